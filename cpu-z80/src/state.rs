//! Bulk CPU state snapshot.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A complete, serializable snapshot of the CPU.
///
/// Field order mirrors the observable state list of the core: register
/// pairs, specials, the tact counter split into two 32-bit halves for
/// deterministic serialization, and the dispatcher's control state.
/// `set_state(state())` is the identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CpuState {
    pub af: u16,
    pub bc: u16,
    pub de: u16,
    pub hl: u16,
    #[cfg_attr(feature = "serde", serde(rename = "af_"))]
    pub af_alt: u16,
    #[cfg_attr(feature = "serde", serde(rename = "bc_"))]
    pub bc_alt: u16,
    #[cfg_attr(feature = "serde", serde(rename = "de_"))]
    pub de_alt: u16,
    #[cfg_attr(feature = "serde", serde(rename = "hl_"))]
    pub hl_alt: u16,
    pub i: u8,
    pub r: u8,
    pub pc: u16,
    pub sp: u16,
    pub ix: u16,
    pub iy: u16,
    pub wz: u16,
    pub tacts_l: u32,
    pub tacts_h: u32,
    pub state_flags: u8,
    pub iff1: bool,
    pub iff2: bool,
    pub interrupt_mode: u8,
    pub is_interrupt_blocked: bool,
    pub is_in_op_execution: bool,
    pub prefix_mode: u8,
    pub index_mode: u8,
    pub maskable_interrupt_mode_entered: bool,
    pub op_code: u8,
    pub use_gate_array_contention: bool,
}
