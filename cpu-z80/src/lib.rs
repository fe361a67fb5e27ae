//! Cycle-accurate Zilog Z80 CPU core.
//!
//! The CPU is an instruction-at-a-time interpreter. Each call to
//! [`Z80::execute_cycle`] services a pending signal, consumes one prefix
//! byte, or executes one terminal instruction; [`Z80::step`] runs cycles
//! until an instruction boundary. All memory and I/O goes through the
//! host's [`emu_core::Bus`]/[`emu_core::IoBus`] implementation, and every
//! access charges the documented T-state cost to the tact counter.
//!
//! Documented and commonly-used undocumented behavior is covered: shadow
//! and index registers, WZ/MEMPTR, the X/Y result flags, the DD/FD/ED/CB
//! prefix machine including the DDCB/FDCB store-back, interrupt modes
//! 0/1/2, NMI, HALT, and the EI delay.

mod cpu;
mod flags;
mod registers;
mod state;
mod status;
mod tables;

pub use cpu::{IndexMode, PrefixMode, SIG_HALTED, SIG_INT, SIG_NMI, SIG_RESET, Z80};
pub use flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
pub use registers::Registers;
pub use state::CpuState;
pub use status::MemoryStatus;
