//! Z80 CPU core: dispatcher, bus plumbing, and interrupt logic.

#![allow(clippy::cast_possible_truncation)] // Intentional truncation for low byte extraction.
#![allow(clippy::cast_possible_wrap)] // Intentional i8 casts for displacements.
#![allow(clippy::struct_excessive_bools)] // CPU control state is a set of latches.

use emu_core::{Bus, Cpu, IoBus};

use crate::registers::Registers;
use crate::state::CpuState;
use crate::status::MemoryStatus;

/// Maskable interrupt request signal.
pub const SIG_INT: u8 = 0x01;
/// Non-maskable interrupt request signal.
pub const SIG_NMI: u8 = 0x02;
/// Reset request signal.
pub const SIG_RESET: u8 = 0x04;
/// HALT latch: the CPU idles until an interrupt or reset.
pub const SIG_HALTED: u8 = 0x08;

/// Decode-table selector carried between machine cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum PrefixMode {
    #[default]
    None = 0,
    /// An ED prefix byte has been consumed.
    Extended = 1,
    /// A CB prefix byte has been consumed.
    Bit = 2,
}

impl PrefixMode {
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Extended,
            2 => Self::Bit,
            _ => Self::None,
        }
    }
}

/// Index-register override carried between machine cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum IndexMode {
    #[default]
    None = 0,
    /// A DD prefix byte rewrites H/L/HL to IXH/IXL/IX.
    Ix = 1,
    /// An FD prefix byte rewrites H/L/HL to IYH/IYL/IY.
    Iy = 2,
}

impl IndexMode {
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Ix,
            2 => Self::Iy,
            _ => Self::None,
        }
    }
}

/// The Z80 CPU.
///
/// The CPU does not own memory or I/O devices: every access goes through
/// the host bus passed into [`Z80::execute_cycle`]/[`Z80::step`], and
/// every access charges its documented T-state cost to the tact counter.
/// The prefix state machine persists across calls, so a host stepping one
/// machine cycle at a time observes consistent mid-instruction state.
pub struct Z80 {
    /// Register file, public so harnesses can set up state directly.
    pub regs: Registers,

    // === Control state ===
    pub(crate) state_flags: u8,
    pub(crate) iff1: bool,
    pub(crate) iff2: bool,
    pub(crate) interrupt_mode: u8,
    pub(crate) is_interrupt_blocked: bool,
    pub(crate) is_in_op_execution: bool,
    pub(crate) prefix_mode: PrefixMode,
    pub(crate) index_mode: IndexMode,
    pub(crate) op_code: u8,
    /// Displacement latched between the DDCB/FDCB prefix cycle and its
    /// execution cycle.
    pub(crate) displacement: i8,
    pub(crate) maskable_interrupt_mode_entered: bool,
    pub(crate) allow_extended_instruction_set: bool,
    pub(crate) use_gate_array_contention: bool,

    // === Timing ===
    tacts: u64,

    // === Instrumentation ===
    /// Addresses fetched as instruction bytes.
    pub execution_flow_status: MemoryStatus,
    /// Addresses read as data.
    pub memory_read_status: MemoryStatus,
    /// Addresses written.
    pub memory_write_status: MemoryStatus,
}

impl Z80 {
    /// Create a CPU in its power-on state: all register lines high,
    /// control state cleared. Call [`Z80::reset`] before running code.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::power_on(),
            state_flags: 0,
            iff1: false,
            iff2: false,
            interrupt_mode: 0,
            is_interrupt_blocked: false,
            is_in_op_execution: false,
            prefix_mode: PrefixMode::None,
            index_mode: IndexMode::None,
            op_code: 0,
            displacement: 0,
            maskable_interrupt_mode_entered: false,
            allow_extended_instruction_set: false,
            use_gate_array_contention: false,
            tacts: 0,
            execution_flow_status: MemoryStatus::new(),
            memory_read_status: MemoryStatus::new(),
            memory_write_status: MemoryStatus::new(),
        }
    }

    /// Re-initialize the register file to the power-on pattern without
    /// touching control state.
    pub fn turn_on(&mut self) {
        self.regs = Registers::power_on();
    }

    /// Apply the RESET protocol: PC/I/R cleared, interrupts disabled,
    /// mode 0, prefix machine cleared, signals cleared, tacts zeroed.
    /// The general-purpose registers keep their values.
    pub fn reset(&mut self) {
        self.regs.pc = 0;
        self.regs.i = 0;
        self.regs.r = 0;
        self.iff1 = false;
        self.iff2 = false;
        self.interrupt_mode = 0;
        self.prefix_mode = PrefixMode::None;
        self.index_mode = IndexMode::None;
        self.is_interrupt_blocked = false;
        self.is_in_op_execution = false;
        self.maskable_interrupt_mode_entered = false;
        self.state_flags = 0;
        self.tacts = 0;
    }

    /// Enable the ZX Spectrum Next extended ED opcodes.
    pub fn enable_extended_instruction_set(&mut self, enabled: bool) {
        self.allow_extended_instruction_set = enabled;
    }

    /// Whether the extended ED set is enabled.
    #[must_use]
    pub fn extended_instruction_set(&self) -> bool {
        self.allow_extended_instruction_set
    }

    /// When set, the CPU queries the bus contention hooks on every access.
    pub fn set_gate_array_contention(&mut self, enabled: bool) {
        self.use_gate_array_contention = enabled;
    }

    /// Total T-states since reset.
    #[must_use]
    pub fn tacts(&self) -> u64 {
        self.tacts
    }

    /// The current program counter.
    #[must_use]
    pub fn pc(&self) -> u16 {
        self.regs.pc
    }

    /// Raw signal flags (`SIG_INT` | `SIG_NMI` | `SIG_RESET` | `SIG_HALTED`).
    #[must_use]
    pub fn state_flags(&self) -> u8 {
        self.state_flags
    }

    /// Whether the CPU is in the HALT state.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.state_flags & SIG_HALTED != 0
    }

    /// Whether a multi-byte opcode is in progress.
    #[must_use]
    pub fn is_in_op_execution(&self) -> bool {
        self.is_in_op_execution
    }

    /// Current prefix-table selector.
    #[must_use]
    pub fn prefix_mode(&self) -> PrefixMode {
        self.prefix_mode
    }

    /// Current index-register override.
    #[must_use]
    pub fn index_mode(&self) -> IndexMode {
        self.index_mode
    }

    /// The most recently fetched opcode byte.
    #[must_use]
    pub fn op_code(&self) -> u8 {
        self.op_code
    }

    /// IFF1 interrupt-enable latch.
    #[must_use]
    pub fn iff1(&self) -> bool {
        self.iff1
    }

    /// IFF2 interrupt-enable latch.
    #[must_use]
    pub fn iff2(&self) -> bool {
        self.iff2
    }

    /// Current interrupt mode (0, 1, or 2).
    #[must_use]
    pub fn interrupt_mode(&self) -> u8 {
        self.interrupt_mode
    }

    /// Whether the last completed signal service was a maskable
    /// interrupt acknowledge. Cleared by the next instruction.
    #[must_use]
    pub fn maskable_interrupt_mode_entered(&self) -> bool {
        self.maskable_interrupt_mode_entered
    }

    /// Raise the maskable interrupt line. The line is level-held: it
    /// stays asserted until [`Z80::clear_interrupt_signal`].
    pub fn request_interrupt(&mut self) {
        self.state_flags |= SIG_INT;
    }

    /// Drop the maskable interrupt line.
    pub fn clear_interrupt_signal(&mut self) {
        self.state_flags &= !SIG_INT;
    }

    /// Raise the non-maskable interrupt line. Consumed when serviced.
    pub fn request_nmi(&mut self) {
        self.state_flags |= SIG_NMI;
    }

    /// Request a reset; serviced before the next instruction.
    pub fn request_reset(&mut self) {
        self.state_flags |= SIG_RESET;
    }

    /// Clear all three instrumentation bitmaps.
    pub fn reset_memory_status(&mut self) {
        self.execution_flow_status.clear();
        self.memory_read_status.clear();
        self.memory_write_status.clear();
    }

    // =========================================================================
    // Host-facing register access by encoding
    // =========================================================================

    /// 8-bit register by 3-bit code {B,C,D,E,H,L,-,A}. Code 6 is the
    /// indirect slot and invalid codes return the 0xFF sentinel.
    #[must_use]
    pub fn get_reg8(&self, code: u8) -> u8 {
        match code {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => self.regs.h,
            5 => self.regs.l,
            7 => self.regs.a,
            _ => 0xFF,
        }
    }

    /// Set an 8-bit register by code; invalid codes are a no-op.
    pub fn set_reg8(&mut self, code: u8, value: u8) {
        match code {
            0 => self.regs.b = value,
            1 => self.regs.c = value,
            2 => self.regs.d = value,
            3 => self.regs.e = value,
            4 => self.regs.h = value,
            5 => self.regs.l = value,
            7 => self.regs.a = value,
            _ => {}
        }
    }

    /// 16-bit register pair by 2-bit code {BC,DE,HL,SP}; invalid codes
    /// return the 0xFFFF sentinel.
    #[must_use]
    pub fn get_reg16(&self, code: u8) -> u16 {
        match code {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.regs.hl(),
            3 => self.regs.sp,
            _ => 0xFFFF,
        }
    }

    /// Set a register pair by code; invalid codes are a no-op.
    pub fn set_reg16(&mut self, code: u8, value: u16) {
        match code {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.regs.set_hl(value),
            3 => self.regs.sp = value,
            _ => {}
        }
    }

    // =========================================================================
    // Snapshot
    // =========================================================================

    /// Capture a full snapshot of the CPU.
    #[must_use]
    pub fn state(&self) -> CpuState {
        CpuState {
            af: self.regs.af(),
            bc: self.regs.bc(),
            de: self.regs.de(),
            hl: self.regs.hl(),
            af_alt: self.regs.af_alt(),
            bc_alt: self.regs.bc_alt(),
            de_alt: self.regs.de_alt(),
            hl_alt: self.regs.hl_alt(),
            i: self.regs.i,
            r: self.regs.r,
            pc: self.regs.pc,
            sp: self.regs.sp,
            ix: self.regs.ix,
            iy: self.regs.iy,
            wz: self.regs.wz,
            tacts_l: self.tacts as u32,
            tacts_h: (self.tacts >> 32) as u32,
            state_flags: self.state_flags,
            iff1: self.iff1,
            iff2: self.iff2,
            interrupt_mode: self.interrupt_mode,
            is_interrupt_blocked: self.is_interrupt_blocked,
            is_in_op_execution: self.is_in_op_execution,
            prefix_mode: self.prefix_mode as u8,
            index_mode: self.index_mode as u8,
            maskable_interrupt_mode_entered: self.maskable_interrupt_mode_entered,
            op_code: self.op_code,
            use_gate_array_contention: self.use_gate_array_contention,
        }
    }

    /// Restore the CPU from a snapshot. `set_state(state())` is the
    /// identity for every well-formed snapshot.
    pub fn set_state(&mut self, state: &CpuState) {
        self.regs.set_af(state.af);
        self.regs.set_bc(state.bc);
        self.regs.set_de(state.de);
        self.regs.set_hl(state.hl);
        self.regs.set_af_alt(state.af_alt);
        self.regs.set_bc_alt(state.bc_alt);
        self.regs.set_de_alt(state.de_alt);
        self.regs.set_hl_alt(state.hl_alt);
        self.regs.i = state.i;
        self.regs.r = state.r;
        self.regs.pc = state.pc;
        self.regs.sp = state.sp;
        self.regs.ix = state.ix;
        self.regs.iy = state.iy;
        self.regs.wz = state.wz;
        self.tacts = u64::from(state.tacts_l) | (u64::from(state.tacts_h) << 32);
        self.state_flags = state.state_flags;
        self.iff1 = state.iff1;
        self.iff2 = state.iff2;
        self.interrupt_mode = state.interrupt_mode;
        self.is_interrupt_blocked = state.is_interrupt_blocked;
        self.is_in_op_execution = state.is_in_op_execution;
        self.prefix_mode = PrefixMode::from_u8(state.prefix_mode);
        self.index_mode = IndexMode::from_u8(state.index_mode);
        self.maskable_interrupt_mode_entered = state.maskable_interrupt_mode_entered;
        self.op_code = state.op_code;
        self.use_gate_array_contention = state.use_gate_array_contention;
    }

    // =========================================================================
    // Bus plumbing with tact accounting
    // =========================================================================

    /// Advance the tact counter and mirror the advance to the bus.
    pub(crate) fn clock<B: Bus>(&mut self, bus: &mut B, tacts: u32) {
        self.tacts += u64::from(tacts);
        bus.tick(tacts);
    }

    /// Add internal idle T-states (stretched M-cycles).
    pub fn delay<B: Bus>(&mut self, bus: &mut B, tacts: u32) {
        self.clock(bus, tacts);
    }

    /// Read a data byte: 3 T plus host contention.
    pub(crate) fn read_memory<B: Bus>(&mut self, bus: &mut B, addr: u16) -> u8 {
        let value = bus.read(addr);
        let mut tacts = 3;
        if self.use_gate_array_contention {
            tacts += bus.contention(addr);
        }
        self.clock(bus, tacts);
        self.memory_read_status.touch(addr);
        value
    }

    /// Write a data byte: 3 T plus host contention.
    pub(crate) fn write_memory<B: Bus>(&mut self, bus: &mut B, addr: u16, value: u8) {
        let mut tacts = 3;
        if self.use_gate_array_contention {
            tacts += bus.contention(addr);
        }
        bus.write(addr, value);
        self.clock(bus, tacts);
        self.memory_write_status.touch(addr);
    }

    /// Read from an I/O port: 4 T plus host contention.
    pub(crate) fn read_port<B: IoBus>(&mut self, bus: &mut B, port: u16) -> u8 {
        let value = bus.read_io(port);
        let mut tacts = 4;
        if self.use_gate_array_contention {
            tacts += bus.io_contention(port);
        }
        self.clock(bus, tacts);
        value
    }

    /// Write to an I/O port: 4 T plus host contention.
    pub(crate) fn write_port<B: IoBus>(&mut self, bus: &mut B, port: u16, value: u8) {
        let mut tacts = 4;
        if self.use_gate_array_contention {
            tacts += bus.io_contention(port);
        }
        bus.write_io(port, value);
        self.clock(bus, tacts);
    }

    /// Read the next instruction byte (operand fetch, 3 T).
    pub(crate) fn read_code<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let value = self.read_memory(bus, self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    /// Read a little-endian operand word (3 + 3 T).
    pub(crate) fn read_code_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.read_code(bus);
        let hi = self.read_code(bus);
        u16::from(lo) | (u16::from(hi) << 8)
    }

    /// M1 opcode fetch: 3 T read, 1 T refresh, R bumped, execution-flow
    /// bitmap touched.
    fn fetch_opcode<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let pc = self.regs.pc;
        let value = bus.read(pc);
        let mut tacts = 3;
        if self.use_gate_array_contention {
            tacts += bus.contention(pc);
        }
        self.clock(bus, tacts);
        self.execution_flow_status.touch(pc);
        self.regs.pc = pc.wrapping_add(1);
        self.clock(bus, 1);
        self.regs.refresh();
        value
    }

    /// Pop a little-endian word from the stack (3 + 3 T).
    pub(crate) fn pop_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.read_memory(bus, self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = self.read_memory(bus, self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        u16::from(lo) | (u16::from(hi) << 8)
    }

    /// Push a word: high byte first, each write preceded by the SP
    /// decrement (3 + 3 T).
    pub(crate) fn push_word<B: Bus>(&mut self, bus: &mut B, value: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_memory(bus, self.regs.sp, (value >> 8) as u8);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_memory(bus, self.regs.sp, value as u8);
    }

    // =========================================================================
    // Dispatcher
    // =========================================================================

    /// Advance by one machine step: service a pending signal, consume a
    /// prefix byte, or execute one terminal instruction.
    ///
    /// Hosts that want whole instructions call [`Z80::step`] instead.
    pub fn execute_cycle<B: IoBus>(&mut self, bus: &mut B) {
        if self.state_flags != 0 && self.process_signals(bus) {
            return;
        }
        self.maskable_interrupt_mode_entered = false;

        match self.prefix_mode {
            PrefixMode::Bit => {
                if self.index_mode == IndexMode::None {
                    self.op_code = self.fetch_opcode(bus);
                    self.execute_bit(bus);
                } else {
                    // Opcode and displacement were latched by the prefix
                    // cycle; no fetch here.
                    self.execute_indexed_bit(bus);
                }
                self.finish_instruction(false);
            }
            PrefixMode::Extended => {
                self.op_code = self.fetch_opcode(bus);
                self.execute_extended(bus);
                self.finish_instruction(false);
            }
            PrefixMode::None => {
                let op = self.fetch_opcode(bus);
                self.op_code = op;
                match op {
                    0xCB => {
                        self.prefix_mode = PrefixMode::Bit;
                        self.is_in_op_execution = true;
                        if self.index_mode != IndexMode::None {
                            // DDCB/FDCB: the displacement precedes the
                            // final opcode, which is read without a
                            // refresh cycle.
                            self.displacement = self.read_code(bus) as i8;
                            self.op_code = self.read_code(bus);
                            self.clock(bus, 2);
                        }
                    }
                    0xED => {
                        self.prefix_mode = PrefixMode::Extended;
                        self.index_mode = IndexMode::None;
                        self.is_in_op_execution = true;
                    }
                    0xDD => {
                        self.index_mode = IndexMode::Ix;
                        self.is_interrupt_blocked = true;
                        self.is_in_op_execution = true;
                    }
                    0xFD => {
                        self.index_mode = IndexMode::Iy;
                        self.is_interrupt_blocked = true;
                        self.is_in_op_execution = true;
                    }
                    _ => {
                        self.execute_standard(bus);
                        // EI and DI hold the interrupt block through the
                        // following instruction.
                        self.finish_instruction(matches!(op, 0xF3 | 0xFB));
                    }
                }
            }
        }
    }

    /// Execute one complete instruction; returns T-states consumed.
    pub fn step<B: IoBus>(&mut self, bus: &mut B) -> u32 {
        let start = self.tacts;
        loop {
            self.execute_cycle(bus);
            if !self.is_in_op_execution {
                break;
            }
        }
        // A serviced RESET zeroes the tact counter under us.
        self.tacts.saturating_sub(start) as u32
    }

    /// Terminal-instruction epilogue: the prefix machine unwinds and the
    /// interrupt block lifts unless the instruction re-arms it.
    fn finish_instruction(&mut self, retain_interrupt_block: bool) {
        self.prefix_mode = PrefixMode::None;
        self.index_mode = IndexMode::None;
        self.is_in_op_execution = false;
        if !retain_interrupt_block {
            self.is_interrupt_blocked = false;
        }
    }

    /// Service pending signals in priority order. Returns true when a
    /// signal consumed this cycle.
    fn process_signals<B: IoBus>(&mut self, bus: &mut B) -> bool {
        // Signals are only serviced at instruction boundaries: a prefix
        // in flight finishes before anything pre-empts it.
        if self.is_in_op_execution {
            return false;
        }
        if self.state_flags & SIG_INT != 0 && self.iff1 && !self.is_interrupt_blocked {
            self.execute_interrupt(bus);
            return true;
        }
        if self.state_flags & SIG_RESET != 0 {
            self.reset();
            return true;
        }
        if self.state_flags & SIG_NMI != 0 {
            self.state_flags &= !SIG_NMI;
            self.execute_nmi(bus);
            return true;
        }
        if self.state_flags & SIG_HALTED != 0 {
            // Halted with nothing serviceable: one refresh M-cycle passes.
            self.clock(bus, 3);
            self.clock(bus, 1);
            self.regs.refresh();
            return true;
        }
        false
    }

    /// Maskable interrupt acknowledge.
    ///
    /// Mode 0 is acknowledged as RST 38h (13 T), mode 1 jumps to 0x0038
    /// (13 T), mode 2 fetches a little-endian vector from `(I << 8) |
    /// 0xFF` (19 T). PC lands in WZ in every mode.
    fn execute_interrupt<B: IoBus>(&mut self, bus: &mut B) {
        if self.state_flags & SIG_HALTED != 0 {
            self.state_flags &= !SIG_HALTED;
            self.regs.pc = self.regs.pc.wrapping_add(1);
        }
        self.iff1 = false;
        self.iff2 = false;
        self.maskable_interrupt_mode_entered = true;

        self.clock(bus, 7);
        let return_addr = self.regs.pc;
        self.push_word(bus, return_addr);

        if self.interrupt_mode == 2 {
            let vector = (u16::from(self.regs.i) << 8) | 0x00FF;
            let lo = self.read_memory(bus, vector);
            let hi = self.read_memory(bus, vector.wrapping_add(1));
            self.regs.wz = u16::from(lo) | (u16::from(hi) << 8);
        } else {
            self.regs.wz = 0x0038;
        }
        self.regs.pc = self.regs.wz;
    }

    /// Non-maskable interrupt: IFF1 is parked in IFF2 for RETN, PC is
    /// pushed, execution continues at 0x0066. 11 T.
    fn execute_nmi<B: IoBus>(&mut self, bus: &mut B) {
        if self.state_flags & SIG_HALTED != 0 {
            self.state_flags &= !SIG_HALTED;
            self.regs.pc = self.regs.pc.wrapping_add(1);
        }
        self.iff2 = self.iff1;
        self.iff1 = false;

        self.clock(bus, 5);
        let return_addr = self.regs.pc;
        self.push_word(bus, return_addr);
        self.regs.wz = 0x0066;
        self.regs.pc = 0x0066;
    }

    // =========================================================================
    // Decode helpers
    // =========================================================================

    /// The register standing in for HL under the current index override.
    pub(crate) fn index_base(&self) -> u16 {
        match self.index_mode {
            IndexMode::Ix => self.regs.ix,
            IndexMode::Iy => self.regs.iy,
            IndexMode::None => self.regs.hl(),
        }
    }

    pub(crate) fn set_index_base(&mut self, value: u16) {
        match self.index_mode {
            IndexMode::Ix => self.regs.ix = value,
            IndexMode::Iy => self.regs.iy = value,
            IndexMode::None => self.regs.set_hl(value),
        }
    }

    /// Effective address of the `(HL)` operand. Under an index prefix
    /// this consumes the displacement byte, burns the address-add cycles,
    /// and latches the result into WZ.
    pub(crate) fn hl_indirect<B: Bus>(&mut self, bus: &mut B) -> u16 {
        if self.index_mode == IndexMode::None {
            return self.regs.hl();
        }
        let d = self.read_code(bus) as i8;
        self.clock(bus, 5);
        let addr = self.index_base().wrapping_add(d as i16 as u16);
        self.regs.wz = addr;
        addr
    }

    /// 8-bit register by decode code, without the index rewrite. Used for
    /// the register companion of `(IX+d)` operands. Code 6 is handled by
    /// the caller.
    pub(crate) fn reg8(&self, code: u8) -> u8 {
        match code & 7 {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => self.regs.h,
            5 => self.regs.l,
            7 => self.regs.a,
            _ => 0,
        }
    }

    pub(crate) fn set_reg8_plain(&mut self, code: u8, value: u8) {
        match code & 7 {
            0 => self.regs.b = value,
            1 => self.regs.c = value,
            2 => self.regs.d = value,
            3 => self.regs.e = value,
            4 => self.regs.h = value,
            5 => self.regs.l = value,
            7 => self.regs.a = value,
            _ => {}
        }
    }

    /// 8-bit register by decode code with H/L rewritten to the index
    /// halves when a DD/FD prefix is active (undocumented IXH/IXL/IYH/IYL).
    pub(crate) fn reg8_idx(&self, code: u8) -> u8 {
        match (code & 7, self.index_mode) {
            (4, IndexMode::Ix) => self.regs.ixh(),
            (5, IndexMode::Ix) => self.regs.ixl(),
            (4, IndexMode::Iy) => self.regs.iyh(),
            (5, IndexMode::Iy) => self.regs.iyl(),
            (other, _) => self.reg8(other),
        }
    }

    pub(crate) fn set_reg8_idx(&mut self, code: u8, value: u8) {
        match code & 7 {
            4 => {
                let base = self.index_base();
                self.set_index_base((base & 0x00FF) | (u16::from(value) << 8));
            }
            5 => {
                let base = self.index_base();
                self.set_index_base((base & 0xFF00) | u16::from(value));
            }
            other => self.set_reg8_plain(other, value),
        }
    }

    /// Register pair by 2-bit code, HL rewritten to IX/IY under a prefix.
    pub(crate) fn reg16(&self, code: u8) -> u16 {
        match code & 3 {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.index_base(),
            _ => self.regs.sp,
        }
    }

    pub(crate) fn set_reg16_internal(&mut self, code: u8, value: u16) {
        match code & 3 {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.set_index_base(value),
            _ => self.regs.sp = value,
        }
    }

    /// Register pair for PUSH/POP: AF replaces SP.
    pub(crate) fn reg16_af(&self, code: u8) -> u16 {
        match code & 3 {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.index_base(),
            _ => self.regs.af(),
        }
    }

    pub(crate) fn set_reg16_af(&mut self, code: u8, value: u16) {
        match code & 3 {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.set_index_base(value),
            _ => self.regs.set_af(value),
        }
    }

    /// Evaluate a 3-bit condition code.
    pub(crate) fn condition(&self, cc: u8) -> bool {
        use crate::flags::{CF, PF, SF, ZF};
        match cc & 7 {
            0 => self.regs.f & ZF == 0, // NZ
            1 => self.regs.f & ZF != 0, // Z
            2 => self.regs.f & CF == 0, // NC
            3 => self.regs.f & CF != 0, // C
            4 => self.regs.f & PF == 0, // PO
            5 => self.regs.f & PF != 0, // PE
            6 => self.regs.f & SF == 0, // P
            _ => self.regs.f & SF != 0, // M
        }
    }

    // =========================================================================
    // Debugger support
    // =========================================================================

    /// Classify the instruction at `pc` for step-over debugging: 3 for
    /// CALL/CALL cc, 1 for RST and HALT, 2 for the repeating block ops,
    /// 0 for everything else. Peeks memory without advancing tacts.
    #[must_use]
    pub fn call_instruction_length<B: Bus>(&self, bus: &mut B, pc: u16) -> u8 {
        let op = bus.read(pc);
        match op {
            0xCD => 3,
            0x76 => 1,
            0xED => match bus.read(pc.wrapping_add(1)) {
                0xB0 | 0xB1 | 0xB2 | 0xB3 | 0xB8 | 0xB9 | 0xBA | 0xBB => 2,
                _ => 0,
            },
            op if op & 0xC7 == 0xC4 => 3, // CALL cc, nn
            op if op & 0xC7 == 0xC7 => 1, // RST n
            _ => 0,
        }
    }
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: IoBus> Cpu<B> for Z80 {
    fn step(&mut self, bus: &mut B) -> u32 {
        self.step(bus)
    }

    fn reset(&mut self) {
        self.reset();
    }

    fn interrupt(&mut self) {
        self.request_interrupt();
    }

    fn nmi(&mut self) {
        self.request_nmi();
    }

    fn pc(&self) -> u16 {
        self.pc()
    }
}

// Instruction execution split across files by decode table.
mod execute;
mod execute_bit;
mod execute_extended;
