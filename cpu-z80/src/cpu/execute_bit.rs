//! CB-prefixed bit operations, including the DDCB/FDCB indexed forms.

#![allow(clippy::match_same_arms)]

use emu_core::IoBus;

use crate::flags::{CF, HF, PF, SF, XF, YF, ZF};
use crate::tables;

use super::Z80;

impl Z80 {
    /// Execute a plain CB-prefixed instruction (no index prefix active).
    pub(super) fn execute_bit<B: IoBus>(&mut self, bus: &mut B) {
        let op = self.op_code;
        let r = op & 7;

        match op >> 6 {
            // Rotates and shifts
            0 => {
                if r == 6 {
                    let addr = self.regs.hl();
                    let value = self.read_memory(bus, addr);
                    self.clock(bus, 1);
                    let result = self.rotate_shift(op, value);
                    self.write_memory(bus, addr, result);
                } else {
                    let value = self.reg8(r);
                    let result = self.rotate_shift(op, value);
                    self.set_reg8_plain(r, result);
                }
            }

            // BIT n, r/(HL)
            1 => {
                if r == 6 {
                    let addr = self.regs.hl();
                    let value = self.read_memory(bus, addr);
                    self.clock(bus, 1);
                    // X/Y leak from the high byte of WZ, not the operand.
                    let wz_high = (self.regs.wz >> 8) as u8;
                    self.bit_test(op, value, wz_high);
                } else {
                    let value = self.reg8(r);
                    self.bit_test(op, value, value);
                }
            }

            // RES n, r/(HL)
            2 => {
                let mask = !(1u8 << ((op >> 3) & 7));
                if r == 6 {
                    let addr = self.regs.hl();
                    let value = self.read_memory(bus, addr);
                    self.clock(bus, 1);
                    self.write_memory(bus, addr, value & mask);
                } else {
                    let value = self.reg8(r) & mask;
                    self.set_reg8_plain(r, value);
                }
            }

            // SET n, r/(HL)
            _ => {
                let mask = 1u8 << ((op >> 3) & 7);
                if r == 6 {
                    let addr = self.regs.hl();
                    let value = self.read_memory(bus, addr);
                    self.clock(bus, 1);
                    self.write_memory(bus, addr, value | mask);
                } else {
                    let value = self.reg8(r) | mask;
                    self.set_reg8_plain(r, value);
                }
            }
        }
    }

    /// Execute a DDCB/FDCB instruction. The displacement and final opcode
    /// were latched when the CB prefix was consumed; the effective address
    /// lands in WZ. Every non-BIT form writes memory and, when the low
    /// three bits name a register, stores the result there as well.
    pub(super) fn execute_indexed_bit<B: IoBus>(&mut self, bus: &mut B) {
        let op = self.op_code;
        let addr = self
            .index_base()
            .wrapping_add(self.displacement as i16 as u16);
        self.regs.wz = addr;

        let value = self.read_memory(bus, addr);
        self.clock(bus, 1);

        let result = match op >> 6 {
            0 => self.rotate_shift(op, value),
            1 => {
                self.bit_test(op, value, (addr >> 8) as u8);
                return;
            }
            2 => value & !(1u8 << ((op >> 3) & 7)),
            _ => value | (1u8 << ((op >> 3) & 7)),
        };

        self.write_memory(bus, addr, result);
        if op & 7 != 6 {
            self.set_reg8_plain(op & 7, result);
        }
    }

    /// The eight rotate/shift operations selected by opcode bits 5-3,
    /// flags straight from the precomputed tables.
    pub(super) fn rotate_shift(&mut self, op: u8, value: u8) -> u8 {
        let t = tables::get();
        let i = usize::from(value);
        let carry_in = self.regs.f & CF != 0;
        match (op >> 3) & 7 {
            0 => {
                // RLC
                self.regs.f = t.rlc_flags[i];
                t.rol_results[i]
            }
            1 => {
                // RRC
                self.regs.f = t.rrc_flags[i];
                t.ror_results[i]
            }
            2 => {
                // RL
                self.regs.f = if carry_in { t.rl1_flags[i] } else { t.rl0_flags[i] };
                (value << 1) | u8::from(carry_in)
            }
            3 => {
                // RR
                self.regs.f = if carry_in { t.rr1_flags[i] } else { t.rr0_flags[i] };
                (value >> 1) | (u8::from(carry_in) << 7)
            }
            4 => {
                // SLA
                self.regs.f = t.rl0_flags[i];
                value << 1
            }
            5 => {
                // SRA
                self.regs.f = t.sra_flags[i];
                (value >> 1) | (value & 0x80)
            }
            6 => {
                // SLL (undocumented: shifts a 1 into bit 0)
                self.regs.f = t.rl1_flags[i];
                (value << 1) | 1
            }
            _ => {
                // SRL
                self.regs.f = t.rr0_flags[i];
                value >> 1
            }
        }
    }

    /// BIT n: Z/P from the tested bit, S only for a set bit 7, X/Y from
    /// `flag_source`, C preserved.
    fn bit_test(&mut self, op: u8, value: u8, flag_source: u8) {
        let bit = (op >> 3) & 7;
        let is_zero = value & (1 << bit) == 0;

        let mut flags = (self.regs.f & CF) | HF;
        if is_zero {
            flags |= ZF | PF;
        }
        if bit == 7 && !is_zero {
            flags |= SF;
        }
        flags |= flag_source & (XF | YF);
        self.regs.f = flags;
    }
}
