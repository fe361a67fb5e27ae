//! Unprefixed instruction execution.
//!
//! Under a DD/FD prefix the same decode runs with H/L/HL rewritten to the
//! index register halves and `(HL)` rewritten to `(IX+d)`/`(IY+d)`; the
//! helpers on [`Z80`] carry that rewrite, so only the handful of opcodes
//! with their own indexed timing need special cases here.

#![allow(clippy::too_many_lines)]
#![allow(clippy::match_same_arms)]

use emu_core::IoBus;

use crate::cpu::{IndexMode, SIG_HALTED};
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
use crate::tables::{self, add16};

use super::Z80;

impl Z80 {
    /// Execute an unprefixed (or index-rewritten) instruction.
    pub(super) fn execute_standard<B: IoBus>(&mut self, bus: &mut B) {
        let op = self.op_code;

        match op {
            // NOP
            0x00 => {}

            // LD rr, nn (01=BC, 11=DE, 21=HL, 31=SP)
            0x01 | 0x11 | 0x21 | 0x31 => {
                let value = self.read_code_word(bus);
                self.set_reg16_internal((op >> 4) & 3, value);
            }

            // LD (BC), A
            0x02 => {
                let addr = self.regs.bc();
                let a = self.regs.a;
                self.regs.wz = (u16::from(a) << 8) | (addr.wrapping_add(1) & 0xFF);
                self.write_memory(bus, addr, a);
            }

            // INC rr (03=BC, 13=DE, 23=HL, 33=SP)
            0x03 | 0x13 | 0x23 | 0x33 => {
                self.clock(bus, 2);
                let rp = (op >> 4) & 3;
                let value = self.reg16(rp).wrapping_add(1);
                self.set_reg16_internal(rp, value);
            }

            // INC r (04=B, 0C=C, 14=D, 1C=E, 24=H, 2C=L, 3C=A)
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x3C => {
                let r = (op >> 3) & 7;
                let value = self.reg8_idx(r);
                let result = self.inc8(value);
                self.set_reg8_idx(r, result);
            }

            // DEC r (05=B, 0D=C, 15=D, 1D=E, 25=H, 2D=L, 3D=A)
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x3D => {
                let r = (op >> 3) & 7;
                let value = self.reg8_idx(r);
                let result = self.dec8(value);
                self.set_reg8_idx(r, result);
            }

            // LD r, n (06=B, 0E=C, 16=D, 1E=E, 26=H, 2E=L, 3E=A)
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x3E => {
                let value = self.read_code(bus);
                self.set_reg8_idx((op >> 3) & 7, value);
            }

            // RLCA
            0x07 => {
                let old = self.regs.a;
                self.regs.a = tables::get().rol_results[usize::from(old)];
                self.regs.f = (self.regs.f & (SF | ZF | PF))
                    | (self.regs.a & (YF | XF))
                    | ((old >> 7) & CF);
            }

            // EX AF, AF'
            0x08 => {
                self.regs.exchange_af();
            }

            // ADD HL, rr (09=BC, 19=DE, 29=HL, 39=SP)
            0x09 | 0x19 | 0x29 | 0x39 => {
                self.clock(bus, 7);
                let hl = self.index_base();
                let rr = self.reg16((op >> 4) & 3);
                self.regs.wz = hl.wrapping_add(1);
                let (result, flags) = add16(hl, rr);
                self.set_index_base(result);
                self.regs.f = (self.regs.f & (SF | ZF | PF)) | flags;
            }

            // LD A, (BC)
            0x0A => {
                let addr = self.regs.bc();
                self.regs.a = self.read_memory(bus, addr);
                self.regs.wz = addr.wrapping_add(1);
            }

            // DEC rr (0B=BC, 1B=DE, 2B=HL, 3B=SP)
            0x0B | 0x1B | 0x2B | 0x3B => {
                self.clock(bus, 2);
                let rp = (op >> 4) & 3;
                let value = self.reg16(rp).wrapping_sub(1);
                self.set_reg16_internal(rp, value);
            }

            // RRCA
            0x0F => {
                let old = self.regs.a;
                self.regs.a = tables::get().ror_results[usize::from(old)];
                self.regs.f =
                    (self.regs.f & (SF | ZF | PF)) | (self.regs.a & (YF | XF)) | (old & CF);
            }

            // DJNZ e
            0x10 => {
                self.clock(bus, 1);
                let d = self.read_code(bus) as i8;
                self.regs.b = self.regs.b.wrapping_sub(1);
                if self.regs.b != 0 {
                    self.clock(bus, 5);
                    self.regs.pc = self.regs.pc.wrapping_add(d as i16 as u16);
                    self.regs.wz = self.regs.pc;
                }
            }

            // LD (DE), A
            0x12 => {
                let addr = self.regs.de();
                let a = self.regs.a;
                self.regs.wz = (u16::from(a) << 8) | (addr.wrapping_add(1) & 0xFF);
                self.write_memory(bus, addr, a);
            }

            // RLA
            0x17 => {
                let old_carry = self.regs.f & CF;
                let new_carry = self.regs.a >> 7;
                self.regs.a = (self.regs.a << 1) | old_carry;
                self.regs.f =
                    (self.regs.f & (SF | ZF | PF)) | (self.regs.a & (YF | XF)) | (new_carry & CF);
            }

            // JR e
            0x18 => {
                let d = self.read_code(bus) as i8;
                self.clock(bus, 5);
                self.regs.pc = self.regs.pc.wrapping_add(d as i16 as u16);
                self.regs.wz = self.regs.pc;
            }

            // LD A, (DE)
            0x1A => {
                let addr = self.regs.de();
                self.regs.a = self.read_memory(bus, addr);
                self.regs.wz = addr.wrapping_add(1);
            }

            // RRA
            0x1F => {
                let old_carry = (self.regs.f & CF) << 7;
                let new_carry = self.regs.a & 1;
                self.regs.a = (self.regs.a >> 1) | old_carry;
                self.regs.f =
                    (self.regs.f & (SF | ZF | PF)) | (self.regs.a & (YF | XF)) | (new_carry & CF);
            }

            // JR cc, e (20=NZ, 28=Z, 30=NC, 38=C)
            0x20 | 0x28 | 0x30 | 0x38 => {
                let d = self.read_code(bus) as i8;
                let taken = match (op >> 3) & 3 {
                    0 => self.regs.f & ZF == 0,
                    1 => self.regs.f & ZF != 0,
                    2 => self.regs.f & CF == 0,
                    _ => self.regs.f & CF != 0,
                };
                if taken {
                    self.clock(bus, 5);
                    self.regs.pc = self.regs.pc.wrapping_add(d as i16 as u16);
                    self.regs.wz = self.regs.pc;
                }
            }

            // LD (nn), HL
            0x22 => {
                let addr = self.read_code_word(bus);
                self.regs.wz = addr.wrapping_add(1);
                let value = self.index_base();
                self.write_memory(bus, addr, value as u8);
                self.write_memory(bus, addr.wrapping_add(1), (value >> 8) as u8);
            }

            // DAA
            0x27 => {
                let key = usize::from(((self.regs.f & HF) >> 2) | (self.regs.f & (NF | CF)));
                let packed = tables::get().daa[(key << 8) | usize::from(self.regs.a)];
                self.regs.a = (packed >> 8) as u8;
                self.regs.f = packed as u8;
            }

            // LD HL, (nn)
            0x2A => {
                let addr = self.read_code_word(bus);
                self.regs.wz = addr.wrapping_add(1);
                let lo = self.read_memory(bus, addr);
                let hi = self.read_memory(bus, addr.wrapping_add(1));
                self.set_index_base(u16::from(lo) | (u16::from(hi) << 8));
            }

            // CPL
            0x2F => {
                self.regs.a = !self.regs.a;
                self.regs.f =
                    (self.regs.f & (SF | ZF | PF | CF)) | HF | NF | (self.regs.a & (XF | YF));
            }

            // LD (nn), A
            0x32 => {
                let addr = self.read_code_word(bus);
                let a = self.regs.a;
                self.regs.wz = (u16::from(a) << 8) | (addr.wrapping_add(1) & 0xFF);
                self.write_memory(bus, addr, a);
            }

            // INC (HL) / INC (IX+d)
            0x34 => {
                let addr = self.hl_indirect(bus);
                let value = self.read_memory(bus, addr);
                self.clock(bus, 1);
                let result = self.inc8(value);
                self.write_memory(bus, addr, result);
            }

            // DEC (HL) / DEC (IX+d)
            0x35 => {
                let addr = self.hl_indirect(bus);
                let value = self.read_memory(bus, addr);
                self.clock(bus, 1);
                let result = self.dec8(value);
                self.write_memory(bus, addr, result);
            }

            // LD (HL), n / LD (IX+d), n
            0x36 => {
                if self.index_mode == IndexMode::None {
                    let value = self.read_code(bus);
                    self.write_memory(bus, self.regs.hl(), value);
                } else {
                    let d = self.read_code(bus) as i8;
                    let value = self.read_code(bus);
                    self.clock(bus, 2);
                    let addr = self.index_base().wrapping_add(d as i16 as u16);
                    self.regs.wz = addr;
                    self.write_memory(bus, addr, value);
                }
            }

            // SCF
            0x37 => {
                self.regs.f =
                    (self.regs.f & (SF | ZF | PF)) | CF | (self.regs.a & (XF | YF));
            }

            // LD A, (nn)
            0x3A => {
                let addr = self.read_code_word(bus);
                self.regs.wz = addr.wrapping_add(1);
                self.regs.a = self.read_memory(bus, addr);
            }

            // CCF
            0x3F => {
                let old_carry = self.regs.f & CF;
                self.regs.f = (self.regs.f & (SF | ZF | PF))
                    | (self.regs.a & (XF | YF))
                    | if old_carry != 0 { HF } else { CF };
            }

            // HALT: PC backs up so the instruction re-executes until an
            // interrupt arrives.
            0x76 => {
                self.state_flags |= SIG_HALTED;
                self.regs.pc = self.regs.pc.wrapping_sub(1);
            }

            // LD r, r' (40-7F except 76)
            0x40..=0x7F => {
                let src = op & 7;
                let dst = (op >> 3) & 7;
                if src == 6 {
                    // LD r, (HL): the register operand is never rewritten.
                    let addr = self.hl_indirect(bus);
                    let value = self.read_memory(bus, addr);
                    self.set_reg8_plain(dst, value);
                } else if dst == 6 {
                    // LD (HL), r
                    let addr = self.hl_indirect(bus);
                    let value = self.reg8(src);
                    self.write_memory(bus, addr, value);
                } else {
                    let value = self.reg8_idx(src);
                    self.set_reg8_idx(dst, value);
                }
            }

            // ALU A, r/(HL) (80-BF)
            0x80..=0xBF => {
                let r = op & 7;
                let value = if r == 6 {
                    let addr = self.hl_indirect(bus);
                    self.read_memory(bus, addr)
                } else {
                    self.reg8_idx(r)
                };
                self.alu_a(op, value);
            }

            // RET cc (C0=NZ, C8=Z, D0=NC, D8=C, E0=PO, E8=PE, F0=P, F8=M)
            0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => {
                self.clock(bus, 1);
                if self.condition((op >> 3) & 7) {
                    let addr = self.pop_word(bus);
                    self.regs.wz = addr;
                    self.regs.pc = addr;
                }
            }

            // POP rr (C1=BC, D1=DE, E1=HL, F1=AF)
            0xC1 | 0xD1 | 0xE1 | 0xF1 => {
                let value = self.pop_word(bus);
                self.set_reg16_af((op >> 4) & 3, value);
            }

            // JP cc, nn
            0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => {
                let addr = self.read_code_word(bus);
                self.regs.wz = addr;
                if self.condition((op >> 3) & 7) {
                    self.regs.pc = addr;
                }
            }

            // JP nn
            0xC3 => {
                let addr = self.read_code_word(bus);
                self.regs.wz = addr;
                self.regs.pc = addr;
            }

            // CALL cc, nn
            0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => {
                let target = self.read_code_word(bus);
                self.regs.wz = target;
                if self.condition((op >> 3) & 7) {
                    self.clock(bus, 1);
                    let ret = self.regs.pc;
                    self.push_word(bus, ret);
                    self.regs.pc = target;
                }
            }

            // PUSH rr (C5=BC, D5=DE, E5=HL, F5=AF)
            0xC5 | 0xD5 | 0xE5 | 0xF5 => {
                self.clock(bus, 1);
                let value = self.reg16_af((op >> 4) & 3);
                self.push_word(bus, value);
            }

            // ALU A, n
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let value = self.read_code(bus);
                self.alu_a(op, value);
            }

            // RST n (C7=00, CF=08, ... FF=38)
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                self.clock(bus, 1);
                let target = u16::from(op & 0x38);
                self.regs.wz = target;
                let ret = self.regs.pc;
                self.push_word(bus, ret);
                self.regs.pc = target;
            }

            // RET
            0xC9 => {
                let addr = self.pop_word(bus);
                self.regs.wz = addr;
                self.regs.pc = addr;
            }

            // CALL nn
            0xCD => {
                let target = self.read_code_word(bus);
                self.regs.wz = target;
                self.clock(bus, 1);
                let ret = self.regs.pc;
                self.push_word(bus, ret);
                self.regs.pc = target;
            }

            // OUT (n), A
            0xD3 => {
                let n = self.read_code(bus);
                let port = (u16::from(self.regs.a) << 8) | u16::from(n);
                self.regs.wz =
                    (u16::from(self.regs.a) << 8) | u16::from(n.wrapping_add(1));
                let a = self.regs.a;
                self.write_port(bus, port, a);
            }

            // EXX
            0xD9 => {
                self.regs.exchange_banks();
            }

            // IN A, (n)
            0xDB => {
                let n = self.read_code(bus);
                let port = (u16::from(self.regs.a) << 8) | u16::from(n);
                self.regs.wz = port.wrapping_add(1);
                self.regs.a = self.read_port(bus, port);
            }

            // EX (SP), HL
            0xE3 => {
                let sp = self.regs.sp;
                let lo = self.read_memory(bus, sp);
                let hi = self.read_memory(bus, sp.wrapping_add(1));
                self.clock(bus, 1);
                let value = self.index_base();
                self.write_memory(bus, sp.wrapping_add(1), (value >> 8) as u8);
                self.write_memory(bus, sp, value as u8);
                self.clock(bus, 2);
                let swapped = u16::from(lo) | (u16::from(hi) << 8);
                self.set_index_base(swapped);
                self.regs.wz = swapped;
            }

            // JP (HL)
            0xE9 => {
                self.regs.pc = self.index_base();
            }

            // EX DE, HL (never index-rewritten)
            0xEB => {
                let de = self.regs.de();
                let hl = self.regs.hl();
                self.regs.set_de(hl);
                self.regs.set_hl(de);
            }

            // DI
            0xF3 => {
                self.iff1 = false;
                self.iff2 = false;
                self.is_interrupt_blocked = true;
            }

            // LD SP, HL
            0xF9 => {
                self.clock(bus, 2);
                self.regs.sp = self.index_base();
            }

            // EI: interrupts enable after the following instruction.
            0xFB => {
                self.iff1 = true;
                self.iff2 = true;
                self.is_interrupt_blocked = true;
            }

            // CB/DD/ED/FD never reach this table.
            _ => unreachable!("prefix byte {op:#04X} dispatched as instruction"),
        }
    }

    // =========================================================================
    // Table-driven ALU helpers
    // =========================================================================

    /// INC r8: table flags, C preserved.
    pub(super) fn inc8(&mut self, value: u8) -> u8 {
        self.regs.f = (self.regs.f & CF) | tables::get().inc_flags[usize::from(value)];
        value.wrapping_add(1)
    }

    /// DEC r8: table flags, C preserved.
    pub(super) fn dec8(&mut self, value: u8) -> u8 {
        self.regs.f = (self.regs.f & CF) | tables::get().dec_flags[usize::from(value)];
        value.wrapping_sub(1)
    }

    /// The eight-entry ALU: ADD/ADC/SUB/SBC/AND/XOR/OR/CP selected by
    /// opcode bits 5-3. All operate on A; CP leaves A untouched.
    pub(super) fn alu_a(&mut self, op: u8, value: u8) {
        let t = tables::get();
        let a = self.regs.a;
        match (op >> 3) & 7 {
            0 => {
                // ADD
                let idx = (usize::from(a) << 8) | usize::from(value);
                self.regs.a = a.wrapping_add(value);
                self.regs.f = t.adc_flags[idx];
            }
            1 => {
                // ADC
                let cin = self.regs.f & CF;
                let idx =
                    (usize::from(cin) << 16) | (usize::from(a) << 8) | usize::from(value);
                self.regs.a = a.wrapping_add(value).wrapping_add(cin);
                self.regs.f = t.adc_flags[idx];
            }
            2 => {
                // SUB
                let idx = (usize::from(a) << 8) | usize::from(value);
                self.regs.a = a.wrapping_sub(value);
                self.regs.f = t.sbc_flags[idx];
            }
            3 => {
                // SBC
                let cin = self.regs.f & CF;
                let idx =
                    (usize::from(cin) << 16) | (usize::from(a) << 8) | usize::from(value);
                self.regs.a = a.wrapping_sub(value).wrapping_sub(cin);
                self.regs.f = t.sbc_flags[idx];
            }
            4 => {
                // AND
                self.regs.a = a & value;
                self.regs.f = t.log_flags[usize::from(self.regs.a)] | HF;
            }
            5 => {
                // XOR
                self.regs.a = a ^ value;
                self.regs.f = t.log_flags[usize::from(self.regs.a)];
            }
            6 => {
                // OR
                self.regs.a = a | value;
                self.regs.f = t.log_flags[usize::from(self.regs.a)];
            }
            _ => {
                // CP: X/Y come from the operand, not the difference.
                let idx = (usize::from(a) << 8) | usize::from(value);
                self.regs.f = (t.sbc_flags[idx] & !(XF | YF)) | (value & (XF | YF));
            }
        }
    }
}
