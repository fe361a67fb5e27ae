//! ED-prefixed instruction execution.
//!
//! Covers the documented extended set, the block instructions with their
//! repeat semantics, and the ZX Spectrum Next additions behind the
//! extended-instruction-set switch. Everything else is an 8-T NOP.

#![allow(clippy::too_many_lines)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

use emu_core::IoBus;

use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
use crate::tables::{self, adc16, sbc16};

use super::Z80;

impl Z80 {
    /// Execute an ED-prefixed instruction.
    pub(super) fn execute_extended<B: IoBus>(&mut self, bus: &mut B) {
        let op = self.op_code;

        match op {
            // IN r, (C) (40=B, 48=C, 50=D, 58=E, 60=H, 68=L, 78=A)
            // 70 = IN (C): flags only, result discarded.
            0x40 | 0x48 | 0x50 | 0x58 | 0x60 | 0x68 | 0x70 | 0x78 => {
                let port = self.regs.bc();
                self.regs.wz = port.wrapping_add(1);
                let value = self.read_port(bus, port);
                let r = (op >> 3) & 7;
                if r != 6 {
                    self.set_reg8_plain(r, value);
                }
                self.regs.f =
                    tables::get().log_flags[usize::from(value)] | (self.regs.f & CF);
            }

            // OUT (C), r (41=B, 49=C, 51=D, 59=E, 61=H, 69=L, 79=A)
            // 71 = OUT (C), 0 on NMOS parts.
            0x41 | 0x49 | 0x51 | 0x59 | 0x61 | 0x69 | 0x71 | 0x79 => {
                let port = self.regs.bc();
                self.regs.wz = port.wrapping_add(1);
                let r = (op >> 3) & 7;
                let value = if r == 6 { 0 } else { self.reg8(r) };
                self.write_port(bus, port, value);
            }

            // SBC HL, rr (42=BC, 52=DE, 62=HL, 72=SP)
            0x42 | 0x52 | 0x62 | 0x72 => {
                self.clock(bus, 7);
                let hl = self.regs.hl();
                self.regs.wz = hl.wrapping_add(1);
                let rr = self.reg16((op >> 4) & 3);
                let (result, flags) = sbc16(hl, rr, self.regs.f & CF != 0);
                self.regs.set_hl(result);
                self.regs.f = flags;
            }

            // LD (nn), rr (43=BC, 53=DE, 63=HL, 73=SP)
            0x43 | 0x53 | 0x63 | 0x73 => {
                let addr = self.read_code_word(bus);
                self.regs.wz = addr.wrapping_add(1);
                let value = self.reg16((op >> 4) & 3);
                self.write_memory(bus, addr, value as u8);
                self.write_memory(bus, addr.wrapping_add(1), (value >> 8) as u8);
            }

            // NEG (and undocumented mirrors)
            0x44 | 0x4C | 0x54 | 0x5C | 0x64 | 0x6C | 0x74 | 0x7C => {
                let a = self.regs.a;
                self.regs.a = 0u8.wrapping_sub(a);
                self.regs.f = tables::get().sbc_flags[usize::from(a)];
            }

            // RETN (and mirrors) / RETI (and mirrors): both restore IFF1
            // from IFF2 and pop the return address into PC.
            0x45 | 0x55 | 0x65 | 0x75 | 0x4D | 0x5D | 0x6D | 0x7D => {
                self.iff1 = self.iff2;
                let addr = self.pop_word(bus);
                self.regs.wz = addr;
                self.regs.pc = addr;
            }

            // IM 0 (and mirrors)
            0x46 | 0x4E | 0x66 | 0x6E => {
                self.interrupt_mode = 0;
            }

            // LD I, A
            0x47 => {
                self.clock(bus, 1);
                self.regs.i = self.regs.a;
            }

            // ADC HL, rr (4A=BC, 5A=DE, 6A=HL, 7A=SP)
            0x4A | 0x5A | 0x6A | 0x7A => {
                self.clock(bus, 7);
                let hl = self.regs.hl();
                self.regs.wz = hl.wrapping_add(1);
                let rr = self.reg16((op >> 4) & 3);
                let (result, flags) = adc16(hl, rr, self.regs.f & CF != 0);
                self.regs.set_hl(result);
                self.regs.f = flags;
            }

            // LD rr, (nn) (4B=BC, 5B=DE, 6B=HL, 7B=SP)
            0x4B | 0x5B | 0x6B | 0x7B => {
                let addr = self.read_code_word(bus);
                self.regs.wz = addr.wrapping_add(1);
                let lo = self.read_memory(bus, addr);
                let hi = self.read_memory(bus, addr.wrapping_add(1));
                self.set_reg16_internal((op >> 4) & 3, u16::from(lo) | (u16::from(hi) << 8));
            }

            // LD R, A
            0x4F => {
                self.clock(bus, 1);
                self.regs.r = self.regs.a;
            }

            // IM 1
            0x56 | 0x76 => {
                self.interrupt_mode = 1;
            }

            // LD A, I: P/V reflects IFF2.
            0x57 => {
                self.clock(bus, 1);
                self.regs.a = self.regs.i;
                self.load_a_ir_flags();
            }

            // IM 2
            0x5E | 0x7E => {
                self.interrupt_mode = 2;
            }

            // LD A, R: P/V reflects IFF2.
            0x5F => {
                self.clock(bus, 1);
                self.regs.a = self.regs.r;
                self.load_a_ir_flags();
            }

            // RRD
            0x67 => {
                let hl = self.regs.hl();
                let mem = self.read_memory(bus, hl);
                self.clock(bus, 4);
                self.regs.wz = hl.wrapping_add(1);
                let a = self.regs.a;
                self.regs.a = (a & 0xF0) | (mem & 0x0F);
                let result = ((a & 0x0F) << 4) | (mem >> 4);
                self.write_memory(bus, hl, result);
                self.regs.f =
                    tables::get().log_flags[usize::from(self.regs.a)] | (self.regs.f & CF);
            }

            // RLD
            0x6F => {
                let hl = self.regs.hl();
                let mem = self.read_memory(bus, hl);
                self.clock(bus, 4);
                self.regs.wz = hl.wrapping_add(1);
                let a = self.regs.a;
                self.regs.a = (a & 0xF0) | (mem >> 4);
                let result = (mem << 4) | (a & 0x0F);
                self.write_memory(bus, hl, result);
                self.regs.f =
                    tables::get().log_flags[usize::from(self.regs.a)] | (self.regs.f & CF);
            }

            // LDI / LDD
            0xA0 | 0xA8 => {
                let step = if op == 0xA0 { 1 } else { 0xFFFF };
                let value = self.block_transfer(bus, step);
                let n = value.wrapping_add(self.regs.a);
                self.regs.f = (self.regs.f & (SF | ZF | CF))
                    | (n & XF)
                    | if n & 0x02 != 0 { YF } else { 0 }
                    | if self.regs.bc() != 0 { PF } else { 0 };
            }

            // LDIR / LDDR
            0xB0 | 0xB8 => {
                let step = if op == 0xB0 { 1 } else { 0xFFFF };
                let value = self.block_transfer(bus, step);
                let n = value.wrapping_add(self.regs.a);
                if self.regs.bc() != 0 {
                    // Repeat: X/Y come from PCH after the PC decrement.
                    self.clock(bus, 5);
                    self.regs.pc = self.regs.pc.wrapping_sub(2);
                    self.regs.wz = self.regs.pc.wrapping_add(1);
                    let pch = (self.regs.pc >> 8) as u8;
                    self.regs.f = (self.regs.f & (SF | ZF | CF)) | PF | (pch & (XF | YF));
                } else {
                    self.regs.f = (self.regs.f & (SF | ZF | CF))
                        | (n & XF)
                        | if n & 0x02 != 0 { YF } else { 0 };
                }
            }

            // CPI / CPD
            0xA1 | 0xA9 => {
                let step = if op == 0xA1 { 1 } else { 0xFFFF };
                let (result, half, n) = self.block_compare(bus, step);
                self.regs.f = self.block_compare_flags(result, half)
                    | (n & XF)
                    | if n & 0x02 != 0 { YF } else { 0 };
            }

            // CPIR / CPDR
            0xB1 | 0xB9 => {
                let step = if op == 0xB1 { 1 } else { 0xFFFF };
                let (result, half, n) = self.block_compare(bus, step);
                let base = self.block_compare_flags(result, half);
                if self.regs.bc() != 0 && result != 0 {
                    // Repeat: X/Y come from PCH.
                    self.clock(bus, 5);
                    self.regs.pc = self.regs.pc.wrapping_sub(2);
                    self.regs.wz = self.regs.pc.wrapping_add(1);
                    let pch = (self.regs.pc >> 8) as u8;
                    self.regs.f = base | (pch & (XF | YF));
                } else {
                    self.regs.f = base | (n & XF) | if n & 0x02 != 0 { YF } else { 0 };
                }
            }

            // INI / IND
            0xA2 | 0xAA => {
                let inc = op == 0xA2;
                let (value, k) = self.block_input(bus, inc);
                self.regs.f = self.block_io_flags(value, k);
            }

            // INIR / INDR
            0xB2 | 0xBA => {
                let inc = op == 0xB2;
                let (value, k) = self.block_input(bus, inc);
                if self.regs.b != 0 {
                    self.block_io_repeat(bus, value, k);
                } else {
                    self.regs.f = self.block_io_flags(value, k);
                }
            }

            // OUTI / OUTD
            0xA3 | 0xAB => {
                let inc = op == 0xA3;
                let (value, k) = self.block_output(bus, inc);
                self.regs.f = self.block_io_flags(value, k);
            }

            // OTIR / OTDR
            0xB3 | 0xBB => {
                let inc = op == 0xB3;
                let (value, k) = self.block_output(bus, inc);
                if self.regs.b != 0 {
                    self.block_io_repeat(bus, value, k);
                } else {
                    self.regs.f = self.block_io_flags(value, k);
                }
            }

            // === ZX Spectrum Next extensions ===

            // SWAPNIB
            0x23 if self.allow_extended_instruction_set => {
                self.regs.a = self.regs.a.rotate_left(4);
            }

            // MIRROR A
            0x24 if self.allow_extended_instruction_set => {
                self.regs.a = self.regs.a.reverse_bits();
            }

            // TEST n: AND with A, flags only.
            0x27 if self.allow_extended_instruction_set => {
                let value = self.read_code(bus);
                self.regs.f =
                    tables::get().log_flags[usize::from(self.regs.a & value)] | HF;
            }

            // BSLA DE, B
            0x28 if self.allow_extended_instruction_set => {
                let shift = u32::from(self.regs.b & 0x1F);
                let de = self.regs.de();
                self.regs
                    .set_de(if shift >= 16 { 0 } else { de << shift });
            }

            // BSRA DE, B (arithmetic)
            0x29 if self.allow_extended_instruction_set => {
                let shift = u32::from(self.regs.b & 0x1F).min(15);
                let de = self.regs.de() as i16;
                self.regs.set_de((de >> shift) as u16);
            }

            // BSRL DE, B (logical)
            0x2A if self.allow_extended_instruction_set => {
                let shift = u32::from(self.regs.b & 0x1F);
                let de = self.regs.de();
                self.regs
                    .set_de(if shift >= 16 { 0 } else { de >> shift });
            }

            // BSRF DE, B (ones shifted in)
            0x2B if self.allow_extended_instruction_set => {
                let shift = u32::from(self.regs.b & 0x1F);
                let de = self.regs.de();
                self.regs
                    .set_de(if shift >= 16 { 0xFFFF } else { !(!de >> shift) });
            }

            // BRLC DE, B (rotate left circular)
            0x2C if self.allow_extended_instruction_set => {
                let rotate = u32::from(self.regs.b & 0x0F);
                let de = self.regs.de();
                self.regs.set_de(de.rotate_left(rotate));
            }

            // MUL D, E
            0x30 if self.allow_extended_instruction_set => {
                let product = u16::from(self.regs.d) * u16::from(self.regs.e);
                self.regs.set_de(product);
            }

            // ADD HL/DE/BC, A (no flags)
            0x31 if self.allow_extended_instruction_set => {
                let value = self.regs.hl().wrapping_add(u16::from(self.regs.a));
                self.regs.set_hl(value);
            }
            0x32 if self.allow_extended_instruction_set => {
                let value = self.regs.de().wrapping_add(u16::from(self.regs.a));
                self.regs.set_de(value);
            }
            0x33 if self.allow_extended_instruction_set => {
                let value = self.regs.bc().wrapping_add(u16::from(self.regs.a));
                self.regs.set_bc(value);
            }

            // ADD HL/DE/BC, nn (no flags)
            0x34 if self.allow_extended_instruction_set => {
                let nn = self.read_code_word(bus);
                self.clock(bus, 2);
                let value = self.regs.hl().wrapping_add(nn);
                self.regs.set_hl(value);
            }
            0x35 if self.allow_extended_instruction_set => {
                let nn = self.read_code_word(bus);
                self.clock(bus, 2);
                let value = self.regs.de().wrapping_add(nn);
                self.regs.set_de(value);
            }
            0x36 if self.allow_extended_instruction_set => {
                let nn = self.read_code_word(bus);
                self.clock(bus, 2);
                let value = self.regs.bc().wrapping_add(nn);
                self.regs.set_bc(value);
            }

            // PUSH nn (immediate stored big-endian)
            0x8A if self.allow_extended_instruction_set => {
                let hi = self.read_code(bus);
                let lo = self.read_code(bus);
                self.clock(bus, 3);
                let value = (u16::from(hi) << 8) | u16::from(lo);
                self.push_word(bus, value);
            }

            // OUTINB: OUT (C), (HL) then INC HL; B unchanged.
            0x90 if self.allow_extended_instruction_set => {
                self.clock(bus, 1);
                let hl = self.regs.hl();
                let value = self.read_memory(bus, hl);
                let port = self.regs.bc();
                self.write_port(bus, port, value);
                self.regs.set_hl(hl.wrapping_add(1));
            }

            // NEXTREG n, n: register select and value through the
            // TBBlue ports, presented back-to-back.
            0x91 if self.allow_extended_instruction_set => {
                let register = self.read_code(bus);
                let value = self.read_code(bus);
                bus.write_io(0x243B, register);
                bus.write_io(0x253B, value);
                self.clock(bus, 6);
            }

            // NEXTREG n, A
            0x92 if self.allow_extended_instruction_set => {
                let register = self.read_code(bus);
                bus.write_io(0x243B, register);
                bus.write_io(0x253B, self.regs.a);
                self.clock(bus, 6);
            }

            // PIXELDN: advance HL one screen line down.
            0x93 if self.allow_extended_instruction_set => {
                let hl = self.regs.hl();
                let next = if hl & 0x0700 != 0x0700 {
                    hl.wrapping_add(0x0100)
                } else if hl & 0x00E0 != 0x00E0 {
                    (hl & 0xF8FF).wrapping_add(0x20)
                } else {
                    (hl & 0xF81F).wrapping_add(0x0800)
                };
                self.regs.set_hl(next);
            }

            // PIXELAD: HL = screen address of pixel (D=y, E=x).
            0x94 if self.allow_extended_instruction_set => {
                let y = u16::from(self.regs.d);
                let x = u16::from(self.regs.e);
                let addr = 0x4000
                    | ((y & 0xC0) << 5)
                    | ((y & 0x07) << 8)
                    | ((y & 0x38) << 2)
                    | (x >> 3);
                self.regs.set_hl(addr);
            }

            // SETAE: A = pixel mask for x = E.
            0x95 if self.allow_extended_instruction_set => {
                self.regs.a = 0x80 >> (self.regs.e & 7);
            }

            // JP (C): jump within the 16K page using the port value.
            0x98 if self.allow_extended_instruction_set => {
                let port = self.regs.bc();
                let value = self.read_port(bus, port);
                self.clock(bus, 1);
                self.regs.pc = (self.regs.pc & 0xC000) | (u16::from(value) << 6);
            }

            // LDIX / LDDX: LDI/LDD without flags, write skipped when the
            // byte equals A.
            0xA4 | 0xAC if self.allow_extended_instruction_set => {
                let step = if op == 0xA4 { 1 } else { 0xFFFF };
                self.block_transfer_masked(bus, step);
            }

            // LDWS: LD (DE),(HL); INC L; INC D with INC flags.
            0xA5 if self.allow_extended_instruction_set => {
                let value = self.read_memory(bus, self.regs.hl());
                self.write_memory(bus, self.regs.de(), value);
                self.regs.l = self.regs.l.wrapping_add(1);
                let d = self.regs.d;
                self.regs.d = self.inc8(d);
            }

            // LDIRX / LDDRX
            0xB4 | 0xBC if self.allow_extended_instruction_set => {
                let step = if op == 0xB4 { 1 } else { 0xFFFF };
                self.block_transfer_masked(bus, step);
                if self.regs.bc() != 0 {
                    self.clock(bus, 5);
                    self.regs.pc = self.regs.pc.wrapping_sub(2);
                }
            }

            // LDPIRX: pattern fill from the 8-byte-aligned source window.
            0xB7 if self.allow_extended_instruction_set => {
                let addr = (self.regs.hl() & 0xFFF8) | u16::from(self.regs.e & 7);
                let value = self.read_memory(bus, addr);
                if value == self.regs.a {
                    self.clock(bus, 3);
                } else {
                    let de = self.regs.de();
                    self.write_memory(bus, de, value);
                }
                self.clock(bus, 2);
                self.regs.set_de(self.regs.de().wrapping_add(1));
                self.regs.set_bc(self.regs.bc().wrapping_sub(1));
                if self.regs.bc() != 0 {
                    self.clock(bus, 5);
                    self.regs.pc = self.regs.pc.wrapping_sub(2);
                }
            }

            // Every other ED opcode is a NOP (8 T from the two fetches).
            _ => {}
        }
    }

    /// S/Z/X/Y + P/V=IFF2 flags shared by LD A,I and LD A,R.
    fn load_a_ir_flags(&mut self) {
        let a = self.regs.a;
        self.regs.f = (self.regs.f & CF)
            | (a & (SF | YF | XF))
            | if a == 0 { ZF } else { 0 }
            | if self.iff2 { PF } else { 0 };
    }

    /// Shared LDI/LDD body: move one byte, step the pointers, decrement
    /// BC. Returns the transferred byte.
    fn block_transfer<B: IoBus>(&mut self, bus: &mut B, step: u16) -> u8 {
        let hl = self.regs.hl();
        let value = self.read_memory(bus, hl);
        let de = self.regs.de();
        self.write_memory(bus, de, value);
        self.clock(bus, 2);
        self.regs.set_hl(hl.wrapping_add(step));
        self.regs.set_de(de.wrapping_add(step));
        self.regs.set_bc(self.regs.bc().wrapping_sub(1));
        value
    }

    /// LDIX/LDDX body: as `block_transfer` but the write is suppressed
    /// (with its timing kept) when the byte equals A, and DE always
    /// increments. No flags.
    fn block_transfer_masked<B: IoBus>(&mut self, bus: &mut B, step: u16) {
        let hl = self.regs.hl();
        let value = self.read_memory(bus, hl);
        if value == self.regs.a {
            self.clock(bus, 3);
        } else {
            let de = self.regs.de();
            self.write_memory(bus, de, value);
        }
        self.clock(bus, 2);
        self.regs.set_hl(hl.wrapping_add(step));
        self.regs.set_de(self.regs.de().wrapping_add(1));
        self.regs.set_bc(self.regs.bc().wrapping_sub(1));
    }

    /// Shared CPI/CPD body. Returns (difference, half-borrow, n) where
    /// n feeds the undocumented X/Y bits.
    fn block_compare<B: IoBus>(&mut self, bus: &mut B, step: u16) -> (u8, bool, u8) {
        let hl = self.regs.hl();
        let value = self.read_memory(bus, hl);
        self.clock(bus, 5);
        self.regs.wz = self.regs.wz.wrapping_add(step);
        let result = self.regs.a.wrapping_sub(value);
        let half = (self.regs.a & 0x0F) < (value & 0x0F);
        let n = result.wrapping_sub(u8::from(half));
        self.regs.set_hl(hl.wrapping_add(step));
        self.regs.set_bc(self.regs.bc().wrapping_sub(1));
        (result, half, n)
    }

    /// CPI/CPD flags shared by single and repeating forms, without X/Y.
    fn block_compare_flags(&self, result: u8, half: bool) -> u8 {
        (self.regs.f & CF)
            | NF
            | if result == 0 { ZF } else { 0 }
            | (result & SF)
            | if half { HF } else { 0 }
            | if self.regs.bc() != 0 { PF } else { 0 }
    }

    /// Shared INI/IND body. Returns the port byte and the k sum feeding
    /// the H/C/P flags.
    fn block_input<B: IoBus>(&mut self, bus: &mut B, inc: bool) -> (u8, u16) {
        self.clock(bus, 1);
        let bc = self.regs.bc();
        self.regs.wz = if inc {
            bc.wrapping_add(1)
        } else {
            bc.wrapping_sub(1)
        };
        let value = self.read_port(bus, bc);
        let hl = self.regs.hl();
        self.write_memory(bus, hl, value);
        self.regs.b = self.regs.b.wrapping_sub(1);
        let step = if inc { 1u16 } else { 0xFFFF };
        self.regs.set_hl(hl.wrapping_add(step));
        let c_next = if inc {
            self.regs.c.wrapping_add(1)
        } else {
            self.regs.c.wrapping_sub(1)
        };
        let k = u16::from(value) + u16::from(c_next);
        (value, k)
    }

    /// Shared OUTI/OUTD body.
    fn block_output<B: IoBus>(&mut self, bus: &mut B, inc: bool) -> (u8, u16) {
        self.clock(bus, 1);
        let hl = self.regs.hl();
        let value = self.read_memory(bus, hl);
        self.regs.b = self.regs.b.wrapping_sub(1);
        let bc = self.regs.bc();
        self.regs.wz = if inc {
            bc.wrapping_add(1)
        } else {
            bc.wrapping_sub(1)
        };
        self.write_port(bus, bc, value);
        let step = if inc { 1u16 } else { 0xFFFF };
        self.regs.set_hl(hl.wrapping_add(step));
        let k = u16::from(value) + u16::from(self.regs.l);
        (value, k)
    }

    /// Block I/O flags for a terminal iteration: Z/S/X/Y from B, N from
    /// the data bit 7, H/C from the k overflow, P from the k/B parity mix.
    fn block_io_flags(&self, value: u8, k: u16) -> u8 {
        let b = self.regs.b;
        let p = ((k as u8) & 7) ^ b;
        (b & (SF | YF | XF))
            | if b == 0 { ZF } else { 0 }
            | if value & 0x80 != 0 { NF } else { 0 }
            | if k > 0xFF { HF | CF } else { 0 }
            | (tables::get().log_flags[usize::from(p)] & PF)
    }

    /// Block I/O repeat iteration: PC rewinds, X/Y come from PCH, and
    /// H/P are recomputed against the in-flight B.
    fn block_io_repeat<B: IoBus>(&mut self, bus: &mut B, value: u8, k: u16) {
        let b = self.regs.b;
        let carried = k > 0xFF;
        let negative = value & 0x80 != 0;
        let p = ((k as u8) & 7) ^ b;

        self.clock(bus, 5);
        self.regs.pc = self.regs.pc.wrapping_sub(2);
        self.regs.wz = self.regs.pc.wrapping_add(1);
        let pch = (self.regs.pc >> 8) as u8;

        let log_flags = &tables::get().log_flags;
        let (half, parity) = if carried {
            if negative {
                (
                    if b & 0x0F == 0x00 { HF } else { 0 },
                    log_flags[usize::from(p ^ (b.wrapping_sub(1) & 7))] & PF,
                )
            } else {
                (
                    if b & 0x0F == 0x0F { HF } else { 0 },
                    log_flags[usize::from(p ^ (b.wrapping_add(1) & 7))] & PF,
                )
            }
        } else {
            (0, log_flags[usize::from(p ^ (b & 7))] & PF)
        };

        self.regs.f = (b & SF)
            | (pch & (XF | YF))
            | if negative { NF } else { 0 }
            | if carried { CF } else { 0 }
            | half
            | parity;
    }
}
