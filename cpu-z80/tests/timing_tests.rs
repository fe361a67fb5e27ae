//! T-state accounting for every instruction group.
//!
//! Each case loads a program, executes a fixed number of instructions,
//! and compares the tact counter against the documented totals.

use cpu_z80::{CF, Z80, ZF};
use emu_core::{Bus, IoBus, SimpleBus};

fn make_cpu() -> Z80 {
    let mut cpu = Z80::new();
    cpu.reset();
    cpu
}

/// Step one instruction of `program` from a fresh CPU and return its tacts.
fn time_one(program: &[u8], setup: impl FnOnce(&mut Z80, &mut SimpleBus)) -> u32 {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, program);
    let mut cpu = make_cpu();
    setup(&mut cpu, &mut bus);
    cpu.step(&mut bus)
}

fn time(program: &[u8]) -> u32 {
    time_one(program, |_, _| {})
}

#[test]
fn unprefixed_timings() {
    assert_eq!(time(&[0x00]), 4, "NOP");
    assert_eq!(time(&[0x41]), 4, "LD B, C");
    assert_eq!(time(&[0x06, 0x12]), 7, "LD B, n");
    assert_eq!(time(&[0x46]), 7, "LD B, (HL)");
    assert_eq!(time(&[0x70]), 7, "LD (HL), B");
    assert_eq!(time(&[0x36, 0x12]), 10, "LD (HL), n");
    assert_eq!(time(&[0x01, 0x34, 0x12]), 10, "LD BC, nn");
    assert_eq!(time(&[0x02]), 7, "LD (BC), A");
    assert_eq!(time(&[0x0A]), 7, "LD A, (BC)");
    assert_eq!(time(&[0x03]), 6, "INC BC");
    assert_eq!(time(&[0x04]), 4, "INC B");
    assert_eq!(time(&[0x34]), 11, "INC (HL)");
    assert_eq!(time(&[0x07]), 4, "RLCA");
    assert_eq!(time(&[0x08]), 4, "EX AF, AF'");
    assert_eq!(time(&[0x09]), 11, "ADD HL, BC");
    assert_eq!(time(&[0x27]), 4, "DAA");
    assert_eq!(time(&[0x22, 0x00, 0x20]), 16, "LD (nn), HL");
    assert_eq!(time(&[0x2A, 0x00, 0x20]), 16, "LD HL, (nn)");
    assert_eq!(time(&[0x32, 0x00, 0x20]), 13, "LD (nn), A");
    assert_eq!(time(&[0x3A, 0x00, 0x20]), 13, "LD A, (nn)");
    assert_eq!(time(&[0x80]), 4, "ADD A, B");
    assert_eq!(time(&[0x86]), 7, "ADD A, (HL)");
    assert_eq!(time(&[0xC6, 0x01]), 7, "ADD A, n");
    assert_eq!(time(&[0xC3, 0x00, 0x10]), 10, "JP nn");
    assert_eq!(time(&[0xE9]), 4, "JP (HL)");
    assert_eq!(time(&[0xF9]), 6, "LD SP, HL");
    assert_eq!(time(&[0xF3]), 4, "DI");
    assert_eq!(time(&[0xFB]), 4, "EI");
}

#[test]
fn jump_and_call_timings_depend_on_condition() {
    // JR taken / not taken
    assert_eq!(time(&[0x18, 0x02]), 12, "JR e");
    assert_eq!(
        time_one(&[0x20, 0x02], |cpu, _| cpu.regs.f = ZF),
        7,
        "JR NZ not taken"
    );
    assert_eq!(
        time_one(&[0x20, 0x02], |cpu, _| cpu.regs.f = 0),
        12,
        "JR NZ taken"
    );

    // DJNZ taken / not taken
    assert_eq!(
        time_one(&[0x10, 0xFE], |cpu, _| cpu.regs.b = 2),
        13,
        "DJNZ taken"
    );
    assert_eq!(
        time_one(&[0x10, 0xFE], |cpu, _| cpu.regs.b = 1),
        8,
        "DJNZ falls through"
    );

    // JP cc costs 10 either way
    assert_eq!(
        time_one(&[0xC2, 0x00, 0x10], |cpu, _| cpu.regs.f = ZF),
        10,
        "JP NZ not taken"
    );
    assert_eq!(
        time_one(&[0xC2, 0x00, 0x10], |cpu, _| cpu.regs.f = 0),
        10,
        "JP NZ taken"
    );

    // CALL / RET
    assert_eq!(
        time_one(&[0xCD, 0x00, 0x10], |cpu, _| cpu.regs.sp = 0x8000),
        17,
        "CALL nn"
    );
    assert_eq!(
        time_one(&[0xC4, 0x00, 0x10], |cpu, _| {
            cpu.regs.sp = 0x8000;
            cpu.regs.f = ZF;
        }),
        10,
        "CALL NZ not taken"
    );
    assert_eq!(
        time_one(&[0xC9], |cpu, _| cpu.regs.sp = 0x8000),
        10,
        "RET"
    );
    assert_eq!(
        time_one(&[0xC0], |cpu, _| {
            cpu.regs.sp = 0x8000;
            cpu.regs.f = ZF;
        }),
        5,
        "RET NZ not taken"
    );
    assert_eq!(
        time_one(&[0xC0], |cpu, _| {
            cpu.regs.sp = 0x8000;
            cpu.regs.f = 0;
        }),
        11,
        "RET NZ taken"
    );

    assert_eq!(
        time_one(&[0xC5], |cpu, _| cpu.regs.sp = 0x8000),
        11,
        "PUSH BC"
    );
    assert_eq!(
        time_one(&[0xC1], |cpu, _| cpu.regs.sp = 0x8000),
        10,
        "POP BC"
    );
    assert_eq!(
        time_one(&[0xC7], |cpu, _| cpu.regs.sp = 0x8000),
        11,
        "RST 0"
    );
    assert_eq!(
        time_one(&[0xE3], |cpu, _| cpu.regs.sp = 0x8000),
        19,
        "EX (SP), HL"
    );
}

#[test]
fn io_timings() {
    assert_eq!(time(&[0xD3, 0xFE]), 11, "OUT (n), A");
    assert_eq!(time(&[0xDB, 0xFE]), 11, "IN A, (n)");
    assert_eq!(time(&[0xED, 0x40]), 12, "IN B, (C)");
    assert_eq!(time(&[0xED, 0x41]), 12, "OUT (C), B");
}

#[test]
fn extended_timings() {
    assert_eq!(time(&[0xED, 0x44]), 8, "NEG");
    assert_eq!(time(&[0xED, 0x46]), 8, "IM 0");
    assert_eq!(time(&[0xED, 0x47]), 9, "LD I, A");
    assert_eq!(time(&[0xED, 0x57]), 9, "LD A, I");
    assert_eq!(time(&[0xED, 0x42]), 15, "SBC HL, BC");
    assert_eq!(time(&[0xED, 0x4A]), 15, "ADC HL, BC");
    assert_eq!(time(&[0xED, 0x43, 0x00, 0x20]), 20, "LD (nn), BC");
    assert_eq!(time(&[0xED, 0x4B, 0x00, 0x20]), 20, "LD BC, (nn)");
    assert_eq!(
        time_one(&[0xED, 0x45], |cpu, _| cpu.regs.sp = 0x8000),
        14,
        "RETN"
    );
    assert_eq!(time(&[0xED, 0x67]), 18, "RRD");
    assert_eq!(time(&[0xED, 0x00]), 8, "undefined ED is an 8T NOP");
}

#[test]
fn block_instruction_timings() {
    // Single-shot forms.
    assert_eq!(
        time_one(&[0xED, 0xA0], |cpu, _| {
            cpu.regs.set_hl(0x2000);
            cpu.regs.set_de(0x3000);
            cpu.regs.set_bc(2);
        }),
        16,
        "LDI"
    );
    assert_eq!(
        time_one(&[0xED, 0xA1], |cpu, _| {
            cpu.regs.set_hl(0x2000);
            cpu.regs.set_bc(2);
        }),
        16,
        "CPI"
    );
    assert_eq!(
        time_one(&[0xED, 0xA2], |cpu, _| cpu.regs.set_bc(0x02FE)),
        16,
        "INI"
    );
    assert_eq!(
        time_one(&[0xED, 0xA3], |cpu, _| {
            cpu.regs.set_hl(0x2000);
            cpu.regs.set_bc(0x02FE);
        }),
        16,
        "OUTI"
    );

    // Repeating LDIR: 21 T per looping iteration, 16 T for the last.
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[0xED, 0xB0]);
    let mut cpu = make_cpu();
    cpu.regs.set_hl(0x2000);
    cpu.regs.set_de(0x3000);
    cpu.regs.set_bc(3);

    assert_eq!(cpu.step(&mut bus), 21, "first iteration repeats");
    assert_eq!(cpu.pc(), 0x0000, "PC backed up over the instruction");
    assert_eq!(cpu.step(&mut bus), 21, "second iteration repeats");
    assert_eq!(cpu.step(&mut bus), 16, "final iteration");
    assert_eq!(cpu.pc(), 0x0002);
    assert_eq!(cpu.tacts(), 58);
}

#[test]
fn bit_group_timings() {
    assert_eq!(time(&[0xCB, 0x00]), 8, "RLC B");
    assert_eq!(time(&[0xCB, 0x06]), 15, "RLC (HL)");
    assert_eq!(time(&[0xCB, 0x40]), 8, "BIT 0, B");
    assert_eq!(time(&[0xCB, 0x46]), 12, "BIT 0, (HL)");
    assert_eq!(time(&[0xCB, 0x86]), 15, "RES 0, (HL)");
    assert_eq!(time(&[0xCB, 0xC6]), 15, "SET 0, (HL)");
}

#[test]
fn indexed_timings() {
    assert_eq!(time(&[0xDD, 0x21, 0x00, 0x10]), 14, "LD IX, nn");
    assert_eq!(time(&[0xDD, 0x09]), 15, "ADD IX, BC");
    assert_eq!(time(&[0xDD, 0x23]), 10, "INC IX");
    assert_eq!(time(&[0xDD, 0x24]), 8, "INC IXH");
    assert_eq!(time(&[0xDD, 0x7E, 0x02]), 19, "LD A, (IX+d)");
    assert_eq!(time(&[0xDD, 0x77, 0x02]), 19, "LD (IX+d), B");
    assert_eq!(time(&[0xDD, 0x36, 0x02, 0x55]), 19, "LD (IX+d), n");
    assert_eq!(time(&[0xDD, 0x34, 0x02]), 23, "INC (IX+d)");
    assert_eq!(time(&[0xDD, 0x86, 0x02]), 19, "ADD A, (IX+d)");
    assert_eq!(time(&[0xDD, 0xE9]), 8, "JP (IX)");
    assert_eq!(
        time_one(&[0xDD, 0xE3], |cpu, _| cpu.regs.sp = 0x8000),
        23,
        "EX (SP), IX"
    );
    assert_eq!(
        time_one(&[0xDD, 0xE5], |cpu, _| cpu.regs.sp = 0x8000),
        15,
        "PUSH IX"
    );
    assert_eq!(time(&[0xDD, 0x00]), 8, "prefix adds 4 to untouched ops");
    assert_eq!(time(&[0xDD, 0xCB, 0x02, 0x46]), 20, "BIT n, (IX+d)");
    assert_eq!(time(&[0xDD, 0xCB, 0x02, 0x86]), 23, "RES n, (IX+d)");
    assert_eq!(time(&[0xDD, 0xDD, 0x21, 0x00, 0x10]), 18, "stacked prefix");
}

#[test]
fn mid_instruction_state_is_observable() {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[0xDD, 0x7E, 0x02]);
    let mut cpu = make_cpu();

    cpu.execute_cycle(&mut bus);
    assert!(cpu.is_in_op_execution(), "prefix pending");
    assert_eq!(cpu.tacts(), 4);

    cpu.execute_cycle(&mut bus);
    assert!(!cpu.is_in_op_execution(), "instruction complete");
    assert_eq!(cpu.tacts(), 19);
}

/// A bus that applies one wait state to every contended access.
struct ContendedBus {
    inner: SimpleBus,
}

impl Bus for ContendedBus {
    fn read(&mut self, address: u16) -> u8 {
        self.inner.read(address)
    }
    fn write(&mut self, address: u16, value: u8) {
        self.inner.write(address, value);
    }
    fn contention(&mut self, _address: u16) -> u32 {
        1
    }
}

impl IoBus for ContendedBus {
    fn read_io(&mut self, port: u16) -> u8 {
        self.inner.read_io(port)
    }
    fn write_io(&mut self, port: u16, value: u8) {
        self.inner.write_io(port, value);
    }
    fn io_contention(&mut self, _port: u16) -> u32 {
        2
    }
}

#[test]
fn contention_applies_only_when_enabled() {
    let mut bus = ContendedBus {
        inner: SimpleBus::new(),
    };
    bus.inner.load(0x0000, &[0x3E, 0x46, 0x3E, 0x46]);
    let mut cpu = make_cpu();

    assert_eq!(cpu.step(&mut bus), 7, "waits ignored by default");

    cpu.set_gate_array_contention(true);
    // Both the fetch and the operand read gain one wait state.
    assert_eq!(cpu.step(&mut bus), 9, "waits applied when enabled");
}

#[test]
fn bus_tick_mirrors_tacts() {
    struct TickingBus {
        inner: SimpleBus,
        ticks: u32,
    }
    impl Bus for TickingBus {
        fn read(&mut self, address: u16) -> u8 {
            self.inner.read(address)
        }
        fn write(&mut self, address: u16, value: u8) {
            self.inner.write(address, value);
        }
        fn tick(&mut self, tacts: u32) {
            self.ticks += tacts;
        }
    }
    impl IoBus for TickingBus {
        fn read_io(&mut self, port: u16) -> u8 {
            self.inner.read_io(port)
        }
        fn write_io(&mut self, port: u16, value: u8) {
            self.inner.write_io(port, value);
        }
    }

    let mut bus = TickingBus {
        inner: SimpleBus::new(),
        ticks: 0,
    };
    bus.inner.load(0x0000, &[0x3E, 0x46, 0x34]);
    let mut cpu = make_cpu();
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(u64::from(bus.ticks), cpu.tacts(), "host saw every tact");
}

#[test]
fn delay_adds_idle_tacts() {
    let mut bus = SimpleBus::new();
    let mut cpu = make_cpu();
    cpu.delay(&mut bus, 17);
    assert_eq!(cpu.tacts(), 17);
}

#[test]
fn carry_chain_adc_sbc_match_tables() {
    // ADC then SBC with the carry flowing between them.
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[
        0x3E, 0xFF, // LD A, 0xFF
        0xC6, 0x02, // ADD A, 2   -> A=0x01, C=1
        0xCE, 0x00, // ADC A, 0   -> A=0x02, C=0
        0xD6, 0x03, // SUB 3      -> A=0xFF, C=1
        0xDE, 0x00, // SBC A, 0   -> A=0xFE, C=0
        0x76,
    ]);
    let mut cpu = make_cpu();
    while !cpu.is_halted() {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.regs.a, 0xFE);
    assert_eq!(cpu.regs.f & CF, 0, "no borrow out of the final SBC");
}
