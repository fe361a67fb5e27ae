//! CPU state snapshot round-trips, including JSON serialization.

use cpu_z80::{CpuState, Z80};
use emu_core::SimpleBus;

fn busy_cpu() -> Z80 {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[
        0x31, 0x00, 0x80, // LD SP, 0x8000
        0x01, 0x22, 0x11, // LD BC, 0x1122
        0x11, 0x44, 0x33, // LD DE, 0x3344
        0x21, 0x66, 0x55, // LD HL, 0x5566
        0xD9,             // EXX
        0xDD, 0x21, 0x88, 0x77, // LD IX, 0x7788
        0xFB,             // EI
    ]);
    let mut cpu = Z80::new();
    cpu.reset();
    for _ in 0..7 {
        cpu.step(&mut bus);
    }
    cpu
}

#[test]
fn set_state_of_state_is_identity() {
    let mut cpu = busy_cpu();
    let snapshot = cpu.state();

    // Scramble, then restore.
    cpu.regs = cpu_z80::Registers::power_on();
    cpu.reset();
    cpu.set_state(&snapshot);

    assert_eq!(cpu.state(), snapshot);
    assert_eq!(cpu.regs.bc_alt(), 0x1122, "shadow bank restored");
    assert_eq!(cpu.regs.ix, 0x7788);
    assert!(cpu.iff1());
}

#[test]
fn snapshot_captures_control_state() {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[0xDD, 0x21, 0x34, 0x12]);
    let mut cpu = Z80::new();
    cpu.reset();

    cpu.execute_cycle(&mut bus); // DD consumed, instruction in flight
    let snapshot = cpu.state();

    assert!(snapshot.is_in_op_execution);
    assert!(snapshot.is_interrupt_blocked);
    assert_eq!(snapshot.index_mode, 1, "IX override recorded");
    assert_eq!(snapshot.prefix_mode, 0);
    assert_eq!(snapshot.op_code, 0xDD);

    // A fresh CPU restored from the snapshot finishes the instruction.
    let mut resumed = Z80::new();
    resumed.set_state(&snapshot);
    resumed.execute_cycle(&mut bus);
    assert_eq!(resumed.regs.ix, 0x1234);
}

#[test]
fn tacts_split_into_halves() {
    let mut cpu = Z80::new();
    let snapshot = CpuState {
        tacts_l: 0x89AB_CDEF,
        tacts_h: 0x0000_0001,
        ..CpuState::default()
    };
    cpu.set_state(&snapshot);
    assert_eq!(cpu.tacts(), 0x1_89AB_CDEF);
    assert_eq!(cpu.state().tacts_l, 0x89AB_CDEF);
    assert_eq!(cpu.state().tacts_h, 1);
}

#[test]
fn json_round_trip() {
    let cpu = busy_cpu();
    let snapshot = cpu.state();

    let json = serde_json::to_string(&snapshot).expect("serialize");
    assert!(json.contains("\"af_\""), "shadow pairs use the _ suffix");

    let restored: CpuState = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(restored, snapshot);
}

#[test]
fn restored_cpu_continues_deterministically() {
    let mut bus_a = SimpleBus::new();
    let mut bus_b = SimpleBus::new();
    let program = [
        0x3E, 0x10, // LD A, 0x10
        0xC6, 0x22, // ADD A, 0x22
        0x32, 0x00, 0x40, // LD (0x4000), A
        0x76,
    ];
    bus_a.load(0x0000, &program);
    bus_b.load(0x0000, &program);

    let mut original = Z80::new();
    original.reset();
    original.step(&mut bus_a);

    let mut clone = Z80::new();
    clone.set_state(&original.state());

    while !original.is_halted() {
        original.step(&mut bus_a);
        clone.step(&mut bus_b);
    }

    assert_eq!(original.state(), clone.state());
    assert_eq!(bus_a.peek(0x4000), bus_b.peek(0x4000));
    assert_eq!(bus_a.peek(0x4000), 0x32);
}
