/// A bus that supports memory read/write operations.
///
/// The CPU owns the tact counter and charges the documented minimum cost
/// for each access itself; the bus only supplies data. Hosts that model
/// contended memory report the extra wait states through [`Bus::contention`],
/// which the CPU queries when gate-array contention is enabled.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);

    /// Extra wait states for a memory access at `address`.
    ///
    /// Only consulted when the CPU has gate-array contention enabled.
    /// The default is an uncontended bus.
    fn contention(&mut self, address: u16) -> u32 {
        let _ = address;
        0
    }

    /// Notification that the CPU clock advanced by `tacts` T-states.
    ///
    /// Called for every memory access, I/O access, and internal delay, so
    /// a host that renders in lockstep with the CPU (e.g. a ULA) can track
    /// time without polling. The default does nothing.
    fn tick(&mut self, tacts: u32) {
        let _ = tacts;
    }
}
