//! Core traits for retro computer emulation.

mod bus;
mod cpu;
mod io_bus;
mod simple_bus;

pub use bus::Bus;
pub use cpu::Cpu;
pub use io_bus::IoBus;
pub use simple_bus::{IoAccess, SimpleBus};
