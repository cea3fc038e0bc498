//! ZX Spectrum 48K machine.
//!
//! Wires the shared bus, the ULA, the beeper, and the expansion port into
//! one machine, and drives it in lockstep with an external Z80 core
//! consumed through `emu_core::Cpu`. Snapshot loading for the SNA and
//! .Z80 formats restores registers and memory into a powered machine.
//!
//! The host owns the outer loop: it renders lines (or whole frames),
//! reads the pixel buffer, drains completed audio frames, and feeds key
//! and joystick events in.

mod board;
mod buzzer;
mod cpu;
mod expansion;
mod sna;
mod spectrum;
mod z80;

#[cfg(test)]
pub(crate) mod testing;

pub use board::{AccessLevel, Board, Mapping, Region, Rom, ROM_SIZE, VRAM_SIZE, WRAM_SIZE};
pub use buzzer::{Buzzer, SAMPLE_RATE};
pub use cpu::Z80Registers;
pub use expansion::{Expansion, Interface2Joystick, JoystickButton, KempstonJoystick};
pub use sna::{load_sna, load_sna_file};
pub use spectrum::Spectrum;
pub use z80::{load_z80, load_z80_file};
