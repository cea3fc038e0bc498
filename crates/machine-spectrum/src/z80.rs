//! .Z80 snapshot loading.
//!
//! The parser does the format work; this loader follows the common
//! snapshot protocol (powered CPU, registers, memory, border) and writes
//! the image into the machine. The program counter comes straight from
//! the parsed header — unlike SNA there is no stack trick.

use std::path::Path;

use emu_core::Cpu;
use format_z80::{MemoryImage, Z80Snapshot};

use crate::cpu::Z80Registers;
use crate::spectrum::Spectrum;

/// Load a .Z80 snapshot into the machine and CPU.
///
/// # Errors
///
/// Returns an error when the CPU is not powered, the file is malformed,
/// the hardware mode is not a 48K-class machine, or a page targets the
/// ROM or an unknown destination. Parsing happens before any machine
/// state is touched, so a failed load leaves memory unmodified.
pub fn load_z80<C>(spectrum: &mut Spectrum, cpu: &mut C, data: &[u8]) -> Result<(), String>
where
    C: Cpu<Registers = Z80Registers>,
{
    if !cpu.powered() {
        return Err(
            "snapshot loaded before power-on: power-on defaults would overwrite the restored state"
                .to_string(),
        );
    }

    let snapshot = Z80Snapshot::parse(data)?;

    cpu.registers_mut().restore(&snapshot.registers);
    cpu.registers_mut().pc = snapshot.pc;

    match &snapshot.memory {
        MemoryImage::Flat(image) => {
            for (offset, &byte) in image.iter().enumerate() {
                spectrum.board_mut().poke(0x4000 + offset as u16, byte);
            }
        }
        MemoryImage::Paged(pages) => {
            for page in pages {
                for (offset, &byte) in page.data.iter().enumerate() {
                    spectrum.board_mut().poke(page.address + offset as u16, byte);
                }
            }
        }
    }

    spectrum.ula_mut().set_border(snapshot.border);
    Ok(())
}

/// Read a .Z80 file from disk and load it.
///
/// # Errors
///
/// As [`load_z80`], plus file read failures.
pub fn load_z80_file<C>(
    spectrum: &mut Spectrum,
    cpu: &mut C,
    path: impl AsRef<Path>,
) -> Result<(), String>
where
    C: Cpu<Registers = Z80Registers>,
{
    let path = path.as_ref();
    let data = std::fs::read(path)
        .map_err(|error| format!("cannot read snapshot {}: {error}", path.display()))?;
    load_z80(spectrum, cpu, &data)
}
