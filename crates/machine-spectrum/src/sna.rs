//! SNA snapshot loading.
//!
//! Protocol shared with the .Z80 loader: the CPU must already be powered
//! (power-on would overwrite the restored registers), then registers,
//! then memory, then the format's post-load side effect.
//!
//! The SNA side effect is PC recovery. The format has no PC field — the
//! saver pushed it onto the stack — so the loader plants a RETN at the
//! top of memory and runs it: the instruction pops the real PC off the
//! restored stack and copies IFF2 back into IFF1, exactly as the
//! hardware's NMI return path would. The two patched bytes are restored
//! afterwards.

use std::path::Path;

use emu_core::Cpu;
use format_sna::SnaSnapshot;

use crate::cpu::Z80Registers;
use crate::spectrum::Spectrum;

/// Address the RETN is planted at.
const TRAMPOLINE: u16 = 0xFFFE;

/// RETN opcode bytes.
const RETN: [u8; 2] = [0xED, 0x45];

/// Load an SNA snapshot into the machine and CPU.
///
/// # Errors
///
/// Returns an error when the CPU is not powered or the file is not a
/// valid 48K SNA image. The machine must not be used after a failure.
pub fn load_sna<C>(spectrum: &mut Spectrum, cpu: &mut C, data: &[u8]) -> Result<(), String>
where
    C: Cpu<Registers = Z80Registers>,
{
    if !cpu.powered() {
        return Err(
            "snapshot loaded before power-on: power-on defaults would overwrite the restored state"
                .to_string(),
        );
    }

    let snapshot = SnaSnapshot::parse(data)?;

    cpu.registers_mut().restore(&snapshot.registers);
    for (offset, &byte) in snapshot.memory.iter().enumerate() {
        spectrum.board_mut().poke(0x4000 + offset as u16, byte);
    }
    spectrum.ula_mut().set_border(snapshot.border);

    let saved = [
        spectrum.board().peek(TRAMPOLINE),
        spectrum.board().peek(TRAMPOLINE + 1),
    ];
    spectrum.board_mut().poke(TRAMPOLINE, RETN[0]);
    spectrum.board_mut().poke(TRAMPOLINE + 1, RETN[1]);
    cpu.registers_mut().pc = TRAMPOLINE;
    cpu.step(spectrum);
    spectrum.board_mut().poke(TRAMPOLINE, saved[0]);
    spectrum.board_mut().poke(TRAMPOLINE + 1, saved[1]);

    Ok(())
}

/// Read an SNA file from disk and load it.
///
/// # Errors
///
/// As [`load_sna`], plus file read failures.
pub fn load_sna_file<C>(
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
    load_sna(spectrum, cpu, &data)
}
