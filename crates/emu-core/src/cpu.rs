//! CPU core contract.

use crate::{Bus, Ticks};

/// A CPU core, consumed through pins and single-instruction stepping.
///
/// The machine never owns the CPU; it drives one through this contract.
/// Pin methods follow hardware convention: RESET, INT, and NMI are active
/// low, so `lower_*` asserts and `raise_*` releases.
///
/// Register access goes through an associated register-file type so that
/// snapshot loaders can restore machine state by name without the trait
/// committing to one processor family.
pub trait Cpu {
    /// The register file exposed for inspection and restoration.
    type Registers;

    /// Raise the POWER pin. Registers assume their power-on defaults.
    fn raise_power(&mut self);

    /// Lower the POWER pin.
    fn lower_power(&mut self);

    /// Whether the POWER pin is currently raised.
    fn powered(&self) -> bool;

    /// Release the RESET pin.
    fn raise_reset(&mut self);

    /// Assert the RESET pin.
    fn lower_reset(&mut self);

    /// Release the INT pin.
    fn raise_int(&mut self);

    /// Assert the INT pin.
    fn lower_int(&mut self);

    /// Release the NMI pin.
    fn raise_nmi(&mut self);

    /// Assert the NMI pin.
    fn lower_nmi(&mut self);

    /// Execute exactly one instruction against the bus and return the
    /// cycles consumed, including any wait states the bus imposed.
    fn step<B: Bus>(&mut self, bus: &mut B) -> Ticks;

    /// The register file.
    fn registers(&self) -> &Self::Registers;

    /// Mutable access to the register file.
    fn registers_mut(&mut self) -> &mut Self::Registers;
}
