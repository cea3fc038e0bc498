//! The assembled 48K machine and its drive loop.
//!
//! The ULA and the CPU are two state machines advanced in lockstep. The
//! machine ticks the ULA once per pixel clock; every other pixel clock
//! is a CPU slot, which either absorbs one pending contention stall or
//! grants the CPU one cycle of credit. The CPU executes a whole
//! instruction once its credit is positive and then owes the balance, so
//! it can never run ahead of the raster by more than one instruction.
//!
//! All CPU memory and port traffic comes back through this type's
//! [`Bus`] implementation, which is where contention is charged and the
//! port space is routed: the ULA claims every even port, expansions are
//! offered the rest in plug order, and unclaimed reads return `0xFF`.

use emu_core::{Bus, Cpu};
use sinclair_ula::{Key, Palette, RASTER_WIDTH, TOTAL_HEIGHT, Ula};

use crate::board::{Board, Rom};
use crate::buzzer::Buzzer;
use crate::cpu::Z80Registers;
use crate::expansion::{Expansion, Interface2Joystick, JoystickButton};

/// ZX Spectrum 48K.
pub struct Spectrum {
    board: Board,
    ula: Ula,
    buzzer: Buzzer,
    expansions: Vec<Expansion>,
    /// Pixel clock counter; CPU slots land on the even ticks.
    clock: u64,
    /// Cycle credit granted to the CPU but not yet spent.
    allowed: i64,
    /// CPU cycles since the start of the audio frame.
    frame_cycles: u32,
    powered: bool,
}

impl Spectrum {
    #[must_use]
    pub fn new(palette: Palette, rom: Rom) -> Self {
        Self {
            board: Board::new(rom),
            ula: Ula::new(palette),
            buzzer: Buzzer::new(),
            expansions: Vec::new(),
            clock: 0,
            allowed: 0,
            frame_cycles: 0,
            powered: false,
        }
    }

    /// Power the machine up: expansions first, then the ULA, then the
    /// CPU, which also gets its RESET released and INT/NMI deasserted.
    pub fn raise_power<C>(&mut self, cpu: &mut C)
    where
        C: Cpu<Registers = Z80Registers>,
    {
        self.powered = true;
        self.clock = 0;
        self.allowed = 0;
        self.frame_cycles = 0;

        for expansion in &mut self.expansions {
            expansion.raise_power();
        }
        self.ula.raise_power();

        cpu.raise_power();
        cpu.lower_reset();
        cpu.raise_int();
        cpu.raise_nmi();
    }

    /// Power down in the reverse order: CPU, ULA, expansions.
    pub fn lower_power<C>(&mut self, cpu: &mut C)
    where
        C: Cpu<Registers = Z80Registers>,
    {
        cpu.lower_power();
        self.ula.lower_power();
        for expansion in self.expansions.iter_mut().rev() {
            expansion.lower_power();
        }
        self.powered = false;
    }

    #[must_use]
    pub fn powered(&self) -> bool {
        self.powered
    }

    /// Render the raster line at the current beam position, co-stepping
    /// the CPU through one line's worth of cycles.
    pub fn render_line<C>(&mut self, cpu: &mut C)
    where
        C: Cpu<Registers = Z80Registers>,
    {
        for _ in 0..RASTER_WIDTH {
            self.tick(cpu);
        }
    }

    /// Run one complete frame of line renders.
    pub fn run_frame<C>(&mut self, cpu: &mut C)
    where
        C: Cpu<Registers = Z80Registers>,
    {
        for _ in 0..TOTAL_HEIGHT {
            self.render_line(cpu);
        }
    }

    /// One pixel clock: advance the ULA, then service the CPU slot on
    /// every other tick.
    fn tick<C>(&mut self, cpu: &mut C)
    where
        C: Cpu<Registers = Z80Registers>,
    {
        let board = &self.board;
        self.ula.tick(|address| board.peek(address));

        if self.ula.take_vertical_sync_started() {
            self.buzzer.end_frame();
            self.frame_cycles = 0;
        }

        self.clock += 1;
        if self.clock % 2 != 0 {
            return;
        }

        // One cycle of wall-clock time at the CPU's rate.
        self.frame_cycles += 1;

        if self.ula.int_active() {
            cpu.lower_int();
        } else {
            cpu.raise_int();
        }

        if self.ula.take_stall_cycle() {
            return;
        }

        self.allowed += 1;
        if self.allowed > 0 {
            let spent = cpu.step(self).get() as i64;
            self.allowed -= spent;
        }
    }

    // === Host input ===

    /// Press a key on the keyboard matrix.
    pub fn press_key(&mut self, key: Key) {
        self.ula.press_key(key);
    }

    /// Release a key.
    pub fn release_key(&mut self, key: Key) {
        self.ula.release_key(key);
    }

    /// Plug an expansion into the expansion port. Returns its slot.
    pub fn plug(&mut self, expansion: Expansion) -> usize {
        self.expansions.push(expansion);
        self.expansions.len() - 1
    }

    /// Number of plugged expansions.
    #[must_use]
    pub fn expansion_count(&self) -> usize {
        self.expansions.len()
    }

    /// Route a joystick press to the expansion in `slot`.
    pub fn joystick_press(&mut self, slot: usize, button: JoystickButton) {
        match &mut self.expansions[slot] {
            Expansion::Kempston(joystick) => joystick.press(button),
            Expansion::Interface2(_) => self.ula.press_key(Interface2Joystick::key(button)),
        }
    }

    /// Route a joystick release to the expansion in `slot`.
    pub fn joystick_release(&mut self, slot: usize, button: JoystickButton) {
        match &mut self.expansions[slot] {
            Expansion::Kempston(joystick) => joystick.release(button),
            Expansion::Interface2(_) => self.ula.release_key(Interface2Joystick::key(button)),
        }
    }

    // === Host output ===

    /// The ARGB32 pixel buffer, refreshed as lines render.
    #[must_use]
    pub fn pixels(&self) -> &[u32] {
        self.ula.pixels()
    }

    /// The oldest completed audio frame, if one is waiting.
    pub fn take_audio_frame(&mut self) -> Option<Vec<f32>> {
        self.buzzer.take_frame()
    }

    // === Component access ===

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    #[must_use]
    pub fn ula(&self) -> &Ula {
        &self.ula
    }

    pub fn ula_mut(&mut self) -> &mut Ula {
        &mut self.ula
    }

    #[must_use]
    pub fn buzzer(&self) -> &Buzzer {
        &self.buzzer
    }

    /// CPU cycles since the start of the audio frame.
    #[must_use]
    pub fn frame_cycles(&self) -> u32 {
        self.frame_cycles
    }
}

impl Bus for Spectrum {
    fn read(&mut self, address: u16) -> u8 {
        // Contention is charged before the access completes, against the
        // ULA's state at this cycle.
        if self.ula.fetching_video() && Board::contended(address) {
            self.ula.charge_contention();
        }
        self.board.peek(address)
    }

    fn write(&mut self, address: u16, value: u8) {
        if self.ula.fetching_video() && Board::contended(address) {
            self.ula.charge_contention();
        }
        self.board.poke(address, value);
    }

    fn input(&mut self, port: u16) -> u8 {
        // The ULA claims every port with bit 0 of the low byte clear.
        if port & 0x01 == 0 {
            return self.ula.read_port((port >> 8) as u8);
        }
        for expansion in &self.expansions {
            if let Some(value) = expansion.input(port) {
                return value;
            }
        }
        0xFF
    }

    fn output(&mut self, port: u16, value: u8) {
        if port & 0x01 == 0 {
            let speaker = self.ula.write_port(value);
            self.buzzer.set_level(speaker, self.frame_cycles);
        }
    }
}
