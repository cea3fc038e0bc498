//! Standard Sinclair ULA (Uncommitted Logic Array).
//!
//! The ULA generates the video raster, injects memory contention, scans
//! the keyboard, decodes port $FE, and asserts the frame interrupt. It is
//! ticked once per pixel clock by the machine; every other pixel clock is
//! a CPU slot, so all CPU-facing figures here come doubled.
//!
//! # Standalone IC
//!
//! This crate has no dependencies — the ULA reads VRAM through a closure
//! passed by the caller, keeping it decoupled from any particular memory
//! model. The machine consumes its state through accessors (`int_active`,
//! `take_stall_cycle`, the take-flags) rather than callbacks.
//!
//! # Raster
//!
//! 352×296 visible pixels: 256 active + 48 border each side horizontally,
//! 192 active + 48 top border + 56 bottom border vertically. A frame is
//! 312 lines of 352 pixel clocks; line counting starts at the top of the
//! active area, so a frame runs active video → bottom border → vertical
//! sync (16 unrendered lines) → top border.
//!
//! # Contention
//!
//! While the ULA fetches bitmap/attribute data for an active row, a CPU
//! access to $4000-$7FFF stalls the CPU for 3 cycles. The stall is stored
//! doubled (6 pixel clocks) and consumed one CPU slot at a time before
//! the CPU is allowed to proceed.

mod keyboard;
mod palette;

pub use keyboard::{HALF_ROWS, Key};
pub use palette::Palette;

use std::collections::HashSet;

/// Active bitmap width in pixels.
pub const ACTIVE_WIDTH: u16 = 256;
/// Border width either side of the active area.
pub const HORIZONTAL_BORDER: u16 = 48;
/// Visible raster width.
pub const RASTER_WIDTH: u16 = (HORIZONTAL_BORDER * 2) + ACTIVE_WIDTH;

/// Active bitmap height in lines.
pub const ACTIVE_HEIGHT: u16 = 192;
/// Bottom border height.
pub const BOTTOM_BORDER: u16 = 56;
/// Vertical sync lines (not rendered).
pub const VERTICAL_SYNC_LINES: u16 = 16;
/// Top border height.
pub const TOP_BORDER: u16 = 48;
/// Visible raster height.
pub const RASTER_HEIGHT: u16 = TOP_BORDER + ACTIVE_HEIGHT + BOTTOM_BORDER;
/// Lines per frame, including vertical sync.
pub const TOTAL_HEIGHT: u16 = ACTIVE_HEIGHT + BOTTOM_BORDER + VERTICAL_SYNC_LINES + TOP_BORDER;

/// CPU clock rate in Hz (the ULA pixel clock is double this).
pub const CYCLES_PER_SECOND: u32 = 3_500_000;
/// Nominal frame rate.
pub const FRAMES_PER_SECOND: f32 = 50.08;

/// Stall charged per contended access during a video fetch, in CPU cycles.
pub const CONTENTION_CYCLES: u8 = 3;

/// First vertical sync line.
const VERTICAL_SYNC_START: u16 = ACTIVE_HEIGHT + BOTTOM_BORDER;
/// First top border line.
const TOP_BORDER_START: u16 = VERTICAL_SYNC_START + VERTICAL_SYNC_LINES;

/// INT stays asserted for this many pixel clocks (= 32 CPU cycles) from
/// the start of vertical sync.
const INT_PULSE_TICKS: u16 = 64;

/// Frames between FLASH toggles.
const FLASH_FRAME_COUNT: u8 = 16;

/// Start of video RAM in the address space.
const VRAM_BASE: u16 = 0x4000;
/// Attribute file offset within VRAM.
const ATTRIBUTE_OFFSET: u16 = 0x1800;

/// Standard Sinclair ULA.
pub struct Ula {
    /// Pixel clock within the line (0..352).
    horizontal: u16,
    /// Current line (0 = first active line).
    line: u16,
    /// Frame counter, wraps at 16 and toggles FLASH.
    frame: u8,
    /// FLASH state: true = ink/paper swapped for flashing cells.
    flash: bool,
    /// Border colour index (0-7).
    border: u8,
    /// Border colour sampled at the current 8-pixel chunk.
    border_latch: u32,
    /// Bitmap byte latched for the cell being shifted out.
    bitmap: u8,
    /// Cell colours latched with the bitmap byte.
    foreground: u32,
    background: u32,
    /// True while the active-row VRAM fetch is in progress.
    fetching: bool,
    /// Pending contention, in pixel clocks.
    stall: u16,
    /// Output pin levels from port $FE writes.
    speaker: bool,
    mic: bool,
    /// EAR input level, read back on bit 6.
    ear: bool,
    /// Set when the beam enters vertical sync; cleared on read.
    vertical_sync_started: bool,
    /// Set when the line counter wraps; cleared on read.
    frame_complete: bool,
    powered: bool,
    keys: HashSet<Key>,
    /// Bitmap address of column 0 for each active line.
    scanline_addresses: [u16; ACTIVE_HEIGHT as usize],
    /// Attribute address of column 0 for each active line.
    attribute_addresses: [u16; ACTIVE_HEIGHT as usize],
    /// ARGB32 pixel buffer, 352×296.
    pixels: Vec<u32>,
    palette: Palette,
}

impl Ula {
    #[must_use]
    pub fn new(palette: Palette) -> Self {
        // The bitmap address interleaves the line number as Y7Y6 Y2Y1Y0
        // Y5Y4Y3; attributes are linear, one row per 8 lines. Both tables
        // are precomputed per line, as the hardware's address mux wires them.
        let mut scanline_addresses = [0u16; ACTIVE_HEIGHT as usize];
        let mut attribute_addresses = [0u16; ACTIVE_HEIGHT as usize];
        let mut line = 0;
        for third in 0..3u16 {
            for row in 0..8u16 {
                for offset in 0..8u16 {
                    scanline_addresses[line] =
                        VRAM_BASE + ((third << 11) | (offset << 8) | (row << 5));
                    attribute_addresses[line] =
                        VRAM_BASE + ATTRIBUTE_OFFSET + (((third << 3) | row) << 5);
                    line += 1;
                }
            }
        }

        let border_latch = palette.colour(0, false);
        Self {
            horizontal: 0,
            line: 0,
            frame: 0,
            flash: false,
            border: 0,
            border_latch,
            bitmap: 0,
            foreground: border_latch,
            background: border_latch,
            fetching: false,
            stall: 0,
            speaker: false,
            mic: false,
            ear: false,
            vertical_sync_started: false,
            frame_complete: false,
            powered: false,
            keys: HashSet::new(),
            scanline_addresses,
            attribute_addresses,
            pixels: vec![border_latch; usize::from(RASTER_WIDTH) * usize::from(RASTER_HEIGHT)],
            palette,
        }
    }

    /// Advance the ULA by one pixel clock.
    ///
    /// `read_vram` reads a byte from the shared address space without side
    /// effects. It is only called for bitmap/attribute fetches at the
    /// start of each 8-pixel cell.
    pub fn tick(&mut self, read_vram: impl Fn(u16) -> u8) {
        self.render_tick(&read_vram);

        self.horizontal += 1;
        if self.horizontal == RASTER_WIDTH {
            self.horizontal = 0;
            self.line += 1;
            if self.line == TOTAL_HEIGHT {
                self.line = 0;
                self.frame_complete = true;
                self.frame += 1;
                if self.frame == FLASH_FRAME_COUNT {
                    self.frame = 0;
                    self.flash = !self.flash;
                }
            }
            if self.line == VERTICAL_SYNC_START {
                self.vertical_sync_started = true;
            }
        }
    }

    /// Is the INT signal currently asserted?
    ///
    /// The pulse spans the first 64 pixel clocks of vertical sync.
    #[must_use]
    pub fn int_active(&self) -> bool {
        self.line == VERTICAL_SYNC_START && self.horizontal < INT_PULSE_TICKS
    }

    /// Has the beam just entered vertical sync? Clears on read.
    pub fn take_vertical_sync_started(&mut self) -> bool {
        std::mem::take(&mut self.vertical_sync_started)
    }

    /// Has the line counter wrapped to a new frame? Clears on read.
    pub fn take_frame_complete(&mut self) -> bool {
        std::mem::take(&mut self.frame_complete)
    }

    // === Contention ===

    /// Is the active-row VRAM fetch in progress?
    #[must_use]
    pub fn fetching_video(&self) -> bool {
        self.fetching
    }

    /// Charge the stall for one contended access.
    ///
    /// The constant is 3 CPU cycles, held doubled because the ULA counts
    /// pixel clocks.
    pub fn charge_contention(&mut self) {
        self.stall = self.stall.saturating_add(u16::from(CONTENTION_CYCLES) * 2);
    }

    /// Pending stall in CPU cycles.
    #[must_use]
    pub fn stall_pending(&self) -> u16 {
        self.stall / 2
    }

    /// Absorb one CPU slot into the pending stall.
    ///
    /// Returns true when a stall credit was consumed — the CPU must not
    /// run this slot.
    pub fn take_stall_cycle(&mut self) -> bool {
        if self.stall == 0 {
            return false;
        }
        self.stall = self.stall.saturating_sub(2);
        true
    }

    // === Port $FE ===

    /// Read the ULA port.
    ///
    /// `address_high` is the high byte of the port address; each zero bit
    /// selects one keyboard half-row. Bits 0-4 report pressed keys in the
    /// selected rows (active low), bit 6 reports the EAR level, bits 5
    /// and 7 read 1.
    #[must_use]
    pub fn read_port(&self, address_high: u8) -> u8 {
        let selected = self.selected_keys(!address_high);
        let ear = if self.ear { 0x40 } else { 0x00 };
        (selected & !0x40) | ear
    }

    /// Write the ULA port: bits 0-2 border colour, bit 3 MIC, bit 4
    /// speaker. Returns the new speaker level so the caller can forward
    /// it to the buzzer with a timestamp.
    pub fn write_port(&mut self, value: u8) -> bool {
        self.mic = value & 0x08 != 0;
        self.speaker = value & 0x10 != 0;
        self.set_border(value & 0x07);
        self.speaker
    }

    // === Keyboard ===

    /// Press a key. Idempotent.
    pub fn press_key(&mut self, key: Key) {
        self.keys.insert(key);
    }

    /// Release a key. Idempotent.
    pub fn release_key(&mut self, key: Key) {
        self.keys.remove(&key);
    }

    /// Active-low key bits for the half-rows selected in `rows`.
    fn selected_keys(&self, rows: u8) -> u8 {
        let mut returned = 0xFFu8;
        for (row, row_keys) in HALF_ROWS.iter().enumerate() {
            if rows & (1 << row) != 0 {
                for (column, key) in row_keys.iter().enumerate() {
                    if self.keys.contains(key) {
                        returned &= !(1 << column);
                    }
                }
            }
        }
        returned
    }

    // === Pins and state ===

    pub fn raise_power(&mut self) {
        self.powered = true;
        self.horizontal = 0;
        self.line = 0;
        self.frame = 0;
        self.flash = false;
        self.stall = 0;
        self.fetching = false;
        self.vertical_sync_started = false;
        self.frame_complete = false;
        self.set_border(0);
    }

    pub fn lower_power(&mut self) {
        self.powered = false;
        self.speaker = false;
        self.mic = false;
    }

    #[must_use]
    pub fn powered(&self) -> bool {
        self.powered
    }

    /// Set the border colour (low 3 bits).
    pub fn set_border(&mut self, colour: u8) {
        self.border = colour & 0x07;
    }

    #[must_use]
    pub fn border_colour(&self) -> u8 {
        self.border
    }

    /// Drive the EAR input pin.
    pub fn set_ear(&mut self, level: bool) {
        self.ear = level;
    }

    #[must_use]
    pub fn speaker_level(&self) -> bool {
        self.speaker
    }

    #[must_use]
    pub fn mic_level(&self) -> bool {
        self.mic
    }

    /// Current line (0 = first active line).
    #[must_use]
    pub fn line(&self) -> u16 {
        self.line
    }

    /// Pixel clock within the current line.
    #[must_use]
    pub fn horizontal(&self) -> u16 {
        self.horizontal
    }

    /// Frame counter (0..16).
    #[must_use]
    pub fn frame(&self) -> u8 {
        self.frame
    }

    #[must_use]
    pub fn flash_active(&self) -> bool {
        self.flash
    }

    /// The ARGB32 pixel buffer, 352×296 row-major.
    #[must_use]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Position the beam for tests.
    #[doc(hidden)]
    pub fn set_beam(&mut self, line: u16, horizontal: u16) {
        self.line = line;
        self.horizontal = horizontal;
    }

    // === Rendering ===

    fn render_tick(&mut self, read_vram: &impl Fn(u16) -> u8) {
        let line = self.line;
        let x = self.horizontal;

        // Vertical sync: the beam is off screen.
        if (VERTICAL_SYNC_START..TOP_BORDER_START).contains(&line) {
            self.fetching = false;
            return;
        }

        // Active and bottom-border lines sit below the top border in the
        // pixel buffer; top-border lines fill the rows above them.
        let row = if line < VERTICAL_SYNC_START {
            usize::from(line + TOP_BORDER)
        } else {
            usize::from(line - TOP_BORDER_START)
        };

        let in_active = line < ACTIVE_HEIGHT
            && (HORIZONTAL_BORDER..HORIZONTAL_BORDER + ACTIVE_WIDTH).contains(&x);
        self.fetching = in_active;

        if in_active {
            self.render_active_pixel(read_vram, row, x - HORIZONTAL_BORDER);
        } else {
            self.render_border_pixel(row, x);
        }
    }

    fn render_active_pixel(&mut self, read_vram: &impl Fn(u16) -> u8, row: usize, x: u16) {
        if x % 8 == 0 {
            let column = x / 8;
            let bitmap_address = self.scanline_addresses[usize::from(self.line)] + column;
            let attribute_address = self.attribute_addresses[usize::from(self.line)] + column;
            self.bitmap = read_vram(bitmap_address);
            let attribute = read_vram(attribute_address);

            let ink = attribute & 0x07;
            let paper = (attribute >> 3) & 0x07;
            let bright = attribute & 0x40 != 0;
            let flashing = attribute & 0x80 != 0;

            let (ink, paper) = if flashing && self.flash {
                (paper, ink)
            } else {
                (ink, paper)
            };
            self.foreground = self.palette.colour(ink, bright);
            self.background = self.palette.colour(paper, bright);
        }

        let lit = self.bitmap & (0x80 >> (x % 8)) != 0;
        let colour = if lit { self.foreground } else { self.background };
        self.pixels[row * usize::from(RASTER_WIDTH) + usize::from(HORIZONTAL_BORDER + x)] = colour;
    }

    fn render_border_pixel(&mut self, row: usize, x: u16) {
        // The border colour is sampled once per 8-pixel chunk, so a
        // mid-chunk port write lands on the next chunk boundary.
        if x % 8 == 0 {
            self.border_latch = self.palette.colour(self.border, false);
        }
        self.pixels[row * usize::from(RASTER_WIDTH) + usize::from(x)] = self.border_latch;
    }
}

impl Default for Ula {
    fn default() -> Self {
        Self::new(Palette::new())
    }
}
