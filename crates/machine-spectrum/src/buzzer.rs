//! Beeper audio: a sample-and-hold square wave built from speaker
//! transitions.
//!
//! Port $FE writes arrive as (level, frame-relative CPU cycle) pairs.
//! Each transition fills every sample slot up to its own timestamp with
//! the level that was held until then; `end_frame` pads the remainder and
//! queues the finished buffer for the host's audio sink.

use std::collections::VecDeque;

use sinclair_ula::{CYCLES_PER_SECOND, FRAMES_PER_SECOND};

/// Output sample rate in Hz.
pub const SAMPLE_RATE: u32 = 44_100;

/// Peak amplitude of the square wave.
const AMPLITUDE: f32 = 0.5;

/// The beeper.
pub struct Buzzer {
    /// The frame being filled.
    buffer: Vec<f32>,
    /// First unfilled sample slot.
    cursor: usize,
    /// Level held since the last transition.
    level: f32,
    /// Finished frames awaiting the host.
    completed: VecDeque<Vec<f32>>,
}

impl Buzzer {
    #[must_use]
    pub fn new() -> Self {
        let samples_per_frame = (SAMPLE_RATE as f32 / FRAMES_PER_SECOND) as usize;
        Self {
            buffer: vec![-AMPLITUDE; samples_per_frame],
            cursor: 0,
            level: -AMPLITUDE,
            completed: VecDeque::new(),
        }
    }

    /// Mono samples per frame.
    #[must_use]
    pub fn samples_per_frame(&self) -> usize {
        self.buffer.len()
    }

    /// Record a speaker transition at a frame-relative CPU cycle.
    ///
    /// Timestamps within one frame must not decrease — samples up to the
    /// timestamp are committed at the previously held level and cannot be
    /// rewritten.
    pub fn set_level(&mut self, high: bool, cycle: u32) {
        let sample = Self::sample_for(cycle).min(self.buffer.len());
        debug_assert!(
            sample >= self.cursor,
            "audio timestamp moved backwards: sample {sample} before cursor {}",
            self.cursor
        );
        let sample = sample.max(self.cursor);
        self.fill(self.cursor, sample);
        self.cursor = sample;
        self.level = if high { AMPLITUDE } else { -AMPLITUDE };
    }

    /// Close the frame: hold the current level to the end, queue the
    /// buffer for the host, and start the next frame.
    pub fn end_frame(&mut self) {
        self.fill(self.cursor, self.buffer.len());
        self.completed.push_back(self.buffer.clone());
        self.cursor = 0;
    }

    /// The oldest completed frame of mono samples, if one is waiting.
    pub fn take_frame(&mut self) -> Option<Vec<f32>> {
        self.completed.pop_front()
    }

    /// How many completed frames the host has not yet taken.
    #[must_use]
    pub fn completed_frames(&self) -> usize {
        self.completed.len()
    }

    fn fill(&mut self, from: usize, to: usize) {
        let level = self.level;
        for slot in &mut self.buffer[from..to] {
            *slot = level;
        }
    }

    /// Sample slot for a CPU-cycle timestamp, truncated toward zero.
    fn sample_for(cycle: u32) -> usize {
        let ratio = SAMPLE_RATE as f32 / CYCLES_PER_SECOND as f32;
        (cycle as f32 * ratio) as usize
    }
}

impl Default for Buzzer {
    fn default() -> Self {
        Self::new()
    }
}
