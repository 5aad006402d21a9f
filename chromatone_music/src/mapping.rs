// Color-to-note mapping.
//
// Each channel of a color sample drives exactly one musical attribute and
// nothing else:
// - red   -> pitch: an index into four octaves of the chosen scale
// - green -> velocity: linear 1..=127, never 0 (0 would read as note-off)
// - blue  -> duration: 0.1..=2.0 beats
//
// The mapping is a pure function. Mode-specific transposition and duration
// scaling happen later, in the sequencer.

use crate::color::ColorSample;
use crate::scale::Scale;
use serde::{Deserialize, Serialize};

/// Middle C.
pub const DEFAULT_BASE_NOTE: u8 = 60;

/// Octaves spanned by the red channel.
const OCTAVES: usize = 4;

pub const MIN_DURATION_BEATS: f64 = 0.1;
pub const MAX_DURATION_BEATS: f64 = 2.0;

/// A quantized note derived from one color sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// MIDI key, 0-127.
    pub pitch: u8,
    /// MIDI velocity, 1-127.
    pub velocity: u8,
    /// Length in beats (quarter notes).
    pub duration: f64,
}

/// Maps color samples to notes in a fixed scale and register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteMapper {
    pub scale: Scale,
    pub base_note: u8,
}

impl NoteMapper {
    pub fn new(scale: Scale) -> Self {
        NoteMapper {
            scale,
            base_note: DEFAULT_BASE_NOTE,
        }
    }

    pub fn with_base_note(mut self, base_note: u8) -> Self {
        self.base_note = base_note.min(127);
        self
    }

    pub fn map(&self, c: ColorSample) -> NoteEvent {
        NoteEvent {
            pitch: self.pitch(c.r),
            velocity: velocity(c.g),
            duration: duration(c.b),
        }
    }

    /// Red channel to a scale tone, `base_note` up to four octaves above.
    /// Saturates at 127 for high base notes.
    pub fn pitch(&self, r: u8) -> u8 {
        let offsets = self.scale.offsets();
        let len = offsets.len();
        let top = (len * OCTAVES - 1) as f64;
        let index = (f64::from(r) / 255.0 * top).floor() as usize;
        let octave = index / len;
        let degree = index % len;
        let pitch = usize::from(self.base_note) + 12 * octave + usize::from(offsets[degree]);
        pitch.min(127) as u8
    }
}

/// Map one sample with the default base note.
pub fn map_color(c: ColorSample, scale: Scale) -> NoteEvent {
    NoteMapper::new(scale).map(c)
}

pub fn velocity(g: u8) -> u8 {
    let v = (f64::from(g) / 255.0 * 127.0).floor() as u8;
    v.max(1)
}

pub fn duration(b: u8) -> f64 {
    MIN_DURATION_BEATS + f64::from(b) / 255.0 * (MAX_DURATION_BEATS - MIN_DURATION_BEATS)
}
