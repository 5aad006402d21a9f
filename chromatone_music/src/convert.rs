// Image-to-MIDI conversion pipeline.
//
// Sampler -> mapper -> sequencer -> encoder, strictly in that order, each
// stage fully materialised before the next starts. Every call owns its own
// buffers, so independent conversions can run on separate threads without
// coordination.
//
// Options are data-driven (`ConvertOptions`, deserialisable from JSON with
// per-field defaults). Pattern, scale and mode are given by name and resolve
// with a logged fallback; only a zero tempo is an error. A zero sample count
// or an empty image is not an error: it yields a track with just the tempo
// and end-of-track events.

use crate::color::PixelBuffer;
use crate::mapping::{DEFAULT_BASE_NOTE, NoteMapper};
use crate::sampler::{Pattern, Sampler};
use crate::scale::Scale;
use crate::sequencer::{MappedNote, Mode, sequence};
use crate::smf::{TICKS_PER_BEAT, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Seconds per note used for the rough duration estimate shown to users.
pub const SECONDS_PER_NOTE_ESTIMATE: f64 = 0.5;

/// Errors surfaced to the caller. Nothing else in the pipeline can fail.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvertError {
    #[error("tempo must be at least 1 BPM")]
    ZeroTempo,
    #[error(
        "pixel buffer holds {actual} bytes but a {width}x{height} RGB image needs {expected}"
    )]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Conversion settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Sampling pattern name; unknown names use region-average.
    pub pattern: String,
    /// Scale name; unknown names use chromatic.
    pub scale: String,
    /// Sequencing mode name; unknown names use linear.
    pub mode: String,
    pub tempo_bpm: u32,
    pub sample_count: usize,
    /// Seed for the random pattern.
    pub seed: u64,
    /// MIDI note for red = 0.
    pub base_note: u8,
    /// Row/column step for the scan pattern.
    pub scan_step: u32,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            pattern: Pattern::RegionAverage.name().to_string(),
            scale: Scale::Chromatic.name().to_string(),
            mode: Mode::Linear.name().to_string(),
            tempo_bpm: 120,
            sample_count: 64,
            seed: 0,
            base_note: DEFAULT_BASE_NOTE,
            scan_step: 1,
        }
    }
}

/// Facts about a finished conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Samples taken from the image.
    pub sample_count: usize,
    /// One note per sample, as reported to users.
    pub note_count: usize,
    /// `note_count * 0.5` seconds.
    pub estimated_seconds: f64,
    /// Note-on events actually written; modes may add or drop notes.
    pub emitted_notes: usize,
    /// Tick of the end-of-track event.
    pub total_ticks: u32,
    /// Real length at the requested tempo.
    pub duration_seconds: f64,
}

/// Encoded SMF plus statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub bytes: Vec<u8>,
    pub stats: ConversionStats,
}

/// Convert a decoded image into a Standard MIDI File.
pub fn convert(pixels: &PixelBuffer, options: &ConvertOptions) -> Result<Conversion, ConvertError> {
    if options.tempo_bpm == 0 {
        return Err(ConvertError::ZeroTempo);
    }

    let pattern = Pattern::from_name(&options.pattern);
    let scale = Scale::from_name(&options.scale);
    let mode = Mode::from_name(&options.mode);

    let samples = Sampler::new(options.seed)
        .with_scan_step(options.scan_step)
        .sample(pixels, options.sample_count, pattern);
    tracing::debug!(
        pattern = pattern.name(),
        requested = options.sample_count,
        produced = samples.len(),
        "sampled image"
    );

    let mapper = NoteMapper::new(scale).with_base_note(options.base_note);
    let notes: Vec<MappedNote> = samples
        .iter()
        .map(|&color| MappedNote {
            color,
            note: mapper.map(color),
        })
        .collect();

    let track = sequence(&notes, mode, options.tempo_bpm);
    let total_ticks = track.last_tick();
    let emitted_notes = track.note_on_count();
    let bytes = encode(std::slice::from_ref(&track));

    let beats = f64::from(total_ticks) / f64::from(TICKS_PER_BEAT);
    let stats = ConversionStats {
        sample_count: samples.len(),
        note_count: samples.len(),
        estimated_seconds: samples.len() as f64 * SECONDS_PER_NOTE_ESTIMATE,
        emitted_notes,
        total_ticks,
        duration_seconds: beats * 60.0 / f64::from(options.tempo_bpm),
    };
    tracing::debug!(
        scale = scale.name(),
        mode = mode.name(),
        bytes = bytes.len(),
        emitted_notes,
        "encoded midi"
    );

    Ok(Conversion { bytes, stats })
}
