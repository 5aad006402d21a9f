// Note sequencing: from mapped notes to a timed event track.
//
// A `Mode` decides, note by note, which note-on/note-off pairs to emit and how
// far the time cursor moves. All modes share a `TrackBuilder`, which holds
// the cursor (in beats), seeds the track with the tempo event at tick 0, and
// is the only place beats become ticks and pitch/velocity get clamped to the
// MIDI ranges. Modes work in `i32`/`f64` and may overshoot freely; clamping
// happens exactly once, when an event is created.
//
// The mode is fixed for a whole run. Several modes look at neighbours or the
// total length (chords, melodic, wave-modulation, palindrome), so the whole
// note list is available up front.
//
// Modes (durations in beats, `i` = note index, `n` = note count):
// - linear:           one note each, advance by its duration
// - arpeggio:         root, +4, +7 at a third of the duration each
// - chords:           triples sounded together for the first note's duration
// - melodic:          passing note at the midpoint before leaps > an octave
// - rhythmic:         bright samples x0.3, dark samples x1.5
// - harmonic:         transpose by 12*log2(h), h cycling 1..=5
// - fibonacci-rhythm: duration x fib(i mod 7) / 8
// - golden-ratio:     duration alternately x phi and / phi, velocity decays
// - wave-modulation:  pitch +12 sin(3t), duration x (0.5 + 0.5 cos(2t))
// - polyrhythm:       extra voices stacked in fifths on every 3rd/4th/5th note
// - fractal:          every 5th note echoes at half length/velocity, 3 deep
// - palindrome:       first half forwards, then first half backwards
// - canon:            second voice a fifth up, 4 beats later, at 70% velocity

use crate::color::ColorSample;
use crate::mapping::NoteEvent;
use crate::smf::{EventKind, TICKS_PER_BEAT, Track, beats_to_ticks, tempo_micros};
use std::f64::consts::TAU;

/// Golden ratio.
const PHI: f64 = 1.618_033_988_749_895;

/// Multipliers for the fibonacci-rhythm mode, in eighths.
const FIBONACCI: [u32; 7] = [1, 1, 2, 3, 5, 8, 13];

/// Intensity above which the rhythmic mode shortens notes.
const BRIGHT: f64 = 0.7;
/// Intensity below which the rhythmic mode lengthens notes.
const DARK: f64 = 0.3;

/// A mapped note together with the sample it came from. The rhythmic mode
/// reads the colour directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappedNote {
    pub color: ColorSample,
    pub note: NoteEvent,
}

impl MappedNote {
    fn pitch(&self) -> i32 {
        i32::from(self.note.pitch)
    }

    fn velocity(&self) -> i32 {
        i32::from(self.note.velocity)
    }

    fn duration(&self) -> f64 {
        self.note.duration
    }
}

/// Composition strategy. Variants carry only the parameters they use.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Mode {
    #[default]
    Linear,
    Arpeggio { intervals: [i32; 3] },
    Chords { size: usize },
    Melodic { max_leap: i32 },
    Rhythmic,
    Harmonic { partials: u32 },
    FibonacciRhythm,
    GoldenRatio { decay_every: usize },
    WaveModulation,
    Polyrhythm { divisors: [usize; 3] },
    Fractal { every: usize, depth: u32 },
    Palindrome,
    Canon {
        delay_beats: u32,
        interval: i32,
        velocity_scale: f64,
    },
}

impl Mode {
    /// Every mode with its default parameters.
    pub const ALL: [Mode; 13] = [
        Mode::Linear,
        Mode::Arpeggio {
            intervals: [0, 4, 7],
        },
        Mode::Chords { size: 3 },
        Mode::Melodic { max_leap: 12 },
        Mode::Rhythmic,
        Mode::Harmonic { partials: 5 },
        Mode::FibonacciRhythm,
        Mode::GoldenRatio { decay_every: 10 },
        Mode::WaveModulation,
        Mode::Polyrhythm {
            divisors: [3, 4, 5],
        },
        Mode::Fractal { every: 5, depth: 3 },
        Mode::Palindrome,
        Mode::Canon {
            delay_beats: 4,
            interval: 7,
            velocity_scale: 0.7,
        },
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Linear => "linear",
            Mode::Arpeggio { .. } => "arpeggio",
            Mode::Chords { .. } => "chords",
            Mode::Melodic { .. } => "melodic",
            Mode::Rhythmic => "rhythmic",
            Mode::Harmonic { .. } => "harmonic",
            Mode::FibonacciRhythm => "fibonacci-rhythm",
            Mode::GoldenRatio { .. } => "golden-ratio",
            Mode::WaveModulation => "wave-modulation",
            Mode::Polyrhythm { .. } => "polyrhythm",
            Mode::Fractal { .. } => "fractal",
            Mode::Palindrome => "palindrome",
            Mode::Canon { .. } => "canon",
        }
    }

    /// Case-insensitive lookup with default parameters; `_` and `-` are
    /// interchangeable.
    pub fn parse(name: &str) -> Option<Mode> {
        let name = name.trim().to_ascii_lowercase().replace('_', "-");
        Mode::ALL.into_iter().find(|m| m.name() == name)
    }

    /// Lookup with fallback to linear.
    pub fn from_name(name: &str) -> Mode {
        Mode::parse(name).unwrap_or_else(|| {
            tracing::warn!(mode = name, "unknown sequencing mode, using linear");
            Mode::Linear
        })
    }

    /// Append this mode's events for `notes` to `out`.
    pub fn arrange(&self, notes: &[MappedNote], out: &mut TrackBuilder) {
        match *self {
            Mode::Linear => linear(notes, out),
            Mode::Arpeggio { intervals } => arpeggio(notes, &intervals, out),
            Mode::Chords { size } => chords(notes, size, out),
            Mode::Melodic { max_leap } => melodic(notes, max_leap, out),
            Mode::Rhythmic => rhythmic(notes, out),
            Mode::Harmonic { partials } => harmonic(notes, partials, out),
            Mode::FibonacciRhythm => fibonacci_rhythm(notes, out),
            Mode::GoldenRatio { decay_every } => golden_ratio(notes, decay_every, out),
            Mode::WaveModulation => wave_modulation(notes, out),
            Mode::Polyrhythm { divisors } => polyrhythm(notes, &divisors, out),
            Mode::Fractal { every, depth } => fractal(notes, every, depth, out),
            Mode::Palindrome => palindrome(notes, out),
            Mode::Canon {
                delay_beats,
                interval,
                velocity_scale,
            } => canon(notes, delay_beats, interval, velocity_scale, out),
        }
    }
}

/// Run `mode` over `notes` and return the finished, sorted track.
pub fn sequence(notes: &[MappedNote], mode: Mode, tempo_bpm: u32) -> Track {
    let mut out = TrackBuilder::new(tempo_bpm);
    mode.arrange(notes, &mut out);
    let track = out.finish();
    tracing::debug!(
        mode = mode.name(),
        input_notes = notes.len(),
        emitted_notes = track.note_on_count(),
        end_tick = track.last_tick(),
        "sequenced track"
    );
    track
}

/// Accumulates one track: a beat cursor plus an append-only event list.
#[derive(Debug, Clone)]
pub struct TrackBuilder {
    track: Track,
    time: f64,
    channel: u8,
}

impl TrackBuilder {
    /// Start a track on channel 0 with the tempo event at tick 0.
    pub fn new(tempo_bpm: u32) -> Self {
        let mut track = Track::new();
        track.push(
            0,
            EventKind::Tempo {
                micros_per_beat: tempo_micros(tempo_bpm),
            },
        );
        TrackBuilder {
            track,
            time: 0.0,
            channel: 0,
        }
    }

    /// Cursor position in beats.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn advance(&mut self, beats: f64) {
        self.time += beats.max(0.0);
    }

    /// Note at an explicit start (in beats).
    pub fn note(&mut self, pitch: i32, velocity: i32, start: f64, duration: f64) {
        self.emit(pitch, velocity, start, duration, 0);
    }

    /// Note at the cursor. Does not move the cursor.
    pub fn note_now(&mut self, pitch: i32, velocity: i32, duration: f64) {
        self.emit(pitch, velocity, self.time, duration, 0);
    }

    /// Note at `start`, shifted by a whole number of beats. The shift is
    /// applied in ticks so the offset is exact regardless of rounding.
    pub fn delayed_note(
        &mut self,
        pitch: i32,
        velocity: i32,
        start: f64,
        duration: f64,
        delay_beats: u32,
    ) {
        let offset = delay_beats.saturating_mul(u32::from(TICKS_PER_BEAT));
        self.emit(pitch, velocity, start, duration, offset);
    }

    fn emit(&mut self, pitch: i32, velocity: i32, start: f64, duration: f64, offset: u32) {
        let on = beats_to_ticks(start).saturating_add(offset);
        let off = beats_to_ticks(start + duration.max(0.0)).saturating_add(offset);
        let on_kind = EventKind::note_on(self.channel, pitch, velocity);
        let off_kind = EventKind::note_off(self.channel, pitch);
        self.track.push(on, on_kind);
        self.track.push(off, off_kind);
    }

    /// Stable-sort the events and close the track at its last tick.
    pub fn finish(mut self) -> Track {
        self.track.sort();
        let end = self.track.last_tick();
        self.track.push(end, EventKind::EndOfTrack);
        self.track
    }
}

fn linear(notes: &[MappedNote], out: &mut TrackBuilder) {
    for n in notes {
        out.note_now(n.pitch(), n.velocity(), n.duration());
        out.advance(n.duration());
    }
}

fn arpeggio(notes: &[MappedNote], intervals: &[i32], out: &mut TrackBuilder) {
    for n in notes {
        let step = n.duration() / intervals.len() as f64;
        for &iv in intervals {
            out.note_now(n.pitch() + iv, n.velocity(), step);
            out.advance(step);
        }
    }
}

fn chords(notes: &[MappedNote], size: usize, out: &mut TrackBuilder) {
    for group in notes.chunks(size.max(1)) {
        let duration = group[0].duration();
        for n in group {
            out.note_now(n.pitch(), n.velocity(), duration);
        }
        out.advance(duration);
    }
}

fn melodic(notes: &[MappedNote], max_leap: i32, out: &mut TrackBuilder) {
    let mut prev: Option<i32> = None;
    for n in notes {
        let pitch = n.pitch();
        let mut duration = n.duration();
        if let Some(prev) = prev.filter(|&p| (pitch - p).abs() > max_leap) {
            let passing = duration / 3.0;
            out.note_now((pitch + prev) / 2, n.velocity(), passing);
            out.advance(passing);
            duration -= passing;
        }
        out.note_now(pitch, n.velocity(), duration);
        out.advance(duration);
        prev = Some(pitch);
    }
}

fn rhythmic(notes: &[MappedNote], out: &mut TrackBuilder) {
    for n in notes {
        let intensity = n.color.intensity();
        let duration = if intensity > BRIGHT {
            n.duration() * 0.3
        } else if intensity < DARK {
            n.duration() * 1.5
        } else {
            n.duration()
        };
        out.note_now(n.pitch(), n.velocity(), duration);
        out.advance(duration);
    }
}

/// Semitones between the fundamental and harmonic `h`, rounded.
fn harmonic_shift(h: u32) -> i32 {
    (12.0 * f64::from(h).log2()).round() as i32
}

fn harmonic(notes: &[MappedNote], partials: u32, out: &mut TrackBuilder) {
    let partials = partials.max(1);
    for (i, n) in notes.iter().enumerate() {
        let h = (i as u32 % partials) + 1;
        out.note_now(n.pitch() + harmonic_shift(h), n.velocity(), n.duration());
        out.advance(n.duration());
    }
}

fn fibonacci_rhythm(notes: &[MappedNote], out: &mut TrackBuilder) {
    for (i, n) in notes.iter().enumerate() {
        let duration = n.duration() * f64::from(FIBONACCI[i % FIBONACCI.len()]) / 8.0;
        out.note_now(n.pitch(), n.velocity(), duration);
        out.advance(duration);
    }
}

fn golden_ratio(notes: &[MappedNote], decay_every: usize, out: &mut TrackBuilder) {
    let decay_every = decay_every.max(1);
    for (i, n) in notes.iter().enumerate() {
        let duration = if i % 2 == 0 {
            n.duration() * PHI
        } else {
            n.duration() / PHI
        };
        let k = (i / decay_every) as f64;
        let velocity = (f64::from(n.velocity()) * PHI.powf(-k / PHI)).floor() as i32;
        out.note_now(n.pitch(), velocity, duration);
        out.advance(duration);
    }
}

fn wave_modulation(notes: &[MappedNote], out: &mut TrackBuilder) {
    let total = notes.len() as f64;
    for (i, n) in notes.iter().enumerate() {
        let phase = i as f64 / total * TAU;
        let pitch = n.pitch() + (12.0 * (3.0 * phase).sin()).round() as i32;
        let duration = n.duration() * (0.5 + 0.5 * (2.0 * phase).cos());
        out.note_now(pitch, n.velocity(), duration);
        out.advance(duration);
    }
}

fn polyrhythm(notes: &[MappedNote], divisors: &[usize], out: &mut TrackBuilder) {
    for (i, n) in notes.iter().enumerate() {
        out.note_now(n.pitch(), n.velocity(), n.duration());
        for (voice, &div) in divisors.iter().enumerate() {
            if div == 0 || i % div != 0 {
                continue;
            }
            let layer = voice as i32 + 1;
            let velocity = (f64::from(n.velocity()) * 0.8f64.powi(layer)).floor() as i32;
            let duration = n.duration() * div as f64 / 4.0;
            out.note_now(n.pitch() + 7 * layer, velocity, duration);
        }
        out.advance(n.duration());
    }
}

fn fractal(notes: &[MappedNote], every: usize, depth: u32, out: &mut TrackBuilder) {
    let every = every.max(1);
    for (i, n) in notes.iter().enumerate() {
        let start = out.time();
        out.note(n.pitch(), n.velocity(), start, n.duration());
        if i % every == 0 {
            echo(out, n.pitch(), n.velocity(), start, n.duration(), depth);
        }
        out.advance(n.duration());
    }
}

/// Re-emit a note at its parent's end, halving duration and velocity, until
/// `depth` copies have been placed.
fn echo(
    out: &mut TrackBuilder,
    pitch: i32,
    velocity: i32,
    parent_start: f64,
    parent_duration: f64,
    depth: u32,
) {
    if depth == 0 {
        return;
    }
    let start = parent_start + parent_duration;
    let duration = parent_duration / 2.0;
    let velocity = velocity / 2;
    out.note(pitch, velocity, start, duration);
    echo(out, pitch, velocity, start, duration, depth - 1);
}

fn palindrome(notes: &[MappedNote], out: &mut TrackBuilder) {
    let first_half = &notes[..notes.len() / 2];
    for n in first_half.iter().chain(first_half.iter().rev()) {
        out.note_now(n.pitch(), n.velocity(), n.duration());
        out.advance(n.duration());
    }
}

fn canon(
    notes: &[MappedNote],
    delay_beats: u32,
    interval: i32,
    velocity_scale: f64,
    out: &mut TrackBuilder,
) {
    for n in notes {
        let start = out.time();
        out.note(n.pitch(), n.velocity(), start, n.duration());
        let follower_velocity = (f64::from(n.velocity()) * velocity_scale).floor() as i32;
        out.delayed_note(
            (n.pitch() + interval).min(127),
            follower_velocity,
            start,
            n.duration(),
            delay_beats,
        );
        out.advance(n.duration());
    }
}
