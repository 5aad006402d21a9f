// Standard MIDI File (SMF) encoding.
//
// Serializes timed tracks into the chunked SMF container: an `MThd` header
// (format 1, track count, 480 ticks per quarter note) followed by one `MTrk`
// chunk per track. Events are held with absolute tick times; the encoder
// stable-sorts them, converts to delta times and writes each delta as a
// variable-length quantity (VLQ) ahead of the event bytes. Running status is
// never used, so every channel event is a full three bytes.
//
// Output goes straight into one pre-sized `Vec<u8>`. Track chunk lengths are
// written as a zero placeholder and back-patched once the chunk body is done.
//
// `midly` is used by the tests as an independent parser to confirm the bytes
// are a valid SMF.

use serde::{Deserialize, Serialize};

/// Ticks per quarter note (beat). Fixed for every conversion.
pub const TICKS_PER_BEAT: u16 = 480;

/// SMF format 1: one or more simultaneous tracks.
const FORMAT_PARALLEL: u16 = 1;

/// Largest tempo value the 3-byte tempo meta event can hold.
pub const MAX_TEMPO_MICROS: u32 = 0x00FF_FFFF;

/// Convert a position in beats to ticks, rounding to the nearest tick.
/// Negative positions clamp to tick 0.
pub fn beats_to_ticks(beats: f64) -> u32 {
    (beats * f64::from(TICKS_PER_BEAT)).round().max(0.0) as u32
}

/// Microseconds per beat for a tempo in BPM, saturated to 24 bits.
pub fn tempo_micros(bpm: u32) -> u32 {
    (60_000_000 / bpm.max(1)).min(MAX_TEMPO_MICROS)
}

/// Payload of a timed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Tempo { micros_per_beat: u32 },
    NoteOn { channel: u8, pitch: u8, velocity: u8 },
    NoteOff { channel: u8, pitch: u8 },
    EndOfTrack,
}

impl EventKind {
    /// A note-on with pitch clamped to 0..=127 and velocity to 1..=127.
    pub fn note_on(channel: u8, pitch: i32, velocity: i32) -> Self {
        EventKind::NoteOn {
            channel: channel & 0x0F,
            pitch: pitch.clamp(0, 127) as u8,
            velocity: velocity.clamp(1, 127) as u8,
        }
    }

    /// A note-off with pitch clamped to 0..=127.
    pub fn note_off(channel: u8, pitch: i32) -> Self {
        EventKind::NoteOff {
            channel: channel & 0x0F,
            pitch: pitch.clamp(0, 127) as u8,
        }
    }
}

/// An event at an absolute tick position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub tick: u32,
    pub kind: EventKind,
}

/// An ordered list of events on one channel namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub events: Vec<TimedEvent>,
}

impl Track {
    pub fn new() -> Self {
        Track::default()
    }

    pub fn push(&mut self, tick: u32, kind: EventKind) {
        self.events.push(TimedEvent { tick, kind });
    }

    /// Stable sort by tick; events at the same tick keep emission order.
    pub fn sort(&mut self) {
        self.events.sort_by_key(|e| e.tick);
    }

    pub fn note_on_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::NoteOn { .. }))
            .count()
    }

    /// Tick of the latest event, 0 for an empty track.
    pub fn last_tick(&self) -> u32 {
        self.events.iter().map(|e| e.tick).max().unwrap_or(0)
    }
}

/// Encode tracks as a format-1 SMF.
///
/// Each track is stable-sorted before encoding. A track that does not already
/// end in `EndOfTrack` gets one at its last tick.
pub fn encode(tracks: &[Track]) -> Vec<u8> {
    let body_estimate: usize = tracks.iter().map(|t| 8 + 8 * (t.events.len() + 1)).sum();
    let mut buf = Vec::with_capacity(14 + body_estimate);

    buf.extend_from_slice(b"MThd");
    buf.extend_from_slice(&6u32.to_be_bytes());
    buf.extend_from_slice(&FORMAT_PARALLEL.to_be_bytes());
    buf.extend_from_slice(&(tracks.len().min(usize::from(u16::MAX)) as u16).to_be_bytes());
    buf.extend_from_slice(&TICKS_PER_BEAT.to_be_bytes());

    for track in tracks.iter().take(usize::from(u16::MAX)) {
        write_track(&mut buf, track);
    }
    buf
}

fn write_track(buf: &mut Vec<u8>, track: &Track) {
    let mut events = track.events.clone();
    events.sort_by_key(|e| e.tick);
    if !matches!(events.last(), Some(e) if e.kind == EventKind::EndOfTrack) {
        let tick = events.last().map_or(0, |e| e.tick);
        events.push(TimedEvent {
            tick,
            kind: EventKind::EndOfTrack,
        });
    }

    buf.extend_from_slice(b"MTrk");
    let len_at = buf.len();
    buf.extend_from_slice(&[0; 4]);
    let body_start = buf.len();

    let mut prev = 0u32;
    for event in &events {
        write_vlq(buf, event.tick - prev);
        prev = event.tick;
        write_event(buf, event.kind);
    }

    let body_len = (buf.len() - body_start) as u32;
    buf[len_at..body_start].copy_from_slice(&body_len.to_be_bytes());
}

fn write_event(buf: &mut Vec<u8>, kind: EventKind) {
    match kind {
        EventKind::Tempo { micros_per_beat } => {
            let t = micros_per_beat.min(MAX_TEMPO_MICROS).to_be_bytes();
            buf.extend_from_slice(&[0xFF, 0x51, 0x03, t[1], t[2], t[3]]);
        }
        EventKind::NoteOn {
            channel,
            pitch,
            velocity,
        } => buf.extend_from_slice(&[0x90 | (channel & 0x0F), pitch & 0x7F, velocity & 0x7F]),
        EventKind::NoteOff { channel, pitch } => {
            buf.extend_from_slice(&[0x80 | (channel & 0x0F), pitch & 0x7F, 0])
        }
        EventKind::EndOfTrack => buf.extend_from_slice(&[0xFF, 0x2F, 0x00]),
    }
}

/// Append `value` as a big-endian variable-length quantity.
///
/// Seven bits per byte, most significant group first, 0x80 set on every byte
/// but the last. Zero is the single byte `0x00`. SMF limits deltas to
/// 0x0FFF_FFFF (four bytes); larger values take a fifth byte.
pub fn write_vlq(buf: &mut Vec<u8>, value: u32) {
    let mut groups = [0u8; 5];
    let mut n = 0;
    let mut v = value;
    loop {
        groups[n] = (v & 0x7F) as u8;
        n += 1;
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let continuation = if i > 0 { 0x80 } else { 0 };
        buf.push(groups[i] | continuation);
    }
}

/// Decode a VLQ from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed, or `None` if the input
/// ends mid-quantity or the value does not fit in a `u32`.
pub fn read_vlq(bytes: &[u8]) -> Option<(u32, usize)> {
    let mut value: u64 = 0;
    for (i, &b) in bytes.iter().enumerate().take(5) {
        value = (value << 7) | u64::from(b & 0x7F);
        if b & 0x80 == 0 {
            return u32::try_from(value).ok().map(|v| (v, i + 1));
        }
    }
    None
}
