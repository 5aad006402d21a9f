// Musical scales used to quantize mapped pitches.
//
// A scale is an ordered, non-empty list of semitone offsets (0-11) above a
// tonic. The note mapper picks a scale degree from the red channel and adds
// the degree's offset to the base note, so every mapped pitch lands on a
// scale tone. The set of scales is fixed; an unrecognised name falls back to
// chromatic, which accepts every pitch class.

use serde::{Deserialize, Serialize};

/// The built-in scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    /// All twelve pitch classes.
    #[default]
    Chromatic,
    /// Ionian: C D E F G A B
    Major,
    /// Natural minor (aeolian): C D Eb F G Ab Bb
    Minor,
    /// Major pentatonic: C D E G A
    Pentatonic,
    /// Minor blues hexatonic: C Eb F F# G Bb
    Blues,
}

impl Scale {
    pub const ALL: [Scale; 5] = [
        Scale::Chromatic,
        Scale::Major,
        Scale::Minor,
        Scale::Pentatonic,
        Scale::Blues,
    ];

    /// Semitone offsets from the tonic, ascending.
    pub fn offsets(self) -> &'static [u8] {
        match self {
            Scale::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
            Scale::Major => &[0, 2, 4, 5, 7, 9, 11],
            Scale::Minor => &[0, 2, 3, 5, 7, 8, 10],
            Scale::Pentatonic => &[0, 2, 4, 7, 9],
            Scale::Blues => &[0, 3, 5, 6, 7, 10],
        }
    }

    pub fn len(self) -> usize {
        self.offsets().len()
    }

    /// Scales are never empty; present for clippy's `len_without_is_empty`.
    pub fn is_empty(self) -> bool {
        false
    }

    pub fn name(self) -> &'static str {
        match self {
            Scale::Chromatic => "chromatic",
            Scale::Major => "major",
            Scale::Minor => "minor",
            Scale::Pentatonic => "pentatonic",
            Scale::Blues => "blues",
        }
    }

    /// Look up a scale by name, case-insensitively.
    pub fn parse(name: &str) -> Option<Scale> {
        let name = name.trim().to_ascii_lowercase();
        Scale::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Look up a scale by name, falling back to chromatic.
    pub fn from_name(name: &str) -> Scale {
        Scale::parse(name).unwrap_or_else(|| {
            tracing::warn!(scale = name, "unknown scale, using chromatic");
            Scale::Chromatic
        })
    }
}
