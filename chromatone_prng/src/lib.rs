// Seedable pseudo-random number generator for reproducible sampling.
//
// xoshiro256++ (Blackman & Vigna, 2019) whose 256-bit state is expanded from
// a single `u64` seed with SplitMix64. The generator is written out by hand so
// that a given seed yields the same stream on every platform and compiler,
// which is what makes the `random` sampling pattern in `chromatone_music`
// reproducible: the same image, seed and sample count always produce the same
// coordinates and therefore byte-identical MIDI output.
//
// Only integer arithmetic is used to advance the state.

/// Xoshiro256++ generator state.
///
/// Cheap to clone; a clone continues the exact same stream as the original.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleRng {
    s: [u64; 4],
}

impl SampleRng {
    /// Build a generator from a `u64` seed.
    ///
    /// Equal seeds give equal streams. Seed 0 is valid; SplitMix64 never
    /// produces the all-zero state xoshiro must avoid.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        let s = [
            splitmix64(&mut sm),
            splitmix64(&mut sm),
            splitmix64(&mut sm),
            splitmix64(&mut sm),
        ];
        Self { s }
    }

    pub fn next_u64(&mut self) -> u64 {
        let [s0, s1, s2, s3] = self.s;
        let result = s0.wrapping_add(s3).rotate_left(23).wrapping_add(s0);

        let t = s1 << 17;
        let s2 = s2 ^ s0;
        let s3 = s3 ^ s1;
        let s1 = s1 ^ s2;
        let s0 = s0 ^ s3;
        self.s = [s0, s1, s2 ^ t, s3.rotate_left(45)];

        result
    }

    /// Uniform integer in `[low, high)` without modulo bias.
    ///
    /// Panics if `low >= high`.
    pub fn below_range(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "below_range: empty range {low}..{high}");
        let span = high - low;
        if span.is_power_of_two() {
            return low + (self.next_u64() & (span - 1));
        }
        // Reject the short tail of the u64 space that would bias `% span`.
        let threshold = span.wrapping_neg() % span;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + r % span;
            }
        }
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
