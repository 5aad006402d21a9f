// Spatial sampling of a pixel buffer.
//
// A `Pattern` is a coordinate generator over the image plane. The sampler
// walks the generator, drops every coordinate outside [0, width) x
// [0, height) (never clamps), and keeps the first `count` in-bounds hits. If
// a pattern runs dry before `count`, the remainder is filled by region
// averages over the whole image, so the result always has exactly `count`
// samples for a non-empty image.
//
// Patterns:
// - region-average: mean colour of `count` contiguous runs of the flat index
// - spiral: square spiral out from the centre (legs 1,1,2,2,3,3,...)
// - diagonal: anti-diagonal sweep over a strided lattice
// - wave: one sine-displaced point per column slot
// - circular: radius grows with i, angular step grows with radius
// - random: distinct uniform coordinates from a seeded `SampleRng`
// - checkerboard / zigzag: strided rows, offset or reversed on odd rows
// - fibonacci: golden-angle phyllotaxis spiral
// - scan: raster order, every `scan_step`-th row and column
//
// Duplicates: the walk/lattice patterns (spiral, diagonal, checkerboard,
// zigzag, scan) and random never revisit a pixel. The continuous patterns
// (wave, circular, fibonacci) round to pixels and may hit one twice; those
// repeats are kept.

use crate::color::{ColorSample, PixelBuffer};
use chromatone_prng::SampleRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::f64::consts::{PI, TAU};

type Point = (i64, i64);

/// Golden ratio.
const PHI: f64 = 1.618_033_988_749_895;

/// Sampling patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pattern {
    #[default]
    RegionAverage,
    Spiral,
    Diagonal,
    Wave,
    Circular,
    Random,
    Checkerboard,
    Zigzag,
    Fibonacci,
    Scan,
}

impl Pattern {
    pub const ALL: [Pattern; 10] = [
        Pattern::RegionAverage,
        Pattern::Spiral,
        Pattern::Diagonal,
        Pattern::Wave,
        Pattern::Circular,
        Pattern::Random,
        Pattern::Checkerboard,
        Pattern::Zigzag,
        Pattern::Fibonacci,
        Pattern::Scan,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Pattern::RegionAverage => "region-average",
            Pattern::Spiral => "spiral",
            Pattern::Diagonal => "diagonal",
            Pattern::Wave => "wave",
            Pattern::Circular => "circular",
            Pattern::Random => "random",
            Pattern::Checkerboard => "checkerboard",
            Pattern::Zigzag => "zigzag",
            Pattern::Fibonacci => "fibonacci",
            Pattern::Scan => "scan",
        }
    }

    /// Case-insensitive lookup; `_` and `-` are interchangeable.
    pub fn parse(name: &str) -> Option<Pattern> {
        let name = name.trim().to_ascii_lowercase().replace('_', "-");
        Pattern::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Lookup with fallback to region-average.
    pub fn from_name(name: &str) -> Pattern {
        Pattern::parse(name).unwrap_or_else(|| {
            tracing::warn!(pattern = name, "unknown sampling pattern, using region-average");
            Pattern::RegionAverage
        })
    }
}

/// Sampler configuration shared by all patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampler {
    /// Seed for the `random` pattern.
    pub seed: u64,
    /// Row/column step for the `scan` pattern (0 behaves as 1).
    pub scan_step: u32,
}

impl Default for Sampler {
    fn default() -> Self {
        Sampler {
            seed: 0,
            scan_step: 1,
        }
    }
}

impl Sampler {
    pub fn new(seed: u64) -> Self {
        Sampler {
            seed,
            ..Default::default()
        }
    }

    pub fn with_scan_step(mut self, scan_step: u32) -> Self {
        self.scan_step = scan_step;
        self
    }

    /// Produce exactly `count` samples (none for an empty image).
    pub fn sample(&self, buf: &PixelBuffer, count: usize, pattern: Pattern) -> Vec<ColorSample> {
        if count == 0 || buf.is_empty() {
            return Vec::new();
        }
        if pattern == Pattern::RegionAverage {
            return region_average(buf, count);
        }

        let mut samples: Vec<ColorSample> = self
            .points(buf, count, pattern)
            .filter_map(|(x, y)| buf.get(x, y))
            .take(count)
            .collect();

        let placed = samples.len();
        if placed < count {
            tracing::debug!(
                pattern = pattern.name(),
                placed,
                shortfall = count - placed,
                "pattern under-filled, padding with region averages"
            );
            samples.extend(region_average(buf, count - placed));
        }
        samples.truncate(count);
        samples
    }

    fn points(
        &self,
        buf: &PixelBuffer,
        count: usize,
        pattern: Pattern,
    ) -> Box<dyn Iterator<Item = Point>> {
        let (w, h) = (i64::from(buf.width()), i64::from(buf.height()));
        match pattern {
            Pattern::RegionAverage => Box::new(std::iter::empty()),
            Pattern::Spiral => Box::new(spiral(w, h)),
            Pattern::Diagonal => Box::new(diagonal(w, h, grid_stride(w, h, count))),
            Pattern::Wave => Box::new(wave(w, h, count)),
            Pattern::Circular => Box::new(circular(w, h, count)),
            Pattern::Random => Box::new(random(w, h, count, self.seed)),
            Pattern::Checkerboard => Box::new(checkerboard(w, h, grid_stride(w, h, count))),
            Pattern::Zigzag => Box::new(zigzag(w, h, grid_stride(w, h, count))),
            Pattern::Fibonacci => Box::new(fibonacci(w, h, count)),
            Pattern::Scan => Box::new(scan(w, h, i64::from(self.scan_step.max(1)))),
        }
    }
}

/// Split the flat pixel index space into `count` contiguous regions and return
/// each region's per-channel mean, rounded to nearest.
///
/// Regions are `len / count` pixels long and the last one absorbs the
/// remainder. When there are more regions than pixels, region `i` is the
/// single pixel at `i * len / count`.
pub fn region_average(buf: &PixelBuffer, count: usize) -> Vec<ColorSample> {
    let total = buf.len();
    if count == 0 || total == 0 {
        return Vec::new();
    }
    let size = total / count;
    (0..count)
        .map(|i| {
            let (start, end) = if size == 0 {
                let s = (i as u128 * total as u128 / count as u128) as usize;
                (s, s + 1)
            } else if i == count - 1 {
                (i * size, total)
            } else {
                (i * size, (i + 1) * size)
            };
            mean(buf, start, end)
        })
        .collect()
}

fn mean(buf: &PixelBuffer, start: usize, end: usize) -> ColorSample {
    let mut sum = [0u64; 3];
    for i in start..end {
        let c = buf.at_index(i);
        sum[0] += u64::from(c.r);
        sum[1] += u64::from(c.g);
        sum[2] += u64::from(c.b);
    }
    let n = (end - start) as u64;
    let avg = |s: u64| ((s + n / 2) / n) as u8;
    ColorSample::new(avg(sum[0]), avg(sum[1]), avg(sum[2]))
}

/// Lattice stride so that a `stride`-spaced grid holds roughly `count` points.
fn grid_stride(w: i64, h: i64, count: usize) -> i64 {
    let per_sample = (w * h) as f64 / count.max(1) as f64;
    (per_sample.sqrt().floor() as i64).max(1)
}

/// Square spiral from the centre: right 1, down 1, left 2, up 2, right 3, ...
/// Ends once the legs are longer than the image, by which point every pixel
/// has been visited.
fn spiral(w: i64, h: i64) -> impl Iterator<Item = Point> {
    const DIRS: [Point; 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
    let max_leg = w.max(h) + 2;
    let (mut x, mut y) = (w / 2, h / 2);
    let mut leg = 1;
    let mut walked = 0;
    let mut turns = 0usize;
    let mut started = false;

    std::iter::from_fn(move || {
        if !started {
            started = true;
            return Some((x, y));
        }
        if leg > max_leg {
            return None;
        }
        let (dx, dy) = DIRS[turns % 4];
        x += dx;
        y += dy;
        walked += 1;
        if walked == leg {
            walked = 0;
            turns += 1;
            if turns % 2 == 0 {
                leg += 1;
            }
        }
        Some((x, y))
    })
}

/// Anti-diagonals `x + y = d` for increasing `d`, keeping lattice points whose
/// coordinates are both multiples of `stride`.
fn diagonal(w: i64, h: i64, stride: i64) -> impl Iterator<Item = Point> {
    (0..w + h - 1).flat_map(move |d| {
        let lo = (d - (h - 1)).max(0);
        let hi = d.min(w - 1);
        (lo..=hi)
            .map(move |x| (x, d - x))
            .filter(move |&(x, y)| x % stride == 0 && y % stride == 0)
    })
}

/// `y = h/2 + (h/4) * sin(3*pi/w * x)` at `count` evenly spaced columns.
fn wave(w: i64, h: i64, count: usize) -> impl Iterator<Item = Point> {
    let center_y = h as f64 / 2.0;
    let amplitude = h as f64 / 4.0;
    let frequency = 3.0 * PI / w as f64;
    let n = count as u64;
    (0..n).map(move |i| {
        let x = (i * w as u64 / n) as i64;
        let y = (center_y + amplitude * (frequency * x as f64).sin()).floor() as i64;
        (x, y)
    })
}

/// Radius grows linearly with `i / count`; the angular step grows with the
/// radius, so points bunch up near the centre.
fn circular(w: i64, h: i64, count: usize) -> impl Iterator<Item = Point> {
    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
    let max_r = w.min(h) as f64 / 2.0;
    let mut angle = 0.0f64;
    (0..count).map(move |i| {
        let t = i as f64 / count as f64;
        let r = max_r * t;
        angle += 0.5 + 2.0 * t;
        (
            (cx + r * angle.cos()).floor() as i64,
            (cy + r * angle.sin()).floor() as i64,
        )
    })
}

/// Up to `count` distinct uniform coordinates (capped at the pixel count).
fn random(w: i64, h: i64, count: usize, seed: u64) -> impl Iterator<Item = Point> {
    let total = (w * h) as usize;
    let target = count.min(total);
    let mut rng = SampleRng::new(seed);
    let mut taken: HashSet<Point> = HashSet::with_capacity(target);
    let mut produced = 0;

    std::iter::from_fn(move || {
        if produced == target {
            return None;
        }
        loop {
            let x = rng.below_range(0, w as u64) as i64;
            let y = rng.below_range(0, h as u64) as i64;
            if taken.insert((x, y)) {
                produced += 1;
                return Some((x, y));
            }
        }
    })
}

/// Rows every `stride` pixels; odd rows shift right by half a stride.
fn checkerboard(w: i64, h: i64, stride: i64) -> impl Iterator<Item = Point> {
    let step = stride as usize;
    (0..h).step_by(step).enumerate().flat_map(move |(row, y)| {
        let offset = if row % 2 == 1 { stride / 2 } else { 0 };
        (offset..w).step_by(step).map(move |x| (x, y))
    })
}

/// Rows every `stride` pixels; odd rows run right to left.
fn zigzag(w: i64, h: i64, stride: i64) -> impl Iterator<Item = Point> {
    let step = stride as usize;
    (0..h).step_by(step).enumerate().flat_map(move |(row, y)| {
        let xs: Vec<i64> = (0..w).step_by(step).collect();
        let reverse = row % 2 == 1;
        (0..xs.len()).map(move |k| {
            let x = if reverse { xs[xs.len() - 1 - k] } else { xs[k] };
            (x, y)
        })
    })
}

/// Phyllotaxis: angle `i * 2pi/phi`, radius proportional to `sqrt(i)`.
fn fibonacci(w: i64, h: i64, count: usize) -> impl Iterator<Item = Point> {
    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
    let max_r = w.min(h) as f64 / 2.0;
    (0..count).map(move |i| {
        let angle = i as f64 * TAU / PHI;
        let r = max_r * (i as f64 / count as f64).sqrt();
        (
            (cx + r * angle.cos()).floor() as i64,
            (cy + r * angle.sin()).floor() as i64,
        )
    })
}

fn scan(w: i64, h: i64, step: i64) -> impl Iterator<Item = Point> {
    let s = step as usize;
    (0..h)
        .step_by(s)
        .flat_map(move |y| (0..w).step_by(s).map(move |x| (x, y)))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Image whose pixel at (x, y) is (x, y, 7), so samples identify their
    /// coordinates.
    fn coord_image(w: u32, h: u32) -> Vec<u8> {
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                data.extend_from_slice(&[x as u8, y as u8, 7]);
            }
        }
        data
    }

    #[test]
    fn every_pattern_returns_exact_count() {
        for (w, h) in [(1, 1), (2, 1), (1, 20), (7, 5), (16, 9), (31, 17)] {
            let data = coord_image(w, h);
            let buf = PixelBuffer::new(w, h, &data).unwrap();
            let total = buf.len();
            for n in [1, 2, 3, total / 2, total, total + 5] {
                if n == 0 {
                    continue;
                }
                for pattern in Pattern::ALL {
                    let s = Sampler::new(42).sample(&buf, n, pattern);
                    assert_eq!(s.len(), n, "{pattern:?} on {w}x{h}, n={n}");
                }
            }
        }
    }

    #[test]
    fn zero_count_or_empty_image_yields_nothing() {
        let data = coord_image(4, 4);
        let buf = PixelBuffer::new(4, 4, &data).unwrap();
        let empty = PixelBuffer::new(0, 0, &[]).unwrap();
        for pattern in Pattern::ALL {
            assert!(Sampler::default().sample(&buf, 0, pattern).is_empty());
            assert!(Sampler::default().sample(&empty, 5, pattern).is_empty());
        }
    }

    #[test]
    fn region_average_means_and_remainder() {
        // Flat values 0, 10, 20, 30, 40: two regions of 2, last absorbs 3.
        let data: Vec<u8> = (0..5u8).flat_map(|i| [i * 10, 0, 255]).collect();
        let buf = PixelBuffer::new(5, 1, &data).unwrap();
        let s = region_average(&buf, 2);
        assert_eq!(s[0], ColorSample::new(5, 0, 255));
        assert_eq!(s[1], ColorSample::new(30, 0, 255));
    }

    #[test]
    fn region_average_rounds_to_nearest() {
        let data = [0, 1, 2, 1, 2, 2];
        let buf = PixelBuffer::new(2, 1, &data).unwrap();
        // (0+1)/2 = 0.5 -> 1, (1+2)/2 = 1.5 -> 2, (2+2)/2 = 2
        assert_eq!(region_average(&buf, 1), vec![ColorSample::new(1, 2, 2)]);
    }

    #[test]
    fn region_average_more_regions_than_pixels() {
        let data = [10, 0, 0, 20, 0, 0];
        let buf = PixelBuffer::new(2, 1, &data).unwrap();
        let reds: Vec<u8> = region_average(&buf, 4).iter().map(|c| c.r).collect();
        assert_eq!(reds, vec![10, 10, 20, 20]);
    }

    #[test]
    fn spiral_starts_at_centre_and_covers_image_once() {
        let (w, h) = (6, 5);
        let data = coord_image(w, h);
        let buf = PixelBuffer::new(w, h, &data).unwrap();
        let s = Sampler::default().sample(&buf, 30, Pattern::Spiral);
        assert_eq!((s[0].r, s[0].g), (3, 2));
        assert_eq!((s[1].r, s[1].g), (4, 2));
        assert_eq!((s[2].r, s[2].g), (4, 3));
        let unique: HashSet<_> = s.iter().collect();
        assert_eq!(unique.len(), 30);
    }

    #[test]
    fn lattice_patterns_never_repeat_pixels() {
        let (w, h) = (13, 11);
        let data = coord_image(w, h);
        let buf = PixelBuffer::new(w, h, &data).unwrap();
        for pattern in [
            Pattern::Spiral,
            Pattern::Diagonal,
            Pattern::Checkerboard,
            Pattern::Zigzag,
            Pattern::Scan,
            Pattern::Random,
        ] {
            for n in [10, 40, 143] {
                let s = Sampler::new(9).sample(&buf, n, pattern);
                let unique: HashSet<_> = s.iter().collect();
                assert_eq!(unique.len(), n, "{pattern:?} repeated a pixel at n={n}");
            }
        }
    }

    #[test]
    fn zigzag_reverses_odd_rows() {
        let data = coord_image(3, 2);
        let buf = PixelBuffer::new(3, 2, &data).unwrap();
        let s = Sampler::default().sample(&buf, 6, Pattern::Zigzag);
        let coords: Vec<(u8, u8)> = s.iter().map(|c| (c.r, c.g)).collect();
        assert_eq!(coords, vec![(0, 0), (1, 0), (2, 0), (2, 1), (1, 1), (0, 1)]);
    }

    #[test]
    fn checkerboard_offsets_odd_rows() {
        let data = coord_image(4, 4);
        let buf = PixelBuffer::new(4, 4, &data).unwrap();
        // stride = floor(sqrt(16 / 4)) = 2
        let s = Sampler::default().sample(&buf, 4, Pattern::Checkerboard);
        let coords: Vec<(u8, u8)> = s.iter().map(|c| (c.r, c.g)).collect();
        assert_eq!(coords, vec![(0, 0), (2, 0), (1, 2), (3, 2)]);
    }

    #[test]
    fn diagonal_sweeps_by_coordinate_sum() {
        let data = coord_image(3, 3);
        let buf = PixelBuffer::new(3, 3, &data).unwrap();
        let s = Sampler::default().sample(&buf, 9, Pattern::Diagonal);
        let sums: Vec<u8> = s.iter().map(|c| c.r + c.g).collect();
        assert!(sums.windows(2).all(|w| w[0] <= w[1]), "{sums:?}");
        assert_eq!((s[0].r, s[0].g), (0, 0));
    }

    #[test]
    fn wave_stays_in_middle_half() {
        let (w, h) = (40, 20);
        let data = coord_image(w, h);
        let buf = PixelBuffer::new(w, h, &data).unwrap();
        let s = Sampler::default().sample(&buf, 40, Pattern::Wave);
        for (i, c) in s.iter().enumerate() {
            assert_eq!(c.r as usize, i, "one column per sample");
            assert!((5..=15).contains(&c.g), "y={} outside band", c.g);
        }
    }

    #[test]
    fn circular_and_fibonacci_start_at_centre() {
        let data = coord_image(10, 8);
        let buf = PixelBuffer::new(10, 8, &data).unwrap();
        for pattern in [Pattern::Circular, Pattern::Fibonacci] {
            let s = Sampler::default().sample(&buf, 20, pattern);
            assert_eq!((s[0].r, s[0].g), (5, 4), "{pattern:?}");
        }
    }

    #[test]
    fn circular_and_fibonacci_radius_and_angle_growth() {
        // Large canvas so pixel flooring moves a point by less than one unit
        // per axis and nothing falls outside the image.
        let (size, n) = (2000i64, 100usize);
        let (c, max_r) = (1000.0, 1000.0);

        let mut angle = 0.0f64;
        for (i, (x, y)) in circular(size, size, n).enumerate() {
            let t = i as f64 / n as f64;
            angle += 0.5 + 2.0 * t;
            let r = max_r * t;
            let (dx, dy) = (x as f64 - c, y as f64 - c);
            assert!((dx - r * angle.cos()).abs() < 1.0, "circular x at {i}");
            assert!((dy - r * angle.sin()).abs() < 1.0, "circular y at {i}");
            let dist = dx.hypot(dy);
            assert!((dist - r).abs() < 1.5, "circular radius {dist} vs {r} at {i}");
        }

        for (i, (x, y)) in fibonacci(size, size, n).enumerate() {
            let r = max_r * (i as f64 / n as f64).sqrt();
            let angle = i as f64 * TAU / PHI;
            let (dx, dy) = (x as f64 - c, y as f64 - c);
            assert!((dx - r * angle.cos()).abs() < 1.0, "fibonacci x at {i}");
            assert!((dy - r * angle.sin()).abs() < 1.0, "fibonacci y at {i}");
            let dist = dx.hypot(dy);
            assert!((dist - r).abs() < 1.5, "fibonacci radius {dist} vs {r} at {i}");
        }
    }

    #[test]
    fn random_memory_follows_count_not_image_size() {
        // 10^10 pixels: a per-pixel taken map would not fit in memory.
        let side = 100_000i64;
        let points: Vec<Point> = random(side, side, 64, 9).collect();
        assert_eq!(points.len(), 64);
        let unique: HashSet<_> = points.iter().collect();
        assert_eq!(unique.len(), 64);
        assert!(points
            .iter()
            .all(|&(x, y)| (0..side).contains(&x) && (0..side).contains(&y)));
    }

    #[test]
    fn random_is_reproducible_per_seed() {
        let data = coord_image(20, 20);
        let buf = PixelBuffer::new(20, 20, &data).unwrap();
        let a = Sampler::new(1).sample(&buf, 50, Pattern::Random);
        let b = Sampler::new(1).sample(&buf, 50, Pattern::Random);
        let c = Sampler::new(2).sample(&buf, 50, Pattern::Random);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn scan_step_underfill_falls_back_to_region_average() {
        let data = coord_image(4, 4);
        let buf = PixelBuffer::new(4, 4, &data).unwrap();
        let s = Sampler::default()
            .with_scan_step(2)
            .sample(&buf, 6, Pattern::Scan);
        let head: Vec<(u8, u8)> = s[..4].iter().map(|c| (c.r, c.g)).collect();
        assert_eq!(head, vec![(0, 0), (2, 0), (0, 2), (2, 2)]);
        assert_eq!(&s[4..], region_average(&buf, 2).as_slice());
    }

    #[test]
    fn names_roundtrip_and_fallback() {
        for p in Pattern::ALL {
            assert_eq!(Pattern::parse(p.name()), Some(p));
        }
        assert_eq!(Pattern::parse("REGION_AVERAGE"), Some(Pattern::RegionAverage));
        assert_eq!(Pattern::from_name("hexagonal"), Pattern::RegionAverage);
    }
}
