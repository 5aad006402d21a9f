// Chromatone CLI: convert an image file into a MIDI file.
//
// Decodes the image with the `image` crate, hands the RGB8 buffer to the
// library pipeline and writes the resulting SMF. Options come from an
// optional JSON file (`--config`), then individual flags override it.
//
// Usage:
//   cargo run -p chromatone_music --bin convert -- photo.png -o photo.mid
//     [--pattern P] [--scale S] [--mode M] [--tempo BPM] [--samples N]
//     [--seed N] [--base-note N] [--scan-step N] [--config opts.json]
//     [--stats stats.json]
//
// Logging goes to stderr and is controlled by RUST_LOG (default: info).

use anyhow::{Context, Result};
use chromatone_music::{ConvertOptions, PixelBuffer, convert};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Turn an image into music.
#[derive(Parser, Debug)]
#[command(name = "convert", version, about, long_about = None)]
struct Cli {
    /// Input image (PNG, JPEG, GIF or BMP)
    input: PathBuf,

    /// Output MIDI file
    #[arg(short, long, default_value = "output.mid")]
    output: PathBuf,

    /// JSON file with conversion options; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sampling pattern: region-average, spiral, diagonal, wave, circular,
    /// random, checkerboard, zigzag, fibonacci, scan
    #[arg(long)]
    pattern: Option<String>,

    /// Scale: chromatic, major, minor, pentatonic, blues
    #[arg(long)]
    scale: Option<String>,

    /// Sequencing mode: linear, arpeggio, chords, melodic, rhythmic, harmonic,
    /// fibonacci-rhythm, golden-ratio, wave-modulation, polyrhythm, fractal,
    /// palindrome, canon
    #[arg(long)]
    mode: Option<String>,

    /// Tempo in BPM
    #[arg(long)]
    tempo: Option<u32>,

    /// Number of pixels to sample
    #[arg(long)]
    samples: Option<usize>,

    /// Seed for the random pattern
    #[arg(long)]
    seed: Option<u64>,

    /// MIDI note that red = 0 maps to
    #[arg(long)]
    base_note: Option<u8>,

    /// Row/column step for the scan pattern
    #[arg(long)]
    scan_step: Option<u32>,

    /// Write conversion statistics as JSON to this file
    #[arg(long)]
    stats: Option<PathBuf>,
}

impl Cli {
    fn options(&self) -> Result<ConvertOptions> {
        let mut opts = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => ConvertOptions::default(),
        };
        if let Some(p) = &self.pattern {
            opts.pattern = p.clone();
        }
        if let Some(s) = &self.scale {
            opts.scale = s.clone();
        }
        if let Some(m) = &self.mode {
            opts.mode = m.clone();
        }
        if let Some(t) = self.tempo {
            opts.tempo_bpm = t;
        }
        if let Some(n) = self.samples {
            opts.sample_count = n;
        }
        if let Some(s) = self.seed {
            opts.seed = s;
        }
        if let Some(b) = self.base_note {
            opts.base_note = b;
        }
        if let Some(s) = self.scan_step {
            opts.scan_step = s;
        }
        Ok(opts)
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let opts = cli.options()?;

    println!("=== Chromatone ===");
    println!("Input: {}", cli.input.display());
    println!("Output: {}", cli.output.display());
    println!(
        "Pattern: {} | Scale: {} | Mode: {} | Tempo: {} BPM | Samples: {}",
        opts.pattern, opts.scale, opts.mode, opts.tempo_bpm, opts.sample_count
    );
    println!();

    println!("[1/3] Decoding image...");
    let image = image::open(&cli.input)
        .with_context(|| format!("opening image {}", cli.input.display()))?
        .to_rgb8();
    let (width, height) = image.dimensions();
    let pixels = PixelBuffer::new(width, height, image.as_raw())?;
    let info = pixels.info(opts.scan_step);
    println!(
        "  {}x{} ({} pixels, {} at scan step {})",
        info.width, info.height, info.total_pixels, info.sampled_pixels, info.scan_step
    );

    println!("[2/3] Converting...");
    let conversion = convert(&pixels, &opts)?;
    let stats = &conversion.stats;
    println!(
        "  {} samples -> {} notes written, {:.1}s at tempo (estimate {:.1}s)",
        stats.sample_count, stats.emitted_notes, stats.duration_seconds, stats.estimated_seconds
    );

    println!("[3/3] Writing MIDI to {}...", cli.output.display());
    std::fs::write(&cli.output, &conversion.bytes)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    tracing::info!(bytes = conversion.bytes.len(), path = %cli.output.display(), "wrote midi");

    if let Some(path) = &cli.stats {
        let json = serde_json::to_string_pretty(stats)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        println!("  Stats written to {}", path.display());
    }

    println!();
    println!("Play with: timidity {} (or any MIDI player)", cli.output.display());
    Ok(())
}
