// Chromatone: raster images to Standard MIDI Files.
//
// Pixels are sampled under a spatial pattern, each sample's colour becomes a
// note (red -> pitch, green -> velocity, blue -> duration) quantized to a
// scale, a sequencing mode arranges the notes in time, and the resulting
// track is encoded as a format-1 SMF.
//
// Architecture:
// - color.rs: Borrowed RGB8 pixel buffer, colour samples, image info
// - sampler.rs: Spatial sampling patterns with region-average fallback
// - scale.rs: Built-in scales (chromatic, major, minor, pentatonic, blues)
// - mapping.rs: Colour -> (pitch, velocity, duration)
// - sequencer.rs: The thirteen sequencing modes and the shared track builder
// - smf.rs: Timed events, tracks, VLQ and SMF chunk encoding
// - convert.rs: The end-to-end pipeline, options, errors and statistics
//
// Output is deterministic: the same buffer and options always give the same
// bytes. The random pattern draws from a seeded `chromatone_prng::SampleRng`.

pub mod color;
pub mod convert;
pub mod mapping;
pub mod sampler;
pub mod scale;
pub mod sequencer;
pub mod smf;

pub use color::{ColorSample, PixelBuffer};
pub use convert::{Conversion, ConversionStats, ConvertError, ConvertOptions, convert};
