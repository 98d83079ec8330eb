//! Engine-side plumbing around the Auto-Q DSP chain
//!
//! - [`exchange`]: control thread to audio thread parameter handoff
//! - [`meter`]: audio thread to UI thread level/threshold readout
//! - [`engine`]: per-channel followers over interleaved `f32` buffers
//! - [`render`]: offline WAV processing through the engine

pub mod engine;
pub mod exchange;
pub mod meter;
pub mod render;

pub use engine::AutoQEngine;
pub use exchange::{parameter_channel, ParameterReceiver, ParameterSender};
pub use meter::{MeterReading, MeterTap};
pub use render::{render_file, RenderOptions, RenderReport};
