//! Auto-Q infrastructure
//!
//! Everything that moves audio or parameters around the DSP core: the
//! multichannel engine, the lock-free parameter mailbox, the metering tap
//! and the offline WAV renderer.

pub mod audio;
