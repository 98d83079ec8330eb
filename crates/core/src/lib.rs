//! Auto-Q core: an envelope-driven resonant filter
//!
//! The signal chain lives in [`domain::dsp`]; parameter persistence lives in
//! [`domain::config`].

pub mod domain;
