//! Metering tap shared between the audio thread and UI readers
//!
//! The audio thread publishes after every buffer; readers poll without
//! blocking. Each value lives in its own cache line so the writer and the
//! readers never contend on the same line for different fields.

use autoq_core::domain::dsp::{params, Metering};
use crossbeam::utils::CachePadded;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Snapshot of the tap
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeterReading {
    /// Loudest detector level across channels (dB)
    pub level_db: f64,
    /// Any channel above threshold
    pub threshold_exceeded: bool,
    /// Highest applied cutoff across channels (Hz)
    pub cutoff: f64,
    /// Number of publishes so far
    pub sequence: u64,
}

impl MeterReading {
    /// Combine per-channel metering into one reading
    pub fn from_channels(channels: impl IntoIterator<Item = Metering>) -> Self {
        channels.into_iter().fold(Self::silent(), |acc, m| Self {
            level_db: acc.level_db.max(m.level_db),
            threshold_exceeded: acc.threshold_exceeded || m.threshold_exceeded,
            cutoff: acc.cutoff.max(m.cutoff),
            sequence: acc.sequence,
        })
    }

    /// Reading for silence or bypass
    pub fn silent() -> Self {
        Self {
            level_db: params::DETECTOR_FLOOR_DB,
            threshold_exceeded: false,
            cutoff: 0.0,
            sequence: 0,
        }
    }
}

/// Lock-free meter storage
pub struct MeterTap {
    level_db: CachePadded<AtomicU64>,
    cutoff: CachePadded<AtomicU64>,
    threshold_exceeded: CachePadded<AtomicBool>,
    sequence: CachePadded<AtomicU64>,
}

impl MeterTap {
    pub fn new() -> Self {
        Self {
            level_db: CachePadded::new(AtomicU64::new(params::DETECTOR_FLOOR_DB.to_bits())),
            cutoff: CachePadded::new(AtomicU64::new(0.0f64.to_bits())),
            threshold_exceeded: CachePadded::new(AtomicBool::new(false)),
            sequence: CachePadded::new(AtomicU64::new(0)),
        }
    }

    /// Store a reading (audio thread)
    #[inline]
    pub fn publish(&self, reading: &MeterReading) {
        self.level_db.store(reading.level_db.to_bits(), Ordering::Relaxed);
        self.cutoff.store(reading.cutoff.to_bits(), Ordering::Relaxed);
        self.threshold_exceeded
            .store(reading.threshold_exceeded, Ordering::Relaxed);
        self.sequence.fetch_add(1, Ordering::Release);
    }

    /// Take a snapshot (any thread)
    ///
    /// Fields are individually atomic; a reader racing a publish may see a
    /// mix of two consecutive readings.
    pub fn reading(&self) -> MeterReading {
        let sequence = self.sequence.load(Ordering::Acquire);
        MeterReading {
            level_db: f64::from_bits(self.level_db.load(Ordering::Relaxed)),
            threshold_exceeded: self.threshold_exceeded.load(Ordering::Relaxed),
            cutoff: f64::from_bits(self.cutoff.load(Ordering::Relaxed)),
            sequence,
        }
    }
}

impl Default for MeterTap {
    fn default() -> Self {
        Self::new()
    }
}
