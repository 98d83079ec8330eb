//! Lock-free parameter handoff from a control thread to the audio thread
//!
//! The control side publishes whole [`EffectParameters`] snapshots. The audio
//! side drains the mailbox at the top of each buffer and keeps only the
//! newest snapshot, so a burst of edits collapses into one update.
//!
//! Performance characteristics:
//! - Lock-free on both sides
//! - No allocation after construction
//! - When the mailbox is full the oldest snapshot is overwritten

use autoq_core::domain::dsp::EffectParameters;
use crossbeam::queue::ArrayQueue;
use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Default mailbox depth
pub const DEFAULT_CAPACITY: usize = 8;

struct Mailbox {
    queue: ArrayQueue<EffectParameters>,

    /// Bypass request (cache-padded to keep it off the queue's lines)
    bypass: CachePadded<AtomicBool>,

    /// Snapshots dropped because the consumer fell behind
    overwritten: CachePadded<AtomicU64>,
}

/// Create a connected sender/receiver pair
///
/// `capacity` is raised to 1 if zero.
pub fn parameter_channel(capacity: usize) -> (ParameterSender, ParameterReceiver) {
    let mailbox = Arc::new(Mailbox {
        queue: ArrayQueue::new(capacity.max(1)),
        bypass: CachePadded::new(AtomicBool::new(false)),
        overwritten: CachePadded::new(AtomicU64::new(0)),
    });

    (
        ParameterSender {
            mailbox: Arc::clone(&mailbox),
        },
        ParameterReceiver { mailbox },
    )
}

/// Control-thread end of the mailbox
pub struct ParameterSender {
    mailbox: Arc<Mailbox>,
}

impl ParameterSender {
    /// Publish a snapshot
    ///
    /// Returns `true` when an older, unconsumed snapshot had to be dropped.
    pub fn publish(&self, params: EffectParameters) -> bool {
        let displaced = self.mailbox.queue.force_push(params).is_some();
        if displaced {
            self.mailbox.overwritten.fetch_add(1, Ordering::Relaxed);
        }
        displaced
    }

    /// Request (or release) bypass on the audio side
    pub fn set_bypass(&self, bypass: bool) {
        self.mailbox.bypass.store(bypass, Ordering::Release);
    }

    /// Snapshots waiting to be consumed
    pub fn pending(&self) -> usize {
        self.mailbox.queue.len()
    }

    /// Total snapshots dropped since creation
    pub fn overwritten(&self) -> u64 {
        self.mailbox.overwritten.load(Ordering::Relaxed)
    }
}

/// Audio-thread end of the mailbox
pub struct ParameterReceiver {
    mailbox: Arc<Mailbox>,
}

impl ParameterReceiver {
    /// Drain the mailbox, returning only the newest snapshot
    #[inline]
    pub fn latest(&self) -> Option<EffectParameters> {
        let mut newest = None;
        while let Some(params) = self.mailbox.queue.pop() {
            newest = Some(params);
        }
        newest
    }

    /// Current bypass request
    #[inline]
    pub fn bypass_requested(&self) -> bool {
        self.mailbox.bypass.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.mailbox.queue.capacity()
    }
}
