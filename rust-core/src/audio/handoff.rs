//! Cross-thread handoff of band snapshots
//!
//! One producer (the capture callback) publishes a snapshot after every
//! analysis pass; one consumer drains it with a bounded wait. The copy and the
//! freshness flag change together under one lock, so a fresh read always sees
//! a single complete publish. On timeout the consumer gets the previous
//! snapshot back instead of an error.

use crate::config::{HIGH_BAND_SLOTS, LOW_BAND_SLOTS};
use crate::spectrum::bands::{clip_magnitude, BandFrame};
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Counters describing how the handoff has been used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandoffStats {
    pub published: u64,
    pub fresh_reads: u64,
    pub stale_reads: u64,
}

struct Snapshot {
    bands: BandFrame,
    data_ready: bool,
    stats: HandoffStats,
}

/// Double-buffered band store shared by producer and consumer
pub struct BandHandoff {
    snapshot: Mutex<Snapshot>,
    ready: Condvar,
    clip_ceiling: f32,
}

impl BandHandoff {
    /// Create an empty handoff
    ///
    /// # Arguments
    /// * `clip_ceiling` - Upper bound applied to every value copied out
    pub fn new(clip_ceiling: f32) -> Self {
        Self {
            snapshot: Mutex::new(Snapshot {
                bands: BandFrame::default(),
                data_ready: false,
                stats: HandoffStats::default(),
            }),
            ready: Condvar::new(),
            clip_ceiling,
        }
    }

    /// Publish the bands from one analysis pass and wake the consumer
    pub fn publish(&self, bands: &BandFrame) {
        let mut snapshot = self.snapshot.lock();
        snapshot.bands.copy_from(bands);
        snapshot.data_ready = true;
        snapshot.stats.published += 1;
        self.ready.notify_all();
    }

    /// Retrieve the latest snapshot into caller-provided buffers
    ///
    /// Waits up to `timeout` for a publish. Values are clamped to
    /// `[0, clip_ceiling]` on the way out.
    ///
    /// # Returns
    /// `true` if the data came from a publish not yet consumed, `false` if the
    /// wait timed out and the previous snapshot was returned
    pub fn consume_into(
        &self,
        timeout: Duration,
        low_out: &mut [f32; LOW_BAND_SLOTS],
        high_out: &mut [f32; HIGH_BAND_SLOTS],
    ) -> bool {
        let deadline = Instant::now() + timeout;
        let mut snapshot = self.snapshot.lock();

        while !snapshot.data_ready {
            if self.ready.wait_until(&mut snapshot, deadline).timed_out() {
                break;
            }
        }

        let fresh = snapshot.data_ready;
        for (dst, &src) in low_out.iter_mut().zip(snapshot.bands.low.iter()) {
            *dst = clip_magnitude(src, self.clip_ceiling);
        }
        for (dst, &src) in high_out.iter_mut().zip(snapshot.bands.high.iter()) {
            *dst = clip_magnitude(src, self.clip_ceiling);
        }

        if fresh {
            snapshot.data_ready = false;
            snapshot.stats.fresh_reads += 1;
        } else {
            snapshot.stats.stale_reads += 1;
        }
        drop(snapshot);

        if !fresh {
            log::debug!("No fresh bands within {:?}, returning previous snapshot", timeout);
        }
        fresh
    }

    /// Retrieve the latest snapshot as an owned frame
    pub fn consume(&self, timeout: Duration) -> (BandFrame, bool) {
        let mut frame = BandFrame::default();
        let fresh = self.consume_into(timeout, &mut frame.low, &mut frame.high);
        (frame, fresh)
    }

    /// Zero the snapshot and clear the freshness flag
    pub fn reset(&self) {
        let mut snapshot = self.snapshot.lock();
        snapshot.bands.clear();
        snapshot.data_ready = false;
    }

    /// Whether an unread publish is waiting
    pub fn is_fresh(&self) -> bool {
        self.snapshot.lock().data_ready
    }

    pub fn stats(&self) -> HandoffStats {
        self.snapshot.lock().stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn frame_with(value: f32) -> BandFrame {
        let mut frame = BandFrame::default();
        frame.low.fill(value);
        frame.high.fill(value * 2.0);
        frame
    }

    #[test]
    fn test_consume_without_publish_times_out() {
        let handoff = BandHandoff::new(1000.0);
        let timeout = Duration::from_millis(20);

        let start = Instant::now();
        let (frame, fresh) = handoff.consume(timeout);
        let elapsed = start.elapsed();

        assert!(!fresh);
        assert!(frame.is_silent());
        assert!(elapsed >= timeout);
        assert!(elapsed < Duration::from_secs(1));
    }

    #[test]
    fn test_publish_then_consume_once() {
        let handoff = BandHandoff::new(1000.0);
        let published = frame_with(3.0);
        handoff.publish(&published);

        let (frame, fresh) = handoff.consume(Duration::from_millis(10));
        assert!(fresh);
        assert_eq!(frame, published);

        // Second read has nothing new and falls back to the same values
        let (frame, fresh) = handoff.consume(Duration::from_millis(10));
        assert!(!fresh);
        assert_eq!(frame, published);

        assert_eq!(
            handoff.stats(),
            HandoffStats {
                published: 1,
                fresh_reads: 1,
                stale_reads: 1,
            }
        );
    }

    #[test]
    fn test_latest_publish_wins() {
        let handoff = BandHandoff::new(1000.0);
        handoff.publish(&frame_with(1.0));
        handoff.publish(&frame_with(2.0));

        let (frame, fresh) = handoff.consume(Duration::ZERO);
        assert!(fresh);
        assert_eq!(frame, frame_with(2.0));
    }

    #[test]
    fn test_consume_clamps_output() {
        let handoff = BandHandoff::new(10.0);
        let mut frame = BandFrame::default();
        frame.low[0] = -4.0;
        frame.low[1] = 50.0;
        frame.high[5] = f32::NAN;
        handoff.publish(&frame);

        let (out, _) = handoff.consume(Duration::ZERO);
        assert_eq!(out.low[0], 0.0);
        assert_eq!(out.low[1], 10.0);
        assert_eq!(out.high[5], 10.0);
    }

    #[test]
    fn test_reset_zeroes_snapshot() {
        let handoff = BandHandoff::new(1000.0);
        handoff.publish(&frame_with(5.0));
        handoff.reset();

        assert!(!handoff.is_fresh());
        let (frame, fresh) = handoff.consume(Duration::ZERO);
        assert!(!fresh);
        assert!(frame.is_silent());
    }

    #[test]
    fn test_consumer_wakes_on_publish() {
        let handoff = Arc::new(BandHandoff::new(1000.0));
        let producer = Arc::clone(&handoff);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.publish(&frame_with(7.0));
        });

        let start = Instant::now();
        let (frame, fresh) = handoff.consume(Duration::from_secs(5));
        handle.join().unwrap();

        assert!(fresh);
        assert_eq!(frame, frame_with(7.0));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_reads_never_mix_publishes() {
        let handoff = Arc::new(BandHandoff::new(1000.0));
        let producer = Arc::clone(&handoff);

        let handle = thread::spawn(move || {
            for i in 1..=500 {
                producer.publish(&frame_with(i as f32));
            }
        });

        for _ in 0..200 {
            let (frame, _) = handoff.consume(Duration::from_millis(5));
            let first = frame.low[0];
            assert!(frame.low.iter().all(|&v| v == first));
            assert!(frame.high.iter().all(|&v| v == first * 2.0));
        }
        handle.join().unwrap();
    }
}
