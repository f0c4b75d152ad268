//! Angle sample buffer
//!
//! Bounded ring of raw sweep hits. A poll fills it, `snapshot` reduces it to
//! one `AngleSample`, and the next poll starts from `clear`.

use std::collections::BTreeMap;
use std::fmt;

use contracts::{AngleSample, ChannelId, Station, SweepAngles, SweepAxis, SweepHit};
use ringbuf::{traits::*, HeapRb};

/// Time-windowed hit buffer
///
/// When full, the oldest hit is overwritten.
pub struct AngleBuffer {
    hits: HeapRb<SweepHit>,
    capacity: usize,
    window_ticks: u64,
    evicted_count: u64,
}

impl fmt::Debug for AngleBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AngleBuffer")
            .field("len", &self.hits.occupied_len())
            .field("capacity", &self.capacity)
            .field("window_ticks", &self.window_ticks)
            .field("evicted", &self.evicted_count)
            .finish()
    }
}

impl AngleBuffer {
    /// Create a buffer holding at most `capacity` hits.
    ///
    /// `window_ticks` bounds how far behind the newest hit a hit may be and
    /// still count toward a snapshot.
    pub fn new(capacity: usize, window_ticks: u64) -> Self {
        let capacity = capacity.max(1);
        Self {
            hits: HeapRb::new(capacity),
            capacity,
            window_ticks,
            evicted_count: 0,
        }
    }

    /// Append a hit, evicting the oldest when full
    #[inline]
    pub fn push(&mut self, hit: SweepHit) {
        if self.hits.is_full() {
            let _ = self.hits.try_pop();
            self.evicted_count += 1;
        }
        let _ = self.hits.try_push(hit);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.hits.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Hits dropped to make room since creation
    pub fn evicted_count(&self) -> u64 {
        self.evicted_count
    }

    /// Reduce the buffered hits from `station` to one sample.
    ///
    /// Each channel takes its most recent horizontal and vertical hit inside
    /// the window ending at the station's newest hit. Channels missing either
    /// axis are left out.
    pub fn snapshot(&self, station: Station) -> AngleSample {
        let newest = self
            .hits
            .iter()
            .filter(|h| h.station == station)
            .map(|h| h.timestamp)
            .max();

        let Some(newest) = newest else {
            return AngleSample::empty(station);
        };
        let cutoff = newest.saturating_sub(self.window_ticks);

        let mut latest: BTreeMap<ChannelId, (Option<(u64, u32)>, Option<(u64, u32)>)> =
            BTreeMap::new();
        for hit in self
            .hits
            .iter()
            .filter(|h| h.station == station && h.timestamp >= cutoff)
        {
            let slot = latest.entry(hit.channel).or_default();
            let axis_slot = match hit.axis {
                SweepAxis::Horizontal => &mut slot.0,
                SweepAxis::Vertical => &mut slot.1,
            };
            if axis_slot.is_none_or(|(ts, _)| hit.timestamp >= ts) {
                *axis_slot = Some((hit.timestamp, hit.ticks));
            }
        }

        let mut sample = AngleSample::empty(station);
        for (channel, pair) in latest {
            if let (Some((_, h)), Some((_, v))) = pair {
                sample.insert(channel, SweepAngles::new(h, v));
            }
        }
        sample
    }

    /// Drop all hits
    pub fn clear(&mut self) {
        self.hits.clear();
    }
}
