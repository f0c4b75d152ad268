//! AngleSample - Tracking source output
//!
//! Raw sweep timing per photosensor channel, as captured during one poll.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Physical photosensor channel id (0..31 on the HMD)
pub type ChannelId = u8;

/// Lighthouse base station selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Station {
    #[default]
    A,
    B,
}

impl Station {
    /// Single-byte channel selector used by the device library
    pub fn selector(self) -> u8 {
        match self {
            Self::A => b'A',
            Self::B => b'B',
        }
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.selector() as char)
    }
}

/// Sweep plane of a lighthouse rotor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepAxis {
    Horizontal,
    Vertical,
}

/// Tick offsets from the sync pulse for both sweep planes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepAngles {
    pub horizontal_ticks: u32,
    pub vertical_ticks: u32,
}

impl SweepAngles {
    pub const fn new(horizontal_ticks: u32, vertical_ticks: u32) -> Self {
        Self {
            horizontal_ticks,
            vertical_ticks,
        }
    }
}

/// One raw hit: a sweep crossing a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepHit {
    pub station: Station,
    pub axis: SweepAxis,
    pub channel: ChannelId,
    /// Offset from the sync pulse (timer ticks)
    pub ticks: u32,
    /// Monotonic 48 MHz timestamp of the hit
    pub timestamp: u64,
}

/// Angle sample
///
/// Replaced wholesale every poll. Channels not seen this cycle are absent.
/// Iteration is in ascending channel order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AngleSample {
    pub station: Station,
    pub entries: BTreeMap<ChannelId, SweepAngles>,
}

impl AngleSample {
    /// Empty sample (timeout or nothing visible)
    pub fn empty(station: Station) -> Self {
        Self {
            station,
            entries: BTreeMap::new(),
        }
    }

    /// Build from `(channel, (horizontal, vertical))` pairs
    pub fn from_pairs(
        station: Station,
        pairs: impl IntoIterator<Item = (ChannelId, (u32, u32))>,
    ) -> Self {
        Self {
            station,
            entries: pairs
                .into_iter()
                .map(|(id, (h, v))| (id, SweepAngles::new(h, v)))
                .collect(),
        }
    }

    pub fn insert(&mut self, channel: ChannelId, angles: SweepAngles) {
        self.entries.insert(channel, angles);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending channel order
    pub fn iter(&self) -> impl Iterator<Item = (ChannelId, SweepAngles)> + '_ {
        self.entries.iter().map(|(id, a)| (*id, *a))
    }
}
