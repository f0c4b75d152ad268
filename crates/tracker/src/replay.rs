//! Replay tracker - plays back recorded angle samples
//!
//! Reads a JSONL recording, one sample per line:
//!
//! ```text
//! {"timestamp": 12.5, "station": "a", "sensors": {"0": [71111, 55555], "5": [200000, 150000]}}
//! ```
//!
//! plus an optional device layout JSON served from `get_config`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use contracts::{AngleSample, ChannelId, ContractError, Station, SweepAngles, TrackingSource};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{Result, TrackerError};

/// Replay configuration
#[derive(Debug, Clone, Default)]
pub struct ReplayConfig {
    /// Device layout JSON; the synthetic layout is served when absent
    pub config_path: Option<PathBuf>,

    /// Restart from the first record when the recording ends
    pub loop_playback: bool,
}

/// One JSONL line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    pub timestamp: f64,
    #[serde(default)]
    pub station: Station,
    pub sensors: BTreeMap<ChannelId, [u32; 2]>,
}

impl ReplayRecord {
    /// Capture a sample as a record
    pub fn from_sample(timestamp: f64, sample: &AngleSample) -> Self {
        Self {
            timestamp,
            station: sample.station,
            sensors: sample
                .iter()
                .map(|(id, a)| (id, [a.horizontal_ticks, a.vertical_ticks]))
                .collect(),
        }
    }

    pub fn to_sample(&self) -> AngleSample {
        let mut sample = AngleSample::empty(self.station);
        for (id, [h, v]) in &self.sensors {
            sample.insert(*id, SweepAngles::new(*h, *v));
        }
        sample
    }

    /// Serialize as one JSONL line (no trailing newline)
    pub fn to_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| TrackerError::InvalidRecord {
            line: 0,
            message: e.to_string(),
        })
    }
}

/// Replay tracker
pub struct ReplayTracker {
    name: String,
    records: Vec<ReplayRecord>,
    config_blob: Bytes,
    config: ReplayConfig,
    cursor: usize,
    served: u64,
}

impl ReplayTracker {
    /// Load a recording from disk
    pub fn load(path: &Path, config: ReplayConfig) -> Result<Self> {
        let file = File::open(path).map_err(|e| TrackerError::recording_load(path, e.to_string()))?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| TrackerError::recording_load(path, e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: ReplayRecord =
                serde_json::from_str(&line).map_err(|e| TrackerError::InvalidRecord {
                    line: idx + 1,
                    message: e.to_string(),
                })?;
            records.push(record);
        }

        // Stable sort keeps file order for equal timestamps
        records.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        let config_blob = match &config.config_path {
            Some(p) => Bytes::from(
                std::fs::read(p).map_err(|e| TrackerError::recording_load(p, e.to_string()))?,
            ),
            None => Bytes::from(config_loader::LayoutLoader::to_json(
                &crate::synthetic_layout()?,
                None,
            )?),
        };

        info!(
            path = %path.display(),
            records = records.len(),
            loop_playback = config.loop_playback,
            "recording loaded"
        );

        Ok(Self::from_records(records, config_blob, config))
    }

    /// Replay in-memory records
    pub fn from_records(records: Vec<ReplayRecord>, config_blob: Bytes, config: ReplayConfig) -> Self {
        Self {
            name: "replay".to_string(),
            records,
            config_blob,
            config,
            cursor: 0,
            served: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Samples served so far
    pub fn served(&self) -> u64 {
        self.served
    }

    /// Next record for `station`, wrapping once when looping
    fn next_for(&mut self, station: Station) -> Option<AngleSample> {
        if let Some(sample) = self.advance(station) {
            return Some(sample);
        }
        if self.config.loop_playback {
            debug!(source = %self.name, "recording wrapped");
            self.cursor = 0;
            return self.advance(station);
        }
        None
    }

    fn advance(&mut self, station: Station) -> Option<AngleSample> {
        while let Some(record) = self.records.get(self.cursor) {
            self.cursor += 1;
            if record.station == station {
                return Some(record.to_sample());
            }
        }
        None
    }
}

impl TrackingSource for ReplayTracker {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "replay_get_config", skip(self))]
    async fn get_config(&mut self) -> std::result::Result<Bytes, ContractError> {
        Ok(self.config_blob.clone())
    }

    #[instrument(name = "replay_poll", skip(self), fields(source = %self.name, cursor = self.cursor))]
    async fn poll_angles(
        &mut self,
        station: Station,
        timeout: Duration,
    ) -> std::result::Result<AngleSample, ContractError> {
        match self.next_for(station) {
            Some(sample) => {
                self.served += 1;
                Ok(sample)
            }
            None => Err(ContractError::SourceExhausted {
                source_name: self.name.clone(),
            }),
        }
    }
}
