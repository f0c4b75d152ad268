//! Sample recorder - writes polled samples in the replay JSONL format

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use contracts::{AngleSample, ContractError};
use tracker::ReplayRecord;

pub struct SampleRecorder {
    writer: BufWriter<File>,
    start: Instant,
    written: u64,
}

impl SampleRecorder {
    pub fn create(path: &Path) -> Result<Self, ContractError> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            start: Instant::now(),
            written: 0,
        })
    }

    /// Append one sample, timestamped from recorder creation
    pub fn record(&mut self, sample: &AngleSample) -> Result<(), ContractError> {
        let record = ReplayRecord::from_sample(self.start.elapsed().as_secs_f64(), sample);
        let line = record
            .to_line()
            .map_err(|e| ContractError::Other(e.to_string()))?;
        writeln!(self.writer, "{line}")?;
        self.written += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<u64, ContractError> {
        self.writer.flush()?;
        Ok(self.written)
    }
}
