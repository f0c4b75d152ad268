//! TrackingSource trait - device data source abstraction
//!
//! Real hardware, the simulator and recorded sessions all sit behind the same
//! two operations.

use std::time::Duration;

use bytes::Bytes;

use crate::{AngleSample, ContractError, Station};

/// Tracked-device data source
#[trait_variant::make(TrackingSource: Send)]
pub trait LocalTrackingSource {
    /// Source name (used for logging/metrics)
    fn name(&self) -> &str;

    /// One-shot device configuration blob (JSON)
    ///
    /// # Errors
    /// `Device` if the blob cannot be read
    async fn get_config(&mut self) -> Result<Bytes, ContractError>;

    /// Collect one angle sample from `station`.
    ///
    /// `timeout` is advisory; callers also bound the future. A source that
    /// sees nothing returns an empty sample rather than an error.
    ///
    /// # Errors
    /// `Device` on transport failure, `SourceExhausted` when a finite source
    /// has no more data.
    async fn poll_angles(
        &mut self,
        station: Station,
        timeout: Duration,
    ) -> Result<AngleSample, ContractError>;
}
