//! Observer writing every final lookup result to the log.

use async_trait::async_trait;
use tracing::info;
use tracklane_core::model::{TrackingQuery, TrackingResult};
use tracklane_core::ports::{PortError, TrackingObserver};

/// Emits one structured `info` event per finished lookup.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

#[async_trait]
impl TrackingObserver for LogObserver {
    async fn record(&self, query: &TrackingQuery, result: &TrackingResult) -> Result<(), PortError> {
        info!(
            target: "tracklane::lookups",
            tracking_number = %query.tracking_number,
            source = result.source(),
            success = result.is_success(),
            live = result.is_live_data(),
            error = result.error().unwrap_or_default(),
            "lookup finished"
        );
        Ok(())
    }
}
