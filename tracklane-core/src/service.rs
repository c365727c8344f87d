//! High-level service facade running the provider fallback chain.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::model::{
    BatchOutcome, BatchReport, MULTI_PROVIDER_SOURCE, ProviderAttempt, ProviderId,
    ProviderStatusReport, TrackingFailure, TrackingQuery, TrackingResult,
};
use crate::plugin::{ProviderOrder, ProviderRegistry};
use crate::ports::{TrackError, TrackingObserver};

/// Concurrency used by [`TrackingService::track_batch`] callers that have no preference.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 4;

/// Public entry point for shipment lookups.
pub struct TrackingService {
    registry: Arc<ProviderRegistry>,
    order: ProviderOrder,
    observers: Vec<Arc<dyn TrackingObserver>>,
}

impl TrackingService {
    /// Create a new service bound to the provided registry, using the
    /// default provider order.
    #[must_use]
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            order: ProviderOrder::default(),
            observers: Vec::new(),
        }
    }

    /// Replace the provider attempt order.
    #[must_use]
    pub fn with_order(mut self, order: ProviderOrder) -> Self {
        self.order = order;
        self
    }

    /// Register a collaborator notified of every final result.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn TrackingObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Provider availability, derived from configuration only.
    #[must_use]
    pub fn status(&self) -> ProviderStatusReport {
        self.registry.status()
    }

    /// Look up a shipment, trying providers one after another until one
    /// succeeds.
    ///
    /// Provider failures never surface as errors. An adapter that returns a
    /// transient error counts as a failed attempt, and when every provider
    /// fails the result is a failure attributed to [`MULTI_PROVIDER_SOURCE`].
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::InvalidQuery`] for a malformed tracking number and
    /// [`TrackError::Port`] when a provider reports a configuration error.
    pub async fn track(&self, query: &TrackingQuery) -> Result<TrackingResult, TrackError> {
        let query = query.validated()?;
        let plan = self
            .registry
            .plan(query.preferred_provider.as_ref(), &self.order);

        let mut attempts = Vec::with_capacity(plan.attempts.len());
        for port in plan.attempts {
            let provider = &port.meta().id;
            debug!(
                provider = %provider,
                tracking_number = %query.tracking_number,
                "attempting provider"
            );

            let result = match port.attempt(&query).await {
                Ok(result) => result,
                Err(err) if err.is_configuration() => return Err(err.into()),
                Err(err) => TrackingResult::failure(provider, err),
            };
            match result {
                TrackingResult::Success(_) => {
                    info!(
                        provider = %provider,
                        tracking_number = %query.tracking_number,
                        live = result.is_live_data(),
                        "tracking data found"
                    );
                    self.notify(&query, &result).await;
                    return Ok(result);
                }
                TrackingResult::Failure(failure) => {
                    warn!(
                        provider = %provider,
                        tracking_number = %query.tracking_number,
                        error = %failure.error,
                        "provider failed, falling back"
                    );
                    attempts.push(ProviderAttempt {
                        source: failure.source,
                        error: failure.error,
                    });
                }
            }
        }

        let result = exhausted(attempts, plan.skipped);
        info!(
            tracking_number = %query.tracking_number,
            error = result.error().unwrap_or_default(),
            "all providers exhausted"
        );
        self.notify(&query, &result).await;
        Ok(result)
    }

    /// Look up several shipments with at most `concurrency` lookups in
    /// flight. Every lookup settles on its own; one failure never aborts the
    /// others. Outcomes keep the input order.
    pub async fn track_batch(&self, queries: Vec<TrackingQuery>, concurrency: usize) -> BatchReport {
        let outcomes: Vec<BatchOutcome> = stream::iter(queries)
            .map(|query| async move {
                let outcome = self.track(&query).await;
                if let Err(err) = &outcome {
                    warn!(
                        tracking_number = %query.tracking_number,
                        error = %err,
                        "batch lookup failed"
                    );
                }
                BatchOutcome::settle(query.tracking_number, outcome)
            })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        let report = BatchReport::from_outcomes(outcomes);
        info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            "batch lookup finished"
        );
        report
    }

    async fn notify(&self, query: &TrackingQuery, result: &TrackingResult) {
        for observer in &self.observers {
            if let Err(err) = observer.record(query, result).await {
                warn!(error = %err, "tracking observer failed");
            }
        }
    }
}

fn exhausted(attempts: Vec<ProviderAttempt>, skipped: Vec<ProviderId>) -> TrackingResult {
    let error = if attempts.is_empty() {
        "No tracking providers are configured".to_owned()
    } else {
        let detail = attempts
            .iter()
            .map(|attempt| format!("{}: {}", attempt.source, attempt.error))
            .collect::<Vec<_>>()
            .join("; ");
        format!("All tracking providers failed: {detail}")
    };

    TrackingResult::Failure(TrackingFailure {
        error,
        source: MULTI_PROVIDER_SOURCE.to_owned(),
        fallback_options: skipped.into_iter().map(|id| id.0).collect(),
        attempts,
    })
}
