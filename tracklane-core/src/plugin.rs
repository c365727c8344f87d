//! Registry of tracking providers, their status, and the attempt order.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;

use crate::model::{ProviderId, ProviderStatusReport, Providers};
use crate::ports::TrackingPort;

/// Ordered list of provider identifiers the aggregator walks through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOrder(Vec<ProviderId>);

impl ProviderOrder {
    /// Build an order from identifiers. Duplicates keep their first position.
    #[must_use]
    pub fn new(ids: Vec<ProviderId>) -> Self {
        let mut seen = HashSet::new();
        Self(ids.into_iter().filter(|id| seen.insert(id.clone())).collect())
    }

    /// Parse a comma separated list such as `"mock, maersk"`.
    #[must_use]
    pub fn parse(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(ProviderId::from)
                .collect(),
        )
    }

    /// Identifiers in attempt order.
    pub fn iter(&self) -> impl Iterator<Item = &ProviderId> {
        self.0.iter()
    }
}

impl Default for ProviderOrder {
    fn default() -> Self {
        Self(Providers::ALL.into_iter().map(ProviderId::from).collect())
    }
}

/// Providers selected for one lookup.
pub struct AttemptPlan<'reg> {
    /// Configured providers, in the order they will be tried.
    pub attempts: Vec<&'reg Arc<dyn TrackingPort>>,
    /// Providers passed over because their configuration is incomplete.
    pub skipped: Vec<ProviderId>,
}

/// Registry holding every provider known to the service.
pub struct ProviderRegistry {
    ports: Vec<Arc<dyn TrackingPort>>,
}

impl ProviderRegistry {
    /// Build a registry from the provided ports. A port whose identifier is
    /// already registered is ignored.
    #[must_use]
    pub fn new(ports: Vec<Arc<dyn TrackingPort>>) -> Self {
        let mut seen = HashSet::new();
        let ports = ports
            .into_iter()
            .filter(|port| {
                let fresh = seen.insert(port.meta().id.clone());
                if !fresh {
                    warn!(provider = %port.meta().id, "duplicate provider ignored");
                }
                fresh
            })
            .collect();
        Self { ports }
    }

    /// Look up a provider by identifier.
    #[must_use]
    pub fn port(&self, id: &ProviderId) -> Option<&Arc<dyn TrackingPort>> {
        self.ports.iter().find(|port| &port.meta().id == id)
    }

    /// Configuration-derived availability of every provider. Never touches
    /// the network and is recomputed on each call.
    #[must_use]
    pub fn status(&self) -> ProviderStatusReport {
        ProviderStatusReport::from_statuses(self.ports.iter().map(|port| port.status()).collect())
    }

    /// Decide which providers to try for one lookup.
    ///
    /// The preferred provider comes first, then `order`, then any registered
    /// provider the order does not mention. Each provider appears at most
    /// once; unconfigured ones land in [`AttemptPlan::skipped`].
    #[must_use]
    pub fn plan(&self, preferred: Option<&ProviderId>, order: &ProviderOrder) -> AttemptPlan<'_> {
        let preferred_port = preferred.and_then(|id| {
            let port = self.port(id);
            if port.is_none() {
                warn!(provider = %id, "preferred provider is not registered, ignoring");
            }
            port
        });

        let candidates = preferred_port
            .into_iter()
            .chain(order.iter().filter_map(|id| self.port(id)))
            .chain(self.ports.iter());

        let mut seen = HashSet::new();
        let mut plan = AttemptPlan {
            attempts: Vec::new(),
            skipped: Vec::new(),
        };
        for port in candidates {
            let id = &port.meta().id;
            if !seen.insert(id.clone()) {
                continue;
            }
            if port.available() {
                plan.attempts.push(port);
            } else {
                plan.skipped.push(id.clone());
            }
        }
        plan
    }
}
