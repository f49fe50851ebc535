//! Validation Adapter Set
//!
//! One adapter per connection kind, registered in an [`AdapterRegistry`]
//! keyed by kind. Each adapter drives a kind-specific remote authority
//! through a trait boundary and reports a structured per-service result set.

pub mod cluster;
pub mod container_registry;
pub mod http;
pub mod secrets_vault;
pub mod source_control;
pub mod telemetry;

use crate::connection::fields::FieldSpec;
use crate::connection::secrets::CredentialSet;
use crate::connection::types::{ConnectionKind, RegistryFlavor, ServiceCheck};
use crate::error::Error;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub use cluster::{ClusterAdapter, ClusterAuthority};
pub use container_registry::{ContainerRegistryAdapter, RegistryAuthority, RegistryCredentials};
pub use secrets_vault::{SecretsVaultAdapter, VaultAuthority};
pub use source_control::{SourceControlAdapter, SourceControlAuthority};
pub use telemetry::{TelemetryAdapter, TelemetryAuthority};

/// Outcome of one probe against a remote authority.
///
/// `Err` from an authority method means an unexpected fault (network,
/// protocol); an expected negative answer is `Ok(ProbeOutcome { ok: false })`.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub ok: bool,
    pub message: String,
}

impl ProbeOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Uniform per-kind validation contract.
///
/// Adapters own the check ordering and partial-result semantics for their
/// kind; they perform no scheduling, no persistence and no timeout handling —
/// that is the orchestrator's concern.
#[async_trait]
pub trait ConnectionAdapter: Send + Sync {
    /// The kind this adapter validates
    fn kind(&self) -> ConnectionKind;

    /// Required fields for this kind, resolved per sub-kind where applicable
    fn required_fields(&self, flavor: Option<RegistryFlavor>) -> Vec<FieldSpec>;

    /// Run the kind-specific checks and return one entry per service, in
    /// order. A prerequisite failure must still surface the failed entry
    /// plus `pending` entries for the checks it made unreachable.
    async fn validate(&self, credentials: &CredentialSet) -> Result<Vec<ServiceCheck>, Error>;
}

/// Adapter registry keyed by connection kind
pub struct AdapterRegistry {
    adapters: HashMap<ConnectionKind, Arc<dyn ConnectionAdapter>>,
}

impl AdapterRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Register an adapter for its kind
    pub fn register(&mut self, adapter: Arc<dyn ConnectionAdapter>) -> Result<(), Error> {
        let kind = adapter.kind();
        if self.adapters.contains_key(&kind) {
            return Err(Error::AdapterConflict(kind.to_string()));
        }
        info!("Registering connection adapter: {}", kind);
        self.adapters.insert(kind, adapter);
        Ok(())
    }

    /// Look up the adapter for a kind
    pub fn get(&self, kind: ConnectionKind) -> Option<Arc<dyn ConnectionAdapter>> {
        self.adapters.get(&kind).cloned()
    }

    /// Number of registered adapters
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry wired with all five kinds over one HTTP authority.
pub fn default_registry(authority: Arc<http::HttpAuthority>) -> Result<AdapterRegistry, Error> {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(SourceControlAdapter::new(authority.clone())))?;
    registry.register(Arc::new(ClusterAdapter::new(authority.clone())))?;
    registry.register(Arc::new(ContainerRegistryAdapter::new(authority.clone())))?;
    registry.register(Arc::new(SecretsVaultAdapter::new(authority.clone())))?;
    registry.register(Arc::new(TelemetryAdapter::new(authority)))?;
    Ok(registry)
}

/// Measure the latency of one probe call.
pub(crate) async fn timed_probe<F, Fut>(probe: F) -> (Result<ProbeOutcome, Error>, u64)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<ProbeOutcome, Error>>,
{
    let started = std::time::Instant::now();
    let outcome = probe().await;
    (outcome, started.elapsed().as_millis() as u64)
}

/// Fold a probe outcome into a service entry.
pub(crate) fn check_from_probe(
    service: &str,
    outcome: Result<ProbeOutcome, Error>,
    latency_ms: u64,
) -> Result<ServiceCheck, Error> {
    match outcome {
        Ok(probe) if probe.ok => {
            Ok(ServiceCheck::success(service, probe.message).with_latency(latency_ms))
        }
        Ok(probe) => Ok(ServiceCheck::failed(service, probe.message).with_latency(latency_ms)),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::fields;

    struct NullAdapter(ConnectionKind);

    #[async_trait]
    impl ConnectionAdapter for NullAdapter {
        fn kind(&self) -> ConnectionKind {
            self.0
        }

        fn required_fields(&self, flavor: Option<RegistryFlavor>) -> Vec<FieldSpec> {
            fields::required_fields(self.0, flavor)
        }

        async fn validate(
            &self,
            _credentials: &CredentialSet,
        ) -> Result<Vec<ServiceCheck>, Error> {
            Ok(vec![ServiceCheck::success("noop", "ok")])
        }
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = AdapterRegistry::new();
        registry
            .register(Arc::new(NullAdapter(ConnectionKind::Cluster)))
            .unwrap();
        let err = registry
            .register(Arc::new(NullAdapter(ConnectionKind::Cluster)))
            .unwrap_err();
        assert!(matches!(err, Error::AdapterConflict(_)));
    }

    #[test]
    fn test_lookup_by_kind() {
        let mut registry = AdapterRegistry::new();
        registry
            .register(Arc::new(NullAdapter(ConnectionKind::SecretsVault)))
            .unwrap();
        assert!(registry.get(ConnectionKind::SecretsVault).is_some());
        assert!(registry.get(ConnectionKind::Cluster).is_none());
        assert_eq!(registry.len(), 1);
    }
}
