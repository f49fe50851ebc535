//! クラスターアダプター
//!
//! API 到達性 → 認可の順に依存チェックを行う。

use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;

use super::{check_from_probe, timed_probe, ConnectionAdapter, ProbeOutcome};
use crate::connection::fields::{self, FieldSpec};
use crate::connection::secrets::CredentialSet;
use crate::connection::types::{ConnectionKind, RegistryFlavor, ServiceCheck, ServiceStatus};
use crate::error::Error;

/// クラスター側リモート境界
#[async_trait]
pub trait ClusterAuthority: Send + Sync {
    /// API エンドポイントへ到達できるか（認証なし）
    async fn reachability(&self, endpoint: &str) -> Result<ProbeOutcome, Error>;

    /// サービストークンで認可されるか
    async fn authorization(
        &self,
        endpoint: &str,
        token: &SecretString,
    ) -> Result<ProbeOutcome, Error>;
}

pub const CHECK_API_REACHABILITY: &str = "api-reachability";
pub const CHECK_AUTHORIZATION: &str = "authorization";

pub struct ClusterAdapter {
    authority: Arc<dyn ClusterAuthority>,
}

impl ClusterAdapter {
    pub fn new(authority: Arc<dyn ClusterAuthority>) -> Self {
        Self { authority }
    }
}

#[async_trait]
impl ConnectionAdapter for ClusterAdapter {
    fn kind(&self) -> ConnectionKind {
        ConnectionKind::Cluster
    }

    fn required_fields(&self, flavor: Option<RegistryFlavor>) -> Vec<FieldSpec> {
        fields::required_fields(ConnectionKind::Cluster, flavor)
    }

    async fn validate(&self, credentials: &CredentialSet) -> Result<Vec<ServiceCheck>, Error> {
        let endpoint = credentials
            .field("api_endpoint")
            .ok_or_else(|| Error::InvalidInput("api_endpoint is missing".to_string()))?;
        let token = credentials
            .secret("service_token")
            .ok_or_else(|| Error::InvalidInput("service_token is missing".to_string()))?;

        let (outcome, latency) = timed_probe(|| self.authority.reachability(endpoint)).await;
        let reach_check = check_from_probe(CHECK_API_REACHABILITY, outcome, latency)?;

        if reach_check.status != ServiceStatus::Success {
            return Ok(vec![reach_check, ServiceCheck::skipped(CHECK_AUTHORIZATION)]);
        }

        let (outcome, latency) =
            timed_probe(|| self.authority.authorization(endpoint, token)).await;
        let authz_check = check_from_probe(CHECK_AUTHORIZATION, outcome, latency)?;

        Ok(vec![reach_check, authz_check])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct ScriptedAuthority {
        reachable: bool,
        authorized: bool,
    }

    #[async_trait]
    impl ClusterAuthority for ScriptedAuthority {
        async fn reachability(&self, endpoint: &str) -> Result<ProbeOutcome, Error> {
            Ok(if self.reachable {
                ProbeOutcome::ok(format!("Endpoint {} reachable", endpoint))
            } else {
                ProbeOutcome::rejected(format!("Endpoint {} unreachable", endpoint))
            })
        }

        async fn authorization(
            &self,
            _endpoint: &str,
            _token: &SecretString,
        ) -> Result<ProbeOutcome, Error> {
            Ok(if self.authorized {
                ProbeOutcome::ok("Service token accepted")
            } else {
                ProbeOutcome::rejected("Service token rejected")
            })
        }
    }

    fn credentials() -> CredentialSet {
        let mut values = HashMap::new();
        values.insert("name".to_string(), "prod".to_string());
        values.insert(
            "api_endpoint".to_string(),
            "https://cluster.example.com".to_string(),
        );
        values.insert("service_token".to_string(), "tok".to_string());
        CredentialSet::from_form_values(ConnectionKind::Cluster, &values)
    }

    #[tokio::test]
    async fn test_unreachable_skips_authorization() {
        let adapter = ClusterAdapter::new(Arc::new(ScriptedAuthority {
            reachable: false,
            authorized: true,
        }));
        let checks = adapter.validate(&credentials()).await.unwrap();
        assert_eq!(checks[0].status, ServiceStatus::Failed);
        assert_eq!(checks[1].status, ServiceStatus::Pending);
    }

    #[tokio::test]
    async fn test_reachable_and_authorized() {
        let adapter = ClusterAdapter::new(Arc::new(ScriptedAuthority {
            reachable: true,
            authorized: true,
        }));
        let checks = adapter.validate(&credentials()).await.unwrap();
        assert!(checks.iter().all(|c| c.status == ServiceStatus::Success));
    }
}
