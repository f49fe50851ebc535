//! テレメトリコレクターアダプター
//!
//! 到達性チェックが必須、取り込みレイテンシーチェックは明示的に
//! 助言扱い。助言チェックの失敗・障害は全体の成否に影響しない。

use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::warn;

use super::{check_from_probe, timed_probe, ConnectionAdapter, ProbeOutcome};
use crate::connection::fields::{self, FieldSpec};
use crate::connection::secrets::CredentialSet;
use crate::connection::types::{ConnectionKind, RegistryFlavor, ServiceCheck, ServiceStatus};
use crate::error::Error;

/// テレメトリコレクター側リモート境界
#[async_trait]
pub trait TelemetryAuthority: Send + Sync {
    /// API キーでコレクターへ到達できるか
    async fn reachability(
        &self,
        endpoint: &str,
        api_key: &SecretString,
    ) -> Result<ProbeOutcome, Error>;

    /// 取り込みレイテンシーが許容範囲か（助言）
    async fn ingest_latency(&self, endpoint: &str) -> Result<ProbeOutcome, Error>;
}

pub const CHECK_COLLECTOR_REACHABILITY: &str = "collector-reachability";
pub const CHECK_INGEST_LATENCY: &str = "ingest-latency";

pub struct TelemetryAdapter {
    authority: Arc<dyn TelemetryAuthority>,
}

impl TelemetryAdapter {
    pub fn new(authority: Arc<dyn TelemetryAuthority>) -> Self {
        Self { authority }
    }
}

#[async_trait]
impl ConnectionAdapter for TelemetryAdapter {
    fn kind(&self) -> ConnectionKind {
        ConnectionKind::TelemetryCollector
    }

    fn required_fields(&self, flavor: Option<RegistryFlavor>) -> Vec<FieldSpec> {
        fields::required_fields(ConnectionKind::TelemetryCollector, flavor)
    }

    async fn validate(&self, credentials: &CredentialSet) -> Result<Vec<ServiceCheck>, Error> {
        let endpoint = credentials
            .field("endpoint")
            .ok_or_else(|| Error::InvalidInput("endpoint is missing".to_string()))?;
        let api_key = credentials
            .secret("api_key")
            .ok_or_else(|| Error::InvalidInput("api_key is missing".to_string()))?;

        let (outcome, latency) =
            timed_probe(|| self.authority.reachability(endpoint, api_key)).await;
        let reach_check = check_from_probe(CHECK_COLLECTOR_REACHABILITY, outcome, latency)?;

        if reach_check.status != ServiceStatus::Success {
            return Ok(vec![
                reach_check,
                ServiceCheck::skipped(CHECK_INGEST_LATENCY).advisory(),
            ]);
        }

        // 助言チェックの障害は全体を失敗させない
        let (outcome, latency) = timed_probe(|| self.authority.ingest_latency(endpoint)).await;
        let latency_check = match check_from_probe(CHECK_INGEST_LATENCY, outcome, latency) {
            Ok(check) => check.advisory(),
            Err(err) => {
                warn!("Ingest latency probe fault (advisory): {}", err);
                ServiceCheck::failed(CHECK_INGEST_LATENCY, "Latency probe unavailable")
                    .advisory()
            }
        };

        Ok(vec![reach_check, latency_check])
    }
}
