//! ソースコード管理アダプター
//!
//! 認証 → リポジトリアクセスの順に依存チェックを行う。
//! 認証失敗時もリポジトリチェックを `pending` として報告し、
//! 部分結果を必ず返す。

use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;

use super::{check_from_probe, timed_probe, ConnectionAdapter, ProbeOutcome};
use crate::connection::fields::{self, FieldSpec};
use crate::connection::secrets::CredentialSet;
use crate::connection::types::{ConnectionKind, RegistryFlavor, ServiceCheck};
use crate::error::Error;

/// ソースコード管理側リモート境界
///
/// 失敗には二種類ある: 認証拒否・アクセス不可は `ok=false` の
/// 正常応答、ネットワーク等の予期せぬ障害は `Err`。
#[async_trait]
pub trait SourceControlAuthority: Send + Sync {
    /// トークンで認証できるか
    async fn authenticate(&self, token: &SecretString) -> Result<ProbeOutcome, Error>;

    /// 指定リポジトリへ到達できるか
    async fn repository_access(
        &self,
        owner: &str,
        repository: &str,
        token: &SecretString,
    ) -> Result<ProbeOutcome, Error>;
}

/// サービス名（チェック順と一致）
pub const CHECK_AUTHENTICATION: &str = "authentication";
pub const CHECK_REPOSITORY_ACCESS: &str = "repository-access";

pub struct SourceControlAdapter {
    authority: Arc<dyn SourceControlAuthority>,
}

impl SourceControlAdapter {
    pub fn new(authority: Arc<dyn SourceControlAuthority>) -> Self {
        Self { authority }
    }
}

#[async_trait]
impl ConnectionAdapter for SourceControlAdapter {
    fn kind(&self) -> ConnectionKind {
        ConnectionKind::SourceControl
    }

    fn required_fields(&self, flavor: Option<RegistryFlavor>) -> Vec<FieldSpec> {
        fields::required_fields(ConnectionKind::SourceControl, flavor)
    }

    async fn validate(&self, credentials: &CredentialSet) -> Result<Vec<ServiceCheck>, Error> {
        let token = credentials
            .secret("access_token")
            .ok_or_else(|| Error::InvalidInput("access_token is missing".to_string()))?;
        let owner = credentials
            .field("owner")
            .ok_or_else(|| Error::InvalidInput("owner is missing".to_string()))?;
        let repository = credentials
            .field("repository")
            .ok_or_else(|| Error::InvalidInput("repository is missing".to_string()))?;

        let (outcome, latency) = timed_probe(|| self.authority.authenticate(token)).await;
        let auth_check = check_from_probe(CHECK_AUTHENTICATION, outcome, latency)?;

        // 認証に失敗したら後続チェックは実行しない
        if auth_check.status != crate::connection::types::ServiceStatus::Success {
            return Ok(vec![
                auth_check,
                ServiceCheck::skipped(CHECK_REPOSITORY_ACCESS),
            ]);
        }

        let (outcome, latency) = timed_probe(|| {
            self.authority
                .repository_access(owner, repository, token)
        })
        .await;
        let access_check = check_from_probe(CHECK_REPOSITORY_ACCESS, outcome, latency)?;

        Ok(vec![auth_check, access_check])
    }
}
