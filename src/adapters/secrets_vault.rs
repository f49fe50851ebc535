//! シークレット保管庫アダプター
//!
//! 保管庫のヘルス（シール状態を含む）→ トークン有効性の順にチェックする。

use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;

use super::{check_from_probe, timed_probe, ConnectionAdapter, ProbeOutcome};
use crate::connection::fields::{self, FieldSpec};
use crate::connection::secrets::CredentialSet;
use crate::connection::types::{ConnectionKind, RegistryFlavor, ServiceCheck, ServiceStatus};
use crate::error::Error;

/// 保管庫側リモート境界
#[async_trait]
pub trait VaultAuthority: Send + Sync {
    /// 保管庫が稼働中かつ開封済みか（認証不要）
    async fn health(&self, vault_addr: &str) -> Result<ProbeOutcome, Error>;

    /// トークンが有効か
    async fn token_lookup(
        &self,
        vault_addr: &str,
        token: &SecretString,
    ) -> Result<ProbeOutcome, Error>;
}

pub const CHECK_VAULT_HEALTH: &str = "vault-health";
pub const CHECK_TOKEN_VALIDITY: &str = "token-validity";

pub struct SecretsVaultAdapter {
    authority: Arc<dyn VaultAuthority>,
}

impl SecretsVaultAdapter {
    pub fn new(authority: Arc<dyn VaultAuthority>) -> Self {
        Self { authority }
    }
}

#[async_trait]
impl ConnectionAdapter for SecretsVaultAdapter {
    fn kind(&self) -> ConnectionKind {
        ConnectionKind::SecretsVault
    }

    fn required_fields(&self, flavor: Option<RegistryFlavor>) -> Vec<FieldSpec> {
        fields::required_fields(ConnectionKind::SecretsVault, flavor)
    }

    async fn validate(&self, credentials: &CredentialSet) -> Result<Vec<ServiceCheck>, Error> {
        let vault_addr = credentials
            .field("vault_addr")
            .ok_or_else(|| Error::InvalidInput("vault_addr is missing".to_string()))?;
        let token = credentials
            .secret("vault_token")
            .ok_or_else(|| Error::InvalidInput("vault_token is missing".to_string()))?;

        let (outcome, latency) = timed_probe(|| self.authority.health(vault_addr)).await;
        let health_check = check_from_probe(CHECK_VAULT_HEALTH, outcome, latency)?;

        if health_check.status != ServiceStatus::Success {
            return Ok(vec![
                health_check,
                ServiceCheck::skipped(CHECK_TOKEN_VALIDITY),
            ]);
        }

        let (outcome, latency) =
            timed_probe(|| self.authority.token_lookup(vault_addr, token)).await;
        let token_check = check_from_probe(CHECK_TOKEN_VALIDITY, outcome, latency)?;

        Ok(vec![health_check, token_check])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct ScriptedAuthority {
        healthy: bool,
        token_valid: bool,
    }

    #[async_trait]
    impl VaultAuthority for ScriptedAuthority {
        async fn health(&self, _vault_addr: &str) -> Result<ProbeOutcome, Error> {
            Ok(if self.healthy {
                ProbeOutcome::ok("Vault unsealed")
            } else {
                ProbeOutcome::rejected("Vault sealed")
            })
        }

        async fn token_lookup(
            &self,
            _vault_addr: &str,
            _token: &SecretString,
        ) -> Result<ProbeOutcome, Error> {
            Ok(if self.token_valid {
                ProbeOutcome::ok("Token valid")
            } else {
                ProbeOutcome::rejected("Token expired")
            })
        }
    }

    fn credentials() -> CredentialSet {
        let mut values = HashMap::new();
        values.insert("name".to_string(), "vault".to_string());
        values.insert(
            "vault_addr".to_string(),
            "https://vault.example.com".to_string(),
        );
        values.insert("vault_token".to_string(), "s.token".to_string());
        CredentialSet::from_form_values(ConnectionKind::SecretsVault, &values)
    }

    #[tokio::test]
    async fn test_sealed_vault_skips_token_check() {
        let adapter = SecretsVaultAdapter::new(Arc::new(ScriptedAuthority {
            healthy: false,
            token_valid: true,
        }));
        let checks = adapter.validate(&credentials()).await.unwrap();
        assert_eq!(checks[0].status, ServiceStatus::Failed);
        assert_eq!(checks[1].status, ServiceStatus::Pending);
    }

    #[tokio::test]
    async fn test_expired_token_surfaces_health_success() {
        let adapter = SecretsVaultAdapter::new(Arc::new(ScriptedAuthority {
            healthy: true,
            token_valid: false,
        }));
        let checks = adapter.validate(&credentials()).await.unwrap();
        assert_eq!(checks[0].status, ServiceStatus::Success);
        assert_eq!(checks[1].status, ServiceStatus::Failed);
    }
}
