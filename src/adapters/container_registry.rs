//! コンテナレジストリアダプター
//!
//! 認証方式（basic / access-key / service-principal）ごとに
//! 資格情報の組み立てが異なる。チェック順は認証 → カタログアクセス。

use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;

use super::{check_from_probe, timed_probe, ConnectionAdapter, ProbeOutcome};
use crate::connection::fields::{self, FieldSpec};
use crate::connection::secrets::CredentialSet;
use crate::connection::types::{ConnectionKind, RegistryFlavor, ServiceCheck, ServiceStatus};
use crate::error::Error;

/// レジストリへ渡す方式別資格情報
pub enum RegistryCredentials<'a> {
    Basic {
        username: &'a str,
        password: &'a SecretString,
    },
    AccessKey {
        access_key_id: &'a str,
        secret_access_key: &'a SecretString,
    },
    ServicePrincipal {
        tenant_id: &'a str,
        client_id: &'a str,
        client_secret: &'a SecretString,
    },
}

/// コンテナレジストリ側リモート境界
#[async_trait]
pub trait RegistryAuthority: Send + Sync {
    /// 方式別資格情報で認証できるか
    async fn authenticate(
        &self,
        registry_url: &str,
        credentials: &RegistryCredentials<'_>,
    ) -> Result<ProbeOutcome, Error>;

    /// カタログ（リポジトリ一覧）へアクセスできるか
    async fn catalog_access(
        &self,
        registry_url: &str,
        credentials: &RegistryCredentials<'_>,
    ) -> Result<ProbeOutcome, Error>;
}

pub const CHECK_AUTHENTICATION: &str = "authentication";
pub const CHECK_CATALOG_ACCESS: &str = "catalog-access";

pub struct ContainerRegistryAdapter {
    authority: Arc<dyn RegistryAuthority>,
}

impl ContainerRegistryAdapter {
    pub fn new(authority: Arc<dyn RegistryAuthority>) -> Self {
        Self { authority }
    }

    /// フォーム値から方式別資格情報を組み立てる
    fn build_credentials<'a>(
        credentials: &'a CredentialSet,
        flavor: RegistryFlavor,
    ) -> Result<RegistryCredentials<'a>, Error> {
        let missing = |name: &str| Error::InvalidInput(format!("{} is missing", name));
        match flavor {
            RegistryFlavor::Basic => Ok(RegistryCredentials::Basic {
                username: credentials.field("username").ok_or_else(|| missing("username"))?,
                password: credentials
                    .secret("password")
                    .ok_or_else(|| missing("password"))?,
            }),
            RegistryFlavor::AccessKey => Ok(RegistryCredentials::AccessKey {
                access_key_id: credentials
                    .field("access_key_id")
                    .ok_or_else(|| missing("access_key_id"))?,
                secret_access_key: credentials
                    .secret("secret_access_key")
                    .ok_or_else(|| missing("secret_access_key"))?,
            }),
            RegistryFlavor::ServicePrincipal => Ok(RegistryCredentials::ServicePrincipal {
                tenant_id: credentials
                    .field("tenant_id")
                    .ok_or_else(|| missing("tenant_id"))?,
                client_id: credentials
                    .field("client_id")
                    .ok_or_else(|| missing("client_id"))?,
                client_secret: credentials
                    .secret("client_secret")
                    .ok_or_else(|| missing("client_secret"))?,
            }),
        }
    }
}

#[async_trait]
impl ConnectionAdapter for ContainerRegistryAdapter {
    fn kind(&self) -> ConnectionKind {
        ConnectionKind::ContainerRegistry
    }

    fn required_fields(&self, flavor: Option<RegistryFlavor>) -> Vec<FieldSpec> {
        fields::required_fields(ConnectionKind::ContainerRegistry, flavor)
    }

    async fn validate(&self, credentials: &CredentialSet) -> Result<Vec<ServiceCheck>, Error> {
        let registry_url = credentials
            .field("registry_url")
            .ok_or_else(|| Error::InvalidInput("registry_url is missing".to_string()))?;
        let flavor = RegistryFlavor::from_config(credentials.fields());
        let registry_credentials = Self::build_credentials(credentials, flavor)?;

        let (outcome, latency) = timed_probe(|| {
            self.authority
                .authenticate(registry_url, &registry_credentials)
        })
        .await;
        let auth_check = check_from_probe(CHECK_AUTHENTICATION, outcome, latency)?;

        if auth_check.status != ServiceStatus::Success {
            return Ok(vec![auth_check, ServiceCheck::skipped(CHECK_CATALOG_ACCESS)]);
        }

        let (outcome, latency) = timed_probe(|| {
            self.authority
                .catalog_access(registry_url, &registry_credentials)
        })
        .await;
        let catalog_check = check_from_probe(CHECK_CATALOG_ACCESS, outcome, latency)?;

        Ok(vec![auth_check, catalog_check])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FlavorAwareAuthority;

    #[async_trait]
    impl RegistryAuthority for FlavorAwareAuthority {
        async fn authenticate(
            &self,
            _registry_url: &str,
            credentials: &RegistryCredentials<'_>,
        ) -> Result<ProbeOutcome, Error> {
            // 方式ごとに識別子を埋め込んで検証可能にする
            let label = match credentials {
                RegistryCredentials::Basic { username, .. } => format!("basic:{}", username),
                RegistryCredentials::AccessKey { access_key_id, .. } => {
                    format!("access-key:{}", access_key_id)
                }
                RegistryCredentials::ServicePrincipal { client_id, .. } => {
                    format!("service-principal:{}", client_id)
                }
            };
            Ok(ProbeOutcome::ok(label))
        }

        async fn catalog_access(
            &self,
            _registry_url: &str,
            _credentials: &RegistryCredentials<'_>,
        ) -> Result<ProbeOutcome, Error> {
            Ok(ProbeOutcome::ok("Catalog listing allowed"))
        }
    }

    fn access_key_credentials() -> CredentialSet {
        let mut values = HashMap::new();
        values.insert("name".to_string(), "ecr".to_string());
        values.insert(
            "registry_url".to_string(),
            "https://registry.example.com".to_string(),
        );
        values.insert("auth_method".to_string(), "access-key".to_string());
        values.insert("access_key_id".to_string(), "AKIA123".to_string());
        values.insert("secret_access_key".to_string(), "shh".to_string());
        CredentialSet::from_form_values(ConnectionKind::ContainerRegistry, &values)
    }

    #[tokio::test]
    async fn test_flavor_selects_credential_shape() {
        let adapter = ContainerRegistryAdapter::new(Arc::new(FlavorAwareAuthority));
        let checks = adapter.validate(&access_key_credentials()).await.unwrap();
        assert_eq!(checks[0].message, "access-key:AKIA123");
        assert!(checks.iter().all(|c| c.status == ServiceStatus::Success));
    }

    #[tokio::test]
    async fn test_missing_flavor_field_is_a_fault() {
        let mut values = HashMap::new();
        values.insert("registry_url".to_string(), "https://r".to_string());
        values.insert("auth_method".to_string(), "service-principal".to_string());
        let credentials =
            CredentialSet::from_form_values(ConnectionKind::ContainerRegistry, &values);

        let adapter = ContainerRegistryAdapter::new(Arc::new(FlavorAwareAuthority));
        let err = adapter.validate(&credentials).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
