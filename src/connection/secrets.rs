//! Secret handling for validation-time credentials.
//!
//! Secret material never enters the persisted configuration map. The wizard
//! passes it through at validation time; the health monitor resolves it from
//! secure storage via [`SecretResolver`] on every scheduled run.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::connection::fields::{self, FieldSpec};
use crate::connection::types::{Connection, ConnectionKind, RegistryFlavor};
use crate::error::Error;

/// Kind-specific credentials handed to an adapter: the plain configuration
/// fields plus the secret fields, kept separate so secrets are redacted from
/// logs and never persisted.
#[derive(Clone)]
pub struct CredentialSet {
    kind: ConnectionKind,
    fields: HashMap<String, String>,
    secrets: HashMap<String, SecretString>,
}

impl CredentialSet {
    pub fn new(
        kind: ConnectionKind,
        fields: HashMap<String, String>,
        secrets: HashMap<String, SecretString>,
    ) -> Self {
        Self {
            kind,
            fields,
            secrets,
        }
    }

    /// Split a raw wizard value map into plain fields and secrets according
    /// to the field specs of the kind.
    pub fn from_form_values(kind: ConnectionKind, values: &HashMap<String, String>) -> Self {
        let flavor = RegistryFlavor::from_config(values);
        let specs = fields::required_fields(kind, Some(flavor));
        let mut plain = HashMap::new();
        let mut secrets = HashMap::new();
        for (name, value) in values {
            match specs.iter().find(|s| s.name == name.as_str()) {
                Some(FieldSpec { secret: true, .. }) => {
                    secrets.insert(
                        name.clone(),
                        SecretString::new(value.clone().into_boxed_str()),
                    );
                }
                _ => {
                    plain.insert(name.clone(), value.clone());
                }
            }
        }
        Self::new(kind, plain, secrets)
    }

    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }

    pub fn secret(&self, name: &str) -> Option<&SecretString> {
        self.secrets.get(name)
    }

    /// Merged view used by completeness checks: secret values count as
    /// present without being exposed.
    pub fn completeness_view(&self) -> HashMap<String, String> {
        let mut view = self.fields.clone();
        for (name, secret) in &self.secrets {
            let present = !secret.expose_secret().trim().is_empty();
            view.insert(
                name.clone(),
                if present { "set".to_string() } else { String::new() },
            );
        }
        view
    }
}

// Secrets must never leak through Debug output
impl std::fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSet")
            .field("kind", &self.kind)
            .field("fields", &self.fields)
            .field("secrets", &format!("<{} redacted>", self.secrets.len()))
            .finish()
    }
}

/// Resolves a persisted connection's secret fields from secure storage at
/// validation time.
#[async_trait]
pub trait SecretResolver: Send + Sync + std::fmt::Debug {
    async fn resolve(&self, connection: &Connection) -> Result<CredentialSet, Error>;
}

/// In-memory resolver keyed by connection id, used in tests and as the
/// composition default until a vault-backed resolver is wired in.
#[derive(Debug, Default)]
pub struct MemorySecretResolver {
    secrets: Arc<RwLock<HashMap<Uuid, HashMap<String, SecretString>>>>,
}

impl MemorySecretResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, connection_id: Uuid, name: &str, value: &str) {
        let mut secrets = self.secrets.write().await;
        secrets
            .entry(connection_id)
            .or_default()
            .insert(
                name.to_string(),
                SecretString::new(value.to_string().into_boxed_str()),
            );
    }
}

#[async_trait]
impl SecretResolver for MemorySecretResolver {
    async fn resolve(&self, connection: &Connection) -> Result<CredentialSet, Error> {
        let secrets = self.secrets.read().await;
        let stored = secrets.get(&connection.id).cloned().unwrap_or_default();
        Ok(CredentialSet::new(
            connection.kind,
            connection.config.clone(),
            stored,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_values_split_by_secret_flag() {
        let mut values = HashMap::new();
        values.insert("name".to_string(), "repo".to_string());
        values.insert("owner".to_string(), "acme".to_string());
        values.insert("repository".to_string(), "widgets".to_string());
        values.insert("access_token".to_string(), "t1".to_string());

        let credentials =
            CredentialSet::from_form_values(ConnectionKind::SourceControl, &values);
        assert_eq!(credentials.field("owner"), Some("acme"));
        assert!(credentials.field("access_token").is_none());
        assert!(credentials.secret("access_token").is_some());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut values = HashMap::new();
        values.insert("access_token".to_string(), "super-secret".to_string());
        let credentials =
            CredentialSet::from_form_values(ConnectionKind::SourceControl, &values);
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_completeness_view_marks_secrets_present() {
        let mut values = HashMap::new();
        values.insert("access_token".to_string(), "t1".to_string());
        let credentials =
            CredentialSet::from_form_values(ConnectionKind::SourceControl, &values);
        let view = credentials.completeness_view();
        assert_eq!(view.get("access_token").map(String::as_str), Some("set"));
    }

    #[tokio::test]
    async fn test_memory_resolver_round_trip() {
        let resolver = MemorySecretResolver::new();
        let connection = Connection::new(
            "c".to_string(),
            ConnectionKind::SourceControl,
            HashMap::new(),
        );
        resolver.put(connection.id, "access_token", "t1").await;

        let credentials = resolver.resolve(&connection).await.unwrap();
        assert_eq!(
            credentials.secret("access_token").unwrap().expose_secret(),
            "t1"
        );
    }
}
