//! HTTP-backed remote authority probes.
//!
//! Default implementations of the per-kind authority traits. These are thin
//! reachability and authorization probes against the configured endpoints;
//! the full remote protocols stay behind the trait boundary and out of this
//! crate's scope.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use url::Url;

use super::container_registry::RegistryCredentials;
use super::{
    ClusterAuthority, ProbeOutcome, RegistryAuthority, SourceControlAuthority,
    TelemetryAuthority, VaultAuthority,
};
use crate::error::Error;

/// Shared probe client for all HTTP authorities.
#[derive(Debug, Clone)]
pub struct HttpAuthority {
    client: Client,
    /// Source control API base (GitHub-compatible)
    source_control_api: Url,
    /// Advisory threshold for the telemetry ingest-latency probe
    ingest_latency_budget: Duration,
}

impl HttpAuthority {
    pub fn new(request_timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            source_control_api: Url::parse("https://api.github.com")
                .map_err(|e| Error::Config(e.to_string()))?,
            ingest_latency_budget: Duration::from_millis(750),
        })
    }

    pub fn with_source_control_api(mut self, base: Url) -> Self {
        self.source_control_api = base;
        self
    }

    fn join(base: &str, path: &str) -> Result<Url, Error> {
        let base = Url::parse(base).map_err(|e| Error::InvalidInput(e.to_string()))?;
        base.join(path)
            .map_err(|e| Error::InvalidInput(e.to_string()))
    }

    fn outcome_from_status(status: StatusCode, subject: &str) -> ProbeOutcome {
        if status.is_success() {
            ProbeOutcome::ok(format!("{} check passed", subject))
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            ProbeOutcome::rejected(format!("{} rejected the credentials ({})", subject, status))
        } else {
            ProbeOutcome::rejected(format!("{} returned {}", subject, status))
        }
    }
}

#[async_trait]
impl SourceControlAuthority for HttpAuthority {
    async fn authenticate(&self, token: &SecretString) -> Result<ProbeOutcome, Error> {
        let url = self
            .source_control_api
            .join("/user")
            .map_err(|e| Error::InvalidInput(e.to_string()))?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token.expose_secret())
            .header("User-Agent", "conngate-rs")
            .send()
            .await?;
        Ok(Self::outcome_from_status(
            response.status(),
            "Source control authentication",
        ))
    }

    async fn repository_access(
        &self,
        owner: &str,
        repository: &str,
        token: &SecretString,
    ) -> Result<ProbeOutcome, Error> {
        let url = self
            .source_control_api
            .join(&format!("/repos/{}/{}", owner, repository))
            .map_err(|e| Error::InvalidInput(e.to_string()))?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token.expose_secret())
            .header("User-Agent", "conngate-rs")
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(ProbeOutcome::rejected(format!(
                "Repository {}/{} not found or not accessible",
                owner, repository
            )));
        }
        Ok(Self::outcome_from_status(
            response.status(),
            "Repository access",
        ))
    }
}

#[async_trait]
impl ClusterAuthority for HttpAuthority {
    async fn reachability(&self, endpoint: &str) -> Result<ProbeOutcome, Error> {
        let url = Self::join(endpoint, "/version")?;
        let response = self.client.get(url).send().await?;
        // An unauthenticated 401/403 still proves the API is reachable
        if response.status().is_success()
            || response.status() == StatusCode::UNAUTHORIZED
            || response.status() == StatusCode::FORBIDDEN
        {
            Ok(ProbeOutcome::ok("Cluster API reachable"))
        } else {
            Ok(ProbeOutcome::rejected(format!(
                "Cluster API returned {}",
                response.status()
            )))
        }
    }

    async fn authorization(
        &self,
        endpoint: &str,
        token: &SecretString,
    ) -> Result<ProbeOutcome, Error> {
        let url = Self::join(endpoint, "/apis")?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;
        Ok(Self::outcome_from_status(
            response.status(),
            "Cluster authorization",
        ))
    }
}

#[async_trait]
impl RegistryAuthority for HttpAuthority {
    async fn authenticate(
        &self,
        registry_url: &str,
        credentials: &RegistryCredentials<'_>,
    ) -> Result<ProbeOutcome, Error> {
        let url = Self::join(registry_url, "/v2/")?;
        let request = self.client.get(url);
        let request = match credentials {
            RegistryCredentials::Basic { username, password } => {
                request.basic_auth(username, Some(password.expose_secret()))
            }
            RegistryCredentials::AccessKey {
                access_key_id,
                secret_access_key,
            } => request.basic_auth(access_key_id, Some(secret_access_key.expose_secret())),
            RegistryCredentials::ServicePrincipal {
                client_id,
                client_secret,
                ..
            } => request.basic_auth(client_id, Some(client_secret.expose_secret())),
        };
        let response = request.send().await?;
        Ok(Self::outcome_from_status(
            response.status(),
            "Registry authentication",
        ))
    }

    async fn catalog_access(
        &self,
        registry_url: &str,
        credentials: &RegistryCredentials<'_>,
    ) -> Result<ProbeOutcome, Error> {
        let url = Self::join(registry_url, "/v2/_catalog?n=1")?;
        let request = self.client.get(url);
        let request = match credentials {
            RegistryCredentials::Basic { username, password } => {
                request.basic_auth(username, Some(password.expose_secret()))
            }
            RegistryCredentials::AccessKey {
                access_key_id,
                secret_access_key,
            } => request.basic_auth(access_key_id, Some(secret_access_key.expose_secret())),
            RegistryCredentials::ServicePrincipal {
                client_id,
                client_secret,
                ..
            } => request.basic_auth(client_id, Some(client_secret.expose_secret())),
        };
        let response = request.send().await?;
        Ok(Self::outcome_from_status(response.status(), "Catalog access"))
    }
}

#[async_trait]
impl VaultAuthority for HttpAuthority {
    async fn health(&self, vault_addr: &str) -> Result<ProbeOutcome, Error> {
        let url = Self::join(vault_addr, "/v1/sys/health")?;
        let response = self.client.get(url).send().await?;
        match response.status().as_u16() {
            200 => Ok(ProbeOutcome::ok("Vault healthy and unsealed")),
            429 => Ok(ProbeOutcome::ok("Vault healthy (standby node)")),
            503 => Ok(ProbeOutcome::rejected("Vault is sealed")),
            other => Ok(ProbeOutcome::rejected(format!(
                "Vault health returned {}",
                other
            ))),
        }
    }

    async fn token_lookup(
        &self,
        vault_addr: &str,
        token: &SecretString,
    ) -> Result<ProbeOutcome, Error> {
        let url = Self::join(vault_addr, "/v1/auth/token/lookup-self")?;
        let response = self
            .client
            .get(url)
            .header("X-Vault-Token", token.expose_secret())
            .send()
            .await?;
        Ok(Self::outcome_from_status(response.status(), "Vault token"))
    }
}

#[async_trait]
impl TelemetryAuthority for HttpAuthority {
    async fn reachability(
        &self,
        endpoint: &str,
        api_key: &SecretString,
    ) -> Result<ProbeOutcome, Error> {
        let url = Url::parse(endpoint).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let response = self
            .client
            .get(url)
            .bearer_auth(api_key.expose_secret())
            .send()
            .await?;
        Ok(Self::outcome_from_status(
            response.status(),
            "Telemetry collector",
        ))
    }

    async fn ingest_latency(&self, endpoint: &str) -> Result<ProbeOutcome, Error> {
        let url = Url::parse(endpoint).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let started = std::time::Instant::now();
        let _ = self.client.get(url).send().await?;
        let elapsed = started.elapsed();
        if elapsed <= self.ingest_latency_budget {
            Ok(ProbeOutcome::ok(format!(
                "Ingest round-trip {}ms",
                elapsed.as_millis()
            )))
        } else {
            Ok(ProbeOutcome::rejected(format!(
                "Ingest round-trip {}ms exceeds {}ms budget",
                elapsed.as_millis(),
                self.ingest_latency_budget.as_millis()
            )))
        }
    }
}
