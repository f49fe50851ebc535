//! Append-only audit sink boundary.
//!
//! Audit emission is fire-and-forget: a failing sink is logged and swallowed,
//! never escalated to the operation that triggered the record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::Error;

/// One append-only audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Action identifier, e.g. "connection.created"
    pub action: String,
    /// Resource type the action applied to
    pub resource_type: String,
    /// Structured detail payload (never contains secret material)
    pub details: serde_json::Value,
    /// Record time
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        action: impl Into<String>,
        resource_type: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            action: action.into(),
            resource_type: resource_type.into(),
            details,
            timestamp: Utc::now(),
        }
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync + std::fmt::Debug {
    async fn record(&self, entry: AuditEntry) -> Result<(), Error>;
}

/// Emit an audit record without blocking the caller.
///
/// Sink failures are logged and dropped here; they must not fail the
/// triggering operation.
pub fn emit(sink: Arc<dyn AuditSink>, entry: AuditEntry) {
    tokio::spawn(async move {
        let action = entry.action.clone();
        if let Err(err) = sink.record(entry).await {
            warn!("Audit record '{}' dropped: {}", action, err);
        }
    });
}

/// Sink that writes audit records to the tracing pipeline.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: AuditEntry) -> Result<(), Error> {
        info!(
            target: "audit",
            action = %entry.action,
            resource_type = %entry.resource_type,
            details = %entry.details,
            "audit record"
        );
        Ok(())
    }
}

/// In-memory sink for tests.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, entry: AuditEntry) -> Result<(), Error> {
        self.entries.write().await.push(entry);
        Ok(())
    }
}
