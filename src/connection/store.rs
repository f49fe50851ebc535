use crate::connection::types::{Connection, ConnectionKind, ConnectionStatus};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// Change notification emitted by the store on every mutation
#[derive(Debug, Clone)]
pub enum StoreEvent {
    Created(Connection),
    Updated(Connection),
    Deleted(Uuid),
}

/// Partial update applied through [`ConnectionStore::update`].
///
/// `kind` is deliberately absent: a connection's kind is immutable
/// after creation.
#[derive(Debug, Clone, Default)]
pub struct ConnectionPatch {
    pub name: Option<String>,
    pub status: Option<ConnectionStatus>,
    pub last_message: Option<String>,
    pub last_checked_at: Option<DateTime<Utc>>,
    /// `Some(None)` clears the stored error detail
    pub last_error: Option<Option<String>>,
    pub consecutive_failures: Option<u32>,
}

impl ConnectionPatch {
    /// Patch produced by one health check outcome
    pub fn health_outcome(
        status: ConnectionStatus,
        message: String,
        error: Option<String>,
        consecutive_failures: u32,
    ) -> Self {
        Self {
            name: None,
            status: Some(status),
            last_message: Some(message),
            last_checked_at: Some(Utc::now()),
            last_error: Some(error),
            consecutive_failures: Some(consecutive_failures),
        }
    }

    /// Patch setting only the status field
    pub fn status(status: ConnectionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Filter for [`ConnectionStore::list`]
#[derive(Debug, Clone, Default)]
pub struct ConnectionFilter {
    pub kind: Option<ConnectionKind>,
    pub status: Option<ConnectionStatus>,
}

#[async_trait]
pub trait ConnectionStore: Send + Sync + std::fmt::Debug {
    async fn create(&self, connection: Connection) -> Result<Connection, StoreError>;
    async fn get(&self, id: &Uuid) -> Result<Option<Connection>, StoreError>;
    async fn update(&self, id: &Uuid, patch: ConnectionPatch) -> Result<Connection, StoreError>;
    async fn delete(&self, id: &Uuid) -> Result<bool, StoreError>;
    async fn list(&self, filter: &ConnectionFilter) -> Result<Vec<Connection>, StoreError>;
    /// Subscribe to change notifications
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}

#[derive(Debug)]
pub struct MemoryConnectionStore {
    connections: Arc<RwLock<HashMap<Uuid, Connection>>>,
    events: broadcast::Sender<StoreEvent>,
}

impl MemoryConnectionStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            events,
        }
    }

    fn notify(&self, event: StoreEvent) {
        // No receivers is fine; notifications are best-effort
        let _ = self.events.send(event);
    }
}

impl Default for MemoryConnectionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionStore for MemoryConnectionStore {
    async fn create(&self, connection: Connection) -> Result<Connection, StoreError> {
        let mut connections = self.connections.write().await;
        if connections.contains_key(&connection.id) {
            return Err(StoreError::Conflict(format!(
                "connection {} already exists",
                connection.id
            )));
        }
        connections.insert(connection.id, connection.clone());
        drop(connections);
        self.notify(StoreEvent::Created(connection.clone()));
        Ok(connection)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Connection>, StoreError> {
        let connections = self.connections.read().await;
        Ok(connections.get(id).cloned())
    }

    async fn update(&self, id: &Uuid, patch: ConnectionPatch) -> Result<Connection, StoreError> {
        let mut connections = self.connections.write().await;
        let connection = connections.get_mut(id).ok_or(StoreError::NotFound(*id))?;

        if let Some(name) = patch.name {
            connection.name = name;
        }
        if let Some(status) = patch.status {
            connection.status = status;
        }
        if let Some(message) = patch.last_message {
            connection.last_message = Some(message);
        }
        if let Some(checked_at) = patch.last_checked_at {
            connection.last_checked_at = Some(checked_at);
        }
        if let Some(error) = patch.last_error {
            connection.last_error = error;
        }
        if let Some(failures) = patch.consecutive_failures {
            connection.consecutive_failures = failures;
        }
        connection.updated_at = Utc::now();

        let updated = connection.clone();
        drop(connections);
        self.notify(StoreEvent::Updated(updated.clone()));
        Ok(updated)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, StoreError> {
        let mut connections = self.connections.write().await;
        let removed = connections.remove(id).is_some();
        drop(connections);
        if removed {
            self.notify(StoreEvent::Deleted(*id));
        }
        Ok(removed)
    }

    async fn list(&self, filter: &ConnectionFilter) -> Result<Vec<Connection>, StoreError> {
        let connections = self.connections.read().await;
        let mut result: Vec<Connection> = connections.values().cloned().collect();

        // 種別でフィルター
        if let Some(kind) = filter.kind {
            result.retain(|c| c.kind == kind);
        }

        // 状態でフィルター
        if let Some(status) = filter.status {
            result.retain(|c| c.status == status);
        }

        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(result)
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}
