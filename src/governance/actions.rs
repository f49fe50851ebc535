//! 明示的なガバナンス操作
//!
//! ブロック・解除・削除はここからのみ行われる。ヘルスモニターが
//! これらを行うことはない。全操作が監査記録を送出する。

use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::audit::{self, AuditEntry, AuditSink};
use crate::connection::store::{ConnectionPatch, ConnectionStore};
use crate::connection::types::{Connection, ConnectionStatus};
use crate::error::{Error, StoreError};

pub struct GovernanceActions {
    store: Arc<dyn ConnectionStore>,
    audit: Arc<dyn AuditSink>,
}

impl GovernanceActions {
    pub fn new(store: Arc<dyn ConnectionStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, audit }
    }

    async fn require(&self, id: Uuid) -> Result<Connection, Error> {
        self.store
            .get(&id)
            .await?
            .ok_or(Error::Store(StoreError::NotFound(id)))
    }

    /// 接続を強制ブロックする
    ///
    /// 検証結果とは独立した上書き。解除されるまでモニターは対象を
    /// チェックしない。
    pub async fn block(&self, id: Uuid, reason: impl Into<String>) -> Result<Connection, Error> {
        let connection = self.require(id).await?;
        let reason = reason.into();
        let patch = ConnectionPatch {
            status: Some(ConnectionStatus::Blocked),
            last_error: Some(Some(reason.clone())),
            ..Default::default()
        };
        let updated = self.store.update(&id, patch).await?;
        info!(
            "⛔ Connection '{}' ({}) blocked: {}",
            connection.name, connection.kind, reason
        );
        audit::emit(
            self.audit.clone(),
            AuditEntry::new(
                "connection.blocked",
                "connection",
                json!({ "kind": connection.kind, "name": connection.name, "reason": reason }),
            ),
        );
        Ok(updated)
    }

    /// ブロックを解除する
    ///
    /// 状態は pending へ戻り、次回のスケジュールで再検証される。
    pub async fn unblock(&self, id: Uuid) -> Result<Connection, Error> {
        let connection = self.require(id).await?;
        if connection.status != ConnectionStatus::Blocked {
            return Err(Error::InvalidInput(format!(
                "connection {} is not blocked",
                id
            )));
        }
        let patch = ConnectionPatch {
            status: Some(ConnectionStatus::Pending),
            last_error: Some(None),
            ..Default::default()
        };
        let updated = self.store.update(&id, patch).await?;
        info!(
            "Connection '{}' ({}) unblocked",
            connection.name, connection.kind
        );
        audit::emit(
            self.audit.clone(),
            AuditEntry::new(
                "connection.unblocked",
                "connection",
                json!({ "kind": connection.kind, "name": connection.name }),
            ),
        );
        Ok(updated)
    }

    /// 接続を削除する（明示的なオペレーター操作のみ）
    pub async fn delete(&self, id: Uuid) -> Result<(), Error> {
        let connection = self.require(id).await?;
        if !self.store.delete(&id).await? {
            return Err(Error::Store(StoreError::NotFound(id)));
        }
        info!(
            "🗑️  Connection '{}' ({}) deleted",
            connection.name, connection.kind
        );
        audit::emit(
            self.audit.clone(),
            AuditEntry::new(
                "connection.deleted",
                "connection",
                json!({ "kind": connection.kind, "name": connection.name }),
            ),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::connection::store::MemoryConnectionStore;
    use crate::connection::types::ConnectionKind;
    use std::collections::HashMap;

    fn actions() -> (GovernanceActions, Arc<MemoryConnectionStore>, Arc<MemoryAuditSink>) {
        let store = Arc::new(MemoryConnectionStore::new());
        let audit = Arc::new(MemoryAuditSink::new());
        (
            GovernanceActions::new(store.clone(), audit.clone()),
            store,
            audit,
        )
    }

    async fn seeded(store: &MemoryConnectionStore) -> Uuid {
        let connection = Connection::new(
            "vault".to_string(),
            ConnectionKind::SecretsVault,
            HashMap::new(),
        );
        let id = connection.id;
        store.create(connection).await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_block_sets_status_and_reason() {
        let (actions, store, audit) = actions();
        let id = seeded(&store).await;

        let blocked = actions.block(id, "credential rotation").await.unwrap();
        assert_eq!(blocked.status, ConnectionStatus::Blocked);
        assert_eq!(
            blocked.last_error.as_deref(),
            Some("credential rotation")
        );

        tokio::task::yield_now().await;
        let entries = audit.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "connection.blocked");
    }

    #[tokio::test]
    async fn test_unblock_returns_to_pending() {
        let (actions, store, _) = actions();
        let id = seeded(&store).await;
        actions.block(id, "maintenance").await.unwrap();

        let unblocked = actions.unblock(id).await.unwrap();
        assert_eq!(unblocked.status, ConnectionStatus::Pending);
        assert!(unblocked.last_error.is_none());
    }

    #[tokio::test]
    async fn test_unblock_requires_blocked_status() {
        let (actions, store, _) = actions();
        let id = seeded(&store).await;
        let err = actions.unblock(id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_connection() {
        let (actions, store, _) = actions();
        let id = seeded(&store).await;
        actions.delete(id).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_none());
    }
}
