//! Wizard creation flow integration tests

use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use conngate_rs::adapters::{
    AdapterRegistry, ProbeOutcome, SourceControlAdapter, SourceControlAuthority,
};
use conngate_rs::audit::MemoryAuditSink;
use conngate_rs::connection::store::{ConnectionFilter, ConnectionStore, MemoryConnectionStore};
use conngate_rs::connection::types::{ConnectionKind, ConnectionStatus, ServiceStatus};
use conngate_rs::error::Error;
use conngate_rs::validation::ValidationOrchestrator;
use conngate_rs::wizard::{ValidateOutcome, WizardSession, WizardStep};

/// 台本どおりに応答するソースコード管理オーソリティ
struct ScriptedAuthority {
    auth_ok: AtomicBool,
    access_ok: AtomicBool,
}

impl ScriptedAuthority {
    fn new(auth_ok: bool, access_ok: bool) -> Arc<Self> {
        Arc::new(Self {
            auth_ok: AtomicBool::new(auth_ok),
            access_ok: AtomicBool::new(access_ok),
        })
    }
}

#[async_trait]
impl SourceControlAuthority for ScriptedAuthority {
    async fn authenticate(&self, _token: &SecretString) -> Result<ProbeOutcome, Error> {
        Ok(if self.auth_ok.load(Ordering::SeqCst) {
            ProbeOutcome::ok("Token accepted")
        } else {
            ProbeOutcome::rejected("Bad credentials")
        })
    }

    async fn repository_access(
        &self,
        owner: &str,
        repository: &str,
        _token: &SecretString,
    ) -> Result<ProbeOutcome, Error> {
        Ok(if self.access_ok.load(Ordering::SeqCst) {
            ProbeOutcome::ok(format!("Repository {}/{} reachable", owner, repository))
        } else {
            ProbeOutcome::rejected(format!("Repository {}/{} not found", owner, repository))
        })
    }
}

fn wizard_with(
    authority: Arc<ScriptedAuthority>,
) -> (WizardSession, Arc<MemoryConnectionStore>, Arc<MemoryAuditSink>) {
    let mut registry = AdapterRegistry::new();
    registry
        .register(Arc::new(SourceControlAdapter::new(authority)))
        .unwrap();
    let orchestrator = Arc::new(ValidationOrchestrator::new(
        Arc::new(registry),
        Duration::from_secs(5),
    ));
    let store = Arc::new(MemoryConnectionStore::new());
    let audit = Arc::new(MemoryAuditSink::new());
    let session = WizardSession::new(orchestrator, store.clone(), audit.clone());
    (session, store, audit)
}

fn fill_source_control(session: &mut WizardSession) {
    session.select_kind(ConnectionKind::SourceControl).unwrap();
    session.set_field("owner", "acme").unwrap();
    session.set_field("repository", "widgets").unwrap();
    session.set_field("access_token", "t1").unwrap();
}

#[tokio::test]
async fn test_partial_failure_keeps_wizard_at_configure_with_two_rows() {
    // 認証成功・リポジトリアクセス失敗
    let (mut session, store, _) = wizard_with(ScriptedAuthority::new(true, false));
    fill_source_control(&mut session);

    let outcome = session.validate().await.unwrap();
    let result = match outcome {
        ValidateOutcome::Failed(result) => result,
        other => panic!("expected Failed, got {:?}", other),
    };

    assert!(!result.success);
    assert_eq!(result.services.len(), 2);
    assert_eq!(result.services[0].status, ServiceStatus::Success);
    assert_eq!(result.services[1].status, ServiceStatus::Failed);

    // ウィザードは Configure に留まり、ストアには何も書かれない
    assert_eq!(session.step(), WizardStep::Configure);
    assert_eq!(session.value("owner"), Some("acme"));
    let listed = store.list(&ConnectionFilter::default()).await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_success_flow_creates_one_connected_connection() {
    let (mut session, store, audit) = wizard_with(ScriptedAuthority::new(true, true));
    fill_source_control(&mut session);

    let outcome = session.validate().await.unwrap();
    assert!(outcome.passed());
    assert_eq!(session.step(), WizardStep::Confirmed);

    let created = session.confirm().await.unwrap();
    assert_eq!(created.status, ConnectionStatus::Connected);
    assert_eq!(created.kind, ConnectionKind::SourceControl);

    let listed = store.list(&ConnectionFilter::default()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);

    // 監査記録が送出される（非同期なので明け渡してから確認）
    tokio::task::yield_now().await;
    let entries = audit.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "connection.created");
}

#[tokio::test]
async fn test_retry_after_remote_recovery_succeeds() {
    let authority = ScriptedAuthority::new(true, false);
    let (mut session, store, _) = wizard_with(authority.clone());
    fill_source_control(&mut session);

    let first = session.validate().await.unwrap();
    assert!(!first.passed());
    assert_eq!(session.step(), WizardStep::Configure);

    // リモート側が回復したら、同じ入力で再試行できる
    authority.access_ok.store(true, Ordering::SeqCst);
    let second = session.validate().await.unwrap();
    assert!(second.passed());

    session.confirm().await.unwrap();
    let listed = store.list(&ConnectionFilter::default()).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_blank_fields_block_transition_with_exact_error_set() {
    let (mut session, _, _) = wizard_with(ScriptedAuthority::new(true, true));
    session.select_kind(ConnectionKind::SourceControl).unwrap();
    session.set_field("repository", "widgets").unwrap();

    let outcome = session.validate().await.unwrap();
    match outcome {
        ValidateOutcome::Incomplete(errors) => {
            let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
            assert_eq!(fields, vec!["owner", "access_token"]);
        }
        other => panic!("expected Incomplete, got {:?}", other),
    }
    assert_eq!(session.step(), WizardStep::Configure);
}

#[tokio::test]
async fn test_cancel_at_any_state_never_creates() {
    let (mut session, store, _) = wizard_with(ScriptedAuthority::new(true, true));

    // SelectType からのキャンセル
    session.cancel();

    // Configure からのキャンセル
    fill_source_control(&mut session);
    session.cancel();

    // Confirmed からのキャンセル（confirm せず離脱）
    fill_source_control(&mut session);
    session.validate().await.unwrap();
    assert_eq!(session.step(), WizardStep::Confirmed);
    session.cancel();

    let listed = store.list(&ConnectionFilter::default()).await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_adapter_fault_is_normalized_to_single_detail_row() {
    struct FaultingAuthority;

    #[async_trait]
    impl SourceControlAuthority for FaultingAuthority {
        async fn authenticate(&self, _token: &SecretString) -> Result<ProbeOutcome, Error> {
            Err(Error::AdapterFault("socket closed unexpectedly".to_string()))
        }

        async fn repository_access(
            &self,
            _owner: &str,
            _repository: &str,
            _token: &SecretString,
        ) -> Result<ProbeOutcome, Error> {
            unreachable!()
        }
    }

    let mut registry = AdapterRegistry::new();
    registry
        .register(Arc::new(SourceControlAdapter::new(Arc::new(
            FaultingAuthority,
        ))))
        .unwrap();
    let orchestrator = Arc::new(ValidationOrchestrator::new(
        Arc::new(registry),
        Duration::from_secs(5),
    ));
    let store = Arc::new(MemoryConnectionStore::new());
    let mut session = WizardSession::new(
        orchestrator,
        store.clone(),
        Arc::new(MemoryAuditSink::new()),
    );
    fill_source_control(&mut session);

    let outcome = session.validate().await.unwrap();
    match outcome {
        ValidateOutcome::Failed(result) => {
            // UI 契約: 少なくとも詳細1行、生のエラー文言は出さない
            assert_eq!(result.services.len(), 1);
            assert!(!result.message.contains("socket closed"));
        }
        other => panic!("expected Failed, got {:?}", other),
    }
    assert_eq!(session.step(), WizardStep::Configure);
}
