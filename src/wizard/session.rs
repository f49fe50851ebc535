//! 接続作成ウィザード
//!
//! ダイアログ一回分の一時状態を持つフォームセッション。永続レコードは
//! Confirmed からの `confirm` でのみ作成され、途中離脱は何も残さない。

use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::audit::{self, AuditEntry, AuditSink};
use crate::connection::fields::{self, FieldSpec};
use crate::connection::secrets::CredentialSet;
use crate::connection::store::ConnectionStore;
use crate::connection::types::{
    Connection, ConnectionKind, ConnectionStatus, FieldError, RegistryFlavor, ValidationResult,
};
use crate::error::Error;
use crate::validation::ValidationOrchestrator;
use crate::wizard::types::{ValidateOutcome, WizardStep};

/// 一時フォームセッション
///
/// セッションは呼び出し側から見て単一スレッド協調動作。検証は同時
/// 一件までで、`Validating` 中の再入はガードが拒否する。
pub struct WizardSession {
    orchestrator: Arc<ValidationOrchestrator>,
    store: Arc<dyn ConnectionStore>,
    audit: Arc<dyn AuditSink>,
    step: WizardStep,
    kind: ConnectionKind,
    values: HashMap<String, String>,
    field_errors: Vec<FieldError>,
    last_result: Option<ValidationResult>,
}

impl WizardSession {
    pub fn new(
        orchestrator: Arc<ValidationOrchestrator>,
        store: Arc<dyn ConnectionStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            orchestrator,
            store,
            audit,
            step: WizardStep::SelectType,
            kind: ConnectionKind::SourceControl,
            values: HashMap::new(),
            field_errors: Vec::new(),
            last_result: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    pub fn value(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    /// 直近の検証結果（確認ビューと失敗カードの双方が参照）
    pub fn last_result(&self) -> Option<&ValidationResult> {
        self.last_result.as_ref()
    }

    fn flavor(&self) -> RegistryFlavor {
        RegistryFlavor::from_config(&self.values)
    }

    /// 現在の種別・サブ種別で必要なフィールド一覧
    pub fn required_fields(&self) -> Vec<FieldSpec> {
        fields::required_fields(self.kind, Some(self.flavor()))
    }

    /// 種別選択 → Configure（無条件遷移、既定名をプリフィル）
    pub fn select_kind(&mut self, kind: ConnectionKind) -> Result<(), Error> {
        if self.step == WizardStep::Validating {
            return Err(Error::WizardTransition(
                "cannot change type while validating".to_string(),
            ));
        }
        self.kind = kind;
        self.values.clear();
        self.values
            .insert("name".to_string(), kind.default_name().to_string());
        self.field_errors.clear();
        self.last_result = None;
        self.step = WizardStep::Configure;
        debug!("Wizard configuring kind {}", kind);
        Ok(())
    }

    /// フィールド入力
    ///
    /// 値の変更時は必ず当該フィールドのエラーだけを楽観的に消す。
    /// 妥当性は次の blur かガード遷移で再主張される。
    pub fn set_field(&mut self, field: &str, value: impl Into<String>) -> Result<(), Error> {
        if self.step != WizardStep::Configure {
            return Err(Error::WizardTransition(format!(
                "cannot edit fields in step {}",
                self.step
            )));
        }
        self.values.insert(field.to_string(), value.into());
        self.field_errors.retain(|e| e.field != field);
        Ok(())
    }

    /// フィールド離脱（blur）時の単一フィールド再チェック
    ///
    /// 当該フィールドのエラーだけを追加・削除し、他には触れない。
    pub fn blur_field(&mut self, field: &str) {
        let Some(spec) = fields::field_spec(self.kind, Some(self.flavor()), field) else {
            return;
        };
        let blank = self
            .values
            .get(field)
            .map(|v| v.trim().is_empty())
            .unwrap_or(true);
        self.field_errors.retain(|e| e.field != field);
        if blank {
            self.field_errors
                .push(FieldError::required(spec.name, spec.label));
        }
    }

    /// ガード付き検証遷移
    ///
    /// ガードは毎回再実行される。必須フィールドが一つでも空白なら
    /// そのフィールド全件のエラー集合を返して遷移しない。
    pub async fn validate(&mut self) -> Result<ValidateOutcome, Error> {
        match self.step {
            WizardStep::Validating => {
                return Err(Error::WizardTransition(
                    "a validation is already in flight".to_string(),
                ));
            }
            WizardStep::Configure => {}
            other => {
                return Err(Error::WizardTransition(format!(
                    "cannot validate from step {}",
                    other
                )));
            }
        }

        let missing = fields::missing_fields(self.kind, Some(self.flavor()), &self.values);
        if !missing.is_empty() {
            self.field_errors = missing.clone();
            return Ok(ValidateOutcome::Incomplete(missing));
        }

        self.step = WizardStep::Validating;
        let credentials = CredentialSet::from_form_values(self.kind, &self.values);
        let result = self.orchestrator.validate(&credentials).await;
        self.last_result = Some(result.clone());

        if result.success {
            info!("✅ Wizard validation passed for {}", self.kind);
            self.step = WizardStep::Confirmed;
            Ok(ValidateOutcome::Passed(result))
        } else {
            // 入力値とエラー詳細を保持したまま Configure へ戻す
            debug!("Wizard validation failed for {}: {}", self.kind, result.message);
            self.step = WizardStep::Configure;
            Ok(ValidateOutcome::Failed(result))
        }
    }

    /// 終端アクション: 接続の永続化
    ///
    /// 永続レコードを作るのはここだけ。シークレットフィールドは設定
    /// マップから取り除かれる。監査記録は非同期送出で、完了を待たない。
    pub async fn confirm(&mut self) -> Result<Connection, Error> {
        if self.step != WizardStep::Confirmed {
            return Err(Error::WizardTransition(format!(
                "cannot create a connection from step {}",
                self.step
            )));
        }
        let result = self
            .last_result
            .as_ref()
            .filter(|r| r.success)
            .ok_or_else(|| {
                Error::WizardTransition("no successful validation on record".to_string())
            })?;

        let specs = self.required_fields();
        let name = self
            .values
            .get("name")
            .cloned()
            .unwrap_or_else(|| self.kind.default_name().to_string());

        // シークレットは永続化しない
        let mut config: HashMap<String, String> = self
            .values
            .iter()
            .filter(|(key, _)| {
                specs
                    .iter()
                    .find(|s| s.name == key.as_str())
                    .map(|s| !s.secret)
                    .unwrap_or(true)
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        config.remove("name");

        let mut connection = Connection::new(name.clone(), self.kind, config);
        connection.status = ConnectionStatus::Connected;
        connection.last_message = Some(result.message.clone());
        connection.last_checked_at = Some(connection.created_at);

        let created = self.store.create(connection).await?;
        info!("🔗 Connection '{}' ({}) created", created.name, created.kind);

        audit::emit(
            self.audit.clone(),
            AuditEntry::new(
                "connection.created",
                "connection",
                json!({ "kind": created.kind, "name": created.name }),
            ),
        );

        Ok(created)
    }

    /// キャンセル（ダイアログ破棄）
    ///
    /// どの段階からでも全一時状態を初期値へ戻す。ストアには一切
    /// 触れない。
    pub fn cancel(&mut self) {
        self.step = WizardStep::SelectType;
        self.kind = ConnectionKind::SourceControl;
        self.values.clear();
        self.field_errors.clear();
        self.last_result = None;
    }
}
