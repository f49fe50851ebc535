//! 検証オーケストレーター
//!
//! 種別に対応するアダプターを一つだけ選び、タイムアウト付きで起動し、
//! あらゆる失敗形態を常に詳細1行以上の [`ValidationResult`] へ正規化する。
//! ネットワークやプロトコルの処理は持たない。

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::adapters::AdapterRegistry;
use crate::connection::fields;
use crate::connection::secrets::CredentialSet;
use crate::connection::types::{RegistryFlavor, ValidationResult};

/// 事前チェック失敗時の合成サービス名
pub const SERVICE_CONFIGURATION: &str = "configuration";
/// アダプター障害・タイムアウト正規化時の合成サービス名
pub const SERVICE_VALIDATION: &str = "validation";

pub struct ValidationOrchestrator {
    registry: Arc<AdapterRegistry>,
    validation_timeout: Duration,
}

impl ValidationOrchestrator {
    pub fn new(registry: Arc<AdapterRegistry>, validation_timeout: Duration) -> Self {
        Self {
            registry,
            validation_timeout,
        }
    }

    /// 一回の検証を実行する
    ///
    /// 失敗しても `Err` は返さない。呼び出し側（ウィザード・モニター）は
    /// `success` フラグだけを見ればよい。同じ入力・同じリモート状態に
    /// 対して繰り返し安全に呼べる。
    pub async fn validate(&self, credentials: &CredentialSet) -> ValidationResult {
        let kind = credentials.kind();

        // 完全性の事前チェック（リゾルバーと同一の定義を使う）
        let flavor = RegistryFlavor::from_config(credentials.fields());
        let missing = fields::missing_fields(kind, Some(flavor), &credentials.completeness_view());
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|e| e.field.as_str()).collect();
            debug!("Validation short-circuit for {}: missing {:?}", kind, names);
            return ValidationResult::failure(
                SERVICE_CONFIGURATION,
                format!("Required fields missing: {}", names.join(", ")),
            );
        }

        let Some(adapter) = self.registry.get(kind) else {
            error!("No adapter registered for kind {}", kind);
            return ValidationResult::failure(
                SERVICE_VALIDATION,
                format!("No validation adapter available for {}", kind),
            );
        };

        match timeout(self.validation_timeout, adapter.validate(credentials)).await {
            Ok(Ok(services)) => ValidationResult::from_services(services),
            Ok(Err(fault)) => {
                // 生のエラーは診断ログへ、利用者には汎用メッセージ
                error!("Adapter fault while validating {}: {}", kind, fault);
                ValidationResult::failure(
                    SERVICE_VALIDATION,
                    "Validation failed due to an internal error",
                )
            }
            Err(_) => {
                warn!(
                    "Validation of {} timed out after {}s",
                    kind,
                    self.validation_timeout.as_secs()
                );
                ValidationResult::failure(
                    SERVICE_VALIDATION,
                    format!(
                        "Validation timed out after {} seconds",
                        self.validation_timeout.as_secs()
                    ),
                )
            }
        }
    }
}
