use serde::{Deserialize, Serialize};

use crate::connection::types::{FieldError, ValidationResult};

/// ウィザードの段階
///
/// 検証失敗時は Configure へ戻り、入力値とエラー詳細を保持した
/// まま再試行できる（暗黙の「エラー付き Configure」副状態）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WizardStep {
    /// 接続種別の選択
    SelectType,
    /// 資格情報の入力
    Configure,
    /// 検証実行中（セッションにつき同時一件まで）
    Validating,
    /// 検証成功、作成待ち
    Confirmed,
}

impl WizardStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            WizardStep::SelectType => "select-type",
            WizardStep::Configure => "configure",
            WizardStep::Validating => "validating",
            WizardStep::Confirmed => "confirmed",
        }
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ガード付き検証遷移の結果
#[derive(Debug, Clone)]
pub enum ValidateOutcome {
    /// 必須フィールド不足。エラー集合を提示して Configure に留まる
    Incomplete(Vec<FieldError>),
    /// 検証成功。Confirmed へ遷移済み
    Passed(ValidationResult),
    /// 検証失敗。詳細を保持して Configure へ戻り済み
    Failed(ValidationResult),
}

impl ValidateOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, ValidateOutcome::Passed(_))
    }
}
