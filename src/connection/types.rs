use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// 接続種別
///
/// プラットフォームが統合する外部システムの固定列挙。
/// 作成後の変更は不可。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionKind {
    /// ソースコード管理（リポジトリアクセス）
    SourceControl,
    /// 実行クラスター
    Cluster,
    /// コンテナレジストリ
    ContainerRegistry,
    /// シークレット保管庫
    SecretsVault,
    /// テレメトリコレクター（助言扱い）
    TelemetryCollector,
}

impl ConnectionKind {
    /// 全種別（列挙順は固定）
    pub fn all() -> [ConnectionKind; 5] {
        [
            ConnectionKind::SourceControl,
            ConnectionKind::Cluster,
            ConnectionKind::ContainerRegistry,
            ConnectionKind::SecretsVault,
            ConnectionKind::TelemetryCollector,
        ]
    }

    /// ワイヤー表現（kebab-case）
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionKind::SourceControl => "source-control",
            ConnectionKind::Cluster => "cluster",
            ConnectionKind::ContainerRegistry => "container-registry",
            ConnectionKind::SecretsVault => "secrets-vault",
            ConnectionKind::TelemetryCollector => "telemetry-collector",
        }
    }

    /// ウィザードがプリフィルする既定の接続名
    pub fn default_name(&self) -> &'static str {
        match self {
            ConnectionKind::SourceControl => "Source Control Connection",
            ConnectionKind::Cluster => "Cluster Connection",
            ConnectionKind::ContainerRegistry => "Container Registry Connection",
            ConnectionKind::SecretsVault => "Secrets Vault Connection",
            ConnectionKind::TelemetryCollector => "Telemetry Collector Connection",
        }
    }

    /// 助言種別か（失敗してもゲートを閉じない）
    pub fn is_advisory(&self) -> bool {
        matches!(self, ConnectionKind::TelemetryCollector)
    }

    /// ヘルスチェックの既定間隔
    ///
    /// 認証系は短く、助言系は長く。設定で上書き可能。
    pub fn default_check_interval(&self) -> Duration {
        match self {
            ConnectionKind::SourceControl => Duration::from_secs(60),
            ConnectionKind::SecretsVault => Duration::from_secs(60),
            ConnectionKind::Cluster => Duration::from_secs(120),
            ConnectionKind::ContainerRegistry => Duration::from_secs(120),
            ConnectionKind::TelemetryCollector => Duration::from_secs(300),
        }
    }
}

impl std::fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// コンテナレジストリの認証方式（サブ種別）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RegistryFlavor {
    /// ユーザー名・パスワード方式
    #[default]
    Basic,
    /// アクセスキー方式
    AccessKey,
    /// サービスプリンシパル方式
    ServicePrincipal,
}

impl RegistryFlavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryFlavor::Basic => "basic",
            RegistryFlavor::AccessKey => "access-key",
            RegistryFlavor::ServicePrincipal => "service-principal",
        }
    }

    /// 設定マップの `auth_method` キーから方式を導出
    ///
    /// 未指定・未知の値は Basic 扱い。
    pub fn from_config(config: &HashMap<String, String>) -> Self {
        match config.get("auth_method").map(String::as_str) {
            Some("access-key") => RegistryFlavor::AccessKey,
            Some("service-principal") => RegistryFlavor::ServicePrincipal,
            _ => RegistryFlavor::Basic,
        }
    }
}

/// 接続の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionStatus {
    /// 未検証（作成直後・ブロック解除後）
    Pending,
    /// 検証実行中
    Validating,
    /// 検証成功
    Connected,
    /// 検証失敗
    Failed,
    /// ガバナンスによる強制ブロック（検証結果とは独立）
    Blocked,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Validating => "validating",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Failed => "failed",
            ConnectionStatus::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 構成済み外部統合
///
/// ウィザードの確認ステップでのみ作成され、以後は
/// ヘルスモニターとガバナンス操作だけが状態を更新する。
/// `config` に長期シークレットは保持しない。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// 一意識別子
    pub id: Uuid,
    /// 表示名
    pub name: String,
    /// 接続種別（作成後不変）
    pub kind: ConnectionKind,
    /// 種別固有の設定（非シークレットのみ）
    pub config: HashMap<String, String>,
    /// 現在の状態
    pub status: ConnectionStatus,
    /// 直近の検証結果メッセージ
    pub last_message: Option<String>,
    /// 直近のチェック時刻
    pub last_checked_at: Option<DateTime<Utc>>,
    /// 直近のエラー詳細
    pub last_error: Option<String>,
    /// 連続失敗回数（ヘルスモニターが維持、ガバナンス昇格が参照）
    pub consecutive_failures: u32,
    /// 作成時刻
    pub created_at: DateTime<Utc>,
    /// 更新時刻
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    /// 検証済み設定から新しい接続を構築
    pub fn new(name: String, kind: ConnectionKind, config: HashMap<String, String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            kind,
            config,
            status: ConnectionStatus::Pending,
            last_message: None,
            last_checked_at: None,
            last_error: None,
            consecutive_failures: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 個別チェックの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceStatus {
    /// 成功
    Success,
    /// 失敗
    Failed,
    /// 未実行（前提チェックの失敗により到達せず）
    Pending,
}

/// サービス単位の検証エントリ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCheck {
    /// サービス名（例: "authentication", "repository-access"）
    pub service: String,
    /// チェック結果
    pub status: ServiceStatus,
    /// 人間可読メッセージ
    pub message: String,
    /// 所要時間（ミリ秒）
    pub latency_ms: Option<u64>,
    /// 助言チェックか（全体の成否に影響しない）
    pub advisory: bool,
}

impl ServiceCheck {
    pub fn success(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            status: ServiceStatus::Success,
            message: message.into(),
            latency_ms: None,
            advisory: false,
        }
    }

    pub fn failed(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            status: ServiceStatus::Failed,
            message: message.into(),
            latency_ms: None,
            advisory: false,
        }
    }

    /// 前提チェック失敗により実行されなかったエントリ
    pub fn skipped(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            status: ServiceStatus::Pending,
            message: "Not attempted: prerequisite check failed".to_string(),
            latency_ms: None,
            advisory: false,
        }
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    /// 助言チェックとして明示
    pub fn advisory(mut self) -> Self {
        self.advisory = true;
        self
    }
}

/// 一回の検証試行の結果
///
/// `success` は助言以外の全エントリが成功した場合に限り真。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// 全体の成否
    pub success: bool,
    /// 全体メッセージ
    pub message: String,
    /// サービス単位の詳細（順序保持、常に1件以上）
    pub services: Vec<ServiceCheck>,
}

impl ValidationResult {
    /// サービスエントリ群から全体結果を集計
    pub fn from_services(services: Vec<ServiceCheck>) -> Self {
        let required: Vec<&ServiceCheck> = services.iter().filter(|s| !s.advisory).collect();
        let success =
            !required.is_empty() && required.iter().all(|s| s.status == ServiceStatus::Success);
        let message = if success {
            format!("All {} checks passed", required.len())
        } else {
            let failed: Vec<&str> = services
                .iter()
                .filter(|s| !s.advisory && s.status != ServiceStatus::Success)
                .map(|s| s.service.as_str())
                .collect();
            format!(
                "{} of {} checks failed: {}",
                failed.len(),
                required.len(),
                failed.join(", ")
            )
        };
        Self {
            success,
            message,
            services,
        }
    }

    /// 合成単一エントリの失敗結果
    ///
    /// アダプター障害やタイムアウトを UI 契約（常に詳細1行以上）へ正規化する。
    pub fn failure(service: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            message: message.clone(),
            services: vec![ServiceCheck::failed(service, message)],
        }
    }
}

/// 接続一件のヘルスサンプル
///
/// 書き込み後は不変。ライブ配信と再接続時の読み戻しに使う。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthEvent {
    /// イベント識別子
    pub id: Uuid,
    /// 対象接続
    pub connection_id: Uuid,
    /// サンプリング時点の状態
    pub status: ConnectionStatus,
    /// 結果メッセージ
    pub message: String,
    /// 記録時刻
    pub timestamp: DateTime<Utc>,
    /// チェック所要時間（ミリ秒）
    pub latency_ms: Option<u64>,
}

impl HealthEvent {
    pub fn new(
        connection_id: Uuid,
        status: ConnectionStatus,
        message: impl Into<String>,
        latency_ms: Option<u64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            connection_id,
            status,
            message: message.into(),
            timestamp: Utc::now(),
            latency_ms,
        }
    }
}

/// フォームフィールド単位の入力エラー
///
/// 対話中のみ存在し、永続化されない。対象フィールドの編集で消える。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// フィールド名
    pub field: String,
    /// 表示メッセージ
    pub message: String,
}

impl FieldError {
    pub fn required(field: impl Into<String>, label: &str) -> Self {
        Self {
            field: field.into(),
            message: format!("{} is required", label),
        }
    }
}
