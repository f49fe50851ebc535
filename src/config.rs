use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::connection::types::ConnectionKind;
use crate::error::Error;
use crate::governance::GovernancePolicy;
use crate::health::monitor::MonitorConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub monitor: MonitorSettings,
    pub validation: ValidationSettings,
    pub governance: GovernanceSettings,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// スケジューラーのスキャン間隔（秒）
    pub tick_seconds: u64,
    /// 接続ごとに保持する直近ヘルスイベント数
    pub history_window: usize,
    /// 種別ごとのチェック間隔の上書き（秒）
    pub intervals: IntervalSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntervalSettings {
    pub source_control_seconds: Option<u64>,
    pub cluster_seconds: Option<u64>,
    pub container_registry_seconds: Option<u64>,
    pub secrets_vault_seconds: Option<u64>,
    pub telemetry_collector_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSettings {
    /// アダプター呼び出し全体のタイムアウト（秒）
    pub timeout_seconds: u64,
    /// HTTP プローブ一回あたりのタイムアウト（秒）
    pub http_request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceSettings {
    /// 助言種別が連続失敗でブロックへ昇格するしきい値（未設定なら昇格なし）
    pub advisory_escalation_threshold: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            monitor: MonitorSettings {
                tick_seconds: 1,
                history_window: crate::health::DEFAULT_WINDOW,
                intervals: IntervalSettings::default(),
            },
            validation: ValidationSettings {
                timeout_seconds: 30,
                http_request_timeout_seconds: 10,
            },
            governance: GovernanceSettings {
                advisory_escalation_threshold: None,
            },
            log_level: Some("info".to_string()),
        }
    }
}

impl Settings {
    /// 設定ファイルから読み込み、環境変数で上書き
    pub fn load() -> Result<Self, Error> {
        let mut settings = config::Config::builder();

        // デフォルト値を設定
        let defaults = Settings::default();
        settings = settings.add_source(
            config::Config::try_from(&defaults).map_err(|e| Error::Config(e.to_string()))?,
        );

        // 設定ファイルを読み込み（複数の場所を試行）
        let config_paths = ["conngate.toml", "config/conngate.toml"];
        for path in &config_paths {
            if std::path::Path::new(path).exists() {
                debug!("Loading settings from {}", path);
                settings = settings.add_source(config::File::with_name(path));
                break;
            }
        }

        // 環境変数で上書き (CONNGATE_ で始まる変数)
        settings = settings.add_source(
            config::Environment::with_prefix("CONNGATE")
                .separator("__")
                .try_parsing(true),
        );

        settings
            .build()
            .map_err(|e| Error::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// ヘルスモニター設定へ変換
    pub fn monitor_config(&self) -> MonitorConfig {
        let mut intervals = HashMap::new();
        let pairs = [
            (
                ConnectionKind::SourceControl,
                self.monitor.intervals.source_control_seconds,
            ),
            (ConnectionKind::Cluster, self.monitor.intervals.cluster_seconds),
            (
                ConnectionKind::ContainerRegistry,
                self.monitor.intervals.container_registry_seconds,
            ),
            (
                ConnectionKind::SecretsVault,
                self.monitor.intervals.secrets_vault_seconds,
            ),
            (
                ConnectionKind::TelemetryCollector,
                self.monitor.intervals.telemetry_collector_seconds,
            ),
        ];
        for (kind, seconds) in pairs {
            if let Some(seconds) = seconds {
                intervals.insert(kind, Duration::from_secs(seconds));
            }
        }
        MonitorConfig {
            tick: Duration::from_secs(self.monitor.tick_seconds.max(1)),
            intervals,
        }
    }

    /// ガバナンスポリシーへ変換
    pub fn governance_policy(&self) -> GovernancePolicy {
        GovernancePolicy {
            advisory_escalation_threshold: self.governance.advisory_escalation_threshold,
            ..Default::default()
        }
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.validation.timeout_seconds)
    }

    pub fn http_request_timeout(&self) -> Duration {
        Duration::from_secs(self.validation.http_request_timeout_seconds)
    }
}
