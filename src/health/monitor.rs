//! ヘルスモニター
//!
//! 永続化された全接続を種別固有の間隔で再検証し、結果をヘルスイベント
//! として配信する。失敗しても自動リトライはせず、次の機会は次回の
//! スケジュールか手動再チェックのみ。接続一件につき同時チェック一件。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::connection::secrets::SecretResolver;
use crate::connection::store::{ConnectionFilter, ConnectionPatch, ConnectionStore};
use crate::connection::types::{Connection, ConnectionKind, ConnectionStatus, HealthEvent};
use crate::error::Error;
use crate::health::events::HealthEventBus;
use crate::validation::ValidationOrchestrator;

/// モニター設定
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// スケジューラーのスキャン間隔
    pub tick: Duration,
    /// 種別ごとのチェック間隔（未指定は種別の既定値）
    pub intervals: HashMap<ConnectionKind, Duration>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            intervals: HashMap::new(),
        }
    }
}

impl MonitorConfig {
    /// 種別のチェック間隔を解決
    pub fn interval_for(&self, kind: ConnectionKind) -> Duration {
        self.intervals
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_check_interval())
    }
}

pub struct HealthMonitor {
    store: Arc<dyn ConnectionStore>,
    orchestrator: Arc<ValidationOrchestrator>,
    secrets: Arc<dyn SecretResolver>,
    bus: Arc<HealthEventBus>,
    config: MonitorConfig,
    /// 実行中チェックの接続 ID 集合（同時一件の保証）
    in_flight: Mutex<HashSet<Uuid>>,
    /// 接続ごとの次回実行時刻
    next_due: Mutex<HashMap<Uuid, Instant>>,
}

impl HealthMonitor {
    pub fn new(
        store: Arc<dyn ConnectionStore>,
        orchestrator: Arc<ValidationOrchestrator>,
        secrets: Arc<dyn SecretResolver>,
        bus: Arc<HealthEventBus>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            store,
            orchestrator,
            secrets,
            bus,
            config,
            in_flight: Mutex::new(HashSet::new()),
            next_due: Mutex::new(HashMap::new()),
        }
    }

    pub fn bus(&self) -> Arc<HealthEventBus> {
        self.bus.clone()
    }

    /// スケジューラーを起動する
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        info!("🩺 Health monitor started (tick {:?})", self.config.tick);
        tokio::spawn(async move {
            let mut ticker = interval(self.config.tick);
            loop {
                ticker.tick().await;
                Self::scan(&self).await;
            }
        })
    }

    /// 一回のスキャン: 期限が来た接続のチェックを起動
    async fn scan(monitor: &Arc<Self>) {
        let connections = match monitor.store.list(&ConnectionFilter::default()).await {
            Ok(connections) => connections,
            Err(err) => {
                error!("Health scan could not list connections: {}", err);
                return;
            }
        };

        let now = Instant::now();
        for connection in connections {
            // ブロック中はガバナンスの上書きが優先。検証しない。
            if connection.status == ConnectionStatus::Blocked {
                continue;
            }

            let due = {
                let mut next_due = monitor.next_due.lock().unwrap();
                match next_due.get(&connection.id) {
                    Some(at) if *at > now => false,
                    _ => {
                        let interval = monitor.config.interval_for(connection.kind);
                        next_due.insert(connection.id, now + interval);
                        true
                    }
                }
            };
            if !due {
                continue;
            }

            if !monitor.try_claim(connection.id) {
                // 前回のチェックがまだ走っている。次回に任せる。
                debug!("Check for {} still in flight, skipping tick", connection.id);
                continue;
            }

            let monitor = monitor.clone();
            tokio::spawn(async move {
                if let Err(err) = monitor.run_claimed_check(&connection).await {
                    warn!("Scheduled check for {} failed: {}", connection.id, err);
                }
            });
        }
    }

    /// 手動再チェック（スケジュール外）
    ///
    /// 次回実行時刻はリセットしない。実行中なら拒否する（キューに
    /// 積まない）。
    pub async fn recheck(&self, id: Uuid) -> Result<HealthEvent, Error> {
        let connection = self
            .store
            .get(&id)
            .await?
            .ok_or(Error::Store(crate::error::StoreError::NotFound(id)))?;
        if connection.status == ConnectionStatus::Blocked {
            return Err(Error::InvalidInput(
                "connection is blocked by governance".to_string(),
            ));
        }
        if !self.try_claim(id) {
            return Err(Error::CheckInFlight(id));
        }
        self.run_claimed_check(&connection).await
    }

    fn try_claim(&self, id: Uuid) -> bool {
        self.in_flight.lock().unwrap().insert(id)
    }

    fn release(&self, id: Uuid) {
        self.in_flight.lock().unwrap().remove(&id);
    }

    /// 取得済みの実行権でチェック一回を行う
    ///
    /// どの経路でも必ず実行権を解放し、状態を validating のまま
    /// 放置しない。
    async fn run_claimed_check(&self, connection: &Connection) -> Result<HealthEvent, Error> {
        let outcome = self.check(connection).await;
        self.release(connection.id);
        outcome
    }

    async fn check(&self, connection: &Connection) -> Result<HealthEvent, Error> {
        debug!(
            "Checking connection '{}' ({})",
            connection.name, connection.kind
        );

        self.store
            .update(
                &connection.id,
                ConnectionPatch::status(ConnectionStatus::Validating),
            )
            .await?;

        let started = Instant::now();
        // シークレットは設定マップではなく安全な保管先から毎回解決する
        let result = match self.secrets.resolve(connection).await {
            Ok(credentials) => self.orchestrator.validate(&credentials).await,
            Err(err) => {
                error!(
                    "Secret resolution failed for connection {}: {}",
                    connection.id, err
                );
                crate::connection::types::ValidationResult::failure(
                    "secret-resolution",
                    "Stored credentials could not be resolved",
                )
            }
        };
        let latency_ms = started.elapsed().as_millis() as u64;

        let status = if result.success {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Failed
        };
        let consecutive_failures = if result.success {
            0
        } else {
            connection.consecutive_failures + 1
        };
        let error_detail = (!result.success).then(|| result.message.clone());

        self.store
            .update(
                &connection.id,
                ConnectionPatch::health_outcome(
                    status,
                    result.message.clone(),
                    error_detail,
                    consecutive_failures,
                ),
            )
            .await?;

        let event = HealthEvent::new(connection.id, status, result.message, Some(latency_ms));
        self.bus.publish(event.clone()).await;

        if !result.success {
            warn!(
                "Connection '{}' ({}) unhealthy: {}",
                connection.name, connection.kind, event.message
            );
        }

        Ok(event)
    }
}
