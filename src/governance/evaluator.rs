//! ガバナンスルール評価器
//!
//! 現在の接続集合だけから操作ゲート判定を再計算する純粋関数。
//! 隠れた累積状態は持たず、同じ入力には常に同じレポートを返す。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::connection::types::{Connection, ConnectionKind, ConnectionStatus};

/// ゲート対象の操作クラス
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationClass {
    /// パイプライン実行の開始
    Executions,
    /// デプロイメント
    Deployments,
    /// 可観測性関連の操作
    Observability,
}

impl OperationClass {
    pub fn all() -> [OperationClass; 3] {
        [
            OperationClass::Executions,
            OperationClass::Deployments,
            OperationClass::Observability,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationClass::Executions => "executions",
            OperationClass::Deployments => "deployments",
            OperationClass::Observability => "observability",
        }
    }
}

/// 操作クラス一つのゲート判定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "state", content = "reason")]
pub enum GateState {
    /// 許可
    Allowed,
    /// 許可するが警告を提示
    Warning(String),
    /// ブロック
    Blocked(String),
}

impl GateState {
    pub fn is_blocked(&self) -> bool {
        matches!(self, GateState::Blocked(_))
    }
}

/// 種別一つの集約ヘルス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KindHealth {
    /// 接続が存在しない
    Missing,
    /// 有効な接続あり
    Healthy,
    /// 直近の検証に失敗
    Unhealthy,
    /// ガバナンスによりブロック中
    Blocked,
    /// 未検証（pending / validating）
    Unverified,
}

/// ガバナンスポリシー
///
/// どの種別がどの操作クラスをゲートするか。助言種別の昇格しきい値は
/// 設定項目であり、未設定なら助言種別は決してブロックしない。
#[derive(Debug, Clone)]
pub struct GovernancePolicy {
    /// 種別 → ゲートする操作クラス
    pub gating: BTreeMap<ConnectionKind, OperationClass>,
    /// 助言種別の連続失敗がこの回数に達したらブロックへ昇格
    pub advisory_escalation_threshold: Option<u32>,
}

impl Default for GovernancePolicy {
    fn default() -> Self {
        let mut gating = BTreeMap::new();
        gating.insert(ConnectionKind::SourceControl, OperationClass::Executions);
        gating.insert(ConnectionKind::Cluster, OperationClass::Deployments);
        gating.insert(ConnectionKind::ContainerRegistry, OperationClass::Deployments);
        gating.insert(ConnectionKind::SecretsVault, OperationClass::Deployments);
        gating.insert(
            ConnectionKind::TelemetryCollector,
            OperationClass::Observability,
        );
        Self {
            gating,
            advisory_escalation_threshold: None,
        }
    }
}

/// 評価結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceReport {
    /// 種別ごとの集約ヘルス
    pub per_kind: BTreeMap<ConnectionKind, KindHealth>,
    /// 操作クラスごとのゲート判定
    pub gates: BTreeMap<OperationClass, GateState>,
}

impl GovernanceReport {
    /// 評価済みレポートは全操作クラスのエントリを必ず持つ
    pub fn gate(&self, class: OperationClass) -> &GateState {
        &self.gates[&class]
    }
}

/// ゲート用のアクティブ接続: 種別ごとに最新作成のもの
fn active_connection(connections: &[Connection], kind: ConnectionKind) -> Option<&Connection> {
    connections
        .iter()
        .filter(|c| c.kind == kind)
        .max_by_key(|c| (c.created_at, c.id))
}

fn kind_health(connection: Option<&Connection>) -> KindHealth {
    match connection {
        None => KindHealth::Missing,
        Some(c) => match c.status {
            ConnectionStatus::Blocked => KindHealth::Blocked,
            ConnectionStatus::Connected => KindHealth::Healthy,
            ConnectionStatus::Failed => KindHealth::Unhealthy,
            ConnectionStatus::Pending | ConnectionStatus::Validating => KindHealth::Unverified,
        },
    }
}

/// 現在の接続集合から操作ゲート判定を計算する
pub fn evaluate(connections: &[Connection], policy: &GovernancePolicy) -> GovernanceReport {
    let mut per_kind = BTreeMap::new();
    for kind in ConnectionKind::all() {
        per_kind.insert(kind, kind_health(active_connection(connections, kind)));
    }

    let mut gates = BTreeMap::new();
    for class in OperationClass::all() {
        let mut blocked: Vec<String> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();

        for (kind, gated_class) in &policy.gating {
            if *gated_class != class {
                continue;
            }
            let health = per_kind[kind];
            if kind.is_advisory() {
                match health {
                    KindHealth::Unhealthy => {
                        let escalated = policy.advisory_escalation_threshold.is_some_and(|n| {
                            active_connection(connections, *kind)
                                .map(|c| c.consecutive_failures >= n)
                                .unwrap_or(false)
                        });
                        if escalated {
                            blocked.push(format!(
                                "{} connection failing persistently",
                                kind
                            ));
                        } else {
                            warnings.push(format!("{} connection is failing", kind));
                        }
                    }
                    KindHealth::Blocked => {
                        warnings.push(format!("{} connection is blocked", kind));
                    }
                    // 助言種別の不在・未検証は黙認
                    _ => {}
                }
            } else {
                match health {
                    KindHealth::Missing => {
                        blocked.push(format!("no {} connection configured", kind));
                    }
                    KindHealth::Unhealthy => {
                        blocked.push(format!("{} connection is failing", kind));
                    }
                    KindHealth::Blocked => {
                        blocked.push(format!("{} connection is blocked", kind));
                    }
                    KindHealth::Unverified => {
                        warnings.push(format!("{} connection not yet verified", kind));
                    }
                    KindHealth::Healthy => {}
                }
            }
        }

        let state = if !blocked.is_empty() {
            GateState::Blocked(blocked.join("; "))
        } else if !warnings.is_empty() {
            GateState::Warning(warnings.join("; "))
        } else {
            GateState::Allowed
        };
        gates.insert(class, state);
    }

    GovernanceReport { per_kind, gates }
}
