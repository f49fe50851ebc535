//! ヘルスイベント配信チャンネル
//!
//! 記録順のライブ配信（broadcast）と、再接続時の読み戻し用に接続ごとの
//! 有界リングバッファを併せ持つ。配信は at-least-once。イベントは
//! 不変で、適用は冪等であること。

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use uuid::Uuid;

use crate::connection::types::HealthEvent;

/// 接続ごとに保持する直近イベント数の既定値
pub const DEFAULT_WINDOW: usize = 5;

pub struct HealthEventBus {
    sender: broadcast::Sender<HealthEvent>,
    recent: Arc<RwLock<HashMap<Uuid, VecDeque<HealthEvent>>>>,
    window: usize,
}

impl HealthEventBus {
    pub fn new(window: usize) -> Self {
        let (sender, _) = broadcast::channel(1000);
        Self {
            sender,
            recent: Arc::new(RwLock::new(HashMap::new())),
            window: window.max(1),
        }
    }

    /// イベントを記録して配信する
    ///
    /// リングバッファへの追記が先。購読者ゼロでの送信失敗は正常。
    pub async fn publish(&self, event: HealthEvent) {
        {
            let mut recent = self.recent.write().await;
            let history = recent
                .entry(event.connection_id)
                .or_insert_with(|| VecDeque::with_capacity(self.window));
            if history.len() >= self.window {
                history.pop_front();
            }
            history.push_back(event.clone());
        }
        let _ = self.sender.send(event);
    }

    /// ライブ購読（記録順に受信）
    pub fn subscribe(&self) -> broadcast::Receiver<HealthEvent> {
        self.sender.subscribe()
    }

    /// 接続を絞ったライブ購読
    ///
    /// `connection_id` が None なら全件。返却レシーバーの破棄が購読解除。
    pub fn subscribe_filtered(
        &self,
        connection_id: Option<Uuid>,
    ) -> mpsc::UnboundedReceiver<HealthEvent> {
        let mut source = self.sender.subscribe();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(event) => {
                        if connection_id.is_some_and(|id| id != event.connection_id) {
                            continue;
                        }
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    // 取りこぼしは recent() の読み戻しで回復する
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        rx
    }

    /// 読み戻し: 指定接続の直近イベント（新しい順、最大 n 件）
    pub async fn recent(&self, connection_id: Uuid, n: usize) -> Vec<HealthEvent> {
        let recent = self.recent.read().await;
        recent
            .get(&connection_id)
            .map(|history| history.iter().rev().take(n).cloned().collect())
            .unwrap_or_default()
    }

    /// 接続削除時の履歴破棄
    pub async fn forget(&self, connection_id: Uuid) {
        self.recent.write().await.remove(&connection_id);
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl Default for HealthEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::types::ConnectionStatus;

    fn event(connection_id: Uuid, message: &str) -> HealthEvent {
        HealthEvent::new(connection_id, ConnectionStatus::Connected, message, Some(10))
    }

    #[tokio::test]
    async fn test_window_is_bounded_most_recent_kept() {
        let bus = HealthEventBus::new(3);
        let id = Uuid::new_v4();
        for i in 0..10 {
            bus.publish(event(id, &format!("sample {}", i))).await;
        }
        let recent = bus.recent(id, 10).await;
        assert_eq!(recent.len(), 3);
        // 新しい順
        assert_eq!(recent[0].message, "sample 9");
        assert_eq!(recent[2].message, "sample 7");
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_recorded_order() {
        let bus = HealthEventBus::default();
        let mut rx = bus.subscribe();
        let id = Uuid::new_v4();

        bus.publish(event(id, "first")).await;
        bus.publish(event(id, "second")).await;

        assert_eq!(rx.recv().await.unwrap().message, "first");
        assert_eq!(rx.recv().await.unwrap().message, "second");
    }

    #[tokio::test]
    async fn test_recent_is_per_connection() {
        let bus = HealthEventBus::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        bus.publish(event(a, "for a")).await;
        bus.publish(event(b, "for b")).await;

        let recent = bus.recent(a, 5).await;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].message, "for a");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_fine() {
        let bus = HealthEventBus::default();
        bus.publish(event(Uuid::new_v4(), "nobody listening")).await;
    }

    #[tokio::test]
    async fn test_filtered_subscription_only_sees_its_connection() {
        let bus = HealthEventBus::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut rx = bus.subscribe_filtered(Some(a));
        tokio::task::yield_now().await;

        bus.publish(event(b, "other")).await;
        bus.publish(event(a, "mine")).await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received.connection_id, a);
        assert_eq!(received.message, "mine");
    }
}
