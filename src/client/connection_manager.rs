//! 客户端连接管理器
//!
//! 按频道记录引擎上报的连接状态。会话层不主动建立或重建连接，
//! 状态只随引擎的连接状态事件变化。

use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

use crate::common::events::{ConnectionChangeReason, ConnectionState, ConnectionStateEvent};

/// 单个频道的连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConnection {
    pub state: ConnectionState,
    /// 最近一次变化的原因
    pub reason: ConnectionChangeReason,
}

/// 连接管理器
#[derive(Debug, Default)]
pub struct ConnectionManager {
    channels: RwLock<HashMap<String, ChannelConnection>>,
}

impl ConnectionManager {
    /// 创建新的连接管理器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次状态变化，返回变化前的状态
    pub async fn record(&self, event: &ConnectionStateEvent) -> ConnectionState {
        let mut channels = self.channels.write().await;
        let previous = channels.insert(
            event.channel_name.clone(),
            ChannelConnection {
                state: event.state,
                reason: event.reason,
            },
        );
        let previous = previous.map(|connection| connection.state).unwrap_or_default();
        if previous != event.state {
            info!(
                channel = %event.channel_name,
                "连接状态变化: {} -> {} ({})",
                previous,
                event.state,
                event.reason
            );
        }
        previous
    }

    /// 频道当前状态，从未上报过的频道视为未连接
    pub async fn state(&self, channel_name: &str) -> ConnectionState {
        self.channels
            .read()
            .await
            .get(channel_name)
            .map(|connection| connection.state)
            .unwrap_or_default()
    }

    /// 频道状态与最近一次变化原因
    pub async fn connection(&self, channel_name: &str) -> Option<ChannelConnection> {
        self.channels.read().await.get(channel_name).copied()
    }

    /// 当前处于已连接状态的频道
    pub async fn connected_channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self
            .channels
            .read()
            .await
            .iter()
            .filter(|(_, connection)| connection.state == ConnectionState::Connected)
            .map(|(name, _)| name.clone())
            .collect();
        channels.sort();
        channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::events::converters::to_connection_state_event;

    #[tokio::test]
    async fn test_unknown_channel_is_disconnected() {
        let manager = ConnectionManager::new();
        assert_eq!(manager.state("lobby").await, ConnectionState::Disconnected);
        assert!(manager.connection("lobby").await.is_none());
    }

    #[tokio::test]
    async fn test_record_tracks_each_channel() {
        let manager = ConnectionManager::new();
        // 3 connected, 1 connecting
        let previous = manager.record(&to_connection_state_event("lobby", 3, 1)).await;
        assert_eq!(previous, ConnectionState::Disconnected);
        manager.record(&to_connection_state_event("game", 2, 0)).await;

        assert_eq!(manager.state("lobby").await, ConnectionState::Connected);
        assert_eq!(manager.state("game").await, ConnectionState::Connecting);
        assert_eq!(manager.connected_channels().await, vec!["lobby".to_string()]);

        let previous = manager.record(&to_connection_state_event("lobby", 1, 0)).await;
        assert_eq!(previous, ConnectionState::Connected);
        assert_eq!(manager.state("lobby").await, ConnectionState::Disconnected);
        assert!(manager.connected_channels().await.is_empty());
    }
}
