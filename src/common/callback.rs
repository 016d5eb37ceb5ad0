//! Flare RTM 回调系统模块
//!
//! 观察者接口：每种事件一个投递方法，不关心的事件使用默认空实现

use async_trait::async_trait;
use tracing::debug;

use crate::common::events::{
    ConnectionStateEvent, LockEvent, MessageEvent, PresenceEvent, StorageEvent, TopicEvent,
};

/// 事件观察者
///
/// 分发器只持有观察者的弱引用，观察者的生命周期由其所有者决定
#[async_trait]
pub trait RtmEventCallback: Send + Sync {
    /// 收到频道或 Topic 消息
    async fn on_message(&self, _event: &MessageEvent) {}

    /// Presence 变化
    async fn on_presence(&self, _event: &PresenceEvent) {}

    /// 锁变化
    async fn on_lock(&self, _event: &LockEvent) {}

    /// 元数据变化
    async fn on_storage(&self, _event: &StorageEvent) {}

    /// Topic 变化
    async fn on_topic(&self, _event: &TopicEvent) {}

    /// Token 即将过期，`channel` 为空表示登录 Token
    async fn on_token_privilege_will_expire(&self, _channel: Option<&str>) {}

    /// 连接状态变化
    async fn on_connection_state_changed(&self, _event: &ConnectionStateEvent) {}
}

/// 默认观察者：只记录日志
pub struct DefaultEventCallback;

#[async_trait]
impl RtmEventCallback for DefaultEventCallback {
    async fn on_message(&self, event: &MessageEvent) {
        debug!(channel = %event.channel, publisher = %event.publisher, "收到消息");
    }

    async fn on_presence(&self, event: &PresenceEvent) {
        debug!(channel = %event.channel, "Presence 事件: {:?}", event.event_type);
    }

    async fn on_lock(&self, event: &LockEvent) {
        debug!(channel = %event.channel, "锁事件: {:?}", event.event_type);
    }

    async fn on_storage(&self, event: &StorageEvent) {
        debug!(target_id = %event.target, "存储事件: {:?}", event.event_type);
    }

    async fn on_topic(&self, event: &TopicEvent) {
        debug!(channel = %event.channel_name, "Topic 事件: {:?}", event.event_type);
    }

    async fn on_token_privilege_will_expire(&self, channel: Option<&str>) {
        debug!("Token 即将过期: {:?}", channel);
    }

    async fn on_connection_state_changed(&self, event: &ConnectionStateEvent) {
        debug!(
            channel = %event.channel_name,
            "连接状态变化: {} ({})",
            event.state,
            event.reason
        );
    }
}
