//! 事件分发器
//!
//! 接收引擎上报的原始事件，转换为强类型事件后按注册顺序投递给全部观察者。
//! 分发器只持有观察者的弱引用，观察者被其所有者释放后自动失效。

use async_trait::async_trait;
use std::sync::{Arc, Weak};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::client::connection_manager::ConnectionManager;
use crate::client::traits::EngineEventHandler;
use crate::common::callback::RtmEventCallback;
use crate::common::events::converters;
use crate::common::protocol::{
    RawLockEvent, RawMessageEvent, RawPresenceEvent, RawStorageEvent, RawTopicEvent,
};

type Observer = Weak<dyn RtmEventCallback>;

fn same_observer(weak: &Observer, observer: &Arc<dyn RtmEventCallback>) -> bool {
    std::ptr::eq(weak.as_ptr() as *const (), Arc::as_ptr(observer) as *const ())
}

/// 事件分发器
pub struct EventDispatcher {
    observers: RwLock<Vec<Observer>>,
    connections: Arc<ConnectionManager>,
}

impl EventDispatcher {
    /// 创建分发器，`observers` 按顺序成为最先注册的观察者
    pub fn with_observers<'a>(
        observers: impl IntoIterator<Item = &'a Arc<dyn RtmEventCallback>>,
        connections: Arc<ConnectionManager>,
    ) -> Self {
        let mut registered: Vec<Observer> = Vec::new();
        for observer in observers {
            if !registered.iter().any(|weak| same_observer(weak, observer)) {
                registered.push(Arc::downgrade(observer));
            }
        }
        Self {
            observers: RwLock::new(registered),
            connections,
        }
    }

    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self::with_observers(std::iter::empty(), connections)
    }

    /// 注册观察者，重复注册保持原位置
    pub async fn add_observer(&self, observer: &Arc<dyn RtmEventCallback>) {
        let mut observers = self.observers.write().await;
        observers.retain(|weak| weak.strong_count() > 0);
        if observers.iter().any(|weak| same_observer(weak, observer)) {
            return;
        }
        observers.push(Arc::downgrade(observer));
        debug!(count = observers.len(), "注册观察者");
    }

    /// 注销观察者，未注册时无操作
    pub async fn remove_observer(&self, observer: &Arc<dyn RtmEventCallback>) {
        let mut observers = self.observers.write().await;
        observers.retain(|weak| weak.strong_count() > 0 && !same_observer(weak, observer));
        debug!(count = observers.len(), "注销观察者");
    }

    /// 仍然存活的观察者数量
    pub async fn observer_count(&self) -> usize {
        self.observers
            .read()
            .await
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// 投递前的快照，投递期间的注册与注销不影响本次投递
    async fn snapshot(&self) -> Vec<Arc<dyn RtmEventCallback>> {
        let observers = self.observers.read().await;
        observers.iter().filter_map(Weak::upgrade).collect()
    }
}

#[async_trait]
impl EngineEventHandler for EventDispatcher {
    async fn on_message_event(&self, raw: RawMessageEvent) {
        let Some(event) = converters::to_message_event(&raw) else {
            warn!(channel = %raw.channel_name, "消息事件缺少载荷，已丢弃");
            return;
        };
        for observer in self.snapshot().await {
            observer.on_message(&event).await;
        }
    }

    async fn on_presence_event(&self, raw: RawPresenceEvent) {
        let Some(event) = converters::to_presence_event(&raw) else {
            return;
        };
        for observer in self.snapshot().await {
            observer.on_presence(&event).await;
        }
    }

    async fn on_lock_event(&self, raw: RawLockEvent) {
        let Some(event) = converters::to_lock_event(&raw) else {
            warn!(channel = %raw.channel_name, "锁事件无法转换，已丢弃");
            return;
        };
        for observer in self.snapshot().await {
            observer.on_lock(&event).await;
        }
    }

    async fn on_storage_event(&self, raw: RawStorageEvent) {
        let Some(event) = converters::to_storage_event(&raw) else {
            warn!(target_id = %raw.target, "存储事件无法转换，已丢弃");
            return;
        };
        for observer in self.snapshot().await {
            observer.on_storage(&event).await;
        }
    }

    async fn on_topic_event(&self, raw: RawTopicEvent) {
        let Some(event) = converters::to_topic_event(&raw) else {
            warn!(channel = %raw.channel_name, "Topic 事件无法转换，已丢弃");
            return;
        };
        for observer in self.snapshot().await {
            observer.on_topic(&event).await;
        }
    }

    async fn on_token_privilege_will_expire(&self, channel_name: Option<String>) {
        for observer in self.snapshot().await {
            observer.on_token_privilege_will_expire(channel_name.as_deref()).await;
        }
    }

    async fn on_connection_state_changed(&self, channel_name: String, state: i32, reason: i32) {
        let event = converters::to_connection_state_event(&channel_name, state, reason);
        self.connections.record(&event).await;
        for observer in self.snapshot().await {
            observer.on_connection_state_changed(&event).await;
        }
    }
}
