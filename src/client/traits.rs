//! 引擎门面
//!
//! 真正实现传输、加密与协议的引擎是外部协作者，会话层只通过这些 trait 调用它，
//! 并通过 [`EngineEventHandler`] 接收它主动上报的事件。

use async_trait::async_trait;
use std::sync::Arc;

use crate::client::config::RtmClientConfig;
use crate::common::error::RawErrorInfo;
use crate::common::protocol::{
    EngineOutcome, RawCommonResponse, RawGetLocksResponse, RawGetMetadataResponse,
    RawJoinTopicOptions, RawLockEvent, RawMessageEvent, RawMetadata, RawMetadataOptions,
    RawOnlineUsersResponse, RawPresenceEvent, RawPresenceGetStateResponse, RawStorageEvent,
    RawSubscribedUserListResponse, RawTopicEvent, RawTopicSubscriptionResponse,
    RawUserChannelsResponse,
};
use crate::common::types::PublishOptions;

/// 元数据写操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataOperation {
    Set,
    Update,
    Remove,
}

/// 引擎创建器
pub trait RtmEngineFactory: Send + Sync {
    /// 按配置创建引擎，事件通过 `handler` 上报
    fn create(
        &self,
        config: &RtmClientConfig,
        handler: Arc<dyn EngineEventHandler>,
    ) -> std::result::Result<Arc<dyn RtmEngine>, Option<RawErrorInfo>>;
}

/// 客户端引擎
#[async_trait]
pub trait RtmEngine: Send + Sync {
    async fn login(&self, token: Option<String>) -> EngineOutcome<RawCommonResponse>;

    async fn logout(&self) -> EngineOutcome<RawCommonResponse>;

    async fn renew_token(&self, token: String) -> EngineOutcome<RawCommonResponse>;

    /// `features` 为订阅特性位掩码
    async fn subscribe(
        &self,
        channel_name: String,
        features: u32,
    ) -> EngineOutcome<RawCommonResponse>;

    async fn unsubscribe(&self, channel_name: String) -> EngineOutcome<RawCommonResponse>;

    async fn publish(
        &self,
        channel_name: String,
        message: String,
        options: Option<PublishOptions>,
    ) -> EngineOutcome<RawCommonResponse>;

    /// 返回原始错误码，0 表示成功
    fn set_parameters(&self, parameters: &str) -> i32;

    fn create_stream_channel(
        &self,
        channel_name: &str,
    ) -> std::result::Result<Arc<dyn StreamChannelEngine>, Option<RawErrorInfo>>;

    fn presence(&self) -> Arc<dyn PresenceEngine>;

    fn storage(&self) -> Arc<dyn StorageEngine>;

    fn lock(&self) -> Arc<dyn LockEngine>;

    /// 引擎对错误码的描述
    fn error_reason(&self, error_code: i32) -> Option<String>;

    /// 返回原始错误码，0 表示成功
    fn destroy(&self) -> i32;
}

/// Presence 引擎
#[async_trait]
pub trait PresenceEngine: Send + Sync {
    /// `include` 为结果字段位掩码
    async fn get_online_users(
        &self,
        channel_name: String,
        channel_type: i32,
        include: u32,
        page: Option<String>,
    ) -> EngineOutcome<RawOnlineUsersResponse>;

    async fn get_user_channels(&self, user_id: String) -> EngineOutcome<RawUserChannelsResponse>;

    async fn set_state(
        &self,
        channel_name: String,
        channel_type: i32,
        states: Vec<(String, String)>,
    ) -> EngineOutcome<RawCommonResponse>;

    async fn remove_state(
        &self,
        channel_name: String,
        channel_type: i32,
        keys: Vec<String>,
    ) -> EngineOutcome<RawCommonResponse>;

    async fn get_state(
        &self,
        channel_name: String,
        channel_type: i32,
        user_id: String,
    ) -> EngineOutcome<RawPresenceGetStateResponse>;
}

/// 存储引擎
#[async_trait]
pub trait StorageEngine: Send + Sync {
    async fn write_channel_metadata(
        &self,
        operation: MetadataOperation,
        channel_name: String,
        channel_type: i32,
        data: RawMetadata,
        options: Option<RawMetadataOptions>,
        lock: Option<String>,
    ) -> EngineOutcome<RawCommonResponse>;

    async fn get_channel_metadata(
        &self,
        channel_name: String,
        channel_type: i32,
    ) -> EngineOutcome<RawGetMetadataResponse>;

    async fn write_user_metadata(
        &self,
        operation: MetadataOperation,
        user_id: String,
        data: RawMetadata,
        options: Option<RawMetadataOptions>,
    ) -> EngineOutcome<RawCommonResponse>;

    async fn get_user_metadata(&self, user_id: String) -> EngineOutcome<RawGetMetadataResponse>;

    async fn subscribe_user_metadata(&self, user_id: String) -> EngineOutcome<RawCommonResponse>;

    async fn unsubscribe_user_metadata(&self, user_id: String) -> EngineOutcome<RawCommonResponse>;
}

/// 锁引擎
#[async_trait]
pub trait LockEngine: Send + Sync {
    async fn set_lock(
        &self,
        channel_name: String,
        channel_type: i32,
        lock_name: String,
        ttl: i32,
    ) -> EngineOutcome<RawCommonResponse>;

    async fn remove_lock(
        &self,
        channel_name: String,
        channel_type: i32,
        lock_name: String,
    ) -> EngineOutcome<RawCommonResponse>;

    /// `retry` 为真时由引擎在竞争时持续尝试
    async fn acquire_lock(
        &self,
        channel_name: String,
        channel_type: i32,
        lock_name: String,
        retry: bool,
    ) -> EngineOutcome<RawCommonResponse>;

    async fn release_lock(
        &self,
        channel_name: String,
        channel_type: i32,
        lock_name: String,
    ) -> EngineOutcome<RawCommonResponse>;

    async fn revoke_lock(
        &self,
        channel_name: String,
        channel_type: i32,
        lock_name: String,
        owner: String,
    ) -> EngineOutcome<RawCommonResponse>;

    async fn get_locks(
        &self,
        channel_name: String,
        channel_type: i32,
    ) -> EngineOutcome<RawGetLocksResponse>;
}

/// 流频道引擎
#[async_trait]
pub trait StreamChannelEngine: Send + Sync {
    async fn join(&self, token: Option<String>, features: u32) -> EngineOutcome<RawCommonResponse>;

    async fn leave(&self) -> EngineOutcome<RawCommonResponse>;

    async fn renew_token(&self, token: String) -> EngineOutcome<RawCommonResponse>;

    async fn join_topic(
        &self,
        topic: String,
        options: Option<RawJoinTopicOptions>,
    ) -> EngineOutcome<RawCommonResponse>;

    async fn leave_topic(&self, topic: String) -> EngineOutcome<RawCommonResponse>;

    /// `users` 为 `None` 表示 Topic 内的全部发布者，空列表表示不指定任何用户
    async fn subscribe_topic(
        &self,
        topic: String,
        users: Option<Vec<String>>,
    ) -> EngineOutcome<RawTopicSubscriptionResponse>;

    async fn unsubscribe_topic(
        &self,
        topic: String,
        users: Option<Vec<String>>,
    ) -> EngineOutcome<RawCommonResponse>;

    async fn publish_topic_message(
        &self,
        topic: String,
        message: String,
        options: Option<PublishOptions>,
    ) -> EngineOutcome<RawCommonResponse>;

    async fn get_subscribed_user_list(
        &self,
        topic: String,
    ) -> EngineOutcome<RawSubscribedUserListResponse>;

    /// 返回原始错误码，0 表示成功
    fn destroy(&self) -> i32;
}

/// 引擎事件接收方
///
/// 引擎在自己的投递调用中等待接收方处理完毕
#[async_trait]
pub trait EngineEventHandler: Send + Sync {
    async fn on_message_event(&self, event: RawMessageEvent);

    async fn on_presence_event(&self, event: RawPresenceEvent);

    async fn on_lock_event(&self, event: RawLockEvent);

    async fn on_storage_event(&self, event: RawStorageEvent);

    async fn on_topic_event(&self, event: RawTopicEvent);

    async fn on_token_privilege_will_expire(&self, channel_name: Option<String>);

    async fn on_connection_state_changed(&self, channel_name: String, state: i32, reason: i32);
}
