//! 流频道
//!
//! 流频道先整体加入，再在其中加入 Topic 发布消息、订阅其他用户在 Topic 中的消息。
//! 句柄由 [`crate::client::RtmClient::create_stream_channel`] 创建，销毁后不可再用。

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::client::operation::{InstanceGuard, Operation};
use crate::client::traits::StreamChannelEngine;
use crate::client::types::{CommonResponse, TopicSubscriptionResponse};
use crate::common::error::{ErrorInfo, Result};
use crate::common::message_parser::encode_message;
use crate::common::protocol::RawJoinTopicOptions;
use crate::common::types::{JoinChannelFeatures, PublishOptions};

// ==================== 选项 ====================

/// 加入流频道选项
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinChannelOption {
    pub token: Option<String>,
    pub features: JoinChannelFeatures,
}

impl JoinChannelOption {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token,
            features: JoinChannelFeatures::default(),
        }
    }

    pub fn with_features(mut self, features: impl Into<JoinChannelFeatures>) -> Self {
        self.features = features.into();
        self
    }
}

/// Topic 消息投递顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MessageQos {
    Unordered = 0,
    #[default]
    Ordered = 1,
}

/// Topic 消息优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MessagePriority {
    Highest = 0,
    High = 1,
    #[default]
    Normal = 4,
    Low = 8,
}

/// 加入 Topic 选项
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinTopicOption {
    pub qos: MessageQos,
    pub meta: Option<String>,
    pub priority: MessagePriority,
    /// 消息时间戳与音视频流同步
    pub sync_with_media: bool,
}

impl JoinTopicOption {
    pub fn with_qos(mut self, qos: MessageQos) -> Self {
        self.qos = qos;
        self
    }

    pub fn with_meta(mut self, meta: impl Into<String>) -> Self {
        self.meta = Some(meta.into());
        self
    }

    pub fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_sync_with_media(mut self, sync_with_media: bool) -> Self {
        self.sync_with_media = sync_with_media;
        self
    }

    fn to_raw(&self) -> RawJoinTopicOptions {
        RawJoinTopicOptions {
            qos: self.qos as i32,
            priority: self.priority as i32,
            meta: self.meta.clone(),
            sync_with_media: self.sync_with_media,
        }
    }
}

/// Topic 订阅选项
///
/// `users` 为 `None` 表示 Topic 内的全部发布者；`Some(vec![])` 原样交给引擎
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicOption {
    pub users: Option<Vec<String>>,
}

impl TopicOption {
    pub fn users<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            users: Some(users.into_iter().map(Into::into).collect()),
        }
    }

    fn into_users(option: Option<TopicOption>) -> Option<Vec<String>> {
        option.and_then(|option| option.users)
    }
}

// ==================== 流频道 ====================

/// 流频道句柄
pub struct RtmStreamChannel {
    id: Uuid,
    channel_name: String,
    engine: Arc<dyn StreamChannelEngine>,
    session_guard: InstanceGuard,
    guard: InstanceGuard,
}

impl RtmStreamChannel {
    pub(crate) fn new(
        channel_name: impl Into<String>,
        engine: Arc<dyn StreamChannelEngine>,
        session_guard: InstanceGuard,
    ) -> Self {
        let channel = Self {
            id: Uuid::new_v4(),
            channel_name: channel_name.into(),
            engine,
            session_guard,
            guard: InstanceGuard::new(),
        };
        info!(channel = %channel.channel_name, id = %channel.id, "创建流频道");
        channel
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    fn guards(&self) -> Vec<InstanceGuard> {
        vec![self.session_guard.clone(), self.guard.clone()]
    }

    fn check(&self, operation: &str) -> Result<()> {
        self.session_guard.check(operation)?;
        self.guard.check(operation)
    }

    /// 加入流频道
    pub fn join(&self, option: JoinChannelOption) -> Operation<CommonResponse> {
        let engine = Arc::clone(&self.engine);
        Operation::from_engine("join", self.guards(), async move {
            engine.join(option.token, option.features.to_bits()).await
        })
    }

    /// 离开流频道
    pub fn leave(&self) -> Operation<CommonResponse> {
        let engine = Arc::clone(&self.engine);
        Operation::from_engine("leave", self.guards(), async move { engine.leave().await })
    }

    /// 更新流频道 Token
    pub fn renew_token(&self, token: &str) -> Operation<CommonResponse> {
        let engine = Arc::clone(&self.engine);
        let token = token.to_string();
        Operation::from_engine("renew_token", self.guards(), async move {
            engine.renew_token(token).await
        })
    }

    /// 以发布者身份加入 Topic
    pub fn join_topic(
        &self,
        topic: &str,
        option: Option<JoinTopicOption>,
    ) -> Operation<CommonResponse> {
        let engine = Arc::clone(&self.engine);
        let topic = topic.to_string();
        let option = option.as_ref().map(JoinTopicOption::to_raw);
        Operation::from_engine("join_topic", self.guards(), async move {
            engine.join_topic(topic, option).await
        })
    }

    pub fn leave_topic(&self, topic: &str) -> Operation<CommonResponse> {
        let engine = Arc::clone(&self.engine);
        let topic = topic.to_string();
        Operation::from_engine("leave_topic", self.guards(), async move {
            engine.leave_topic(topic).await
        })
    }

    /// 订阅 Topic 中的用户消息
    pub fn subscribe_topic(
        &self,
        topic: &str,
        option: Option<TopicOption>,
    ) -> Operation<TopicSubscriptionResponse> {
        let engine = Arc::clone(&self.engine);
        let topic = topic.to_string();
        let users = TopicOption::into_users(option);
        Operation::from_engine("subscribe_topic", self.guards(), async move {
            engine.subscribe_topic(topic, users).await
        })
    }

    pub fn unsubscribe_topic(
        &self,
        topic: &str,
        option: Option<TopicOption>,
    ) -> Operation<CommonResponse> {
        let engine = Arc::clone(&self.engine);
        let topic = topic.to_string();
        let users = TopicOption::into_users(option);
        Operation::from_engine("unsubscribe_topic", self.guards(), async move {
            engine.unsubscribe_topic(topic, users).await
        })
    }

    /// 在已加入的 Topic 中发布消息，编码失败时不会调用引擎
    pub fn publish_topic_message<M: Serialize + ?Sized>(
        &self,
        topic: &str,
        message: &M,
        options: Option<PublishOptions>,
    ) -> Operation<CommonResponse> {
        const OPERATION: &str = "publish_topic_message";
        let message = match encode_message(message, OPERATION) {
            Ok(message) => message,
            Err(error) => return Operation::fail(OPERATION, error),
        };
        let engine = Arc::clone(&self.engine);
        let topic = topic.to_string();
        Operation::from_engine(OPERATION, self.guards(), async move {
            engine.publish_topic_message(topic, message, options).await
        })
    }

    /// Topic 中已订阅的用户
    pub fn get_subscribed_user_list(&self, topic: &str) -> Operation<Vec<String>> {
        let engine = Arc::clone(&self.engine);
        let topic = topic.to_string();
        Operation::from_engine("get_subscribed_user_list", self.guards(), async move {
            engine.get_subscribed_user_list(topic).await
        })
    }

    /// 释放流频道，之后句柄上的所有调用都会失败
    pub fn destroy(&self) -> Result<()> {
        self.check("destroy")?;
        let code = self.engine.destroy();
        if let Some(error) = ErrorInfo::from_raw(code, "destroy", "") {
            return Err(error);
        }
        self.guard.release();
        info!(channel = %self.channel_name, id = %self.id, "流频道已销毁");
        Ok(())
    }

    pub fn is_destroyed(&self) -> bool {
        self.guard.is_released()
    }
}

impl std::fmt::Debug for RtmStreamChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtmStreamChannel")
            .field("id", &self.id)
            .field("channel_name", &self.channel_name)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock_engine::{MockEngine, Script};
    use crate::common::error::ErrorCode;
    use crate::common::message_parser::tests::Unencodable;
    use crate::common::protocol::{RawSubscribedUserListResponse, RawTopicSubscriptionResponse};
    use crate::common::types::JoinChannelFeature;

    fn channel(engine: &MockEngine) -> (RtmStreamChannel, InstanceGuard) {
        let session = InstanceGuard::new();
        (RtmStreamChannel::new("game", Arc::new(engine.clone()), session.clone()), session)
    }

    #[test]
    fn test_option_defaults() {
        let option = JoinTopicOption::default();
        assert_eq!(option.qos, MessageQos::Ordered);
        assert_eq!(option.priority, MessagePriority::Normal);
        assert!(!option.sync_with_media);
        assert_eq!(option.to_raw().priority, 4);

        let join = JoinChannelOption::new(None);
        assert_eq!(join.features.to_bits(), 0x1);
    }

    #[tokio::test]
    async fn test_join_and_topics() {
        let engine = MockEngine::new();
        let (channel, _session) = channel(&engine);
        assert_eq!(channel.channel_name(), "game");

        let option = JoinChannelOption::new(Some("tok".to_string()))
            .with_features([JoinChannelFeature::Presence, JoinChannelFeature::Lock]);
        channel.join(option).await.unwrap();
        assert_eq!(engine.last_detail("join").as_deref(), Some("tok 0x5"));

        let topic_option = JoinTopicOption::default()
            .with_qos(MessageQos::Unordered)
            .with_priority(MessagePriority::High)
            .with_meta("m");
        channel.join_topic("moves", Some(topic_option)).await.unwrap();
        assert_eq!(engine.last_detail("join_topic").as_deref(), Some("moves 0 1 m false"));

        engine.respond_with(
            "subscribe_topic",
            RawTopicSubscriptionResponse {
                succeed_users: vec!["u2".to_string()],
                failed_users: vec!["u3".to_string()],
            },
        );
        let response = channel
            .subscribe_topic("moves", Some(TopicOption::users(["u2", "u3"])))
            .await
            .unwrap();
        assert_eq!(response.succeed_users, vec!["u2"]);
        assert_eq!(response.failed_users, vec!["u3"]);

        assert_eq!(
            engine.last_detail("subscribe_topic").as_deref(),
            Some(r#"moves Some(["u2", "u3"])"#)
        );

        channel.unsubscribe_topic("moves", None).await.unwrap();
        assert_eq!(engine.last_detail("unsubscribe_topic").as_deref(), Some("moves None"));
    }

    #[tokio::test]
    async fn test_topic_users_all_vs_empty() {
        let engine = MockEngine::new();
        let (channel, _session) = channel(&engine);

        channel.subscribe_topic("moves", None).await.unwrap();
        assert_eq!(engine.last_detail("subscribe_topic").as_deref(), Some("moves None"));

        channel.subscribe_topic("moves", Some(TopicOption::default())).await.unwrap();
        assert_eq!(engine.last_detail("subscribe_topic").as_deref(), Some("moves None"));

        let empty = TopicOption { users: Some(Vec::new()) };
        channel.unsubscribe_topic("moves", Some(empty)).await.unwrap();
        assert_eq!(engine.last_detail("unsubscribe_topic").as_deref(), Some("moves Some([])"));
    }

    #[tokio::test]
    async fn test_publish_topic_message_encode_failure() {
        let engine = MockEngine::new();
        let (channel, _session) = channel(&engine);

        let error = channel
            .publish_topic_message("moves", &Unencodable, None)
            .await
            .unwrap_err();
        assert_eq!(error.code, ErrorCode::ChannelInvalidMessage);
        assert_eq!(error.operation, "publish_topic_message");
        assert!(engine.calls().is_empty());

        channel
            .publish_topic_message("moves", "e4", Some(PublishOptions::new("chess")))
            .await
            .unwrap();
        assert_eq!(engine.last_detail("publish_topic_message").as_deref(), Some("moves e4 chess"));
    }

    #[tokio::test]
    async fn test_get_subscribed_user_list() {
        let engine = MockEngine::new();
        engine.respond_with(
            "get_subscribed_user_list",
            RawSubscribedUserListResponse {
                users: vec!["b".to_string(), "a".to_string()],
            },
        );
        let (channel, _session) = channel(&engine);

        let users = channel.get_subscribed_user_list("moves").await.unwrap();
        assert_eq!(users, vec!["b", "a"]);

        engine.script("get_subscribed_user_list", Script::Empty);
        let error = channel.get_subscribed_user_list("moves").await.unwrap_err();
        assert_eq!(error.code, ErrorCode::NoKnownError);
        assert_eq!(error.operation, "get_subscribed_user_list");
    }

    #[tokio::test]
    async fn test_destroy_makes_handle_unusable() {
        let engine = MockEngine::new();
        let (channel, _session) = channel(&engine);

        channel.destroy().unwrap();
        assert!(channel.is_destroyed());

        let error = channel.leave().await.unwrap_err();
        assert_eq!(error.code, ErrorCode::InstanceAlreadyReleased);
        let error = channel.destroy().unwrap_err();
        assert_eq!(error.code, ErrorCode::InstanceAlreadyReleased);
        assert_eq!(engine.operations(), vec!["destroy_stream_channel"]);
    }

    #[tokio::test]
    async fn test_failed_destroy_keeps_handle() {
        let engine = MockEngine::new();
        engine.script("destroy_stream_channel", Script::Fail(-11015));
        let (channel, _session) = channel(&engine);

        let error = channel.destroy().unwrap_err();
        assert_eq!(error.raw_code, -11015);
        assert!(!channel.is_destroyed());
    }

    #[tokio::test]
    async fn test_session_release_reaches_channel() {
        let engine = MockEngine::new();
        let (channel, session) = channel(&engine);
        session.release();

        let error = channel.join(JoinChannelOption::default()).await.unwrap_err();
        assert_eq!(error.code, ErrorCode::InstanceAlreadyReleased);
        assert!(engine.calls().is_empty());
    }
}
