//! Presence 代理
//!
//! 查询频道在线用户、用户所在频道，以及读写当前用户在频道内的临时状态

use std::collections::HashMap;
use std::sync::Arc;

use crate::client::operation::{InstanceGuard, Operation};
use crate::client::traits::PresenceEngine;
use crate::client::types::{
    CommonResponse, OnlineUsersResponse, PresenceGetStateResponse, UserChannelsResponse,
};
use crate::common::types::{ChannelRef, Flag, FlagSet};

/// 在线用户查询结果包含的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PresenceInclude {
    UserId,
    UserState,
}

impl Flag for PresenceInclude {
    const ALL: &'static [Self] = &[PresenceInclude::UserId, PresenceInclude::UserState];

    fn bits(self) -> u32 {
        match self {
            PresenceInclude::UserId => 0x1,
            PresenceInclude::UserState => 0x2,
        }
    }
}

pub type PresenceIncludes = FlagSet<PresenceInclude>;

impl Default for FlagSet<PresenceInclude> {
    fn default() -> Self {
        FlagSet::from([PresenceInclude::UserId])
    }
}

/// 在线用户查询选项
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceOptions {
    pub include: PresenceIncludes,
    /// 上一次结果中的 `next_page`
    pub page: Option<String>,
}

impl PresenceOptions {
    pub fn new(include: impl Into<PresenceIncludes>) -> Self {
        Self {
            include: include.into(),
            page: None,
        }
    }

    /// 从指定页继续查询
    pub fn with_page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        self
    }
}

/// Presence 代理
#[derive(Clone)]
pub struct RtmPresence {
    engine: Arc<dyn PresenceEngine>,
    guard: InstanceGuard,
}

impl RtmPresence {
    pub(crate) fn new(engine: Arc<dyn PresenceEngine>, guard: InstanceGuard) -> Self {
        Self { engine, guard }
    }

    /// 频道在线用户，支持分页
    pub fn get_online_users(
        &self,
        channel: &ChannelRef,
        options: Option<PresenceOptions>,
    ) -> Operation<OnlineUsersResponse> {
        let options = options.unwrap_or_default();
        let engine = Arc::clone(&self.engine);
        let (name, channel_type) = (channel.name().to_string(), channel.channel_type().as_i32());
        Operation::from_engine("get_online_users", vec![self.guard.clone()], async move {
            engine
                .get_online_users(name, channel_type, options.include.to_bits(), options.page)
                .await
        })
    }

    /// 用户当前所在的频道
    pub fn get_user_channels(&self, user_id: &str) -> Operation<UserChannelsResponse> {
        let engine = Arc::clone(&self.engine);
        let user_id = user_id.to_string();
        Operation::from_engine("get_user_channels", vec![self.guard.clone()], async move {
            engine.get_user_channels(user_id).await
        })
    }

    /// 设置当前用户在频道内的状态
    ///
    /// 尚未加入频道时状态由引擎缓存，加入后生效并产生事件
    pub fn set_user_state(
        &self,
        channel: &ChannelRef,
        states: &HashMap<String, String>,
    ) -> Operation<CommonResponse> {
        let engine = Arc::clone(&self.engine);
        let (name, channel_type) = (channel.name().to_string(), channel.channel_type().as_i32());
        let states: Vec<(String, String)> =
            states.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        Operation::from_engine("set_user_state", vec![self.guard.clone()], async move {
            engine.set_state(name, channel_type, states).await
        })
    }

    /// 删除当前用户在频道内的部分状态
    pub fn remove_user_state(
        &self,
        channel: &ChannelRef,
        keys: &[String],
    ) -> Operation<CommonResponse> {
        let engine = Arc::clone(&self.engine);
        let (name, channel_type) = (channel.name().to_string(), channel.channel_type().as_i32());
        let keys = keys.to_vec();
        Operation::from_engine("remove_user_state", vec![self.guard.clone()], async move {
            engine.remove_state(name, channel_type, keys).await
        })
    }

    /// 指定用户在频道内的状态
    pub fn get_state(
        &self,
        user_id: &str,
        channel: &ChannelRef,
    ) -> Operation<PresenceGetStateResponse> {
        let engine = Arc::clone(&self.engine);
        let (name, channel_type) = (channel.name().to_string(), channel.channel_type().as_i32());
        let user_id = user_id.to_string();
        Operation::from_engine("get_state", vec![self.guard.clone()], async move {
            engine.get_state(name, channel_type, user_id).await
        })
    }

    #[deprecated(note = "使用 get_online_users")]
    pub fn who_now(
        &self,
        channel: &ChannelRef,
        options: Option<PresenceOptions>,
    ) -> Operation<OnlineUsersResponse> {
        self.get_online_users(channel, options)
    }

    #[deprecated(note = "使用 get_user_channels")]
    pub fn where_now(&self, user_id: &str) -> Operation<UserChannelsResponse> {
        self.get_user_channels(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock_engine::{MockEngine, Script};
    use crate::common::error::ErrorCode;
    use crate::common::protocol::{RawOnlineUsersResponse, RawUserState};

    fn presence(engine: &MockEngine) -> (RtmPresence, InstanceGuard) {
        let guard = InstanceGuard::new();
        (RtmPresence::new(Arc::new(engine.clone()), guard.clone()), guard)
    }

    #[test]
    fn test_default_options() {
        let options = PresenceOptions::default();
        assert_eq!(options.include.to_bits(), 0x1);
        assert!(options.page.is_none());

        let options = PresenceOptions::new([PresenceInclude::UserId, PresenceInclude::UserState])
            .with_page("p2");
        assert_eq!(options.include.to_bits(), 0x3);
        assert_eq!(options.page.as_deref(), Some("p2"));
    }

    #[tokio::test]
    async fn test_get_online_users_forwards_options() {
        let engine = MockEngine::new();
        engine.respond_with(
            "get_online_users",
            RawOnlineUsersResponse {
                total_occupancy: 2,
                user_state_list: vec![
                    RawUserState {
                        user_id: "u2".to_string(),
                        states: vec![],
                    },
                    RawUserState {
                        user_id: "u1".to_string(),
                        states: vec![],
                    },
                ],
                next_page: None,
            },
        );
        let (presence, _guard) = presence(&engine);
        let options = PresenceOptions::new([PresenceInclude::UserId, PresenceInclude::UserState])
            .with_page("p2");

        let response = presence
            .get_online_users(&ChannelRef::message("lobby"), Some(options))
            .await
            .unwrap();

        assert_eq!(response.users(), vec!["u1", "u2"]);
        assert_eq!(engine.last_detail("get_online_users").as_deref(), Some("lobby 1 0x3 p2"));
    }

    #[tokio::test]
    #[allow(deprecated)]
    async fn test_deprecated_aliases_forward() {
        let engine = MockEngine::new();
        engine.script("get_user_channels", Script::Fail(-13005));
        let (presence, _guard) = presence(&engine);

        let renamed = presence.get_user_channels("u9").await.unwrap_err();
        let alias = presence.where_now("u9").await.unwrap_err();
        assert_eq!(renamed.code, alias.code);
        assert_eq!(alias.operation, "get_user_channels");

        presence.who_now(&ChannelRef::stream("s"), None).await.unwrap();
        assert_eq!(engine.last_detail("get_online_users").as_deref(), Some("s 2 0x1 "));
    }

    #[tokio::test]
    async fn test_state_operations() {
        let engine = MockEngine::new();
        let (presence, _guard) = presence(&engine);
        let channel = ChannelRef::message("lobby");

        let states = HashMap::from([("mood".to_string(), "ok".to_string())]);
        presence.set_user_state(&channel, &states).await.unwrap();
        presence
            .remove_user_state(&channel, &["mood".to_string()])
            .await
            .unwrap();
        engine.script("get_state", Script::Empty);
        let error = presence.get_state("u2", &channel).await.unwrap_err();
        assert_eq!(error.code, ErrorCode::NoKnownError);
        assert_eq!(error.operation, "get_state");

        assert_eq!(engine.operations(), vec!["set_state", "remove_state", "get_state"]);
        assert_eq!(
            engine.last_detail("set_state").as_deref(),
            Some(r#"lobby 1 [("mood", "ok")]"#)
        );
    }

    #[tokio::test]
    async fn test_released_session_makes_proxy_inert() {
        let engine = MockEngine::new();
        let (presence, guard) = presence(&engine);
        guard.release();

        let error = presence.get_user_channels("u1").await.unwrap_err();
        assert_eq!(error.code, ErrorCode::InstanceAlreadyReleased);
        assert!(engine.calls().is_empty());
    }
}
