//! 客户端类型定义模块
//!
//! 引擎应答的强类型形态，每个类型通过 [`EngineResponse`] 从原始应答构造

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::client::operation::EngineResponse;
use crate::common::events::LockDetail;
use crate::common::metadata::Metadata;
use crate::common::protocol::{
    states_to_map, user_states_to_map, RawCommonResponse, RawGetLocksResponse,
    RawGetMetadataResponse, RawOnlineUsersResponse, RawPresenceGetStateResponse,
    RawSubscribedUserListResponse, RawTopicSubscriptionResponse, RawUserChannelsResponse,
};
use crate::common::types::{ChannelRef, ChannelType};

/// 通用应答
///
/// 大多数操作只关心成功与否，引擎带回的频道与用户信息原样保留
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonResponse {
    pub channel_name: Option<String>,
    pub channel_type: ChannelType,
    pub user_id: Option<String>,
}

impl EngineResponse for CommonResponse {
    type Raw = RawCommonResponse;

    fn from_engine(raw: RawCommonResponse) -> Self {
        Self {
            channel_name: raw.channel_name,
            channel_type: ChannelType::from_raw(raw.channel_type),
            user_id: raw.user_id,
        }
    }
}

/// Topic 订阅结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSubscriptionResponse {
    /// 订阅成功的用户
    pub succeed_users: Vec<String>,
    /// 订阅失败的用户
    pub failed_users: Vec<String>,
}

impl EngineResponse for TopicSubscriptionResponse {
    type Raw = RawTopicSubscriptionResponse;

    fn from_engine(raw: RawTopicSubscriptionResponse) -> Self {
        Self {
            succeed_users: raw.succeed_users,
            failed_users: raw.failed_users,
        }
    }
}

/// 获取元数据结果
#[derive(Debug, Clone)]
pub struct GetMetadataResponse {
    /// 目标尚无元数据时为空
    pub data: Option<Metadata>,
}

impl EngineResponse for GetMetadataResponse {
    type Raw = RawGetMetadataResponse;

    fn from_engine(raw: RawGetMetadataResponse) -> Self {
        Self {
            data: raw.data.map(Metadata::from_raw),
        }
    }
}

/// 获取锁列表结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetLocksResponse {
    pub lock_detail_list: Vec<LockDetail>,
}

impl EngineResponse for GetLocksResponse {
    type Raw = RawGetLocksResponse;

    fn from_engine(raw: RawGetLocksResponse) -> Self {
        Self {
            lock_detail_list: raw.lock_detail_list.into_iter().map(LockDetail::from).collect(),
        }
    }
}

/// 频道在线用户
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineUsersResponse {
    /// 频道总人数，可能大于本页返回的用户数
    pub total_users: i32,
    /// 用户 → 状态
    pub user_state_list: HashMap<String, HashMap<String, String>>,
    /// 下一页游标，没有更多时为空
    pub next_page: Option<String>,
}

impl OnlineUsersResponse {
    /// 本页用户，按用户 ID 排序
    pub fn users(&self) -> Vec<String> {
        let mut users: Vec<String> = self.user_state_list.keys().cloned().collect();
        users.sort();
        users
    }
}

impl EngineResponse for OnlineUsersResponse {
    type Raw = RawOnlineUsersResponse;

    fn from_engine(raw: RawOnlineUsersResponse) -> Self {
        Self {
            total_users: raw.total_occupancy,
            user_state_list: user_states_to_map(&raw.user_state_list),
            next_page: raw.next_page.filter(|page| !page.is_empty()),
        }
    }
}

#[deprecated(note = "使用 OnlineUsersResponse")]
pub type WhoNowResponse = OnlineUsersResponse;

/// 用户所在频道
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserChannelsResponse {
    pub subscribed_channel_count: i32,
    pub channels: Vec<ChannelRef>,
}

impl EngineResponse for UserChannelsResponse {
    type Raw = RawUserChannelsResponse;

    fn from_engine(raw: RawUserChannelsResponse) -> Self {
        Self {
            subscribed_channel_count: raw.total_channel,
            channels: raw
                .channels
                .into_iter()
                .map(|channel| {
                    let channel_type = ChannelType::from_raw(channel.channel_type);
                    ChannelRef::new(channel.channel_name, channel_type)
                })
                .collect(),
        }
    }
}

#[deprecated(note = "使用 UserChannelsResponse")]
pub type WhereNowResponse = UserChannelsResponse;

/// 用户 Presence 状态
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceGetStateResponse {
    pub user_id: String,
    pub states: HashMap<String, String>,
}

impl EngineResponse for PresenceGetStateResponse {
    type Raw = RawPresenceGetStateResponse;

    fn from_engine(raw: RawPresenceGetStateResponse) -> Self {
        Self {
            states: states_to_map(&raw.state.states),
            user_id: raw.state.user_id,
        }
    }
}

/// Topic 已订阅用户列表
impl EngineResponse for Vec<String> {
    type Raw = RawSubscribedUserListResponse;

    fn from_engine(raw: RawSubscribedUserListResponse) -> Self {
        raw.users
    }
}
