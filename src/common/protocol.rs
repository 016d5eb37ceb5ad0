//! 引擎原始记录
//!
//! 引擎请求的应答与主动上报事件的原始形态。字段保持引擎语义，
//! 可选字段缺失时由上层决定丢弃或降级。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::common::error::RawErrorInfo;

/// 引擎调用的原始结果：应答与错误都可能缺失
pub type EngineOutcome<R> = (Option<R>, Option<RawErrorInfo>);

// ==================== 应答 ====================

/// 通用应答
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCommonResponse {
    pub channel_name: Option<String>,
    pub channel_type: i32,
    pub user_id: Option<String>,
}

/// 用户状态
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUserState {
    pub user_id: String,
    pub states: Vec<(String, String)>,
}

/// Topic 订阅应答
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTopicSubscriptionResponse {
    pub succeed_users: Vec<String>,
    pub failed_users: Vec<String>,
}

/// 元数据项
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMetadataItem {
    pub key: String,
    pub value: String,
    pub author_user_id: String,
    pub revision: i64,
    pub update_ts: u64,
}

/// 元数据
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMetadata {
    pub major_revision: i64,
    pub items: Vec<RawMetadataItem>,
}

/// 元数据写入选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMetadataOptions {
    pub record_ts: bool,
    pub record_user_id: bool,
}

/// 获取元数据应答
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawGetMetadataResponse {
    pub data: Option<RawMetadata>,
}

/// 锁详情
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLockDetail {
    pub lock_name: String,
    pub owner: String,
    pub ttl: i32,
}

/// 获取锁列表应答
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawGetLocksResponse {
    pub lock_detail_list: Vec<RawLockDetail>,
}

/// 在线用户应答
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOnlineUsersResponse {
    pub total_occupancy: i32,
    pub user_state_list: Vec<RawUserState>,
    pub next_page: Option<String>,
}

/// 频道描述
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChannelInfo {
    pub channel_name: String,
    pub channel_type: i32,
}

/// 用户所在频道应答
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUserChannelsResponse {
    pub total_channel: i32,
    pub channels: Vec<RawChannelInfo>,
}

/// Presence 状态应答
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPresenceGetStateResponse {
    pub state: RawUserState,
}

/// Topic 订阅用户列表应答
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSubscribedUserListResponse {
    pub users: Vec<String>,
}

/// 加入 Topic 选项
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawJoinTopicOptions {
    pub qos: i32,
    pub priority: i32,
    pub meta: Option<String>,
    pub sync_with_media: bool,
}

// ==================== 事件 ====================

/// 消息事件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessageEvent {
    pub channel_type: i32,
    pub channel_name: String,
    pub channel_topic: Option<String>,
    /// 文本载荷
    pub message_text: Option<String>,
    /// 二进制载荷
    pub message_data: Option<Vec<u8>>,
    pub publisher: String,
    pub custom_type: Option<String>,
}

/// Presence 周期汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPresenceIntervalInfo {
    pub join_user_list: Vec<String>,
    pub leave_user_list: Vec<String>,
    pub timeout_user_list: Vec<String>,
    pub user_state_list: Vec<RawUserState>,
}

/// Presence 事件
///
/// `event_type`：0 none, 1 snapshot, 2 interval, 3 remoteJoinChannel,
/// 4 remoteLeaveChannel, 5 remoteConnectionTimeout, 6 remoteStateChanged,
/// 7 errorOutOfService
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPresenceEvent {
    pub event_type: i32,
    pub channel_type: i32,
    pub channel_name: String,
    pub publisher: Option<String>,
    pub states: Vec<(String, String)>,
    pub interval: Option<RawPresenceIntervalInfo>,
    pub snapshot: Vec<RawUserState>,
}

/// 锁事件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLockEvent {
    pub channel_type: i32,
    pub event_type: i32,
    pub channel_name: String,
    pub lock_detail_list: Vec<RawLockDetail>,
}

/// 存储事件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStorageEvent {
    pub channel_type: i32,
    pub storage_type: i32,
    pub event_type: i32,
    pub target: String,
    pub data: Option<RawMetadata>,
}

/// Topic 发布者
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPublisherInfo {
    pub publisher_user_id: String,
    pub publisher_meta: Option<String>,
}

/// Topic 信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTopicInfo {
    pub topic: String,
    pub publishers: Vec<RawPublisherInfo>,
}

/// Topic 事件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTopicEvent {
    pub event_type: i32,
    pub channel_name: String,
    pub publisher: String,
    pub topic_infos: Vec<RawTopicInfo>,
}

/// 状态键值对转为映射
pub(crate) fn states_to_map(states: &[(String, String)]) -> HashMap<String, String> {
    states.iter().cloned().collect()
}

/// 用户状态列表转为 用户 → 状态 映射
pub(crate) fn user_states_to_map(
    list: &[RawUserState],
) -> HashMap<String, HashMap<String, String>> {
    list.iter()
        .map(|state| (state.user_id.clone(), states_to_map(&state.states)))
        .collect()
}
