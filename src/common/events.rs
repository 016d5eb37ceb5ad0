//! 事件定义模块
//!
//! 引擎主动上报的强类型事件，以及从原始记录构造事件的转换器。
//! 构造可能失败（载荷缺失、必需字段缺失），失败时返回 `None`，由分发器丢弃。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

use crate::common::metadata::Metadata;
use crate::common::protocol::{
    states_to_map, user_states_to_map, RawLockDetail, RawPresenceIntervalInfo,
};
use crate::common::types::{ChannelRef, ChannelType, RtmMessage};

// ==================== 连接状态 ====================

/// 连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    Unknown = -1,
    Disconnected = 1,
    Connecting = 2,
    Connected = 3,
    Reconnecting = 4,
    Failed = 5,
}

impl ConnectionState {
    /// 从原始取值创建，未知取值归为 `Unknown`
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => ConnectionState::Disconnected,
            2 => ConnectionState::Connecting,
            3 => ConnectionState::Connected,
            4 => ConnectionState::Reconnecting,
            5 => ConnectionState::Failed,
            _ => ConnectionState::Unknown,
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Disconnected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ConnectionState::Unknown => "unknown",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// 连接状态变化原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionChangeReason {
    Unknown = -1,
    Connecting = 0,
    JoinSuccess = 1,
    Interrupted = 2,
    BannedByServer = 3,
    JoinFailed = 4,
    LeaveChannel = 5,
    InvalidAppId = 6,
    InvalidChannelName = 7,
    InvalidToken = 8,
    TokenExpired = 9,
    RejectedByServer = 10,
    SettingProxyServer = 11,
    RenewToken = 12,
    ClientIpAddressChanged = 13,
    KeepAliveTimeout = 14,
    RejoinSuccess = 15,
    ChangedLost = 16,
    EchoTest = 17,
    ClientIpAddressChangedByUser = 18,
    SameUidLogin = 19,
    TooManyBroadcasters = 20,
    LicenseValidationFailure = 21,
    StreamChannelNotAvailable = 22,
    LoginSuccess = 10001,
    Logout = 10002,
    PresenceNotReady = 10003,
}

impl ConnectionChangeReason {
    const ALL: &'static [ConnectionChangeReason] = &[
        ConnectionChangeReason::Unknown,
        ConnectionChangeReason::Connecting,
        ConnectionChangeReason::JoinSuccess,
        ConnectionChangeReason::Interrupted,
        ConnectionChangeReason::BannedByServer,
        ConnectionChangeReason::JoinFailed,
        ConnectionChangeReason::LeaveChannel,
        ConnectionChangeReason::InvalidAppId,
        ConnectionChangeReason::InvalidChannelName,
        ConnectionChangeReason::InvalidToken,
        ConnectionChangeReason::TokenExpired,
        ConnectionChangeReason::RejectedByServer,
        ConnectionChangeReason::SettingProxyServer,
        ConnectionChangeReason::RenewToken,
        ConnectionChangeReason::ClientIpAddressChanged,
        ConnectionChangeReason::KeepAliveTimeout,
        ConnectionChangeReason::RejoinSuccess,
        ConnectionChangeReason::ChangedLost,
        ConnectionChangeReason::EchoTest,
        ConnectionChangeReason::ClientIpAddressChangedByUser,
        ConnectionChangeReason::SameUidLogin,
        ConnectionChangeReason::TooManyBroadcasters,
        ConnectionChangeReason::LicenseValidationFailure,
        ConnectionChangeReason::StreamChannelNotAvailable,
        ConnectionChangeReason::LoginSuccess,
        ConnectionChangeReason::Logout,
        ConnectionChangeReason::PresenceNotReady,
    ];

    /// 从原始取值创建，未知取值归为 `Unknown`
    pub fn from_raw(raw: i32) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|reason| *reason as i32 == raw)
            .unwrap_or(ConnectionChangeReason::Unknown)
    }

    pub fn description(&self) -> &'static str {
        match self {
            ConnectionChangeReason::Unknown => "unknown",
            ConnectionChangeReason::Connecting => "connecting",
            ConnectionChangeReason::JoinSuccess => "joinSuccess",
            ConnectionChangeReason::Interrupted => "interrupted",
            ConnectionChangeReason::BannedByServer => "bannedByServer",
            ConnectionChangeReason::JoinFailed => "joinFailed",
            ConnectionChangeReason::LeaveChannel => "leaveChannel",
            ConnectionChangeReason::InvalidAppId => "invalidAppId",
            ConnectionChangeReason::InvalidChannelName => "invalidChannelName",
            ConnectionChangeReason::InvalidToken => "invalidToken",
            ConnectionChangeReason::TokenExpired => "tokenExpired",
            ConnectionChangeReason::RejectedByServer => "rejectedByServer",
            ConnectionChangeReason::SettingProxyServer => "settingProxyServer",
            ConnectionChangeReason::RenewToken => "renewToken",
            ConnectionChangeReason::ClientIpAddressChanged => "clientIpAddressChanged",
            ConnectionChangeReason::KeepAliveTimeout => "keepAliveTimeout",
            ConnectionChangeReason::RejoinSuccess => "rejoinSuccess",
            ConnectionChangeReason::ChangedLost => "changedLost",
            ConnectionChangeReason::EchoTest => "echoTest",
            ConnectionChangeReason::ClientIpAddressChangedByUser => "clientIpAddressChangedByUser",
            ConnectionChangeReason::SameUidLogin => "sameUidLogin",
            ConnectionChangeReason::TooManyBroadcasters => "tooManyBroadcasters",
            ConnectionChangeReason::LicenseValidationFailure => "licenseValidationFailure",
            ConnectionChangeReason::StreamChannelNotAvailable => "streamChannelNotAvailable",
            ConnectionChangeReason::LoginSuccess => "loginSuccess",
            ConnectionChangeReason::Logout => "logout",
            ConnectionChangeReason::PresenceNotReady => "presenceNotReady",
        }
    }
}

impl fmt::Display for ConnectionChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// 连接状态变化事件，状态变化总是携带原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStateEvent {
    pub channel_name: String,
    pub state: ConnectionState,
    pub reason: ConnectionChangeReason,
}

// ==================== 消息事件 ====================

/// 消息事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel: ChannelRef,
    pub channel_topic: Option<String>,
    pub message: RtmMessage,
    pub publisher: String,
    pub custom_type: Option<String>,
}

// ==================== Presence 事件 ====================

/// Presence 周期汇总
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceIntervalInfo {
    pub join_user_list: Vec<String>,
    pub leave_user_list: Vec<String>,
    pub timeout_user_list: Vec<String>,
    pub user_state_list: HashMap<String, HashMap<String, String>>,
}

impl PresenceIntervalInfo {
    fn from_raw(raw: &RawPresenceIntervalInfo) -> Self {
        Self {
            join_user_list: raw.join_user_list.clone(),
            leave_user_list: raw.leave_user_list.clone(),
            timeout_user_list: raw.timeout_user_list.clone(),
            user_state_list: user_states_to_map(&raw.user_state_list),
        }
    }
}

/// Presence 事件类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceEventType {
    None,
    /// 全量快照：用户 → 状态
    Snapshot(HashMap<String, HashMap<String, String>>),
    /// 周期汇总
    Interval(PresenceIntervalInfo),
    RemoteJoinChannel { user: String },
    RemoteLeaveChannel { user: String },
    RemoteConnectionTimeout { user: String },
    RemoteStateChanged { user: String, states: HashMap<String, String> },
    #[deprecated(note = "引擎不再上报该类型，转换器不会构造它")]
    ErrorOutOfService { user: String },
}

/// Presence 事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEvent {
    pub event_type: PresenceEventType,
    pub channel: ChannelRef,
    pub publisher: Option<String>,
    pub states: HashMap<String, String>,
}

impl PresenceEvent {
    /// 周期汇总，仅 interval 类型有
    pub fn interval(&self) -> Option<&PresenceIntervalInfo> {
        match &self.event_type {
            PresenceEventType::Interval(info) => Some(info),
            _ => None,
        }
    }
}

// ==================== 锁事件 ====================

/// 锁事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockEventType {
    None = 0,
    Snapshot = 1,
    LockSet = 2,
    LockRemoved = 3,
    LockAcquired = 4,
    LockReleased = 5,
    LockExpired = 6,
}

impl LockEventType {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => LockEventType::Snapshot,
            2 => LockEventType::LockSet,
            3 => LockEventType::LockRemoved,
            4 => LockEventType::LockAcquired,
            5 => LockEventType::LockReleased,
            6 => LockEventType::LockExpired,
            _ => LockEventType::None,
        }
    }
}

/// 锁详情
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockDetail {
    pub lock_name: String,
    pub owner: String,
    /// 过期时间（秒）
    pub ttl: i32,
}

impl From<RawLockDetail> for LockDetail {
    fn from(raw: RawLockDetail) -> Self {
        Self {
            lock_name: raw.lock_name,
            owner: raw.owner,
            ttl: raw.ttl,
        }
    }
}

/// 锁事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockEvent {
    pub channel: ChannelRef,
    pub event_type: LockEventType,
    pub lock_detail_list: Vec<LockDetail>,
}

// ==================== 存储事件 ====================

/// 存储作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageType {
    None = 0,
    User = 1,
    Channel = 2,
}

impl StorageType {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => StorageType::User,
            2 => StorageType::Channel,
            _ => StorageType::None,
        }
    }
}

/// 存储事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageEventType {
    None = 0,
    Snapshot = 1,
    Set = 2,
    Update = 3,
    Remove = 4,
}

impl StorageEventType {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => StorageEventType::Snapshot,
            2 => StorageEventType::Set,
            3 => StorageEventType::Update,
            4 => StorageEventType::Remove,
            _ => StorageEventType::None,
        }
    }
}

/// 存储事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub channel_type: ChannelType,
    pub storage_type: StorageType,
    pub event_type: StorageEventType,
    /// 用户 ID 或频道名
    pub target: String,
    pub data: Metadata,
}

// ==================== Topic 事件 ====================

/// Topic 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TopicEventType {
    None = 0,
    Snapshot = 1,
    RemoteJoinTopic = 2,
    RemoteLeaveTopic = 3,
}

impl TopicEventType {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => TopicEventType::Snapshot,
            2 => TopicEventType::RemoteJoinTopic,
            3 => TopicEventType::RemoteLeaveTopic,
            _ => TopicEventType::None,
        }
    }
}

/// Topic 发布者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherInfo {
    pub publisher_user_id: String,
    pub publisher_meta: Option<String>,
}

/// Topic 信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicInfo {
    pub topic: String,
    pub publishers: Vec<PublisherInfo>,
}

/// Topic 事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicEvent {
    pub event_type: TopicEventType,
    pub channel_name: String,
    pub publisher: String,
    pub topic_infos: Vec<TopicInfo>,
}

// ==================== 转换器 ====================

/// 原始记录到强类型事件的转换
pub mod converters {
    use super::*;
    use crate::common::protocol::{
        RawLockEvent, RawMessageEvent, RawPresenceEvent, RawStorageEvent, RawTopicEvent,
    };

    const PRESENCE_NONE: i32 = 0;
    const PRESENCE_SNAPSHOT: i32 = 1;
    const PRESENCE_INTERVAL: i32 = 2;
    const PRESENCE_REMOTE_JOIN: i32 = 3;
    const PRESENCE_REMOTE_LEAVE: i32 = 4;
    const PRESENCE_REMOTE_TIMEOUT: i32 = 5;
    const PRESENCE_REMOTE_STATE_CHANGED: i32 = 6;
    const PRESENCE_ERROR_OUT_OF_SERVICE: i32 = 7;

    /// 转换为消息事件，两种载荷都缺失时返回 `None`
    pub fn to_message_event(raw: &RawMessageEvent) -> Option<MessageEvent> {
        let message = RtmMessage::from_parts(raw.message_text.clone(), raw.message_data.clone())?;
        Some(MessageEvent {
            channel: ChannelRef::new(
                raw.channel_name.clone(),
                ChannelType::from_raw(raw.channel_type),
            ),
            channel_topic: raw.channel_topic.clone(),
            message,
            publisher: raw.publisher.clone(),
            custom_type: raw.custom_type.clone(),
        })
    }

    /// 转换为 Presence 事件
    ///
    /// 需要发布者的类型缺少发布者时降级为 `None` 类型；
    /// interval 类型缺少汇总数据时整个事件返回 `None`。
    pub fn to_presence_event(raw: &RawPresenceEvent) -> Option<PresenceEvent> {
        let states = states_to_map(&raw.states);
        let event_type = match raw.event_type {
            PRESENCE_SNAPSHOT => PresenceEventType::Snapshot(user_states_to_map(&raw.snapshot)),
            PRESENCE_INTERVAL => match &raw.interval {
                Some(interval) => {
                    PresenceEventType::Interval(PresenceIntervalInfo::from_raw(interval))
                }
                None => {
                    warn!(channel = %raw.channel_name, "Presence interval 事件缺少汇总数据，已丢弃");
                    return None;
                }
            },
            PRESENCE_REMOTE_JOIN | PRESENCE_REMOTE_LEAVE | PRESENCE_REMOTE_TIMEOUT => {
                publisher_event_type(raw.event_type, raw.publisher.as_deref())
            }
            PRESENCE_REMOTE_STATE_CHANGED => match &raw.publisher {
                Some(user) => PresenceEventType::RemoteStateChanged {
                    user: user.clone(),
                    states: states.clone(),
                },
                None => {
                    warn!(channel = %raw.channel_name, "remoteStateChanged 缺少发布者，降级为 none");
                    PresenceEventType::None
                }
            },
            PRESENCE_ERROR_OUT_OF_SERVICE => {
                warn!(channel = %raw.channel_name, "errorOutOfService 已废弃，降级为 none");
                PresenceEventType::None
            }
            PRESENCE_NONE => PresenceEventType::None,
            other => {
                warn!(event_type = other, "未知的 Presence 事件类型，降级为 none");
                PresenceEventType::None
            }
        };

        Some(PresenceEvent {
            event_type,
            channel: ChannelRef::new(
                raw.channel_name.clone(),
                ChannelType::from_raw(raw.channel_type),
            ),
            publisher: raw.publisher.clone(),
            states,
        })
    }

    fn publisher_event_type(event_type: i32, publisher: Option<&str>) -> PresenceEventType {
        let user = match publisher {
            Some(user) => user.to_string(),
            None => {
                warn!(event_type, "Presence 事件缺少发布者，降级为 none");
                return PresenceEventType::None;
            }
        };
        match event_type {
            PRESENCE_REMOTE_JOIN => PresenceEventType::RemoteJoinChannel { user },
            PRESENCE_REMOTE_LEAVE => PresenceEventType::RemoteLeaveChannel { user },
            PRESENCE_REMOTE_TIMEOUT => PresenceEventType::RemoteConnectionTimeout { user },
            _ => PresenceEventType::None,
        }
    }

    /// 转换为锁事件
    pub fn to_lock_event(raw: &RawLockEvent) -> Option<LockEvent> {
        Some(LockEvent {
            channel: ChannelRef::new(
                raw.channel_name.clone(),
                ChannelType::from_raw(raw.channel_type),
            ),
            event_type: LockEventType::from_raw(raw.event_type),
            lock_detail_list: raw.lock_detail_list.iter().cloned().map(LockDetail::from).collect(),
        })
    }

    /// 转换为存储事件，缺少数据时使用空元数据
    pub fn to_storage_event(raw: &RawStorageEvent) -> Option<StorageEvent> {
        let data = match &raw.data {
            Some(data) => Metadata::from_raw(data.clone()),
            None => Metadata::new(),
        };
        Some(StorageEvent {
            channel_type: ChannelType::from_raw(raw.channel_type),
            storage_type: StorageType::from_raw(raw.storage_type),
            event_type: StorageEventType::from_raw(raw.event_type),
            target: raw.target.clone(),
            data,
        })
    }

    /// 转换为 Topic 事件
    pub fn to_topic_event(raw: &RawTopicEvent) -> Option<TopicEvent> {
        let topic_infos = raw
            .topic_infos
            .iter()
            .map(|info| TopicInfo {
                topic: info.topic.clone(),
                publishers: info
                    .publishers
                    .iter()
                    .map(|publisher| PublisherInfo {
                        publisher_user_id: publisher.publisher_user_id.clone(),
                        publisher_meta: publisher.publisher_meta.clone(),
                    })
                    .collect(),
            })
            .collect();
        Some(TopicEvent {
            event_type: TopicEventType::from_raw(raw.event_type),
            channel_name: raw.channel_name.clone(),
            publisher: raw.publisher.clone(),
            topic_infos,
        })
    }

    /// 转换为连接状态变化事件
    pub fn to_connection_state_event(
        channel_name: &str,
        state: i32,
        reason: i32,
    ) -> ConnectionStateEvent {
        ConnectionStateEvent {
            channel_name: channel_name.to_string(),
            state: ConnectionState::from_raw(state),
            reason: ConnectionChangeReason::from_raw(reason),
        }
    }
}
