//! Flare RTM 类型定义
//!
//! 频道引用、特性位集合、消息载荷等客户端与引擎共享的类型

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ==================== 频道 ====================

/// 频道类型
///
/// 与引擎的原始取值一一对应，未知取值归为 `None`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    /// 未知类型
    None = 0,
    /// 消息频道，简单的发布/订阅
    Message = 1,
    /// 流频道，支持 Topic
    Stream = 2,
    /// 用户频道
    User = 3,
}

impl ChannelType {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// 从原始取值创建，未知取值归为 `None`
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => ChannelType::Message,
            2 => ChannelType::Stream,
            3 => ChannelType::User,
            _ => ChannelType::None,
        }
    }
}

impl Default for ChannelType {
    fn default() -> Self {
        ChannelType::None
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelType::None => write!(f, "none"),
            ChannelType::Message => write!(f, "message"),
            ChannelType::Stream => write!(f, "stream"),
            ChannelType::User => write!(f, "user"),
        }
    }
}

/// 频道引用
///
/// 频道名与类型的不可变组合，作为各功能代理的作用域键
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelRef {
    name: String,
    channel_type: ChannelType,
}

impl ChannelRef {
    pub fn new(name: impl Into<String>, channel_type: ChannelType) -> Self {
        Self {
            name: name.into(),
            channel_type,
        }
    }

    /// 消息频道
    pub fn message(name: impl Into<String>) -> Self {
        Self::new(name, ChannelType::Message)
    }

    /// 流频道
    pub fn stream(name: impl Into<String>) -> Self {
        Self::new(name, ChannelType::Stream)
    }

    /// 用户频道
    pub fn user(name: impl Into<String>) -> Self {
        Self::new(name, ChannelType::User)
    }

    /// 类型未知的频道
    pub fn none(name: impl Into<String>) -> Self {
        Self::new(name, ChannelType::None)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channel_type(&self) -> ChannelType {
        self.channel_type
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel_type, self.name)
    }
}

// ==================== 合法字符集 ====================

/// 频道名允许的特殊字符（含空格）
pub const CHANNEL_NAME_SPECIALS: &str = " !#$%&()+-:;<=>.?@[]^_{|}~,";

/// 字符是否可用于频道名：ASCII 字母、数字与 [`CHANNEL_NAME_SPECIALS`]
pub fn is_legal_channel_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || CHANNEL_NAME_SPECIALS.contains(c)
}

/// 频道名是否合法，空名称不合法
pub fn is_legal_channel_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_legal_channel_char)
}

/// 用户名与频道名共用同一字符集
pub fn is_legal_user_name(name: &str) -> bool {
    is_legal_channel_name(name)
}

// ==================== 特性位集合 ====================

/// 可编码为位掩码的标志
pub trait Flag: Copy + Ord + fmt::Debug + 'static {
    /// 全部标志
    const ALL: &'static [Self];

    /// 标志对应的位
    fn bits(self) -> u32;
}

/// 标志集合
///
/// 内部是真正的集合，位掩码只在与引擎交互时编码/解码
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FlagSet<F: Flag> {
    flags: BTreeSet<F>,
}

impl<F: Flag> FlagSet<F> {
    pub fn empty() -> Self {
        Self {
            flags: BTreeSet::new(),
        }
    }

    pub fn with(mut self, flag: F) -> Self {
        self.flags.insert(flag);
        self
    }

    pub fn insert(&mut self, flag: F) -> bool {
        self.flags.insert(flag)
    }

    pub fn remove(&mut self, flag: F) -> bool {
        self.flags.remove(&flag)
    }

    pub fn contains(&self, flag: F) -> bool {
        self.flags.contains(&flag)
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            flags: self.flags.union(&other.flags).copied().collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = F> + '_ {
        self.flags.iter().copied()
    }

    /// 编码为位掩码
    pub fn to_bits(&self) -> u32 {
        self.flags.iter().fold(0, |acc, flag| acc | flag.bits())
    }

    /// 从位掩码解码，未定义的位被忽略
    pub fn from_bits(bits: u32) -> Self {
        F::ALL
            .iter()
            .copied()
            .filter(|flag| flag.bits() != 0 && bits & flag.bits() == flag.bits())
            .collect()
    }
}

impl<F: Flag> FromIterator<F> for FlagSet<F> {
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        Self {
            flags: iter.into_iter().collect(),
        }
    }
}

impl<F: Flag, const N: usize> From<[F; N]> for FlagSet<F> {
    fn from(flags: [F; N]) -> Self {
        flags.into_iter().collect()
    }
}

impl<F: Flag> fmt::Debug for FlagSet<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.flags.iter()).finish()
    }
}

impl<F: Flag> Serialize for FlagSet<F> {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.to_bits())
    }
}

impl<'de, F: Flag> Deserialize<'de> for FlagSet<F> {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let bits = u32::deserialize(deserializer)?;
        Ok(Self::from_bits(bits))
    }
}

/// 订阅频道时启用的特性
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubscribeFeature {
    Messages,
    Metadata,
    Presence,
    Lock,
}

impl Flag for SubscribeFeature {
    const ALL: &'static [Self] = &[
        SubscribeFeature::Messages,
        SubscribeFeature::Metadata,
        SubscribeFeature::Presence,
        SubscribeFeature::Lock,
    ];

    fn bits(self) -> u32 {
        match self {
            SubscribeFeature::Messages => 0x1,
            SubscribeFeature::Metadata => 0x2,
            SubscribeFeature::Presence => 0x4,
            SubscribeFeature::Lock => 0x8,
        }
    }
}

pub type SubscribeFeatures = FlagSet<SubscribeFeature>;

impl Default for FlagSet<SubscribeFeature> {
    /// 默认订阅消息与 Presence
    fn default() -> Self {
        FlagSet::from([SubscribeFeature::Messages, SubscribeFeature::Presence])
    }
}

/// 加入流频道时启用的特性
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JoinChannelFeature {
    Presence,
    Metadata,
    Lock,
}

impl Flag for JoinChannelFeature {
    const ALL: &'static [Self] = &[
        JoinChannelFeature::Presence,
        JoinChannelFeature::Metadata,
        JoinChannelFeature::Lock,
    ];

    fn bits(self) -> u32 {
        match self {
            JoinChannelFeature::Presence => 0x1,
            JoinChannelFeature::Metadata => 0x2,
            JoinChannelFeature::Lock => 0x4,
        }
    }
}

pub type JoinChannelFeatures = FlagSet<JoinChannelFeature>;

impl Default for FlagSet<JoinChannelFeature> {
    /// 默认仅启用 Presence
    fn default() -> Self {
        FlagSet::from([JoinChannelFeature::Presence])
    }
}

// ==================== 消息 ====================

/// 消息载荷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RtmMessage {
    /// 文本消息
    Text(String),
    /// 二进制消息
    Binary(Vec<u8>),
}

impl RtmMessage {
    /// 从引擎载荷创建，两种载荷都缺失时返回 `None`
    pub fn from_parts(text: Option<String>, data: Option<Vec<u8>>) -> Option<Self> {
        match (text, data) {
            (Some(text), _) => Some(RtmMessage::Text(text)),
            (None, Some(data)) => Some(RtmMessage::Binary(data)),
            (None, None) => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            RtmMessage::Text(text) => Some(text),
            RtmMessage::Binary(_) => None,
        }
    }

    pub fn data(&self) -> Option<&[u8]> {
        match self {
            RtmMessage::Text(_) => None,
            RtmMessage::Binary(data) => Some(data),
        }
    }

    /// 按 JSON 解码为调用方指定的类型，失败返回 `None`
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        match self {
            RtmMessage::Text(text) => serde_json::from_str(text).ok(),
            RtmMessage::Binary(data) => serde_json::from_slice(data).ok(),
        }
    }
}

/// 发布选项
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOptions {
    /// 自定义消息类型
    pub custom_type: Option<String>,
    /// 发送时间戳（毫秒），0 表示由引擎决定
    pub send_ts: u64,
}

impl PublishOptions {
    pub fn new(custom_type: impl Into<String>) -> Self {
        Self {
            custom_type: Some(custom_type.into()),
            send_ts: 0,
        }
    }

    pub fn with_send_ts(mut self, send_ts: u64) -> Self {
        self.send_ts = send_ts;
        self
    }
}
