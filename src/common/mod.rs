//! Flare RTM 公共模块
//!
//! 提供会话层与引擎共享的类型定义、错误模型、事件与观察者接口

pub mod callback;
pub mod error;
pub mod events;
pub mod message_parser;
pub mod metadata;
pub mod protocol;
pub mod types;

// 重新导出常用类型
pub use callback::{DefaultEventCallback, RtmEventCallback};
pub use error::{ErrorCode, ErrorInfo, RawErrorInfo, Result};
pub use events::{
    ConnectionChangeReason, ConnectionState, ConnectionStateEvent, LockDetail, LockEvent,
    LockEventType, MessageEvent, PresenceEvent, PresenceEventType, PresenceIntervalInfo,
    PublisherInfo, StorageEvent, StorageEventType, StorageType, TopicEvent, TopicEventType,
    TopicInfo,
};
pub use metadata::{Metadata, MetadataItem};
pub use protocol::EngineOutcome;
pub use types::{
    ChannelRef, ChannelType, FlagSet, JoinChannelFeature, JoinChannelFeatures, PublishOptions,
    RtmMessage, SubscribeFeature, SubscribeFeatures,
};
