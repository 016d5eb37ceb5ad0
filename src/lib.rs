//! Flare RTM - 实时消息会话层
//!
//! ## 功能特性
//!
//! - **会话生命周期**: 登录、登出、Token 续期与显式销毁
//! - **消息频道**: 频道订阅与消息发布，消息可以是字符串或任意可序列化类型
//! - **流频道**: 频道内按 Topic 发布与订阅
//! - **频道功能**: Presence、元数据存储与分布式锁
//! - **统一结果**: 每个操作既可以 `.await`，也可以注册完成回调，两种方式结果一致
//! - **事件分发**: 引擎事件转换为强类型事件，按注册顺序投递给所有观察者
//!
//! 传输、加密与协议由外部引擎实现，本库通过 [`client::traits`] 中的 trait 与之交互。
//!
//! ## 使用方式
//!
//! ```toml
//! [dependencies]
//! flare-rtm = { version = "0.1", features = ["client"] }
//! ```
//!

// 公共模块
pub mod common;

// 客户端模块 (需要 client feature)
#[cfg(feature = "client")]
pub mod client;

// 重新导出常用类型
pub use common::{
    ChannelRef, ChannelType, ErrorCode, ErrorInfo, Metadata, MetadataItem, Result, RtmEventCallback,
    RtmMessage,
};

#[cfg(feature = "client")]
pub use client::{
    config::{RtmClientConfig, RtmClientConfigBuilder},
    operation::Operation,
    RtmClient,
};

// 版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
