//! Flare RTM 客户端模块
//!
//! [`RtmClient`] 持有引擎与事件分发器，负责登录、订阅、发布等会话级操作，
//! 并创建 Presence、存储、锁代理与流频道句柄。
//!
//! 所有异步操作都返回 [`Operation`]：
//!
//! ```ignore
//! // 直接等待
//! let response = client.login(Some("token")).await?;
//!
//! // 或者以回调方式消费
//! client.logout().on_complete(|result| {
//!     if let Err(error) = result {
//!         eprintln!("{}", error);
//!     }
//! });
//! ```

pub mod config;
pub mod connection_manager;
pub mod dispatcher;
pub mod lock;
pub mod operation;
pub mod presence;
pub mod storage;
pub mod stream_channel;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod mock_engine;

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::client::config::RtmClientConfig;
use crate::client::connection_manager::{ChannelConnection, ConnectionManager};
use crate::client::dispatcher::EventDispatcher;
use crate::client::lock::RtmLock;
use crate::client::operation::{InstanceGuard, Operation};
use crate::client::presence::RtmPresence;
use crate::client::storage::RtmStorage;
use crate::client::stream_channel::RtmStreamChannel;
use crate::client::traits::{EngineEventHandler, RtmEngine, RtmEngineFactory};
use crate::client::types::CommonResponse;
use crate::common::callback::RtmEventCallback;
use crate::common::error::{ErrorCode, ErrorInfo, Result};
use crate::common::events::ConnectionState;
use crate::common::message_parser::{encode_message, encode_parameters};
use crate::common::types::{is_legal_channel_name, PublishOptions, SubscribeFeatures};

/// Flare RTM 客户端
pub struct RtmClient {
    /// 配置
    config: RtmClientConfig,
    /// 引擎
    engine: Arc<dyn RtmEngine>,
    /// 事件分发器
    dispatcher: Arc<EventDispatcher>,
    /// 连接管理器
    connections: Arc<ConnectionManager>,
    /// 释放标记，代理与流频道共享
    guard: InstanceGuard,
}

impl RtmClient {
    /// 创建客户端
    ///
    /// `delegate` 成为第一个观察者；分发器只持有其弱引用，调用方需要自行保持它存活
    pub fn new(
        config: RtmClientConfig,
        factory: &dyn RtmEngineFactory,
        delegate: Option<&Arc<dyn RtmEventCallback>>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|(code, reason)| ErrorInfo::new(code, "new", reason))?;

        let connections = Arc::new(ConnectionManager::new());
        let dispatcher = Arc::new(EventDispatcher::with_observers(
            delegate,
            Arc::clone(&connections),
        ));
        let handler: Arc<dyn EngineEventHandler> = dispatcher.clone();

        let engine = factory.create(&config, handler).map_err(|error| {
            let error = error
                .and_then(|raw| ErrorInfo::from_raw_error(&raw, "new"))
                .unwrap_or_else(|| ErrorInfo::no_known_error("new"));
            warn!(app_id = %config.app_id, "引擎创建失败: {}", error);
            error
        })?;

        info!(app_id = %config.app_id, user_id = %config.user_id, "创建 RTM 客户端");
        Ok(Self {
            config,
            engine,
            dispatcher,
            connections,
            guard: InstanceGuard::new(),
        })
    }

    /// 获取配置
    pub fn config(&self) -> &RtmClientConfig {
        &self.config
    }

    /// 当前用户 ID
    pub fn user_id(&self) -> &str {
        &self.config.user_id
    }

    // ==================== 观察者 ====================

    /// 注册观察者，重复注册无效果
    pub async fn add_delegate(&self, delegate: &Arc<dyn RtmEventCallback>) {
        self.dispatcher.add_observer(delegate).await;
    }

    /// 注销观察者
    pub async fn remove_delegate(&self, delegate: &Arc<dyn RtmEventCallback>) {
        self.dispatcher.remove_observer(delegate).await;
    }

    // ==================== 连接 ====================

    /// 登录，`token` 为空时仅适用于未开启鉴权的项目
    pub fn login(&self, token: Option<&str>) -> Operation<CommonResponse> {
        info!(user_id = %self.config.user_id, "客户端登录");
        let engine = Arc::clone(&self.engine);
        let token = token.map(str::to_string);
        Operation::from_engine("login", vec![self.guard.clone()], async move {
            engine.login(token).await
        })
    }

    /// 登出
    pub fn logout(&self) -> Operation<CommonResponse> {
        info!(user_id = %self.config.user_id, "客户端登出");
        let engine = Arc::clone(&self.engine);
        Operation::from_engine("logout", vec![self.guard.clone()], async move {
            engine.logout().await
        })
    }

    /// 更新登录 Token
    pub fn renew_token(&self, token: &str) -> Operation<CommonResponse> {
        let engine = Arc::clone(&self.engine);
        let token = token.to_string();
        Operation::from_engine("renew_token", vec![self.guard.clone()], async move {
            engine.renew_token(token).await
        })
    }

    /// 频道当前连接状态，未收到过状态事件的频道为未连接
    pub async fn connection_state(&self, channel_name: &str) -> ConnectionState {
        self.connections.state(channel_name).await
    }

    /// 频道连接状态与最近一次变化原因
    pub async fn connection(&self, channel_name: &str) -> Option<ChannelConnection> {
        self.connections.connection(channel_name).await
    }

    /// 当前已连接的频道，按名称排序
    pub async fn connected_channels(&self) -> Vec<String> {
        self.connections.connected_channels().await
    }

    // ==================== 消息频道 ====================

    /// 订阅消息频道，`features` 为空时订阅消息与 Presence
    pub fn subscribe(
        &self,
        channel_name: &str,
        features: Option<SubscribeFeatures>,
    ) -> Operation<CommonResponse> {
        const OPERATION: &str = "subscribe";
        if !is_legal_channel_name(channel_name) {
            let error = ErrorInfo::invalid_channel_name(OPERATION, channel_name);
            return Operation::fail(OPERATION, error);
        }
        let engine = Arc::clone(&self.engine);
        let channel_name = channel_name.to_string();
        let features = features.unwrap_or_default().to_bits();
        Operation::from_engine(OPERATION, vec![self.guard.clone()], async move {
            engine.subscribe(channel_name, features).await
        })
    }

    /// 取消订阅
    pub fn unsubscribe(&self, channel_name: &str) -> Operation<CommonResponse> {
        let engine = Arc::clone(&self.engine);
        let channel_name = channel_name.to_string();
        Operation::from_engine("unsubscribe", vec![self.guard.clone()], async move {
            engine.unsubscribe(channel_name).await
        })
    }

    /// 向消息频道发布消息
    ///
    /// 字符串原样发送，其他类型编码为 JSON；编码失败时不会调用引擎
    pub fn publish<M: Serialize + ?Sized>(
        &self,
        channel_name: &str,
        message: &M,
        options: Option<PublishOptions>,
    ) -> Operation<CommonResponse> {
        const OPERATION: &str = "publish";
        let message = match encode_message(message, OPERATION) {
            Ok(message) => message,
            Err(error) => return Operation::fail(OPERATION, error),
        };
        let engine = Arc::clone(&self.engine);
        let channel_name = channel_name.to_string();
        Operation::from_engine(OPERATION, vec![self.guard.clone()], async move {
            engine.publish(channel_name, message, options).await
        })
    }

    // ==================== 同步操作 ====================

    /// 设置引擎私有参数
    ///
    /// 字符串原样传给引擎，其他类型编码为 JSON
    pub fn set_parameters<P: Serialize + ?Sized>(&self, parameters: &P) -> Result<()> {
        const OPERATION: &str = "set_parameters";
        self.guard.check(OPERATION)?;
        let parameters = encode_parameters(parameters, OPERATION)?;
        let code = self.engine.set_parameters(&parameters);
        self.check_code(code, OPERATION)
    }

    /// 创建流频道句柄，创建后需要 `join` 才能使用
    pub fn create_stream_channel(&self, channel_name: &str) -> Result<RtmStreamChannel> {
        const OPERATION: &str = "create_stream_channel";
        self.guard.check(OPERATION)?;
        if !is_legal_channel_name(channel_name) {
            return Err(ErrorInfo::invalid_channel_name(OPERATION, channel_name));
        }
        let engine = self.engine.create_stream_channel(channel_name).map_err(|error| {
            error
                .and_then(|raw| ErrorInfo::from_raw_error(&raw, OPERATION))
                .unwrap_or_else(|| ErrorInfo::no_known_error(OPERATION))
        })?;
        Ok(RtmStreamChannel::new(channel_name, engine, self.guard.clone()))
    }

    /// 销毁客户端，之后所有调用，包括尚未完成的操作，都以 `InstanceAlreadyReleased` 失败
    pub fn destroy(&self) -> Result<()> {
        const OPERATION: &str = "destroy";
        self.guard.check(OPERATION)?;
        let code = self.engine.destroy();
        self.check_code(code, OPERATION)?;
        self.guard.release();
        info!(user_id = %self.config.user_id, "RTM 客户端已销毁");
        Ok(())
    }

    /// 是否已销毁
    pub fn is_destroyed(&self) -> bool {
        self.guard.is_released()
    }

    fn check_code(&self, code: i32, operation: &str) -> Result<()> {
        let reason = self.engine.error_reason(code).unwrap_or_default();
        match ErrorInfo::from_raw(code, operation, reason) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    // ==================== 功能代理 ====================

    /// Presence 代理
    pub fn presence(&self) -> RtmPresence {
        RtmPresence::new(self.engine.presence(), self.guard.clone())
    }

    /// 存储代理
    pub fn storage(&self) -> RtmStorage {
        RtmStorage::new(self.engine.storage(), self.guard.clone())
    }

    /// 锁代理
    pub fn lock(&self) -> RtmLock {
        RtmLock::new(self.engine.lock(), self.guard.clone())
    }

    // ==================== 辅助 ====================

    /// 错误码的描述，未定义的错误码返回 `None`
    pub fn error_reason(error_code: i32) -> Option<String> {
        ErrorCode::from_i32(error_code).map(|code| code.describe().to_string())
    }

    /// 引擎对错误码的描述，引擎没有描述时回退到 [`RtmClient::error_reason`]
    pub fn engine_error_reason(&self, error_code: i32) -> Option<String> {
        self.engine
            .error_reason(error_code)
            .filter(|reason| !reason.is_empty())
            .or_else(|| Self::error_reason(error_code))
    }

    /// 库版本
    pub fn version() -> &'static str {
        crate::VERSION
    }
}

impl Drop for RtmClient {
    fn drop(&mut self) {
        if self.guard.is_released() {
            return;
        }
        let code = self.engine.destroy();
        if code != crate::common::error::RAW_OK {
            warn!(code, "释放引擎失败");
        }
        self.guard.release();
    }
}

impl std::fmt::Debug for RtmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtmClient")
            .field("app_id", &self.config.app_id)
            .field("user_id", &self.config.user_id)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
