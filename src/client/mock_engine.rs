//! 测试用脚本化引擎
//!
//! 记录收到的每次调用，按操作名返回预先设定的结果：
//! 默认成功并带回空应答，也可以设为原始错误、空结果或指定应答。

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::client::config::RtmClientConfig;
use crate::client::traits::{
    EngineEventHandler, LockEngine, MetadataOperation, PresenceEngine, RtmEngine,
    RtmEngineFactory, StorageEngine, StreamChannelEngine,
};
use crate::common::error::{ErrorCode, RawErrorInfo, RAW_OK};
use crate::common::protocol::{
    EngineOutcome, RawCommonResponse, RawGetLocksResponse, RawGetMetadataResponse,
    RawJoinTopicOptions, RawMetadata, RawMetadataOptions, RawOnlineUsersResponse,
    RawPresenceGetStateResponse, RawSubscribedUserListResponse, RawTopicSubscriptionResponse,
    RawUserChannelsResponse,
};
use crate::common::types::PublishOptions;

/// 工厂拒绝并带回 invalidAppId 的 App ID
pub(crate) const BAD_APP_ID: &str = "bad-app-id";
/// 工厂拒绝且不带错误码的 App ID
pub(crate) const SILENT_APP_ID: &str = "silent-app-id";

/// 安装测试日志输出，重复调用无副作用
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// 单个操作的脚本
#[derive(Debug, Clone)]
pub(crate) enum Script {
    /// 成功，应答为给定 JSON；`None` 表示应答类型的默认值
    Respond(Option<serde_json::Value>),
    /// 引擎报错
    Fail(i32),
    /// 既无应答也无错误
    Empty,
}

/// 一次被记录的调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Call {
    pub operation: String,
    pub detail: String,
}

#[derive(Default)]
struct MockState {
    calls: Mutex<Vec<Call>>,
    scripts: Mutex<HashMap<String, Script>>,
    holds: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    handler: Mutex<Option<Arc<dyn EngineEventHandler>>>,
}

/// 脚本化引擎，克隆后共享同一份状态
#[derive(Clone, Default)]
pub(crate) struct MockEngine {
    state: Arc<MockState>,
}

impl MockEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 设定某个操作的结果
    pub(crate) fn script(&self, operation: &str, script: Script) {
        self.state
            .scripts
            .lock()
            .unwrap()
            .insert(operation.to_string(), script);
    }

    /// 设定某个操作的应答内容
    pub(crate) fn respond_with(&self, operation: &str, response: impl Serialize) {
        let value = serde_json::to_value(response).unwrap();
        self.script(operation, Script::Respond(Some(value)));
    }

    /// 让某个操作挂起，直到返回的发送端被触发
    pub(crate) fn hold(&self, operation: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state
            .holds
            .lock()
            .unwrap()
            .insert(operation.to_string(), rx);
        tx
    }

    /// 全部已记录的调用
    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.calls.lock().unwrap().clone()
    }

    /// 已记录调用的操作名
    pub(crate) fn operations(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.operation).collect()
    }

    /// 某个操作最近一次调用的参数
    pub(crate) fn last_detail(&self, operation: &str) -> Option<String> {
        self.calls()
            .into_iter()
            .rev()
            .find(|call| call.operation == operation)
            .map(|call| call.detail)
    }

    /// 引擎创建时拿到的事件接收方
    pub(crate) fn handler(&self) -> Arc<dyn EngineEventHandler> {
        self.state
            .handler
            .lock()
            .unwrap()
            .clone()
            .expect("engine was not created through the factory")
    }

    fn record(&self, operation: &str, detail: String) {
        self.state.calls.lock().unwrap().push(Call {
            operation: operation.to_string(),
            detail,
        });
    }

    fn scripted(&self, operation: &str) -> Option<Script> {
        self.state.scripts.lock().unwrap().get(operation).cloned()
    }

    async fn outcome<R: DeserializeOwned + Default>(
        &self,
        operation: &str,
        detail: String,
    ) -> EngineOutcome<R> {
        self.record(operation, detail);
        let hold = self.state.holds.lock().unwrap().remove(operation);
        if let Some(hold) = hold {
            let _ = hold.await;
        }
        match self.scripted(operation) {
            None | Some(Script::Respond(None)) => (Some(R::default()), None),
            Some(Script::Respond(Some(value))) => {
                (Some(serde_json::from_value(value).unwrap()), None)
            }
            Some(Script::Fail(code)) => {
                let reason = format!("mock {operation} failed");
                (None, Some(RawErrorInfo::new(code, reason)))
            }
            Some(Script::Empty) => (None, None),
        }
    }

    fn return_code(&self, operation: &str, detail: String) -> i32 {
        self.record(operation, detail);
        match self.scripted(operation) {
            Some(Script::Fail(code)) => code,
            _ => RAW_OK,
        }
    }
}

/// 脚本化引擎工厂
pub(crate) struct MockEngineFactory {
    pub engine: MockEngine,
}

impl MockEngineFactory {
    pub(crate) fn new() -> Self {
        Self {
            engine: MockEngine::new(),
        }
    }
}

impl RtmEngineFactory for MockEngineFactory {
    fn create(
        &self,
        config: &RtmClientConfig,
        handler: Arc<dyn EngineEventHandler>,
    ) -> std::result::Result<Arc<dyn RtmEngine>, Option<RawErrorInfo>> {
        match config.app_id.as_str() {
            BAD_APP_ID => return Err(Some(RawErrorInfo::from_code(ErrorCode::InvalidAppId))),
            SILENT_APP_ID => return Err(None),
            _ => {}
        }
        *self.engine.state.handler.lock().unwrap() = Some(handler);
        Ok(Arc::new(self.engine.clone()))
    }
}

#[async_trait]
impl RtmEngine for MockEngine {
    async fn login(&self, token: Option<String>) -> EngineOutcome<RawCommonResponse> {
        if token.is_none() && self.scripted("login").is_none() {
            self.record("login", String::new());
            return (None, Some(RawErrorInfo::new(-10005, "token is missing")));
        }
        self.outcome("login", token.unwrap_or_default()).await
    }

    async fn logout(&self) -> EngineOutcome<RawCommonResponse> {
        self.outcome("logout", String::new()).await
    }

    async fn renew_token(&self, token: String) -> EngineOutcome<RawCommonResponse> {
        self.outcome("renew_token", token).await
    }

    async fn subscribe(
        &self,
        channel_name: String,
        features: u32,
    ) -> EngineOutcome<RawCommonResponse> {
        self.outcome("subscribe", format!("{channel_name} {features:#x}")).await
    }

    async fn unsubscribe(&self, channel_name: String) -> EngineOutcome<RawCommonResponse> {
        self.outcome("unsubscribe", channel_name).await
    }

    async fn publish(
        &self,
        channel_name: String,
        message: String,
        options: Option<PublishOptions>,
    ) -> EngineOutcome<RawCommonResponse> {
        let custom_type = options.and_then(|options| options.custom_type).unwrap_or_default();
        self.outcome("publish", format!("{channel_name} {message} {custom_type}")).await
    }

    fn set_parameters(&self, parameters: &str) -> i32 {
        self.return_code("set_parameters", parameters.to_string())
    }

    fn create_stream_channel(
        &self,
        channel_name: &str,
    ) -> std::result::Result<Arc<dyn StreamChannelEngine>, Option<RawErrorInfo>> {
        self.record("create_stream_channel", channel_name.to_string());
        match self.scripted("create_stream_channel") {
            Some(Script::Fail(code)) => Err(Some(RawErrorInfo::new(code, "mock create failed"))),
            Some(Script::Empty) => Err(None),
            _ => Ok(Arc::new(self.clone())),
        }
    }

    fn presence(&self) -> Arc<dyn PresenceEngine> {
        Arc::new(self.clone())
    }

    fn storage(&self) -> Arc<dyn StorageEngine> {
        Arc::new(self.clone())
    }

    fn lock(&self) -> Arc<dyn LockEngine> {
        Arc::new(self.clone())
    }

    fn error_reason(&self, error_code: i32) -> Option<String> {
        (error_code == -10005).then(|| "mock: token rejected".to_string())
    }

    fn destroy(&self) -> i32 {
        self.return_code("destroy", String::new())
    }
}

#[async_trait]
impl PresenceEngine for MockEngine {
    async fn get_online_users(
        &self,
        channel_name: String,
        channel_type: i32,
        include: u32,
        page: Option<String>,
    ) -> EngineOutcome<RawOnlineUsersResponse> {
        let page = page.unwrap_or_default();
        let detail = format!("{channel_name} {channel_type} {include:#x} {page}");
        self.outcome("get_online_users", detail).await
    }

    async fn get_user_channels(&self, user_id: String) -> EngineOutcome<RawUserChannelsResponse> {
        self.outcome("get_user_channels", user_id).await
    }

    async fn set_state(
        &self,
        channel_name: String,
        channel_type: i32,
        mut states: Vec<(String, String)>,
    ) -> EngineOutcome<RawCommonResponse> {
        states.sort();
        self.outcome("set_state", format!("{channel_name} {channel_type} {states:?}")).await
    }

    async fn remove_state(
        &self,
        channel_name: String,
        channel_type: i32,
        keys: Vec<String>,
    ) -> EngineOutcome<RawCommonResponse> {
        self.outcome("remove_state", format!("{channel_name} {channel_type} {keys:?}")).await
    }

    async fn get_state(
        &self,
        channel_name: String,
        channel_type: i32,
        user_id: String,
    ) -> EngineOutcome<RawPresenceGetStateResponse> {
        self.outcome("get_state", format!("{channel_name} {channel_type} {user_id}")).await
    }
}

fn metadata_detail(data: &RawMetadata, options: Option<RawMetadataOptions>) -> String {
    let keys: Vec<&str> = data.items.iter().map(|item| item.key.as_str()).collect();
    let options = options
        .map(|options| format!("{}/{}", options.record_ts, options.record_user_id))
        .unwrap_or_default();
    format!("{} {keys:?} {options}", data.major_revision)
}

#[async_trait]
impl StorageEngine for MockEngine {
    async fn write_channel_metadata(
        &self,
        operation: MetadataOperation,
        channel_name: String,
        channel_type: i32,
        data: RawMetadata,
        options: Option<RawMetadataOptions>,
        lock: Option<String>,
    ) -> EngineOutcome<RawCommonResponse> {
        let detail = format!(
            "{operation:?} {channel_name} {channel_type} {} {}",
            metadata_detail(&data, options),
            lock.unwrap_or_default()
        );
        self.outcome("write_channel_metadata", detail).await
    }

    async fn get_channel_metadata(
        &self,
        channel_name: String,
        channel_type: i32,
    ) -> EngineOutcome<RawGetMetadataResponse> {
        self.outcome("get_channel_metadata", format!("{channel_name} {channel_type}")).await
    }

    async fn write_user_metadata(
        &self,
        operation: MetadataOperation,
        user_id: String,
        data: RawMetadata,
        options: Option<RawMetadataOptions>,
    ) -> EngineOutcome<RawCommonResponse> {
        let detail = format!("{operation:?} {user_id} {}", metadata_detail(&data, options));
        self.outcome("write_user_metadata", detail).await
    }

    async fn get_user_metadata(&self, user_id: String) -> EngineOutcome<RawGetMetadataResponse> {
        self.outcome("get_user_metadata", user_id).await
    }

    async fn subscribe_user_metadata(&self, user_id: String) -> EngineOutcome<RawCommonResponse> {
        self.outcome("subscribe_user_metadata", user_id).await
    }

    async fn unsubscribe_user_metadata(&self, user_id: String) -> EngineOutcome<RawCommonResponse> {
        self.outcome("unsubscribe_user_metadata", user_id).await
    }
}

#[async_trait]
impl LockEngine for MockEngine {
    async fn set_lock(
        &self,
        channel_name: String,
        channel_type: i32,
        lock_name: String,
        ttl: i32,
    ) -> EngineOutcome<RawCommonResponse> {
        self.outcome("set_lock", format!("{channel_name} {channel_type} {lock_name} {ttl}")).await
    }

    async fn remove_lock(
        &self,
        channel_name: String,
        channel_type: i32,
        lock_name: String,
    ) -> EngineOutcome<RawCommonResponse> {
        self.outcome("remove_lock", format!("{channel_name} {channel_type} {lock_name}")).await
    }

    async fn acquire_lock(
        &self,
        channel_name: String,
        channel_type: i32,
        lock_name: String,
        retry: bool,
    ) -> EngineOutcome<RawCommonResponse> {
        let detail = format!("{channel_name} {channel_type} {lock_name} {retry}");
        self.outcome("acquire_lock", detail).await
    }

    async fn release_lock(
        &self,
        channel_name: String,
        channel_type: i32,
        lock_name: String,
    ) -> EngineOutcome<RawCommonResponse> {
        self.outcome("release_lock", format!("{channel_name} {channel_type} {lock_name}")).await
    }

    async fn revoke_lock(
        &self,
        channel_name: String,
        channel_type: i32,
        lock_name: String,
        owner: String,
    ) -> EngineOutcome<RawCommonResponse> {
        let detail = format!("{channel_name} {channel_type} {lock_name} {owner}");
        self.outcome("revoke_lock", detail).await
    }

    async fn get_locks(
        &self,
        channel_name: String,
        channel_type: i32,
    ) -> EngineOutcome<RawGetLocksResponse> {
        self.outcome("get_locks", format!("{channel_name} {channel_type}")).await
    }
}

#[async_trait]
impl StreamChannelEngine for MockEngine {
    async fn join(&self, token: Option<String>, features: u32) -> EngineOutcome<RawCommonResponse> {
        self.outcome("join", format!("{} {features:#x}", token.unwrap_or_default())).await
    }

    async fn leave(&self) -> EngineOutcome<RawCommonResponse> {
        self.outcome("leave", String::new()).await
    }

    async fn renew_token(&self, token: String) -> EngineOutcome<RawCommonResponse> {
        self.outcome("renew_channel_token", token).await
    }

    async fn join_topic(
        &self,
        topic: String,
        options: Option<RawJoinTopicOptions>,
    ) -> EngineOutcome<RawCommonResponse> {
        let options = options
            .map(|options| {
                format!(
                    "{} {} {} {}",
                    options.qos,
                    options.priority,
                    options.meta.unwrap_or_default(),
                    options.sync_with_media
                )
            })
            .unwrap_or_default();
        self.outcome("join_topic", format!("{topic} {options}")).await
    }

    async fn leave_topic(&self, topic: String) -> EngineOutcome<RawCommonResponse> {
        self.outcome("leave_topic", topic).await
    }

    async fn subscribe_topic(
        &self,
        topic: String,
        users: Option<Vec<String>>,
    ) -> EngineOutcome<RawTopicSubscriptionResponse> {
        self.outcome("subscribe_topic", format!("{topic} {users:?}")).await
    }

    async fn unsubscribe_topic(
        &self,
        topic: String,
        users: Option<Vec<String>>,
    ) -> EngineOutcome<RawCommonResponse> {
        self.outcome("unsubscribe_topic", format!("{topic} {users:?}")).await
    }

    async fn publish_topic_message(
        &self,
        topic: String,
        message: String,
        options: Option<PublishOptions>,
    ) -> EngineOutcome<RawCommonResponse> {
        let custom_type = options.and_then(|options| options.custom_type).unwrap_or_default();
        self.outcome("publish_topic_message", format!("{topic} {message} {custom_type}")).await
    }

    async fn get_subscribed_user_list(
        &self,
        topic: String,
    ) -> EngineOutcome<RawSubscribedUserListResponse> {
        self.outcome("get_subscribed_user_list", topic).await
    }

    fn destroy(&self) -> i32 {
        self.return_code("destroy_stream_channel", String::new())
    }
}
