//! 存储代理
//!
//! 频道与用户两类目标的元数据读写，用户元数据另外支持订阅变化通知。
//! 所有写操作都要求传入由 [`RtmStorage::create_metadata`] 创建且尚未释放的 [`Metadata`]。

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::client::operation::{InstanceGuard, Operation};
use crate::client::traits::{MetadataOperation, StorageEngine};
use crate::client::types::{CommonResponse, GetMetadataResponse};
use crate::common::error::ErrorInfo;
use crate::common::metadata::Metadata;
use crate::common::protocol::RawMetadataOptions;
use crate::common::types::ChannelRef;

/// 元数据写入选项：是否由服务端记录更新时间与更新者
///
/// 引擎目前总是记录这两个字段，构造时传入的取值不生效
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataOptions {
    record_ts: bool,
    record_user_id: bool,
}

impl MetadataOptions {
    pub fn new(_record_ts: bool, _record_user_id: bool) -> Self {
        Self::default()
    }

    pub fn record_ts(&self) -> bool {
        self.record_ts
    }

    pub fn record_user_id(&self) -> bool {
        self.record_user_id
    }

    fn to_raw(self) -> RawMetadataOptions {
        RawMetadataOptions {
            record_ts: self.record_ts,
            record_user_id: self.record_user_id,
        }
    }
}

impl Default for MetadataOptions {
    fn default() -> Self {
        Self {
            record_ts: true,
            record_user_id: true,
        }
    }
}

/// 存储代理
#[derive(Clone)]
pub struct RtmStorage {
    engine: Arc<dyn StorageEngine>,
    guard: InstanceGuard,
}

impl RtmStorage {
    pub(crate) fn new(engine: Arc<dyn StorageEngine>, guard: InstanceGuard) -> Self {
        Self { engine, guard }
    }

    /// 创建空元数据，调用方独占，使用完毕后调用 [`Metadata::destroy`]
    pub fn create_metadata(&self) -> Metadata {
        Metadata::new()
    }

    // ==================== 频道元数据 ====================

    /// 覆盖写入频道元数据
    pub fn set_channel_metadata(
        &self,
        channel: &ChannelRef,
        data: &Metadata,
        options: Option<MetadataOptions>,
        lock: Option<&str>,
    ) -> Operation<CommonResponse> {
        let operation = MetadataOperation::Set;
        self.write_channel("set_channel_metadata", operation, channel, data, options, lock)
    }

    /// 更新已存在的频道元数据项
    pub fn update_channel_metadata(
        &self,
        channel: &ChannelRef,
        data: &Metadata,
        options: Option<MetadataOptions>,
        lock: Option<&str>,
    ) -> Operation<CommonResponse> {
        let operation = MetadataOperation::Update;
        self.write_channel("update_channel_metadata", operation, channel, data, options, lock)
    }

    /// 删除频道元数据项，`data` 为空时删除全部
    pub fn remove_channel_metadata(
        &self,
        channel: &ChannelRef,
        data: &Metadata,
        options: Option<MetadataOptions>,
        lock: Option<&str>,
    ) -> Operation<CommonResponse> {
        let operation = MetadataOperation::Remove;
        self.write_channel("remove_channel_metadata", operation, channel, data, options, lock)
    }

    pub fn get_channel_metadata(&self, channel: &ChannelRef) -> Operation<GetMetadataResponse> {
        let engine = Arc::clone(&self.engine);
        let (name, channel_type) = (channel.name().to_string(), channel.channel_type().as_i32());
        Operation::from_engine("get_channel_metadata", vec![self.guard.clone()], async move {
            engine.get_channel_metadata(name, channel_type).await
        })
    }

    // ==================== 用户元数据 ====================

    pub fn set_user_metadata(
        &self,
        user_id: &str,
        data: &Metadata,
        options: Option<MetadataOptions>,
    ) -> Operation<CommonResponse> {
        self.write_user("set_user_metadata", MetadataOperation::Set, user_id, data, options)
    }

    pub fn update_user_metadata(
        &self,
        user_id: &str,
        data: &Metadata,
        options: Option<MetadataOptions>,
    ) -> Operation<CommonResponse> {
        self.write_user("update_user_metadata", MetadataOperation::Update, user_id, data, options)
    }

    pub fn remove_user_metadata(
        &self,
        user_id: &str,
        data: &Metadata,
        options: Option<MetadataOptions>,
    ) -> Operation<CommonResponse> {
        self.write_user("remove_user_metadata", MetadataOperation::Remove, user_id, data, options)
    }

    pub fn get_user_metadata(&self, user_id: &str) -> Operation<GetMetadataResponse> {
        let engine = Arc::clone(&self.engine);
        let user_id = user_id.to_string();
        Operation::from_engine("get_user_metadata", vec![self.guard.clone()], async move {
            engine.get_user_metadata(user_id).await
        })
    }

    /// 订阅用户元数据变化，变化通过存储事件投递
    pub fn subscribe_user_metadata(&self, user_id: &str) -> Operation<CommonResponse> {
        let engine = Arc::clone(&self.engine);
        let user_id = user_id.to_string();
        Operation::from_engine("subscribe_user_metadata", vec![self.guard.clone()], async move {
            engine.subscribe_user_metadata(user_id).await
        })
    }

    pub fn unsubscribe_user_metadata(&self, user_id: &str) -> Operation<CommonResponse> {
        let engine = Arc::clone(&self.engine);
        let user_id = user_id.to_string();
        Operation::from_engine("unsubscribe_user_metadata", vec![self.guard.clone()], async move {
            engine.unsubscribe_user_metadata(user_id).await
        })
    }

    // ==================== 内部 ====================

    fn check_metadata(
        &self,
        name: &'static str,
        data: &Metadata,
    ) -> Option<Operation<CommonResponse>> {
        if let Err(error) = self.guard.check(name) {
            return Some(Operation::fail(name, error));
        }
        if data.is_released() {
            warn!(operation = name, metadata = %data.id(), "元数据已释放");
            return Some(Operation::fail(name, ErrorInfo::invalid_metadata(name)));
        }
        None
    }

    fn write_channel(
        &self,
        name: &'static str,
        operation: MetadataOperation,
        channel: &ChannelRef,
        data: &Metadata,
        options: Option<MetadataOptions>,
        lock: Option<&str>,
    ) -> Operation<CommonResponse> {
        if let Some(failed) = self.check_metadata(name, data) {
            return failed;
        }
        let engine = Arc::clone(&self.engine);
        let channel_name = channel.name().to_string();
        let channel_type = channel.channel_type().as_i32();
        let raw = data.to_raw();
        let options = options.map(MetadataOptions::to_raw);
        let lock = lock.map(str::to_string);
        Operation::from_engine(name, vec![self.guard.clone()], async move {
            engine
                .write_channel_metadata(operation, channel_name, channel_type, raw, options, lock)
                .await
        })
    }

    fn write_user(
        &self,
        name: &'static str,
        operation: MetadataOperation,
        user_id: &str,
        data: &Metadata,
        options: Option<MetadataOptions>,
    ) -> Operation<CommonResponse> {
        if let Some(failed) = self.check_metadata(name, data) {
            return failed;
        }
        let engine = Arc::clone(&self.engine);
        let user_id = user_id.to_string();
        let raw = data.to_raw();
        let options = options.map(MetadataOptions::to_raw);
        Operation::from_engine(name, vec![self.guard.clone()], async move {
            engine.write_user_metadata(operation, user_id, raw, options).await
        })
    }
}
