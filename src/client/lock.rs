//! 锁代理
//!
//! 频道内的分布式锁。锁状态以引擎观察到的全局状态为准，客户端不做本地重试。

use std::sync::Arc;

use crate::client::operation::{InstanceGuard, Operation};
use crate::client::traits::LockEngine;
use crate::client::types::{CommonResponse, GetLocksResponse};
use crate::common::types::ChannelRef;

/// 锁代理
#[derive(Clone)]
pub struct RtmLock {
    engine: Arc<dyn LockEngine>,
    guard: InstanceGuard,
}

impl RtmLock {
    pub(crate) fn new(engine: Arc<dyn LockEngine>, guard: InstanceGuard) -> Self {
        Self { engine, guard }
    }

    /// 创建锁，`ttl` 为持有者断线后锁保留的秒数
    pub fn set_lock(
        &self,
        lock_name: &str,
        channel: &ChannelRef,
        ttl: i32,
    ) -> Operation<CommonResponse> {
        let engine = Arc::clone(&self.engine);
        let (name, channel_type) = (channel.name().to_string(), channel.channel_type().as_i32());
        let lock_name = lock_name.to_string();
        Operation::from_engine("set_lock", vec![self.guard.clone()], async move {
            engine.set_lock(name, channel_type, lock_name, ttl).await
        })
    }

    pub fn remove_lock(&self, lock_name: &str, channel: &ChannelRef) -> Operation<CommonResponse> {
        let engine = Arc::clone(&self.engine);
        let (name, channel_type) = (channel.name().to_string(), channel.channel_type().as_i32());
        let lock_name = lock_name.to_string();
        Operation::from_engine("remove_lock", vec![self.guard.clone()], async move {
            engine.remove_lock(name, channel_type, lock_name).await
        })
    }

    /// 获取锁
    ///
    /// `retry` 为真时引擎在锁被占用期间持续尝试，而不是立即失败
    pub fn acquire_lock(
        &self,
        lock_name: &str,
        channel: &ChannelRef,
        retry: bool,
    ) -> Operation<CommonResponse> {
        let engine = Arc::clone(&self.engine);
        let (name, channel_type) = (channel.name().to_string(), channel.channel_type().as_i32());
        let lock_name = lock_name.to_string();
        Operation::from_engine("acquire_lock", vec![self.guard.clone()], async move {
            engine.acquire_lock(name, channel_type, lock_name, retry).await
        })
    }

    pub fn release_lock(&self, lock_name: &str, channel: &ChannelRef) -> Operation<CommonResponse> {
        let engine = Arc::clone(&self.engine);
        let (name, channel_type) = (channel.name().to_string(), channel.channel_type().as_i32());
        let lock_name = lock_name.to_string();
        Operation::from_engine("release_lock", vec![self.guard.clone()], async move {
            engine.release_lock(name, channel_type, lock_name).await
        })
    }

    /// 强制收回其他用户持有的锁
    pub fn revoke_lock(
        &self,
        lock_name: &str,
        channel: &ChannelRef,
        owner: &str,
    ) -> Operation<CommonResponse> {
        let engine = Arc::clone(&self.engine);
        let (name, channel_type) = (channel.name().to_string(), channel.channel_type().as_i32());
        let (lock_name, owner) = (lock_name.to_string(), owner.to_string());
        Operation::from_engine("revoke_lock", vec![self.guard.clone()], async move {
            engine.revoke_lock(name, channel_type, lock_name, owner).await
        })
    }

    pub fn get_locks(&self, channel: &ChannelRef) -> Operation<GetLocksResponse> {
        let engine = Arc::clone(&self.engine);
        let (name, channel_type) = (channel.name().to_string(), channel.channel_type().as_i32());
        Operation::from_engine("get_locks", vec![self.guard.clone()], async move {
            engine.get_locks(name, channel_type).await
        })
    }
}
