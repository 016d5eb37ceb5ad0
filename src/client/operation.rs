//! 操作桥接
//!
//! 每个引擎调用都包装成一个 [`Operation`]：同一个异步核心既可以直接 `.await`，
//! 也可以通过 [`Operation::on_complete`] 以回调方式消费，两种方式的结果完全一致。
//!
//! 解析规则按顺序：
//! 1. 引擎返回了非成功错误码，失败并映射为 [`ErrorInfo`]；
//! 2. 否则没有应答，失败为 `no_known_error`；
//! 3. 否则把原始应答转换为强类型结果。

use futures_util::future::{BoxFuture, FutureExt};
use std::future::{Future, IntoFuture};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::common::error::{ErrorInfo, Result};
use crate::common::protocol::EngineOutcome;

/// 可由引擎原始应答构造的结果类型
pub trait EngineResponse: Sized + Send + 'static {
    type Raw: Send + 'static;

    fn from_engine(raw: Self::Raw) -> Self;
}

/// 按三段规则解析引擎结果
pub fn resolve<T: EngineResponse>(outcome: EngineOutcome<T::Raw>, operation: &str) -> Result<T> {
    let (response, error) = outcome;
    if let Some(error) = error {
        if let Some(info) = ErrorInfo::from_raw_error(&error, operation) {
            return Err(info);
        }
    }
    match response {
        Some(raw) => Ok(T::from_engine(raw)),
        None => Err(ErrorInfo::no_known_error(operation)),
    }
}

/// 实例释放标记
///
/// 会话与流频道各持有一个；释放后新发起的操作立即失败，
/// 释放前发起、释放后才完成的操作同样以失败结束。
#[derive(Debug, Clone, Default)]
pub struct InstanceGuard {
    released: Arc<AtomicBool>,
}

impl InstanceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// 已释放时返回 `InstanceAlreadyReleased`
    pub fn check(&self, operation: &str) -> Result<()> {
        if self.is_released() {
            Err(ErrorInfo::instance_already_released(operation))
        } else {
            Ok(())
        }
    }
}

/// 一次异步操作，只会产生一个结果
#[must_use = "操作需要 .await 或 on_complete 才会执行"]
pub struct Operation<T> {
    name: &'static str,
    future: BoxFuture<'static, Result<T>>,
}

impl<T: Send + 'static> Operation<T> {
    /// 包装一次引擎调用
    ///
    /// `guards` 中任一实例在调用完成时已释放，结果即为 `InstanceAlreadyReleased`
    pub fn from_engine<F>(name: &'static str, guards: Vec<InstanceGuard>, call: F) -> Self
    where
        T: EngineResponse,
        F: Future<Output = EngineOutcome<T::Raw>> + Send + 'static,
    {
        let future = async move {
            for guard in &guards {
                guard.check(name)?;
            }
            let outcome = call.await;
            for guard in &guards {
                guard.check(name)?;
            }
            resolve::<T>(outcome, name)
        };
        Self {
            name,
            future: future.boxed(),
        }
    }

    /// 本地已经得到结果的操作，例如参数校验失败
    pub fn ready(name: &'static str, result: Result<T>) -> Self {
        Self {
            name,
            future: futures_util::future::ready(result).boxed(),
        }
    }

    /// 本地校验失败
    pub fn fail(name: &'static str, error: ErrorInfo) -> Self {
        Self::ready(name, Err(error))
    }

    /// 操作名
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 等待结果
    pub async fn wait(self) -> Result<T> {
        let name = self.name;
        let result = self.future.await;
        match &result {
            Ok(_) => debug!(operation = name, "操作完成"),
            Err(error) => debug!(operation = name, code = %error.code, "操作失败"),
        }
        result
    }

    /// 以回调方式消费，回调恰好被调用一次
    pub fn on_complete<C>(self, callback: C) -> JoinHandle<()>
    where
        C: FnOnce(Result<T>) + Send + 'static,
    {
        tokio::spawn(async move {
            let result = self.wait().await;
            callback(result);
        })
    }

    /// 转换成功结果
    pub fn map<U, M>(self, mapper: M) -> Operation<U>
    where
        U: Send + 'static,
        M: FnOnce(T) -> U + Send + 'static,
    {
        Operation {
            name: self.name,
            future: self.future.map(|result| result.map(mapper)).boxed(),
        }
    }
}

impl<T: Send + 'static> IntoFuture for Operation<T> {
    type Output = Result<T>;
    type IntoFuture = BoxFuture<'static, Result<T>>;

    fn into_future(self) -> Self::IntoFuture {
        self.wait().boxed()
    }
}

impl<T> std::fmt::Debug for Operation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation").field("name", &self.name).finish()
    }
}
