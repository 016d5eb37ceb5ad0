//! 消息编解码
//!
//! 发布前把调用方的消息序列化为传输字符串：字符串值原样发送，其余值编码为 JSON。
//! 编码失败在到达引擎之前就以本地错误返回。

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::common::error::{ErrorInfo, Result};
use crate::common::types::RtmMessage;

/// 序列化为传输字符串
pub fn to_transport_string<M: Serialize + ?Sized>(
    value: &M,
) -> std::result::Result<String, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::String(text) => Ok(text),
        other => serde_json::to_string(&other),
    }
}

/// 编码待发布的消息，失败归为 `ChannelInvalidMessage`
pub fn encode_message<M: Serialize + ?Sized>(message: &M, operation: &str) -> Result<String> {
    to_transport_string(message).map_err(|err| ErrorInfo::invalid_message(operation, err))
}

/// 编码引擎参数，失败归为 `InvalidParameter`
pub fn encode_parameters<P: Serialize + ?Sized>(parameters: &P, operation: &str) -> Result<String> {
    to_transport_string(parameters)
        .map_err(|err| ErrorInfo::invalid_parameter(operation, err.to_string()))
}

/// 解码消息，失败返回 `None`
pub fn decode_message<T: DeserializeOwned>(message: &RtmMessage) -> Option<T> {
    message.decode()
}
