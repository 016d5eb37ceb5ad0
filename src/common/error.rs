//! 错误分类模块
//!
//! 将引擎返回的原始错误码映射为封闭的错误种类集合，并提供统一的错误信息结构。
//! 错误码分段：通用/登录 (-10001..)、频道 (-11001..)、存储 (-12001..)、
//! Presence (-13001..)、锁 (-14001..)。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// 引擎表示成功的原始错误码
pub const RAW_OK: i32 = 0;

macro_rules! error_codes {
    ($( $(#[$meta:meta])* $variant:ident = $code:expr => ($ident:expr, $desc:expr), )+) => {
        /// 错误种类
        ///
        /// 判别值即引擎的原始错误码。
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum ErrorCode {
            $( $(#[$meta])* $variant = $code, )+
        }

        impl ErrorCode {
            /// 全部错误种类，按声明顺序
            pub const ALL: &'static [ErrorCode] = &[ $( ErrorCode::$variant, )+ ];

            /// 获取错误种类的英文标识符
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( ErrorCode::$variant => $ident, )+
                }
            }

            /// 错误种类的描述
            pub fn describe(&self) -> &'static str {
                match self {
                    $( ErrorCode::$variant => $desc, )+
                }
            }
        }
    };
}

error_codes! {
    // 未知错误
    Unknown = -1 => ("UNKNOWN", "Unknown error happened"),
    /// 引擎既未返回结果也未返回错误，仅在本地产生
    NoKnownError = -2 => ("NO_KNOWN_ERROR", "Operation finished without a response or an error"),

    // 通用/登录错误 (-10001 ~ -10999)
    NotInitialized = -10001 => ("NOT_INITIALIZED", "The client has not been initialized"),
    NotLogin = -10002 => ("NOT_LOGIN", "The user called an API that requires login before logging in"),
    InvalidAppId = -10003 => ("INVALID_APP_ID", "The app id is invalid"),
    InvalidEventHandler = -10004 => ("INVALID_EVENT_HANDLER", "The event handler is invalid"),
    InvalidToken = -10005 => ("INVALID_TOKEN", "The token is invalid"),
    InvalidUserId = -10006 => ("INVALID_USER_ID", "The user id is invalid"),
    InitServiceFailed = -10007 => ("INIT_SERVICE_FAILED", "Failed to initialize the service"),
    InvalidChannelName = -10008 => ("INVALID_CHANNEL_NAME", "The channel name is invalid"),
    TokenExpired = -10009 => ("TOKEN_EXPIRED", "The token has expired"),
    LoginNoServerResources = -10010 => ("LOGIN_NO_SERVER_RESOURCES", "No server resources available for login"),
    LoginTimeout = -10011 => ("LOGIN_TIMEOUT", "Login timed out"),
    LoginRejected = -10012 => ("LOGIN_REJECTED", "Login was rejected by the server"),
    LoginAborted = -10013 => ("LOGIN_ABORTED", "Login was aborted"),
    InvalidParameter = -10014 => ("INVALID_PARAMETER", "A parameter is invalid"),
    LoginNotAuthorized = -10015 => ("LOGIN_NOT_AUTHORIZED", "The project is not authorized to log in"),
    LoginInconsistentAppId = -10016 => ("LOGIN_INCONSISTENT_APP_ID", "The app id of the token does not match the client"),
    DuplicateOperation = -10017 => ("DUPLICATE_OPERATION", "The same operation is already in progress"),
    InstanceAlreadyReleased = -10018 => ("INSTANCE_ALREADY_RELEASED", "The instance has already been released"),

    // 频道错误 (-11001 ~ -11999)
    ChannelNotJoined = -11001 => ("CHANNEL_NOT_JOINED", "The channel has not been joined"),
    ChannelNotSubscribed = -11002 => ("CHANNEL_NOT_SUBSCRIBED", "The channel has not been subscribed"),
    ChannelExceedTopicUserLimitation = -11003 => ("CHANNEL_EXCEED_TOPIC_USER_LIMITATION", "Too many users subscribed in the topic"),
    ChannelReused = -11004 => ("CHANNEL_REUSED", "The channel name is already in use by another stream channel"),
    ChannelInstanceExceedLimitation = -11005 => ("CHANNEL_INSTANCE_EXCEED_LIMITATION", "Too many stream channel instances"),
    ChannelInErrorState = -11006 => ("CHANNEL_IN_ERROR_STATE", "The channel is in an error state"),
    ChannelJoinFailed = -11007 => ("CHANNEL_JOIN_FAILED", "Failed to join the channel"),
    ChannelInvalidTopicName = -11008 => ("CHANNEL_INVALID_TOPIC_NAME", "The topic name is invalid"),
    ChannelInvalidMessage = -11009 => ("CHANNEL_INVALID_MESSAGE", "The message is invalid"),
    ChannelMessageLengthExceedLimitation = -11010 => ("CHANNEL_MESSAGE_LENGTH_EXCEED_LIMITATION", "The message exceeds the length limit"),
    ChannelInvalidUserList = -11011 => ("CHANNEL_INVALID_USER_LIST", "The user list is invalid"),
    ChannelNotAvailable = -11012 => ("CHANNEL_NOT_AVAILABLE", "The stream channel is not available"),
    ChannelTopicNotSubscribed = -11013 => ("CHANNEL_TOPIC_NOT_SUBSCRIBED", "The topic has not been subscribed"),
    ChannelExceedTopicLimitation = -11014 => ("CHANNEL_EXCEED_TOPIC_LIMITATION", "Too many topics in the channel"),
    ChannelJoinTopicFailed = -11015 => ("CHANNEL_JOIN_TOPIC_FAILED", "Failed to join the topic"),
    ChannelTopicNotJoined = -11016 => ("CHANNEL_TOPIC_NOT_JOINED", "The topic has not been joined"),
    ChannelTopicNotExist = -11017 => ("CHANNEL_TOPIC_NOT_EXIST", "The topic does not exist"),
    ChannelInvalidTopicMeta = -11018 => ("CHANNEL_INVALID_TOPIC_META", "The topic meta is invalid"),
    ChannelSubscribeTimeout = -11019 => ("CHANNEL_SUBSCRIBE_TIMEOUT", "Subscribing to the channel timed out"),
    ChannelSubscribeTooFrequent = -11020 => ("CHANNEL_SUBSCRIBE_TOO_FREQUENT", "Subscribe requests are too frequent"),
    ChannelSubscribeFailed = -11021 => ("CHANNEL_SUBSCRIBE_FAILED", "Failed to subscribe to the channel"),
    ChannelUnsubscribeFailed = -11022 => ("CHANNEL_UNSUBSCRIBE_FAILED", "Failed to unsubscribe from the channel"),
    ChannelEncryptMessageFailed = -11023 => ("CHANNEL_ENCRYPT_MESSAGE_FAILED", "Failed to encrypt the message"),
    ChannelPublishMessageFailed = -11024 => ("CHANNEL_PUBLISH_MESSAGE_FAILED", "Failed to publish the message"),
    ChannelPublishMessageTooFrequent = -11025 => ("CHANNEL_PUBLISH_MESSAGE_TOO_FREQUENT", "Messages are published too frequently"),
    ChannelPublishMessageTimeout = -11026 => ("CHANNEL_PUBLISH_MESSAGE_TIMEOUT", "Publishing the message timed out"),
    ChannelNotConnected = -11027 => ("CHANNEL_NOT_CONNECTED", "The channel is not connected"),
    ChannelLeaveFailed = -11028 => ("CHANNEL_LEAVE_FAILED", "Failed to leave the channel"),
    ChannelCustomTypeLengthOverflow = -11029 => ("CHANNEL_CUSTOM_TYPE_LENGTH_OVERFLOW", "The custom type is too long"),
    ChannelInvalidCustomType = -11030 => ("CHANNEL_INVALID_CUSTOM_TYPE", "The custom type is invalid"),
    ChannelUnsupportedMessageType = -11031 => ("CHANNEL_UNSUPPORTED_MESSAGE_TYPE", "The message type is not supported"),
    ChannelPresenceNotReady = -11032 => ("CHANNEL_PRESENCE_NOT_READY", "Presence is not ready for the channel"),

    // 存储错误 (-12001 ~ -12999)
    StorageOperationFailed = -12001 => ("STORAGE_OPERATION_FAILED", "The storage operation failed"),
    StorageMetadataItemExceedLimitation = -12002 => ("STORAGE_METADATA_ITEM_EXCEED_LIMITATION", "Too many metadata items"),
    StorageInvalidMetadataItem = -12003 => ("STORAGE_INVALID_METADATA_ITEM", "The metadata item is invalid"),
    StorageInvalidArgument = -12004 => ("STORAGE_INVALID_ARGUMENT", "A storage argument is invalid"),
    StorageInvalidRevision = -12005 => ("STORAGE_INVALID_REVISION", "The metadata revision is invalid"),
    StorageMetadataLengthOverflow = -12006 => ("STORAGE_METADATA_LENGTH_OVERFLOW", "The metadata is too long"),
    StorageInvalidLockName = -12007 => ("STORAGE_INVALID_LOCK_NAME", "The lock name used for storage is invalid"),
    StorageLockNotAcquired = -12008 => ("STORAGE_LOCK_NOT_ACQUIRED", "The lock for the storage operation is not acquired"),
    StorageInvalidKey = -12009 => ("STORAGE_INVALID_KEY", "The metadata key is invalid"),
    StorageInvalidValue = -12010 => ("STORAGE_INVALID_VALUE", "The metadata value is invalid"),
    StorageKeyLengthOverflow = -12011 => ("STORAGE_KEY_LENGTH_OVERFLOW", "The metadata key is too long"),
    StorageValueLengthOverflow = -12012 => ("STORAGE_VALUE_LENGTH_OVERFLOW", "The metadata value is too long"),
    StorageDuplicateKey = -12013 => ("STORAGE_DUPLICATE_KEY", "The metadata key is duplicated"),
    StorageOutdatedRevision = -12014 => ("STORAGE_OUTDATED_REVISION", "The metadata revision is outdated"),
    StorageNotSubscribe = -12015 => ("STORAGE_NOT_SUBSCRIBE", "The user metadata has not been subscribed"),
    StorageInvalidMetadataInstance = -12016 => ("STORAGE_INVALID_METADATA_INSTANCE", "The metadata instance is invalid"),
    StorageSubscribeUserExceedLimitation = -12017 => ("STORAGE_SUBSCRIBE_USER_EXCEED_LIMITATION", "Too many users subscribed for metadata"),
    StorageOperationTimeout = -12018 => ("STORAGE_OPERATION_TIMEOUT", "The storage operation timed out"),
    StorageNotAvailable = -12019 => ("STORAGE_NOT_AVAILABLE", "The storage service is not available"),

    // Presence 错误 (-13001 ~ -13999)
    PresenceNotConnected = -13001 => ("PRESENCE_NOT_CONNECTED", "The presence service is not connected"),
    PresenceNotWritable = -13002 => ("PRESENCE_NOT_WRITABLE", "The presence state is not writable"),
    PresenceInvalidArgument = -13003 => ("PRESENCE_INVALID_ARGUMENT", "A presence argument is invalid"),
    PresenceCacheTooManyStates = -13004 => ("PRESENCE_CACHE_TOO_MANY_STATES", "Too many cached presence states"),
    PresenceStateCountOverflow = -13005 => ("PRESENCE_STATE_COUNT_OVERFLOW", "Too many presence state items"),
    PresenceInvalidStateKey = -13006 => ("PRESENCE_INVALID_STATE_KEY", "The presence state key is invalid"),
    PresenceInvalidStateValue = -13007 => ("PRESENCE_INVALID_STATE_VALUE", "The presence state value is invalid"),
    PresenceStateKeySizeOverflow = -13008 => ("PRESENCE_STATE_KEY_SIZE_OVERFLOW", "The presence state key is too long"),
    PresenceStateValueSizeOverflow = -13009 => ("PRESENCE_STATE_VALUE_SIZE_OVERFLOW", "The presence state value is too long"),
    PresenceStateDuplicateKey = -13010 => ("PRESENCE_STATE_DUPLICATE_KEY", "The presence state key is duplicated"),
    PresenceUserNotExist = -13011 => ("PRESENCE_USER_NOT_EXIST", "The user is not present in the channel"),
    PresenceOperationTimeout = -13012 => ("PRESENCE_OPERATION_TIMEOUT", "The presence operation timed out"),
    PresenceOperationFailed = -13013 => ("PRESENCE_OPERATION_FAILED", "The presence operation failed"),

    // 锁错误 (-14001 ~ -14999)
    LockOperationFailed = -14001 => ("LOCK_OPERATION_FAILED", "The lock operation failed"),
    LockOperationTimeout = -14002 => ("LOCK_OPERATION_TIMEOUT", "The lock operation timed out"),
    LockOperationPerforming = -14003 => ("LOCK_OPERATION_PERFORMING", "A lock operation is already being performed"),
    LockAlreadyExist = -14004 => ("LOCK_ALREADY_EXIST", "The lock already exists"),
    LockInvalidName = -14005 => ("LOCK_INVALID_NAME", "The lock name is invalid"),
    LockNotAcquired = -14006 => ("LOCK_NOT_ACQUIRED", "The lock has not been acquired"),
    LockAcquireFailed = -14007 => ("LOCK_ACQUIRE_FAILED", "Failed to acquire the lock"),
    LockNotExist = -14008 => ("LOCK_NOT_EXIST", "The lock does not exist"),
    LockNotAvailable = -14009 => ("LOCK_NOT_AVAILABLE", "The lock service is not available"),
}

impl ErrorCode {
    /// 获取错误代码的数字值
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// 从数字值创建错误代码
    ///
    /// 成功码与未登记的错误码都返回 `None`。
    pub fn from_i32(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_i32() == code)
    }

    /// 将原始错误码归类为错误种类
    ///
    /// 全函数：未登记的错误码归为 `Unknown` 并记录日志。
    pub fn classify(raw_code: i32) -> Self {
        match Self::from_i32(raw_code) {
            Some(kind) => kind,
            None => {
                warn!(raw_code, "未识别的引擎错误码，归类为 UNKNOWN");
                ErrorCode::Unknown
            }
        }
    }

    /// 所属子系统
    pub fn subsystem(&self) -> &'static str {
        match self.as_i32() {
            -10999..=-10001 => "general",
            -11999..=-11001 => "channel",
            -12999..=-12001 => "storage",
            -13999..=-13001 => "presence",
            -14999..=-14001 => "lock",
            _ => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 引擎上报的原始错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawErrorInfo {
    /// 原始错误码，0 表示成功
    pub error_code: i32,
    /// 引擎给出的原因，可能为空
    pub reason: String,
}

impl RawErrorInfo {
    pub fn new(error_code: i32, reason: impl Into<String>) -> Self {
        Self {
            error_code,
            reason: reason.into(),
        }
    }

    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code.as_i32(), code.describe())
    }

    pub fn is_ok(&self) -> bool {
        self.error_code == RAW_OK
    }
}

/// 统一错误信息
///
/// 不存在"成功"取值的实例：没有错误即没有 `ErrorInfo`。
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[error("{operation} 失败 [{code} {raw_code}]: {reason}")]
pub struct ErrorInfo {
    /// 错误种类
    pub code: ErrorCode,
    /// 原始错误码
    pub raw_code: i32,
    /// 发起的操作名
    pub operation: String,
    /// 错误原因
    pub reason: String,
    /// 错误时间戳
    pub timestamp: DateTime<Utc>,
}

impl ErrorInfo {
    /// 由错误种类创建
    pub fn new(code: ErrorCode, operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code,
            raw_code: code.as_i32(),
            operation: operation.into(),
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    /// 由错误种类创建，原因取种类描述
    pub fn from_code(code: ErrorCode, operation: impl Into<String>) -> Self {
        Self::new(code, operation, code.describe())
    }

    /// 由原始错误码创建，成功码返回 `None`
    pub fn from_raw(
        raw_code: i32,
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Option<Self> {
        if raw_code == RAW_OK {
            return None;
        }
        let code = ErrorCode::classify(raw_code);
        let reason = reason.into();
        Some(Self {
            code,
            raw_code,
            operation: operation.into(),
            reason: if reason.is_empty() { code.describe().to_string() } else { reason },
            timestamp: Utc::now(),
        })
    }

    /// 由引擎原始错误创建，成功码返回 `None`
    pub fn from_raw_error(raw: &RawErrorInfo, operation: impl Into<String>) -> Option<Self> {
        Self::from_raw(raw.error_code, operation, raw.reason.clone())
    }

    /// 引擎既没有返回结果也没有返回错误
    pub fn no_known_error(operation: impl Into<String>) -> Self {
        let operation = operation.into();
        let reason = format!("{} did not fail or return a response", operation);
        Self::new(ErrorCode::NoKnownError, operation, reason)
    }

    /// 实例已释放
    pub fn instance_already_released(operation: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::InstanceAlreadyReleased, operation)
    }

    /// 频道名包含非法字符
    pub fn invalid_channel_name(operation: impl Into<String>, channel_name: &str) -> Self {
        Self::new(
            ErrorCode::InvalidChannelName,
            operation,
            format!("channel name contains illegal characters: {:?}", channel_name),
        )
    }

    /// 消息无法编码
    pub fn invalid_message(operation: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorCode::ChannelInvalidMessage,
            operation,
            format!("could not encode message: {}", detail),
        )
    }

    /// 参数无效
    pub fn invalid_parameter(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParameter, operation, reason)
    }

    /// 元数据对象无效或已释放
    pub fn invalid_metadata(operation: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageInvalidMetadataItem, operation, "bad metadata")
    }

    /// 替换错误原因
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// 获取错误代码的数字值
    pub fn code_value(&self) -> i32 {
        self.raw_code
    }

    /// 获取错误代码的字符串标识符
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl From<serde_json::Error> for ErrorInfo {
    fn from(err: serde_json::Error) -> Self {
        ErrorInfo::invalid_parameter("encode", err.to_string())
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ErrorInfo>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_error_code() {
        assert_eq!(ErrorCode::InvalidToken.as_i32(), -10005);
        assert_eq!(ErrorCode::ChannelInvalidMessage.as_i32(), -11009);
        assert_eq!(ErrorCode::StorageInvalidMetadataItem.as_i32(), -12003);
        assert_eq!(ErrorCode::PresenceOperationFailed.as_i32(), -13013);
        assert_eq!(ErrorCode::LockNotAvailable.as_i32(), -14009);
        assert_eq!(ErrorCode::InvalidToken.as_str(), "INVALID_TOKEN");
    }

    #[test]
    fn test_error_code_from_i32() {
        assert_eq!(ErrorCode::from_i32(-10003), Some(ErrorCode::InvalidAppId));
        assert_eq!(ErrorCode::from_i32(RAW_OK), None);
        assert_eq!(ErrorCode::from_i32(-99999), None);
    }

    #[test]
    fn test_classify_is_total() {
        assert_eq!(ErrorCode::classify(-10005), ErrorCode::InvalidToken);
        assert_eq!(ErrorCode::classify(-99999), ErrorCode::Unknown);
        assert_eq!(ErrorCode::classify(42), ErrorCode::Unknown);
        for kind in ErrorCode::ALL {
            assert_eq!(ErrorCode::classify(kind.as_i32()), *kind);
        }
    }

    #[test]
    fn test_describe_exhaustive() {
        let generic = ErrorCode::Unknown.describe();
        assert_eq!(generic, "Unknown error happened");

        let mut descriptions = HashSet::new();
        for kind in ErrorCode::ALL {
            let description = kind.describe();
            assert!(!description.is_empty(), "{} 缺少描述", kind);
            if *kind != ErrorCode::Unknown {
                assert_ne!(description, generic, "{} 使用了通用描述", kind);
            }
            assert!(descriptions.insert(description), "{} 描述重复", kind);
        }
    }

    #[test]
    fn test_table_is_consistent() {
        let codes: HashSet<i32> = ErrorCode::ALL.iter().map(|k| k.as_i32()).collect();
        assert_eq!(codes.len(), ErrorCode::ALL.len());
        assert!(!codes.contains(&RAW_OK));

        let idents: HashSet<&str> = ErrorCode::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(idents.len(), ErrorCode::ALL.len());

        assert_eq!(ErrorCode::ALL.iter().filter(|k| k.subsystem() == "general").count(), 18);
        assert_eq!(ErrorCode::ALL.iter().filter(|k| k.subsystem() == "channel").count(), 32);
        assert_eq!(ErrorCode::ALL.iter().filter(|k| k.subsystem() == "storage").count(), 19);
        assert_eq!(ErrorCode::ALL.iter().filter(|k| k.subsystem() == "presence").count(), 13);
        assert_eq!(ErrorCode::ALL.iter().filter(|k| k.subsystem() == "lock").count(), 9);
    }

    #[test]
    fn test_error_info_from_raw() {
        assert!(ErrorInfo::from_raw(RAW_OK, "login", "").is_none());

        let info = ErrorInfo::from_raw(-10005, "login", "token invalid").unwrap();
        assert_eq!(info.code, ErrorCode::InvalidToken);
        assert_eq!(info.raw_code, -10005);
        assert_eq!(info.operation, "login");
        assert_eq!(info.reason, "token invalid");

        let unknown = ErrorInfo::from_raw(-77, "publish", "").unwrap();
        assert_eq!(unknown.code, ErrorCode::Unknown);
        assert_eq!(unknown.raw_code, -77);
        assert_eq!(unknown.reason, "Unknown error happened");
    }

    #[test]
    fn test_raw_and_kind_paths_agree() {
        let by_kind = ErrorInfo::from_code(ErrorCode::LockNotExist, "remove_lock");
        let by_raw = ErrorInfo::from_raw(-14008, "remove_lock", "").unwrap();
        assert_eq!(by_kind.code, by_raw.code);
        assert_eq!(by_kind.raw_code, by_raw.raw_code);
        assert_eq!(by_kind.reason, by_raw.reason);
        assert_eq!(by_kind.operation, by_raw.operation);
    }

    #[test]
    fn test_no_known_error() {
        let error = ErrorInfo::no_known_error("get_locks");
        assert_eq!(error.code, ErrorCode::NoKnownError);
        assert_eq!(error.operation, "get_locks");
        assert_eq!(error.reason, "get_locks did not fail or return a response");
        assert_ne!(error.code, ErrorCode::Unknown);
    }

    #[test]
    fn test_local_constructors() {
        let error = ErrorInfo::invalid_message("publish", "boom");
        assert_eq!(error.code, ErrorCode::ChannelInvalidMessage);
        assert_eq!(error.reason, "could not encode message: boom");

        let error = ErrorInfo::invalid_metadata("set_channel_metadata");
        assert_eq!(error.code, ErrorCode::StorageInvalidMetadataItem);
        assert_eq!(error.reason, "bad metadata");

        let text = ErrorInfo::instance_already_released("logout").to_string();
        assert!(text.contains("logout"));
        assert!(text.contains("INSTANCE_ALREADY_RELEASED"));
    }
}
