//! 客户端配置模块
//!
//! 定义会话配置结构：身份、区域、Presence 超时、日志、代理与加密

use serde::{Deserialize, Serialize};

use crate::common::error::{ErrorCode, ErrorInfo, Result};
use crate::common::types::{is_legal_user_name, Flag, FlagSet};

/// 默认 Presence 超时（秒）
pub const DEFAULT_PRESENCE_TIMEOUT: u32 = 300;

/// 加密盐长度
pub const ENCRYPTION_SALT_LEN: usize = 32;

// ==================== 用户标识 ====================

/// 用户 ID，可以是字符串或整数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserId {
    Text(String),
    Number(u64),
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        UserId::Text(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        UserId::Text(value)
    }
}

impl From<u64> for UserId {
    fn from(value: u64) -> Self {
        UserId::Number(value)
    }
}

impl From<u32> for UserId {
    fn from(value: u32) -> Self {
        UserId::Number(value as u64)
    }
}

// ==================== 区域 ====================

/// 可用的区域节点
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AreaCode {
    MainlandChina,
    NorthAmerica,
    Europe,
    AsiaExcludingChina,
    Japan,
    India,
    Global,
}

impl Flag for AreaCode {
    const ALL: &'static [Self] = &[
        AreaCode::MainlandChina,
        AreaCode::NorthAmerica,
        AreaCode::Europe,
        AreaCode::AsiaExcludingChina,
        AreaCode::Japan,
        AreaCode::India,
        AreaCode::Global,
    ];

    fn bits(self) -> u32 {
        match self {
            AreaCode::MainlandChina => 0x0000_0001,
            AreaCode::NorthAmerica => 0x0000_0002,
            AreaCode::Europe => 0x0000_0004,
            AreaCode::AsiaExcludingChina => 0x0000_0008,
            AreaCode::Japan => 0x0000_0010,
            AreaCode::India => 0x0000_0020,
            AreaCode::Global => 0xFFFF_FFFF,
        }
    }
}

pub type AreaCodes = FlagSet<AreaCode>;

impl Default for FlagSet<AreaCode> {
    fn default() -> Self {
        FlagSet::from([AreaCode::Global])
    }
}

// ==================== 日志 ====================

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Fatal,
    ApiCall,
}

impl Flag for LogLevel {
    const ALL: &'static [Self] = &[
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Fatal,
        LogLevel::ApiCall,
    ];

    fn bits(self) -> u32 {
        match self {
            LogLevel::Info => 0x0001,
            LogLevel::Warn => 0x0002,
            LogLevel::Error => 0x0004,
            LogLevel::Fatal => 0x0008,
            LogLevel::ApiCall => 0x0010,
        }
    }
}

/// 日志级别集合，空集合表示不输出日志
pub type LogLevels = FlagSet<LogLevel>;

/// 引擎日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevels,
    pub file_path: Option<String>,
    /// 单个日志文件大小上限（KB）
    pub file_size_in_kb: i32,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: FlagSet::from([LogLevel::Warn]),
            file_path: None,
            file_size_in_kb: 1024,
        }
    }
}

impl LogConfig {
    pub fn new(level: LogLevels, file_size_in_kb: i32) -> Self {
        Self {
            level,
            file_path: None,
            file_size_in_kb,
        }
    }

    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }
}

// ==================== 代理 ====================

/// 代理类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProxyType {
    None = 0,
    Http = 1,
}

/// 代理配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub proxy_type: ProxyType,
    pub server: String,
    pub port: u16,
    pub account: Option<String>,
    pub password: Option<String>,
}

impl ProxyConfig {
    pub fn new(proxy_type: ProxyType, server: impl Into<String>, port: u16) -> Self {
        Self {
            proxy_type,
            server: server.into(),
            port,
            account: None,
            password: None,
        }
    }

    pub fn with_credentials(
        mut self,
        account: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.account = Some(account.into());
        self.password = Some(password.into());
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.proxy_type == ProxyType::Http {
            if self.server.is_empty() {
                return Err("HTTP 代理地址不能为空".to_string());
            }
            if self.port == 0 {
                return Err("HTTP 代理端口必须大于0".to_string());
            }
        }
        Ok(())
    }
}

// ==================== 加密 ====================

/// 加密模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionMode {
    None = 0,
    Aes128Gcm = 1,
    Aes256Gcm = 2,
}

/// 加密配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionConfig {
    Aes128Gcm { key: String, salt: Option<[u8; ENCRYPTION_SALT_LEN]> },
    Aes256Gcm { key: String, salt: Option<[u8; ENCRYPTION_SALT_LEN]> },
}

impl EncryptionConfig {
    pub fn mode(&self) -> EncryptionMode {
        match self {
            EncryptionConfig::Aes128Gcm { .. } => EncryptionMode::Aes128Gcm,
            EncryptionConfig::Aes256Gcm { .. } => EncryptionMode::Aes256Gcm,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            EncryptionConfig::Aes128Gcm { key, .. }
            | EncryptionConfig::Aes256Gcm { key, .. } => key,
        }
    }

    pub fn salt(&self) -> Option<&[u8; ENCRYPTION_SALT_LEN]> {
        match self {
            EncryptionConfig::Aes128Gcm { salt, .. }
            | EncryptionConfig::Aes256Gcm { salt, .. } => salt.as_ref(),
        }
    }

    /// 由文本生成加密盐：取 UTF-8 字节，不足补零，超出截断
    pub fn salt_from_str(salt: &str) -> [u8; ENCRYPTION_SALT_LEN] {
        let mut bytes = [0u8; ENCRYPTION_SALT_LEN];
        for (slot, byte) in bytes.iter_mut().zip(salt.as_bytes()) {
            *slot = *byte;
        }
        bytes
    }

    /// 加密盐的文本形式，去掉末尾补零
    pub fn salt_string(&self) -> Option<String> {
        self.salt().map(|salt| {
            let end = salt.iter().rposition(|b| *b != 0).map(|i| i + 1).unwrap_or(0);
            String::from_utf8_lossy(&salt[..end]).into_owned()
        })
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.key().is_empty() {
            return Err("加密密钥不能为空".to_string());
        }
        Ok(())
    }
}

// ==================== 客户端配置 ====================

/// 客户端配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtmClientConfig {
    /// 应用 ID
    pub app_id: String,
    /// 用户 ID（整数 ID 以十进制字符串保存）
    pub user_id: String,
    /// 是否使用字符串用户 ID
    pub use_string_user_id: bool,
    /// 允许使用的区域
    pub area_code: AreaCodes,
    /// Presence 超时（秒）
    pub presence_timeout: u32,
    /// 引擎日志配置
    pub log_config: Option<LogConfig>,
    /// 代理配置
    pub proxy_config: Option<ProxyConfig>,
    /// 加密配置
    pub encryption_config: Option<EncryptionConfig>,
}

impl Default for RtmClientConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            user_id: String::new(),
            use_string_user_id: true,
            area_code: AreaCodes::default(),
            presence_timeout: DEFAULT_PRESENCE_TIMEOUT,
            log_config: None,
            proxy_config: None,
            encryption_config: None,
        }
    }
}

impl RtmClientConfig {
    /// 创建新的配置
    pub fn new(app_id: impl Into<String>, user_id: impl Into<UserId>) -> Self {
        let mut config = Self::default();
        config.app_id = app_id.into();
        match user_id.into() {
            UserId::Text(text) => {
                config.user_id = text;
                config.use_string_user_id = true;
            }
            UserId::Number(number) => {
                config.user_id = number.to_string();
                config.use_string_user_id = false;
            }
        }
        config
    }

    /// 设置区域
    pub fn with_area_code(mut self, area_code: AreaCodes) -> Self {
        self.area_code = area_code;
        self
    }

    /// 设置 Presence 超时
    pub fn with_presence_timeout(mut self, seconds: u32) -> Self {
        self.presence_timeout = seconds;
        self
    }

    /// 设置是否使用字符串用户 ID
    pub fn with_string_user_id(mut self, enabled: bool) -> Self {
        self.use_string_user_id = enabled;
        self
    }

    /// 设置日志配置
    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = Some(log_config);
        self
    }

    /// 设置代理
    pub fn with_proxy_config(mut self, proxy_config: ProxyConfig) -> Self {
        self.proxy_config = Some(proxy_config);
        self
    }

    /// 设置加密
    pub fn with_encryption_config(mut self, encryption_config: EncryptionConfig) -> Self {
        self.encryption_config = Some(encryption_config);
        self
    }

    /// 验证配置
    ///
    /// 失败时给出对应的错误种类：应用 ID 为 `InvalidAppId`，用户 ID 为 `InvalidUserId`，其余为 `InvalidParameter`
    pub fn validate(&self) -> std::result::Result<(), (ErrorCode, String)> {
        if self.app_id.is_empty() {
            return Err((ErrorCode::InvalidAppId, "应用ID不能为空".to_string()));
        }

        if !is_legal_user_name(&self.user_id) {
            return Err((
                ErrorCode::InvalidUserId,
                format!("用户ID包含非法字符或为空: {:?}", self.user_id),
            ));
        }

        if !self.use_string_user_id && self.user_id.parse::<u64>().is_err() {
            return Err((ErrorCode::InvalidUserId, "整数用户ID模式下用户ID必须是数字".to_string()));
        }

        if let Some(proxy) = &self.proxy_config {
            proxy
                .validate()
                .map_err(|reason| (ErrorCode::InvalidParameter, reason))?;
        }

        if let Some(encryption) = &self.encryption_config {
            encryption
                .validate()
                .map_err(|reason| (ErrorCode::InvalidParameter, reason))?;
        }

        if let Some(log) = &self.log_config {
            if log.file_size_in_kb < 0 {
                return Err((ErrorCode::InvalidParameter, "日志文件大小不能为负数".to_string()));
            }
        }

        Ok(())
    }
}

/// 配置构建器
pub struct RtmClientConfigBuilder {
    config: RtmClientConfig,
}

impl RtmClientConfigBuilder {
    /// 创建新的构建器
    pub fn new(app_id: impl Into<String>, user_id: impl Into<UserId>) -> Self {
        Self {
            config: RtmClientConfig::new(app_id, user_id),
        }
    }

    pub fn area_code(mut self, area_code: AreaCodes) -> Self {
        self.config.area_code = area_code;
        self
    }

    pub fn presence_timeout(mut self, seconds: u32) -> Self {
        self.config.presence_timeout = seconds;
        self
    }

    pub fn log_config(mut self, log_config: LogConfig) -> Self {
        self.config.log_config = Some(log_config);
        self
    }

    pub fn proxy_config(mut self, proxy_config: ProxyConfig) -> Self {
        self.config.proxy_config = Some(proxy_config);
        self
    }

    pub fn encryption_config(mut self, encryption_config: EncryptionConfig) -> Self {
        self.config.encryption_config = Some(encryption_config);
        self
    }

    /// 构建配置
    pub fn build(self) -> Result<RtmClientConfig> {
        self.config
            .validate()
            .map_err(|(code, reason)| ErrorInfo::new(code, "build", reason))?;
        Ok(self.config)
    }
}
