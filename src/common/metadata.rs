//! 元数据模型
//!
//! 元数据项拆分为调用方填写的字段与服务端盖章的只读字段。
//! 元数据对象由存储代理创建，需要显式释放，释放后不可再用于任何存储操作。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::common::protocol::{RawMetadata, RawMetadataItem};

/// 未指定版本
pub const UNVERSIONED: i64 = -1;

/// 服务端写入的字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStamp {
    /// 最后修改者
    pub author_user_id: String,
    /// 最后修改时间戳
    pub update_ts: u64,
}

/// 元数据项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataItem {
    pub key: String,
    pub value: String,
    /// 版本号，-1 表示不校验版本
    pub revision: i64,
    server: Option<ServerStamp>,
}

impl MetadataItem {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            revision: UNVERSIONED,
            server: None,
        }
    }

    pub fn with_revision(mut self, revision: i64) -> Self {
        self.revision = revision;
        self
    }

    /// 最后修改者，仅来自引擎的数据才有
    pub fn author_user_id(&self) -> Option<&str> {
        self.server.as_ref().map(|stamp| stamp.author_user_id.as_str())
    }

    /// 最后修改时间戳，仅来自引擎的数据才有
    pub fn update_ts(&self) -> Option<u64> {
        self.server.as_ref().map(|stamp| stamp.update_ts)
    }

    pub(crate) fn from_raw(raw: RawMetadataItem) -> Self {
        Self {
            key: raw.key,
            value: raw.value,
            revision: raw.revision,
            server: Some(ServerStamp {
                author_user_id: raw.author_user_id,
                update_ts: raw.update_ts,
            }),
        }
    }

    pub(crate) fn to_raw(&self) -> RawMetadataItem {
        RawMetadataItem {
            key: self.key.clone(),
            value: self.value.clone(),
            author_user_id: String::new(),
            revision: self.revision,
            update_ts: 0,
        }
    }
}

/// 元数据
///
/// 克隆得到的副本与原对象共享同一句柄与释放标记，任一副本释放后全部失效
#[derive(Debug, Clone)]
pub struct Metadata {
    id: Uuid,
    /// 整体版本号
    pub major_revision: i64,
    items: Vec<MetadataItem>,
    released: Arc<AtomicBool>,
}

impl PartialEq for Metadata {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.major_revision == other.major_revision
            && self.items == other.items
            && self.is_released() == other.is_released()
    }
}

impl Eq for Metadata {}

impl Metadata {
    pub(crate) fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            major_revision: UNVERSIONED,
            items: Vec::new(),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn from_raw(raw: RawMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            major_revision: raw.major_revision,
            items: raw.items.into_iter().map(MetadataItem::from_raw).collect(),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn to_raw(&self) -> RawMetadata {
        RawMetadata {
            major_revision: self.major_revision,
            items: self.items.iter().map(MetadataItem::to_raw).collect(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn items(&self) -> &[MetadataItem] {
        &self.items
    }

    /// 按键查找
    pub fn get(&self, key: &str) -> Option<&MetadataItem> {
        self.items.iter().find(|item| item.key == key)
    }

    /// 写入一项，同键覆盖并保持原位置
    pub fn set_metadata_item(&mut self, item: MetadataItem) {
        match self.items.iter_mut().find(|existing| existing.key == item.key) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    pub fn set_metadata_items(&mut self, items: impl IntoIterator<Item = MetadataItem>) {
        for item in items {
            self.set_metadata_item(item);
        }
    }

    /// 从键值映射写入，按键排序保证顺序确定
    pub fn set_metadata_items_from_map(&mut self, items: &HashMap<String, String>) {
        let mut keys: Vec<&String> = items.keys().collect();
        keys.sort();
        for key in keys {
            self.set_metadata_item(MetadataItem::new(key.clone(), items[key].clone()));
        }
    }

    pub fn clear_metadata(&mut self) {
        self.items.clear();
    }

    /// 释放元数据对象
    pub fn destroy(&mut self) {
        self.items.clear();
        self.released.store(true, Ordering::SeqCst);
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}
