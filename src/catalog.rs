use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, NotFound};

/// 卡牌目录中的一条记录，加载后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRecord {
    pub id: String,
    pub name: String,
    pub set: String,
    /// 规则文本，地牌等可能为空
    #[serde(default)]
    pub oracle_text: Option<String>,
    #[serde(default)]
    pub price_usd: Option<f64>,
    #[serde(rename = "image_uri_normal", default)]
    pub image_uri: Option<String>,
}

/// 返回给调用方的卡牌摘要
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardSummary {
    pub name: String,
    #[serde(rename = "image_uri_normal")]
    pub image_uri: Option<String>,
}

impl From<&CardRecord> for CardSummary {
    fn from(record: &CardRecord) -> Self {
        Self { name: record.name.clone(), image_uri: record.image_uri.clone() }
    }
}

/// 名称比较使用的规范形式
pub(crate) fn name_key(name: &str) -> String {
    name.to_lowercase()
}

/// 只读的卡牌目录
///
/// 同名卡牌（例如不同系列的重印）只有加载顺序中的第一条可以通过名称找到。
#[derive(Debug, Default)]
pub struct Catalog {
    records: Vec<CardRecord>,
    by_name: HashMap<String, usize>,
}

impl Catalog {
    /// 从记录列表构建目录
    pub fn new(records: Vec<CardRecord>) -> Result<Self, LoadError> {
        let mut by_name = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if record.name.trim().is_empty() {
                return Err(LoadError::EmptyName { row: i + 1 });
            }
            by_name.entry(name_key(&record.name)).or_insert(i);
        }
        Ok(Self { records, by_name })
    }

    /// 从带表头的 CSV 读取目录
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let mut reader = csv::Reader::from_reader(reader);
        let records = reader.deserialize().collect::<Result<Vec<CardRecord>, _>>()?;
        Self::new(records)
    }

    /// 从 CSV 文件读取目录
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let file =
            File::open(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
        Self::from_reader(file)
    }

    /// 按名称查找卡牌，忽略大小写
    pub fn lookup_by_name(&self, name: &str) -> Result<&CardRecord, NotFound> {
        self.by_name
            .get(&name_key(name))
            .map(|&i| &self.records[i])
            .ok_or_else(|| NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(&name_key(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CardRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
