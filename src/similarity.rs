use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use ndarray::Zip;
use ndarray::prelude::*;
use serde::Serialize;

use crate::catalog::name_key;
use crate::config::Metric;
use crate::embedding::EmbeddingStore;
use crate::error::CollaboratorError;
use crate::resolver::NameResolver;

/// 将任意文本编码为向量的外部模型
#[async_trait]
pub trait TextEncoder: Send + Sync {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, CollaboratorError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SimilarityError {
    #[error("the embedding index is empty")]
    EmptyIndex,
    #[error("query `{query}` has {got} dimensions but the index has {expected}")]
    InvalidQuery { query: String, expected: usize, got: usize },
    #[error("card `{0}` has no embedding and cannot be encoded")]
    NotFound(String),
    #[error("failed to encode `{query}`: {source}")]
    Encoder {
        query: String,
        #[source]
        source: CollaboratorError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// 向量表中的行号
    pub index: usize,
    pub distance: f32,
}

/// 一张相似卡牌，按距离从近到远排列
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarCard {
    pub name: String,
    #[serde(rename = "image_uri_normal")]
    pub image_uri: Option<String>,
    #[serde(skip)]
    pub distance: f32,
}

pub struct SimilarityEngine {
    store: Arc<EmbeddingStore>,
    resolver: NameResolver,
    encoder: Option<Arc<dyn TextEncoder>>,
    metric: Metric,
}

impl SimilarityEngine {
    pub fn new(store: Arc<EmbeddingStore>, resolver: NameResolver, metric: Metric) -> Self {
        Self { store, resolver, encoder: None, metric }
    }

    /// 设置向量表中不存在的名称所使用的文本编码器
    pub fn with_encoder(mut self, encoder: Arc<dyn TextEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// 查找与 `query` 最相似的至多 `k` 张卡牌
    ///
    /// 与查询同名的记录不会出现在结果中。最近的 `k` 个邻居里目录中找不到的名称会被丢弃，
    /// 因此结果可能少于 `k` 条，空结果也是合法的。
    pub async fn find_similar(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<SimilarCard>, SimilarityError> {
        if self.store.is_empty() {
            return Err(SimilarityError::EmptyIndex);
        }

        // 与 NameResolver 使用相同的匹配规则
        let query = query.trim();
        let vector = match self.store.vector_for_name(query) {
            Ok(vector) => vector.to_owned(),
            Err(_) => {
                let encoder = self
                    .encoder
                    .as_ref()
                    .ok_or_else(|| SimilarityError::NotFound(query.to_string()))?;
                let vector = encoder.encode(query).await.map_err(|source| {
                    SimilarityError::Encoder { query: query.to_string(), source }
                })?;
                Array1::from(vector)
            }
        };

        let neighbors = self.nearest(query, vector.view(), k)?;
        Ok(self.resolve_neighbors(&neighbors))
    }

    /// 在向量表中搜索 `k` 个最近邻，跳过与 `query` 同名的记录
    ///
    /// 距离相同时按插入顺序排列。
    pub fn nearest(
        &self,
        query: &str,
        vector: ArrayView1<f32>,
        k: usize,
    ) -> Result<Vec<Neighbor>, SimilarityError> {
        if self.store.is_empty() {
            return Err(SimilarityError::EmptyIndex);
        }
        if vector.len() != self.store.dim() {
            return Err(SimilarityError::InvalidQuery {
                query: query.to_string(),
                expected: self.store.dim(),
                got: vector.len(),
            });
        }

        let key = name_key(query.trim());
        let mut neighbors = self
            .distances(vector)
            .into_iter()
            .enumerate()
            .filter(|&(index, _)| self.store.key(index) != key)
            .map(|(index, distance)| Neighbor { index, distance })
            .collect::<Vec<_>>();
        // 稳定排序保证距离相同时保留插入顺序
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(k);
        Ok(neighbors)
    }

    fn distances(&self, vector: ArrayView1<f32>) -> Array1<f32> {
        let vectors = self.store.vectors();
        match self.metric {
            Metric::Cosine => {
                let norm = vector.dot(&vector).sqrt();
                let dots = vectors.dot(&vector);
                Zip::from(&dots).and(self.store.norms()).map_collect(|&dot, &n| {
                    if norm == 0. || n == 0. { 1. } else { 1. - dot / (norm * n) }
                })
            }
            Metric::Euclidean => vectors.map_axis(Axis(1), |row| {
                row.iter().zip(vector.iter()).map(|(a, b)| (a - b) * (a - b)).sum::<f32>().sqrt()
            }),
        }
    }

    /// 将邻居转换为目录记录，丢弃找不到的名称和重复的卡牌
    fn resolve_neighbors(&self, neighbors: &[Neighbor]) -> Vec<SimilarCard> {
        let mut seen = HashSet::new();
        neighbors
            .iter()
            .filter_map(|neighbor| {
                let record = self.resolver.resolve(self.store.name(neighbor.index)).ok()?;
                seen.insert(record.id.as_str()).then(|| SimilarCard {
                    name: record.name.clone(),
                    image_uri: record.image_uri.clone(),
                    distance: neighbor.distance,
                })
            })
            .collect()
    }
}
