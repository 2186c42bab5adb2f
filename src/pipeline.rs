use std::sync::Arc;

use crate::catalog::{CardRecord, CardSummary, Catalog};
use crate::config::Metric;
use crate::counter::{CounterError, CounterMerger, CounterSuggester};
use crate::embedding::EmbeddingStore;
use crate::error::NotFound;
use crate::recognition::{RecognitionAdapter, RecognitionFailure, RecognitionResult, Recognizer};
use crate::remote::Unavailable;
use crate::resolver::NameResolver;
use crate::similarity::{SimilarCard, SimilarityEngine, SimilarityError, TextEncoder};

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error(transparent)]
    Recognition(#[from] RecognitionFailure),
    #[error("recognized card `{0}` is not in our catalog")]
    NotInCatalog(String),
}

/// 请求处理所需的全部只读数据
///
/// 启动时构建一次，之后在所有请求间共享，不需要加锁。
pub struct Pipeline {
    resolver: NameResolver,
    similarity: SimilarityEngine,
    counter: CounterMerger,
    recognition: RecognitionAdapter,
}

impl Pipeline {
    pub fn catalog(&self) -> &Catalog {
        self.resolver.catalog()
    }

    pub fn metric(&self) -> Metric {
        self.similarity.metric()
    }

    /// 按名称解析卡牌
    pub fn resolve(&self, name: &str) -> Result<&CardRecord, NotFound> {
        self.resolver.resolve(name)
    }

    /// 查找相似卡牌
    pub async fn find_similar(
        &self,
        name: &str,
        k: usize,
    ) -> Result<Vec<SimilarCard>, SimilarityError> {
        self.similarity.find_similar(name, k).await
    }

    /// 查找克制卡牌
    pub async fn counter_cards(&self, name: &str) -> Result<Vec<CardSummary>, CounterError> {
        self.counter.merge(name).await
    }

    /// 识别图片中的卡牌名称
    pub async fn identify(&self, image: &[u8]) -> RecognitionResult {
        self.recognition.identify(image).await
    }

    /// 识别图片并返回对应的目录记录
    pub async fn process_card(&self, image: &[u8]) -> Result<&CardRecord, ProcessError> {
        let card_name = self.identify(image).await.into_result()?;
        self.resolve(&card_name).map_err(|NotFound(name)| ProcessError::NotInCatalog(name))
    }
}

pub struct PipelineBuilder {
    catalog: Arc<Catalog>,
    store: Arc<EmbeddingStore>,
    metric: Metric,
    encoder: Option<Arc<dyn TextEncoder>>,
    suggester: Arc<dyn CounterSuggester>,
    recognizer: Arc<dyn Recognizer>,
}

impl PipelineBuilder {
    pub fn new(catalog: Catalog, store: EmbeddingStore) -> Self {
        Self {
            catalog: Arc::new(catalog),
            store: Arc::new(store),
            metric: Metric::default(),
            encoder: None,
            suggester: Arc::new(Unavailable("counter suggestion service is not configured")),
            recognizer: Arc::new(Unavailable("image recognition service is not configured")),
        }
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn encoder(mut self, encoder: Arc<dyn TextEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn suggester(mut self, suggester: Arc<dyn CounterSuggester>) -> Self {
        self.suggester = suggester;
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn Recognizer>) -> Self {
        self.recognizer = recognizer;
        self
    }

    pub fn build(self) -> Pipeline {
        let resolver = NameResolver::new(self.catalog.clone());
        let mut similarity = SimilarityEngine::new(self.store, resolver.clone(), self.metric);
        if let Some(encoder) = self.encoder {
            similarity = similarity.with_encoder(encoder);
        }
        Pipeline {
            counter: CounterMerger::new(self.suggester, resolver.clone()),
            recognition: RecognitionAdapter::new(self.recognizer, self.catalog),
            similarity,
            resolver,
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::catalog::tests::sample_catalog;
    use crate::error::CollaboratorError;

    struct StubRecognizer(&'static str);

    #[async_trait]
    impl Recognizer for StubRecognizer {
        async fn recognize(&self, _: &[u8], _: &Catalog) -> Result<String, CollaboratorError> {
            Ok(self.0.to_string())
        }
    }

    fn pipeline(reply: &'static str) -> Pipeline {
        let store = EmbeddingStore::from_entries([
            ("Black Lotus".to_string(), vec![1.0, 0.0]),
            ("Mox Sapphire".to_string(), vec![0.0, 1.0]),
        ])
        .unwrap();
        PipelineBuilder::new(sample_catalog(), store)
            .recognizer(Arc::new(StubRecognizer(reply)))
            .build()
    }

    #[tokio::test]
    async fn test_process_card_resolves_recognized_name() {
        let pipeline = pipeline("BLACK LOTUS");
        let record = pipeline.process_card(b"jpeg").await.unwrap();
        assert_eq!(record.id, "1");
        assert_eq!(record.name, "Black Lotus");
    }

    #[tokio::test]
    async fn test_process_card_unrecognized() {
        let pipeline = pipeline("❌ Card name not found");
        let err = pipeline.process_card(b"jpeg").await.unwrap_err();
        assert!(matches!(err, ProcessError::Recognition(RecognitionFailure::Unrecognized(_))));
    }

    #[tokio::test]
    async fn test_process_card_not_in_catalog() {
        let pipeline = pipeline("Ancestral Recall");
        let err = pipeline.process_card(b"jpeg").await.unwrap_err();
        assert_eq!(err.to_string(), "recognized card `Ancestral Recall` is not in our catalog");
    }

    #[tokio::test]
    async fn test_default_collaborators_are_unavailable() {
        let store = EmbeddingStore::from_entries([]).unwrap();
        let pipeline = PipelineBuilder::new(sample_catalog(), store).build();

        let err = pipeline.counter_cards("Black Lotus").await.unwrap_err();
        assert!(err.to_string().contains("not configured"));

        let result = pipeline.identify(b"jpeg").await;
        assert!(result.card_name().is_none());

        let err = pipeline.find_similar("Black Lotus", 3).await.unwrap_err();
        assert!(matches!(err, SimilarityError::EmptyIndex));
    }

    #[tokio::test]
    async fn test_similar_through_pipeline() {
        let result = pipeline("").find_similar("black lotus", 1).await.unwrap();
        assert_eq!(result[0].name, "Mox Sapphire");
    }
}
