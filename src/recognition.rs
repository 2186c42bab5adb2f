use std::sync::Arc;

use async_trait::async_trait;

use crate::catalog::Catalog;
use crate::error::CollaboratorError;

/// 识别服务在无法识别图片时，返回值以该字符开头
pub const UNRECOGNIZED_MARKER: char = '❌';

/// 从卡牌图片中读取卡牌名称的外部服务
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// 返回服务的原始输出，可以是卡牌名称，也可以是以 [`UNRECOGNIZED_MARKER`] 开头的失败信息
    ///
    /// `catalog` 用于在多个候选名称中挑选目录里存在的那一个。
    async fn recognize(&self, image: &[u8], catalog: &Catalog) -> Result<String, CollaboratorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecognitionFailure {
    #[error("card name could not be extracted: {0}")]
    Unrecognized(String),
    #[error("recognition service failed: {0}")]
    Collaborator(#[from] CollaboratorError),
}

/// 一次图片识别的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionResult {
    Success { card_name: String },
    Failure { reason: RecognitionFailure },
}

impl RecognitionResult {
    /// 将识别服务的原始输出转换为结果
    ///
    /// 以失败标记开头或者为空的输出都视为无法识别。
    pub fn from_reply(reply: &str) -> Self {
        let reply = reply.trim();
        if let Some(reason) = reply.strip_prefix(UNRECOGNIZED_MARKER) {
            return Self::unrecognized(reason.trim());
        }
        if reply.is_empty() {
            return Self::unrecognized("empty card name");
        }
        Self::Success { card_name: reply.to_string() }
    }

    fn unrecognized(reason: &str) -> Self {
        Self::Failure { reason: RecognitionFailure::Unrecognized(reason.to_string()) }
    }

    pub fn status(&self) -> RecognitionStatus {
        match self {
            Self::Success { .. } => RecognitionStatus::Success,
            Self::Failure { .. } => RecognitionStatus::Failure,
        }
    }

    pub fn card_name(&self) -> Option<&str> {
        match self {
            Self::Success { card_name } => Some(card_name),
            Self::Failure { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&RecognitionFailure> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason } => Some(reason),
        }
    }

    pub fn into_result(self) -> Result<String, RecognitionFailure> {
        match self {
            Self::Success { card_name } => Ok(card_name),
            Self::Failure { reason } => Err(reason),
        }
    }
}

/// 包装外部识别服务，统一其失败信号
pub struct RecognitionAdapter {
    recognizer: Arc<dyn Recognizer>,
    catalog: Arc<Catalog>,
}

impl RecognitionAdapter {
    pub fn new(recognizer: Arc<dyn Recognizer>, catalog: Arc<Catalog>) -> Self {
        Self { recognizer, catalog }
    }

    pub async fn identify(&self, image: &[u8]) -> RecognitionResult {
        match self.recognizer.recognize(image, &self.catalog).await {
            Ok(reply) => RecognitionResult::from_reply(&reply),
            Err(e) => RecognitionResult::Failure { reason: e.into() },
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;
    use crate::catalog::tests::sample_catalog;

    struct StubRecognizer(Result<&'static str, &'static str>);

    #[async_trait]
    impl Recognizer for StubRecognizer {
        async fn recognize(&self, image: &[u8], _: &Catalog) -> Result<String, CollaboratorError> {
            assert_eq!(image, b"jpeg");
            self.0.map(str::to_string).map_err(CollaboratorError::new)
        }
    }

    fn adapter(reply: Result<&'static str, &'static str>) -> RecognitionAdapter {
        RecognitionAdapter::new(Arc::new(StubRecognizer(reply)), Arc::new(sample_catalog()))
    }

    #[rstest]
    #[case::plain("Black Lotus", "Black Lotus")]
    #[case::trailing_newline("Mox Sapphire\n", "Mox Sapphire")]
    #[tokio::test]
    async fn test_success(#[case] reply: &'static str, #[case] expected: &str) {
        let result = adapter(Ok(reply)).identify(b"jpeg").await;
        assert_eq!(result.status(), RecognitionStatus::Success);
        assert_eq!(result.card_name(), Some(expected));
        assert_eq!(result.reason(), None);
    }

    #[rstest]
    #[case::marker("❌ Card name not found", "Card name not found")]
    #[case::marker_after_whitespace("  ❌no text", "no text")]
    #[case::empty("", "empty card name")]
    #[case::blank(" \n", "empty card name")]
    #[tokio::test]
    async fn test_unrecognized(#[case] reply: &'static str, #[case] reason: &str) {
        let result = adapter(Ok(reply)).identify(b"jpeg").await;
        assert_eq!(result.status(), RecognitionStatus::Failure);
        assert_eq!(result.card_name(), None);
        assert_eq!(
            result.into_result(),
            Err(RecognitionFailure::Unrecognized(reason.to_string()))
        );
    }

    #[test]
    fn test_marker_inside_name_is_not_failure() {
        let result = RecognitionResult::from_reply("Lotus ❌ Petal");
        assert_eq!(result.card_name(), Some("Lotus ❌ Petal"));
    }

    #[tokio::test]
    async fn test_collaborator_error() {
        let result = adapter(Err("connection refused")).identify(b"jpeg").await;
        assert_eq!(
            result.reason(),
            Some(&RecognitionFailure::Collaborator(CollaboratorError::new("connection refused")))
        );
    }
}
