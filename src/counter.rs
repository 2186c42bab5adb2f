use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::catalog::CardSummary;
use crate::error::CollaboratorError;
use crate::resolver::NameResolver;

/// 为指定卡牌生成克制卡牌名称的外部服务
#[async_trait]
pub trait CounterSuggester: Send + Sync {
    /// 返回按推荐程度排列的卡牌名称
    async fn suggest(&self, card_name: &str) -> Result<Vec<String>, CollaboratorError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    #[error("no suggestions from the external service for `{card}`: {reason}")]
    NoSuggestions { card: String, reason: String },
    #[error("no suggested counter cards for `{card}` are present in our catalog")]
    NoMatchesInCatalog { card: String, suggested: Vec<String> },
}

/// 将外部推荐的名称合并为目录中的卡牌
pub struct CounterMerger {
    suggester: Arc<dyn CounterSuggester>,
    resolver: NameResolver,
}

impl CounterMerger {
    pub fn new(suggester: Arc<dyn CounterSuggester>, resolver: NameResolver) -> Self {
        Self { suggester, resolver }
    }

    /// 获取 `card_name` 的克制卡牌
    ///
    /// 结果保持外部服务给出的顺序，按卡牌 ID 去重，目录中找不到的名称会被忽略。
    pub async fn merge(&self, card_name: &str) -> Result<Vec<CardSummary>, CounterError> {
        let names = match self.suggester.suggest(card_name).await {
            Ok(names) if names.is_empty() => {
                return Err(CounterError::NoSuggestions {
                    card: card_name.to_string(),
                    reason: "empty suggestion list".to_string(),
                });
            }
            Ok(names) => names,
            Err(e) => {
                return Err(CounterError::NoSuggestions {
                    card: card_name.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let cards = self.merge_names(&names);
        if cards.is_empty() {
            return Err(CounterError::NoMatchesInCatalog {
                card: card_name.to_string(),
                suggested: names,
            });
        }
        Ok(cards)
    }

    /// 解析名称列表，按首次出现的顺序去重
    pub fn merge_names<S: AsRef<str>>(&self, names: &[S]) -> Vec<CardSummary> {
        let mut seen = HashSet::new();
        names
            .iter()
            .filter_map(|name| {
                let record = self.resolver.resolve(name.as_ref()).ok()?;
                seen.insert(record.id.as_str()).then(|| CardSummary::from(record))
            })
            .collect()
    }
}
