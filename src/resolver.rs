use std::sync::Arc;

use crate::catalog::{CardRecord, Catalog};
use crate::error::NotFound;

/// 将自由文本名称解析为目录中的卡牌
///
/// 相似卡牌、克制卡牌和图片识别的结果都必须经过这里转换为目录记录，
/// 保证三条路径使用同一套匹配规则。
#[derive(Debug, Clone)]
pub struct NameResolver {
    catalog: Arc<Catalog>,
}

impl NameResolver {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// 去除首尾空白后按名称精确匹配，忽略大小写
    pub fn resolve(&self, raw_name: &str) -> Result<&CardRecord, NotFound> {
        self.catalog.lookup_by_name(raw_name.trim())
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;
    use crate::catalog::tests::sample_catalog;

    #[fixture]
    fn resolver() -> NameResolver {
        NameResolver::new(Arc::new(sample_catalog()))
    }

    #[rstest]
    fn test_resolve_is_case_insensitive(resolver: NameResolver) {
        for record in resolver.catalog().iter() {
            let lower = resolver.resolve(&record.name.to_lowercase()).unwrap();
            let upper = resolver.resolve(&record.name.to_uppercase()).unwrap();
            assert_eq!(lower, upper);
        }
    }

    #[rstest]
    fn test_resolve_black_lotus(resolver: NameResolver) {
        let record = resolver.resolve("black lotus").unwrap();
        assert_eq!(
            record,
            &CardRecord {
                id: "1".to_string(),
                name: "Black Lotus".to_string(),
                set: "LEA".to_string(),
                oracle_text: Some(
                    "Sacrifice Black Lotus: Add three mana of any one color.".to_string()
                ),
                price_usd: Some(25000.0),
                image_uri: Some("http://x/bl.png".to_string()),
            }
        );
    }

    #[rstest]
    #[case("  Disenchant\n")]
    #[case("DISENCHANT")]
    fn test_resolve_trims_whitespace(resolver: NameResolver, #[case] name: &str) {
        assert_eq!(resolver.resolve(name).unwrap().id, "3");
    }

    #[rstest]
    fn test_resolve_unknown(resolver: NameResolver) {
        assert_eq!(
            resolver.resolve("Unknown Card XYZ"),
            Err(NotFound("Unknown Card XYZ".to_string()))
        );
    }
}
