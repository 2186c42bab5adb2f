use axum::body::Bytes;
use axum_typed_multipart::{FieldData, TryFromMultipart};
use serde::Serialize;
use utoipa::ToSchema;

use crate::catalog::CardRecord;

/// 识别卡牌请求
#[derive(TryFromMultipart)]
pub struct ProcessCardRequest {
    pub image: FieldData<Bytes>,
}

/// 识别卡牌表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct ProcessCardForm {
    /// 卡牌照片
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub image: String,
}

/// 卡牌详情
#[derive(Debug, Serialize, ToSchema)]
pub struct CardResponse {
    pub id: String,
    pub name: String,
    pub set: String,
    pub oracle_text: Option<String>,
    pub price_usd: Option<f64>,
    pub image_uri_normal: Option<String>,
}

impl From<&CardRecord> for CardResponse {
    fn from(record: &CardRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            set: record.set.clone(),
            oracle_text: record.oracle_text.clone(),
            price_usd: record.price_usd,
            image_uri_normal: record.image_uri.clone(),
        }
    }
}

/// 卡牌摘要（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct CardSummaryResponse {
    pub name: String,
    /// 卡牌图片地址
    pub image_uri_normal: Option<String>,
}

/// 错误响应（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct ErrorResponse {
    /// 可读的错误信息，说明失败的环节
    pub detail: String,
}
