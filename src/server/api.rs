use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::{self, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum_typed_multipart::TypedMultipart;
use log::{error, info};
use serde_json::{Value, json};

use super::error::{AppError, Result};
use super::state::AppState;
use super::types::*;
use crate::catalog::CardSummary;
use crate::metrics;
use crate::similarity::SimilarCard;

/// 健康检查
#[utoipa::path(get, path = "/", responses((status = 200, description = "服务正常运行")))]
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "Card search API is running on Black Lotus!" }))
}

/// 识别上传的卡牌照片并返回卡牌详情
#[utoipa::path(
    post,
    path = "/process_card",
    request_body(content = ProcessCardForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = CardResponse),
        (status = 400, body = ErrorResponse),
        (status = 500, body = ErrorResponse),
    )
)]
pub async fn process_card_handler(
    State(state): State<Arc<AppState>>,
    TypedMultipart(data): TypedMultipart<ProcessCardRequest>,
) -> Result<Json<CardResponse>> {
    let result = process_card(&state, data).await;
    metrics::inc_request("/process_card", result.is_ok());
    result
}

async fn process_card(state: &AppState, data: ProcessCardRequest) -> Result<Json<CardResponse>> {
    let content_type = data.image.metadata.content_type.as_deref().unwrap_or_default();
    if !content_type.starts_with("image") {
        return Err(AppError::bad_request("Uploaded file is not an image."));
    }
    let file_name = data.image.metadata.file_name.as_deref().unwrap_or("card");
    info!("收到上传图片: {}", file_name);

    let path = save_upload(&state.uploads, file_name, &data.image.contents).await.map_err(|e| {
        error!("保存图片失败: {e}");
        AppError::internal("Image could not be saved.")
    })?;
    info!("图片已保存到: {}", path.display());

    let record = state.pipeline.process_card(&data.image.contents).await.map_err(|e| {
        error!("识别卡牌失败: {e}");
        e
    })?;
    info!("识别结果: {} ({})", record.name, record.set);
    Ok(Json(CardResponse::from(record)))
}

/// 保存上传的图片，文件名为内容的 blake3 哈希
async fn save_upload(dir: &Path, file_name: &str, contents: &[u8]) -> std::io::Result<PathBuf> {
    let hash = blake3::hash(contents);
    let mut path = dir.join(hash.to_hex().as_str());
    if let Some(ext) = Path::new(file_name).extension() {
        path.set_extension(ext);
    }
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(&path, contents).await?;
    Ok(path)
}

/// 查找与指定卡牌文本相似的卡牌
#[utoipa::path(
    get,
    path = "/get_similar_cards/{card_name}",
    params(("card_name" = String, Path, description = "卡牌名称")),
    responses(
        (status = 200, body = Vec<CardSummaryResponse>),
        (status = 500, body = ErrorResponse),
    )
)]
pub async fn similar_cards_handler(
    State(state): State<Arc<AppState>>,
    extract::Path(card_name): extract::Path<String>,
) -> Result<Json<Vec<SimilarCard>>> {
    let start = Instant::now();
    let result = state.pipeline.find_similar(&card_name, state.k).await;
    metrics::observe_similar_duration(
        &format!("{:?}", state.pipeline.metric()),
        start.elapsed().as_secs_f32(),
    );
    metrics::inc_request("/get_similar_cards", result.is_ok());

    let cards = result.map_err(|e| {
        error!("查找相似卡牌失败: {e}");
        e
    })?;
    info!("{} 的相似卡牌: {:?}", card_name, cards.iter().map(|c| &c.name).collect::<Vec<_>>());
    metrics::observe_result_size("/get_similar_cards", cards.len());
    Ok(Json(cards))
}

/// 查找克制指定卡牌的卡牌
#[utoipa::path(
    get,
    path = "/get_counter_cards/{card_name}",
    params(("card_name" = String, Path, description = "卡牌名称")),
    responses(
        (status = 200, body = Vec<CardSummaryResponse>),
        (status = 500, body = ErrorResponse),
    )
)]
pub async fn counter_cards_handler(
    State(state): State<Arc<AppState>>,
    extract::Path(card_name): extract::Path<String>,
) -> Result<Json<Vec<CardSummary>>> {
    let result = state.pipeline.counter_cards(&card_name).await;
    metrics::inc_request("/get_counter_cards", result.is_ok());

    let cards = result.map_err(|e| {
        error!("查找克制卡牌失败: {e}");
        e
    })?;
    info!("{} 的克制卡牌: {:?}", card_name, cards.iter().map(|c| &c.name).collect::<Vec<_>>());
    metrics::observe_result_size("/get_counter_cards", cards.len());
    Ok(Json(cards))
}

/// 导出 prometheus 指标
pub async fn metrics_handler() -> Result<impl IntoResponse> {
    let text = metrics::gather()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], text))
}
