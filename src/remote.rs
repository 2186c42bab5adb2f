//! 基于 HTTP 的外部服务客户端

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use regex::Regex;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;

use crate::catalog::Catalog;
use crate::config::RemoteOptions;
use crate::counter::CounterSuggester;
use crate::error::CollaboratorError;
use crate::recognition::{Recognizer, UNRECOGNIZED_MARKER};
use crate::similarity::TextEncoder;

const COUNTER_PROMPT: &str = "You are an expert Magic: The Gathering player. \
Given a card name, reply with a JSON array of up to 5 exact card names that are strong answers to it. \
Reply with the JSON array only.";

static RE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("failed to build regex"));
static RE_BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:[-*•]|\d+[.)])?\s*["']?(.*?)["']?,?\s*$"#)
        .expect("failed to build regex")
});

fn client(opts: &RemoteOptions) -> reqwest::Result<Client> {
    Client::builder().timeout(Duration::from_secs(opts.timeout)).build()
}

/// 非 2xx 响应转换为错误
async fn check_status(response: Response) -> Result<Response, CollaboratorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CollaboratorError(format!("service returned {status}: {}", body.trim())))
}

/// 未配置的外部服务，所有调用都返回错误
pub struct Unavailable(pub &'static str);

#[async_trait]
impl Recognizer for Unavailable {
    async fn recognize(&self, _: &[u8], _: &Catalog) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::new(self.0))
    }
}

#[async_trait]
impl CounterSuggester for Unavailable {
    async fn suggest(&self, _: &str) -> Result<Vec<String>, CollaboratorError> {
        Err(CollaboratorError::new(self.0))
    }
}

#[async_trait]
impl TextEncoder for Unavailable {
    async fn encode(&self, _: &str) -> Result<Vec<f32>, CollaboratorError> {
        Err(CollaboratorError::new(self.0))
    }
}

/// 通过 HTTP 上传图片的识别服务
///
/// 服务以纯文本返回一个或多个候选名称，每行一个。
pub struct RemoteRecognizer {
    client: Client,
    url: String,
}

impl RemoteRecognizer {
    pub fn new(url: String, opts: &RemoteOptions) -> reqwest::Result<Self> {
        Ok(Self { client: client(opts)?, url })
    }
}

#[async_trait]
impl Recognizer for RemoteRecognizer {
    async fn recognize(
        &self,
        image: &[u8],
        catalog: &Catalog,
    ) -> Result<String, CollaboratorError> {
        let form = Form::new().part("image", Part::bytes(image.to_vec()).file_name("card"));
        let response = self.client.post(&self.url).multipart(form).send().await?;
        let reply = check_status(response).await?.text().await?;
        debug!("识别服务返回: {}", reply.trim());
        Ok(ground_candidates(&reply, catalog).to_string())
    }
}

/// 在候选名称中选择第一个目录里存在的名称，都不存在时返回第一行
fn ground_candidates<'a>(reply: &'a str, catalog: &Catalog) -> &'a str {
    let reply = reply.trim();
    if reply.starts_with(UNRECOGNIZED_MARKER) {
        return reply;
    }
    let mut candidates = reply.lines().map(str::trim).filter(|line| !line.is_empty());
    let first = candidates.clone().next().unwrap_or_default();
    candidates.find(|name| catalog.contains(name)).unwrap_or(first)
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// 使用兼容 OpenAI 的 chat completions 接口生成克制卡牌
pub struct ChatSuggester {
    client: Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl ChatSuggester {
    pub fn new(opts: &RemoteOptions) -> reqwest::Result<Self> {
        Ok(Self {
            client: client(opts)?,
            url: opts.suggest_url.clone(),
            model: opts.suggest_model.clone(),
            api_key: opts.api_key.clone(),
        })
    }
}

#[async_trait]
impl CounterSuggester for ChatSuggester {
    async fn suggest(&self, card_name: &str) -> Result<Vec<String>, CollaboratorError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| CollaboratorError::new("API key is not configured"))?;
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": COUNTER_PROMPT },
                { "role": "user", "content": card_name },
            ],
        });
        let response = self.client.post(&self.url).bearer_auth(api_key).json(&body).send().await?;
        let response: ChatResponse = check_status(response).await?.json().await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CollaboratorError::new("reply has no content"))?;
        debug!("克制卡牌回复: {}", content);
        Ok(parse_suggestions(&content))
    }
}

/// 解析模型回复中的卡牌名称
///
/// 优先按 JSON 数组解析（允许包裹在代码块中），否则每行一个名称，去掉列表符号和引号。
pub fn parse_suggestions(content: &str) -> Vec<String> {
    let body = RE_FENCE
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map_or(content.trim(), |m| m.as_str());

    if let Ok(names) = serde_json::from_str::<Vec<String>>(body) {
        return names.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
    }
    if body.starts_with('[') {
        warn!("无法解析 JSON 格式的回复，按行解析");
    }

    body.lines()
        .filter(|line| !matches!(line.trim(), "[" | "]" | ""))
        .filter_map(|line| RE_BULLET.captures(line).and_then(|caps| caps.get(1)))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// 使用兼容 OpenAI 的 embeddings 接口编码文本
pub struct RemoteEncoder {
    client: Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl RemoteEncoder {
    pub fn new(url: String, opts: &RemoteOptions) -> reqwest::Result<Self> {
        Ok(Self {
            client: client(opts)?,
            url,
            model: opts.encoder_model.clone(),
            api_key: opts.api_key.clone(),
        })
    }
}

#[async_trait]
impl TextEncoder for RemoteEncoder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, CollaboratorError> {
        let mut request =
            self.client.post(&self.url).json(&json!({ "model": self.model, "input": text }));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }
        let response: EmbeddingResponse = check_status(request.send().await?).await?.json().await?;
        response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| CollaboratorError::new("reply has no embedding"))
    }
}
