mod counter;
mod identify;
mod lookup;
pub mod server;
mod similar;

pub use counter::*;
pub use identify::*;
pub use lookup::*;
pub use server::*;
pub use similar::*;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::info;
use serde::Serialize;
use tokio::task::block_in_place;

use crate::catalog::Catalog;
use crate::config::{Metric, Opts, RemoteOptions};
use crate::embedding::EmbeddingStore;
use crate::remote::{ChatSuggester, RemoteEncoder, RemoteRecognizer};
use crate::{Pipeline, PipelineBuilder};

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}

/// 加载卡牌目录和向量表，并按配置接入外部服务
///
/// 任意数据文件加载失败都会直接返回错误。
pub fn load_pipeline(opts: &Opts, metric: Metric, remote: &RemoteOptions) -> Result<Pipeline> {
    let start = Instant::now();
    let (catalog, store) = block_in_place(|| -> Result<_> {
        let path = opts.catalog_path();
        let catalog = Catalog::open(&path)
            .with_context(|| format!("加载卡牌目录失败: {}", path.display()))?;
        let path = opts.embeddings_path();
        let store = EmbeddingStore::open(&path)
            .with_context(|| format!("加载卡牌向量失败: {}", path.display()))?;
        Ok((catalog, store))
    })?;
    info!(
        "已加载 {} 张卡牌，{} 条 {} 维向量，耗时 {:.2}s",
        catalog.len(),
        store.len(),
        store.dim(),
        start.elapsed().as_secs_f32()
    );

    let mut builder = PipelineBuilder::new(catalog, store)
        .metric(metric)
        .suggester(Arc::new(ChatSuggester::new(remote).context("创建 HTTP 客户端失败")?));
    if let Some(url) = &remote.recognizer_url {
        info!("图片识别服务: {}", url);
        let recognizer =
            RemoteRecognizer::new(url.clone(), remote).context("创建 HTTP 客户端失败")?;
        builder = builder.recognizer(Arc::new(recognizer));
    }
    if let Some(url) = &remote.encoder_url {
        info!("文本编码服务: {}", url);
        let encoder = RemoteEncoder::new(url.clone(), remote).context("创建 HTTP 客户端失败")?;
        builder = builder.encoder(Arc::new(encoder));
    }
    Ok(builder.build())
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Table,
}

/// 打印卡牌列表，表格模式下每行为 `名称\t图片地址`
fn print_cards<T: Serialize>(
    cards: &[T],
    format: OutputFormat,
    row: impl Fn(&T) -> (&str, Option<&str>),
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(cards)?)
        }
        OutputFormat::Table => {
            for card in cards {
                let (name, image_uri) = row(card);
                println!("{}\t{}", name, image_uri.unwrap_or("-"));
            }
        }
    }
    Ok(())
}
