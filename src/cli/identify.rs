use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;

use crate::cli::{SubCommandExtend, load_pipeline};
use crate::config::{Metric, Opts, RemoteOptions};

#[derive(Parser, Debug, Clone)]
pub struct IdentifyCommand {
    #[command(flatten)]
    pub remote: RemoteOptions,
    /// 卡牌照片路径
    pub image: PathBuf,
}

impl SubCommandExtend for IdentifyCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let image = tokio::fs::read(&self.image)
            .await
            .with_context(|| format!("读取图片失败: {}", self.image.display()))?;

        let pipeline = load_pipeline(opts, Metric::default(), &self.remote)?;

        let card_name = pipeline.identify(&image).await.into_result()?;
        info!("识别结果: {}", card_name);
        let record = pipeline.resolve(&card_name)?;
        println!("{}", serde_json::to_string_pretty(record)?);
        Ok(())
    }
}
