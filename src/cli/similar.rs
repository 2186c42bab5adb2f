use clap::Parser;

use super::{OutputFormat, print_cards};
use crate::cli::{SubCommandExtend, load_pipeline};
use crate::config::{Opts, RemoteOptions, SearchOptions};

#[derive(Parser, Debug, Clone)]
pub struct SimilarCommand {
    #[command(flatten)]
    pub search: SearchOptions,
    #[command(flatten)]
    pub remote: RemoteOptions,
    /// 卡牌名称，不在向量表中时需要配置文本编码服务
    pub name: String,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for SimilarCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let pipeline = load_pipeline(opts, self.search.metric, &self.remote)?;
        let cards = pipeline.find_similar(&self.name, self.search.k).await?;
        print_cards(&cards, self.output_format, |card| {
            (card.name.as_str(), card.image_uri.as_deref())
        })
    }
}
