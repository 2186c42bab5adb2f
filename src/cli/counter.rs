use clap::Parser;

use super::{OutputFormat, print_cards};
use crate::cli::{SubCommandExtend, load_pipeline};
use crate::config::{Metric, Opts, RemoteOptions};

#[derive(Parser, Debug, Clone)]
pub struct CounterCommand {
    #[command(flatten)]
    pub remote: RemoteOptions,
    /// 卡牌名称
    pub name: String,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for CounterCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let pipeline = load_pipeline(opts, Metric::default(), &self.remote)?;
        let cards = pipeline.counter_cards(&self.name).await?;
        print_cards(&cards, self.output_format, |card| {
            (card.name.as_str(), card.image_uri.as_deref())
        })
    }
}
