use anyhow::Context;
use clap::Parser;
use tokio::task::block_in_place;

use crate::catalog::Catalog;
use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::resolver::NameResolver;

#[derive(Parser, Debug, Clone)]
pub struct LookupCommand {
    /// 卡牌名称，忽略大小写
    pub name: String,
}

impl SubCommandExtend for LookupCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let path = opts.catalog_path();
        let catalog = block_in_place(|| Catalog::open(&path))
            .with_context(|| format!("加载卡牌目录失败: {}", path.display()))?;
        let resolver = NameResolver::new(catalog.into());

        let record = resolver.resolve(&self.name)?;
        println!("{}", serde_json::to_string_pretty(record)?);
        Ok(())
    }
}
