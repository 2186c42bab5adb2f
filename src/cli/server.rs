use clap::Parser;
use log::info;
use tokio::net::TcpListener;

use crate::cli::{SubCommandExtend, load_pipeline};
use crate::config::{RemoteOptions, SearchOptions};
use crate::{Opts, server};

#[derive(Parser, Debug, Clone)]
pub struct ServerCommand {
    #[command(flatten)]
    pub search: SearchOptions,
    #[command(flatten)]
    pub remote: RemoteOptions,
    /// 监听地址
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub addr: String,
}

impl SubCommandExtend for ServerCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        // 数据加载完成之前不接受请求
        let pipeline = load_pipeline(opts, self.search.metric, &self.remote)?;

        // 创建应用状态
        let state = server::AppState::new(pipeline, opts.data_dir.uploads(), self.search.k);

        // 创建应用
        let app = server::create_app(state);

        // 启动服务器
        info!("服务器启动：http://{}", &self.addr);
        let listener = TcpListener::bind(&self.addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
