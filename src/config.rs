use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Args, Parser, Subcommand, ValueEnum};
use directories::ProjectDirs;

use crate::cli::*;

static DATA_DIR: LazyLock<DataDir> = LazyLock::new(|| {
    let proj_dirs =
        ProjectDirs::from("", "cardsearch", "cardsearch").expect("failed to get project dir");
    DataDir::from(proj_dirs.data_dir())
});

fn default_data_dir() -> &'static str {
    DATA_DIR.path().to_str().unwrap_or("data")
}

#[derive(Parser, Debug, Clone)]
#[command(name = "cardsearch", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// 数据目录，包含 cards.csv、embeddings.csv 和上传图片目录
    #[arg(short, long, global = true, default_value = default_data_dir())]
    pub data_dir: DataDir,
    /// 卡牌目录 CSV 路径，默认为 <DATA_DIR>/cards.csv
    #[arg(long, global = true, value_name = "FILE")]
    pub catalog: Option<PathBuf>,
    /// 卡牌向量 CSV 路径，默认为 <DATA_DIR>/embeddings.csv
    #[arg(long, global = true, value_name = "FILE")]
    pub embeddings: Option<PathBuf>,
}

impl Opts {
    pub fn catalog_path(&self) -> PathBuf {
        self.catalog.clone().unwrap_or_else(|| self.data_dir.catalog())
    }

    pub fn embeddings_path(&self) -> PathBuf {
        self.embeddings.clone().unwrap_or_else(|| self.data_dir.embeddings())
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 启动 HTTP 服务
    Server(ServerCommand),
    /// 按名称查询卡牌
    Lookup(LookupCommand),
    /// 查找文本相似的卡牌
    Similar(SimilarCommand),
    /// 查找克制指定卡牌的卡牌
    Counter(CounterCommand),
    /// 识别卡牌图片
    Identify(IdentifyCommand),
}

#[derive(Args, Debug, Clone)]
pub struct SearchOptions {
    /// 返回的相似卡牌数量
    #[arg(short, value_name = "K", default_value_t = 5)]
    pub k: usize,
    /// 向量距离度量
    #[arg(long, value_enum, default_value_t = Metric::Cosine)]
    pub metric: Metric,
}

#[derive(Args, Debug, Clone)]
pub struct RemoteOptions {
    /// 图片识别服务地址，接收 multipart 字段 `image`
    #[arg(long, value_name = "URL")]
    pub recognizer_url: Option<String>,
    /// 兼容 OpenAI 的 chat completions 接口，用于生成克制卡牌
    #[arg(long, value_name = "URL", default_value = "https://api.openai.com/v1/chat/completions")]
    pub suggest_url: String,
    /// 生成克制卡牌使用的模型
    #[arg(long, value_name = "MODEL", default_value = "gpt-4o-mini")]
    pub suggest_model: String,
    /// 兼容 OpenAI 的 embeddings 接口，用于编码不在向量表中的名称
    #[arg(long, value_name = "URL")]
    pub encoder_url: Option<String>,
    /// 文本编码使用的模型
    #[arg(long, value_name = "MODEL", default_value = "text-embedding-3-small")]
    pub encoder_model: String,
    /// 外部服务的 API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    /// 外部服务请求超时，单位为秒
    #[arg(long, value_name = "SECONDS", default_value_t = 30)]
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct DataDir {
    path: PathBuf,
}

impl DataDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回卡牌目录文件的路径
    pub fn catalog(&self) -> PathBuf {
        self.path.join("cards.csv")
    }

    /// 返回卡牌向量文件的路径
    pub fn embeddings(&self) -> PathBuf {
        self.path.join("embeddings.csv")
    }

    /// 返回上传图片目录的路径
    pub fn uploads(&self) -> PathBuf {
        self.path.join("uploaded_image")
    }
}

impl From<&Path> for DataDir {
    fn from(path: &Path) -> Self {
        Self { path: path.to_path_buf() }
    }
}

impl FromStr for DataDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}

/// 相似度搜索使用的距离
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Metric {
    /// 余弦距离，`1 - cos(a, b)`
    #[default]
    Cosine,
    /// 欧氏距离
    Euclidean,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_paths() {
        let dir = DataDir::from_str("/srv/cards").unwrap();
        assert_eq!(dir.catalog(), PathBuf::from("/srv/cards/cards.csv"));
        assert_eq!(dir.embeddings(), PathBuf::from("/srv/cards/embeddings.csv"));
        assert_eq!(dir.uploads(), PathBuf::from("/srv/cards/uploaded_image"));
    }

    #[test]
    fn test_path_overrides() {
        let opts = Opts::parse_from([
            "cardsearch",
            "-d",
            "/srv/cards",
            "--embeddings",
            "/tmp/emb.csv",
            "lookup",
            "Opt",
        ]);
        assert_eq!(opts.catalog_path(), PathBuf::from("/srv/cards/cards.csv"));
        assert_eq!(opts.embeddings_path(), PathBuf::from("/tmp/emb.csv"));
    }
}
