use std::path::PathBuf;

/// 启动时加载数据失败，服务不能在部分加载的数据上运行
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: card name is empty")]
    EmptyName { row: usize },
    #[error("row {row} ({name}): cannot decode embedding: {reason}")]
    MalformedVector { row: usize, name: String, reason: String },
    #[error("row {row} ({name}): expected {expected} dimensions, got {got}")]
    DimensionMismatch { row: usize, name: String, expected: usize, got: usize },
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

/// 名称在目录或向量表中不存在
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("card `{0}` was not found")]
pub struct NotFound(pub String);

/// 外部服务调用失败，携带可读的原因
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

impl CollaboratorError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(err: reqwest::Error) -> Self {
        Self(err.to_string())
    }
}
