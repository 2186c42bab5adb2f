use std::path::PathBuf;
use std::sync::Arc;

use crate::Pipeline;

/// 应用状态
pub struct AppState {
    /// 卡牌目录、向量表和外部服务
    pub pipeline: Pipeline,
    /// 上传图片保存目录
    pub uploads: PathBuf,
    /// 相似卡牌返回数量
    pub k: usize,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(pipeline: Pipeline, uploads: PathBuf, k: usize) -> Arc<Self> {
        Arc::new(AppState { pipeline, uploads, k })
    }
}
