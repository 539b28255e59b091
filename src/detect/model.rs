use std::path::Path;

use ort::session::{Session, builder::GraphOptimizationLevel};

use crate::config::DEFAULT_INTRA_THREADS;
use crate::error::{DrapeError, Result};

/// 加载YOLO服装检测模型
///
/// 加载ONNX格式的模型，并应用优化配置。权重文件不存在或无法解析时
/// 返回 [`DrapeError::ModelUnavailable`]，调用方应拒绝启动服务。
pub fn load_model(model_path: &Path) -> Result<Session> {
    if !model_path.exists() {
        return Err(DrapeError::ModelUnavailable {
            path: model_path.to_path_buf(),
            reason: "权重文件不存在".to_string(),
        });
    }

    let unavailable = |e: ort::Error| DrapeError::ModelUnavailable {
        path: model_path.to_path_buf(),
        reason: e.to_string(),
    };

    let model = Session::builder()
        .map_err(unavailable)?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(unavailable)?
        .with_intra_threads(DEFAULT_INTRA_THREADS)
        .map_err(unavailable)?
        .commit_from_file(model_path)
        .map_err(unavailable)?;
    Ok(model)
}
