//! 错误类型
//!
//! 整条服装特征提取流水线共用一个错误枚举 [`DrapeError`]。

use std::path::PathBuf;

use thiserror::Error;

/// drape 操作的结果类型
pub type Result<T> = std::result::Result<T, DrapeError>;

#[derive(Error, Debug)]
pub enum DrapeError {
    /// 模型权重无法加载，服务不能启动
    #[error("模型不可用: {path:?} ({reason})")]
    ModelUnavailable { path: PathBuf, reason: String },

    #[error("无法加载图像 {path:?}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("模型推理失败: {message}")]
    Inference { message: String },

    /// 没有任何目标超过置信度下限
    #[error("未检测到服装")]
    NoDetection,

    #[error("检测超时 ({timeout_ms} ms)")]
    DetectionTimeout { timeout_ms: u64 },

    /// 写入看似成功，但随后找不到成对的产物文件
    #[error("索引 {index:02} 没有可读取的产物")]
    ArtifactMissing { index: u32 },

    #[error("元数据损坏 {path:?}: {reason}")]
    CorruptMetadata { path: PathBuf, reason: String },

    #[error("文件读写失败 {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("图像编码失败 {path:?}: {source}")]
    ImageEncode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("无效的颜色值: {value:?}")]
    InvalidColor { value: String },

    #[error("配置错误 {path:?}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("绘制失败: {message}")]
    Render { message: String },

    #[error("工作线程失败: {message}")]
    Worker { message: String },
}

impl From<ort::Error> for DrapeError {
    fn from(e: ort::Error) -> Self {
        Self::Inference {
            message: e.to_string(),
        }
    }
}

impl From<ndarray::ShapeError> for DrapeError {
    fn from(e: ndarray::ShapeError) -> Self {
        Self::Inference {
            message: format!("输出形状不符合预期: {}", e),
        }
    }
}

impl DrapeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// 超时与空检测属于同一类可恢复失败
    pub fn is_no_detection(&self) -> bool {
        matches!(
            self,
            DrapeError::NoDetection | DrapeError::DetectionTimeout { .. }
        )
    }

    /// 面向最终用户的提示文本
    pub fn user_message(&self) -> String {
        match self {
            DrapeError::ModelUnavailable { .. } => {
                "Clothing processor service is not available. Please try again later.".to_string()
            }
            DrapeError::NoDetection | DrapeError::DetectionTimeout { .. } => {
                "Could not identify the clothing item. Please try a clearer image.".to_string()
            }
            DrapeError::ImageLoad { .. } => {
                "Could not load the image. Please check the file format and try again.".to_string()
            }
            _ => "Failed to process the image".to_string(),
        }
    }
}
