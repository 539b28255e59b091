//! 配置
//!
//! 常量给出各组件的默认参数，[`DrapeConfig`] 汇总一次服务构造所需的全部配置，
//! 可以从 JSON 文件加载，也可以直接用默认值构造。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DrapeError, Result};
use crate::hue::NamedColor;

pub const DETECTIONS_CAPACITY: usize = 32;
pub const DRESS_CLASS_LABEL: &str = "dress";
pub const UNKNOWN_CLASS_LABEL: &str = "unknown";
pub const MODEL_NAMES_METADATA_KEY: &str = "names";

// 目标检测超参数配置
pub const MODEL_INPUT_NAME: &str = "images";
pub const DEFAULT_INPUT_WIDTH: usize = 640;
pub const DEFAULT_INPUT_HEIGHT: usize = 640;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.7;
pub const DEFAULT_INTRA_THREADS: usize = 4;

// 主色提取配置
pub const DEFAULT_CLUSTER_COUNT: usize = 3;
pub const DEFAULT_KMEANS_ATTEMPTS: usize = 10;
pub const DEFAULT_KMEANS_MAX_ITERATIONS: usize = 200;
pub const DEFAULT_KMEANS_EPSILON: f32 = 0.1;
pub const DEFAULT_SATURATION_BOOST: f32 = 1.2;

// 产物文件
pub const SEGMENT_JPEG_QUALITY: u8 = 90;
pub const IMAGE_EXTENSION: &str = "jpg";
pub const METADATA_EXTENSION: &str = "json";

/// 服务整体配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DrapeConfig {
    /// ONNX 模型权重路径
    pub model_path: PathBuf,
    /// 类别名称文件，每行一个类别
    pub classes_path: Option<PathBuf>,
    /// 产物输出目录
    pub output_dir: PathBuf,
    pub input_width: usize,
    pub input_height: usize,
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
    /// 检测步骤的超时时间（毫秒），为空表示不限时
    pub detect_timeout_ms: Option<u64>,
    pub colors: ColorConfig,
    /// 覆盖默认的参考颜色表
    pub color_table: Option<Vec<NamedColor>>,
}

/// 主色提取参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// 聚类数量 k
    pub cluster_count: usize,
    /// 独立随机初始化的次数
    pub attempts: usize,
    pub max_iterations: usize,
    /// 质心移动小于该值即视为收敛
    pub epsilon: f32,
    /// 饱和度与明度的放大倍数
    pub saturation_boost: f32,
    /// 固定随机种子，便于复现
    pub seed: Option<u64>,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            cluster_count: DEFAULT_CLUSTER_COUNT,
            attempts: DEFAULT_KMEANS_ATTEMPTS,
            max_iterations: DEFAULT_KMEANS_MAX_ITERATIONS,
            epsilon: DEFAULT_KMEANS_EPSILON,
            saturation_boost: DEFAULT_SATURATION_BOOST,
            seed: None,
        }
    }
}

impl Default for DrapeConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/best.onnx"),
            classes_path: None,
            output_dir: PathBuf::from("media/processed_clothes"),
            input_width: DEFAULT_INPUT_WIDTH,
            input_height: DEFAULT_INPUT_HEIGHT,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
            detect_timeout_ms: None,
            colors: ColorConfig::default(),
            color_table: None,
        }
    }
}

impl DrapeConfig {
    /// 从 JSON 文件加载配置，缺省字段使用默认值
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DrapeError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| DrapeError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| DrapeError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| DrapeError::io(path, e))
    }
}
