//! # drape
//!
//! 从单件服装照片中提取结构化的视觉元数据：类别、主色调色板、
//! 一句话描述，以及裁剪后的分割图像。
//!
//! 写入阶段把产物按 `{index:02}{_suffix}` 命名存入输出目录，
//! 读取阶段再按同样的约定找回它们。

pub mod config;
pub mod detect;
pub mod drape;
pub mod error;
pub mod hue;
pub mod store;
pub mod utils;

pub use config::{ColorConfig, DrapeConfig};
pub use detect::{
    BoundingBox, ClassLabels, Detection, Detector, PixelBox, YoloDetector, draw_detections,
    load_model, select_best,
};
pub use drape::{Drape, GarmentSummary, ProcessedGarment, SharedDetector, Stage, assign_slot};
pub use error::{DrapeError, Result};
pub use hue::{ColorExtractor, ColorNamer, ColorValue, DescriptionGenerator, NamedColor};
pub use store::{ArtifactKey, ArtifactPaths, ArtifactStore, FsArtifactStore, Metadata, PROBE_ORDER, Slot};
