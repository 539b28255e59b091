//! Detect模块 - 基于YOLO的服装检测
//!
//! 该模块提供一整套目标检测功能，包括：
//! - 模型加载
//! - 图像预处理
//! - 模型推理
//! - 结果后处理与最佳结果选择
//! - 可视化绘制
//!
//! # 工作流程
//!
//! 1. 使用load_model加载ONNX模型
//! 2. 创建YoloDetector实例并配置阈值与类别表
//! 3. 调用detect方法执行检测
//! 4. 使用select_best选出置信度最高的结果
//!
//! # 示例
//!
//! ```no_run
//! use std::path::Path;
//! use drape::{ClassLabels, Detector, YoloDetector, load_model, select_best};
//!
//! # fn main() -> drape::Result<()> {
//! let model = load_model(Path::new("models/best.onnx"))?;
//! let labels = ClassLabels::from_file(Path::new("models/classes.txt"))?;
//! let image = image::open("shirt.jpg").expect("图像无法解码");
//!
//! let mut detector = YoloDetector::new(model, 640, 640).with_labels(labels);
//! let detections = detector.detect(&image)?;
//! if let Some(best) = select_best(&detections) {
//!     println!("{} {:.2}", best.category, best.confidence);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bounds;
pub mod draw;
pub mod infer;
pub mod labels;
pub mod model;
pub mod posts;
pub mod prevs;
pub mod yolo;

pub use bounds::{BoundingBox, Detection, PixelBox};
pub use draw::draw_detections;
pub use labels::ClassLabels;
pub use model::load_model;
pub use posts::select_best;
pub use yolo::{Detector, YoloDetector};
