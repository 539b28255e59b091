use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use ort::session::Session;

use crate::config::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_NMS_THRESHOLD};
use crate::detect::bounds::Detection;
use crate::detect::infer::run_inference;
use crate::detect::labels::ClassLabels;
use crate::detect::posts::{ScaleMessage, process_detections};
use crate::detect::prevs::{image_to_tensor, resize_image};
use crate::error::{DrapeError, Result};

/// 目标检测器的统一接口
///
/// 推理会修改模型内部缓冲区，因此 `detect` 需要 `&mut self`，
/// 多个调用方共享同一个检测器时必须通过互斥锁串行访问。
pub trait Detector: Send {
    /// 检测图像中的服装，没有目标超过置信度下限时返回空列表
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<Detection>>;

    /// 检测器名称（用于日志）
    fn name(&self) -> &str;
}

/// YOLO服装检测器
///
/// 封装了完整的检测流程，包括图像预处理、模型推理和结果后处理。
///
/// # 示例
///
/// ```no_run
/// use std::path::Path;
/// use drape::{YoloDetector, load_model};
///
/// # fn main() -> drape::Result<()> {
/// let model = load_model(Path::new("models/best.onnx"))?;
/// let detector = YoloDetector::new(model, 640, 640)
///     .with_confidence_threshold(0.5)
///     .with_nms_threshold(0.7);
/// # Ok(())
/// # }
/// ```
pub struct YoloDetector {
    /// ONNX模型会话
    model: Session,
    input_width: usize,
    input_height: usize,
    /// 置信度阈值，低于此值的检测结果将被过滤
    confidence_threshold: f32,
    /// NMS阈值，用于去除重复检测
    nms_threshold: f32,
    labels: ClassLabels,
}

impl YoloDetector {
    pub fn new(model: Session, input_width: usize, input_height: usize) -> Self {
        Self {
            model,
            input_width,
            input_height,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
            labels: ClassLabels::default(),
        }
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_nms_threshold(mut self, threshold: f32) -> Self {
        self.nms_threshold = threshold;
        self
    }

    pub fn with_labels(mut self, labels: ClassLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn input_size(&self) -> (usize, usize) {
        (self.input_width, self.input_height)
    }

    pub fn labels(&self) -> &ClassLabels {
        &self.labels
    }
}

impl Detector for YoloDetector {
    fn detect(&mut self, img: &DynamicImage) -> Result<Vec<Detection>> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(DrapeError::Inference {
                message: "图像尺寸为空".to_string(),
            });
        }

        let resized = resize_image(img, self.input_width as u32, self.input_height as u32);
        let input_tensor = image_to_tensor(&resized, self.input_height, self.input_width);

        let start_time = Instant::now();
        let output = run_inference(&mut self.model, &input_tensor)?;
        tracing::debug!(elapsed = ?start_time.elapsed(), rows = output.nrows(), "模型推理完成");

        let scale = ScaleMessage {
            o_width: width as f32,
            o_height: height as f32,
            s_width: self.input_width,
            s_height: self.input_height,
        };
        Ok(process_detections(
            &output,
            &scale,
            &self.labels,
            self.confidence_threshold,
            self.nms_threshold,
        ))
    }

    fn name(&self) -> &str {
        "yolo"
    }
}
