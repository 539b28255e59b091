use std::path::{Path, PathBuf};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::{DrapeConfig, UNKNOWN_CLASS_LABEL};
use crate::detect::{ClassLabels, Detection, Detector, YoloDetector, load_model, select_best};
use crate::error::{DrapeError, Result};
use crate::hue::{ColorExtractor, ColorNamer, ColorValue, DescriptionGenerator, mask, render_segment};
use crate::store::{ArtifactKey, ArtifactStore, FsArtifactStore, Metadata, Slot};
use crate::utils::deadline::run_with_deadline;

/// 多个编排器之间共享的检测器，推理必须持锁进行
pub type SharedDetector = Arc<Mutex<Box<dyn Detector>>>;

/// 单次处理经过的阶段
///
/// 检测、写入、读取三个阶段出错时转入 `Failed`，附带失败原因。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Detecting,
    Masking,
    ExtractingColor,
    Describing,
    Writing,
    Retrieving,
    Done,
    Failed(String),
}

impl Stage {
    pub fn failed(error: &DrapeError) -> Self {
        Stage::Failed(error.to_string())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed(_))
    }
}

/// 交给调用方的处理结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedGarment {
    pub original_image: PathBuf,
    pub segmented_image: PathBuf,
    pub category: String,
    pub metadata: GarmentSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GarmentSummary {
    pub colors: Vec<ColorValue>,
    pub description: String,
}

impl ProcessedGarment {
    /// 每个单词首字母大写的类别，如 `T-Shirt`、`Long Sleeve Top`
    ///
    /// 任何非字母字符都会开始一个新单词，其余字母转为小写。
    pub fn display_category(&self) -> String {
        let mut display = String::with_capacity(self.category.len());
        let mut word_start = true;
        for ch in self.category.chars() {
            if ch.is_alphabetic() {
                if word_start {
                    display.extend(ch.to_uppercase());
                } else {
                    display.extend(ch.to_lowercase());
                }
                word_start = false;
            } else {
                display.push(ch);
                word_start = true;
            }
        }
        display
    }

    /// 类别为空或为 "unknown" 时视为未识别
    pub fn is_identified(&self) -> bool {
        !self.category.is_empty() && self.category != UNKNOWN_CLASS_LABEL
    }
}

/// 非连衣裙一律写入槽位 0，与选中的是第几个检测结果无关
pub fn assign_slot(detection: &Detection) -> Slot {
    if detection.is_dress() {
        Slot::Dress
    } else {
        Slot::Item0
    }
}

fn enter(stage: Stage) {
    debug!(?stage, "进入阶段");
}

fn fail(error: &DrapeError) {
    enter(Stage::failed(error));
}

fn lock_detector(detector: &Mutex<Box<dyn Detector>>) -> MutexGuard<'_, Box<dyn Detector>> {
    // 推理中途 panic 不会破坏外层状态，继续使用即可
    detector.lock().unwrap_or_else(PoisonError::into_inner)
}

fn detect_locked(detector: &Mutex<Box<dyn Detector>>, image: &DynamicImage) -> Result<Vec<Detection>> {
    let mut detector = lock_detector(detector);
    let detections = detector.detect(image)?;
    debug!(detector = detector.name(), count = detections.len(), "检测完成");
    Ok(detections)
}

/// 服装特征提取流水线
///
/// 依次执行 检测 → 掩码 → 主色提取 → 命名与描述 → 写入产物 → 读回产物。
/// 检测器在构造时加载一次，之后所有调用共享。
///
/// # 示例
///
/// ```no_run
/// use std::path::Path;
/// use drape::{Drape, DrapeConfig};
///
/// # fn main() -> drape::Result<()> {
/// let config = DrapeConfig::default();
/// let drape = Drape::from_config(&config)?;
/// let garment = drape.process(Path::new("uploads/shirt.jpg"), 0)?;
/// println!("{}: {}", garment.category, garment.metadata.description);
/// # Ok(())
/// # }
/// ```
pub struct Drape<S = FsArtifactStore> {
    detector: SharedDetector,
    extractor: ColorExtractor,
    describer: DescriptionGenerator,
    store: S,
    detect_timeout: Option<Duration>,
}

impl Drape<FsArtifactStore> {
    /// 按配置构造服务
    ///
    /// 权重文件缺失或无法加载时返回 [`DrapeError::ModelUnavailable`]，
    /// 且不会再进行任何后续初始化。既没有类别文件、模型也不带类别表时
    /// 返回 [`DrapeError::Config`]，此时输出目录同样不会创建。
    pub fn from_config(config: &DrapeConfig) -> Result<Self> {
        info!(model = %config.model_path.display(), "初始化服装处理服务");
        let model = load_model(&config.model_path)?;

        let labels = ClassLabels::resolve(config.classes_path.as_deref(), &config.model_path, || {
            ClassLabels::from_model(&model)
        })?;
        let detector = YoloDetector::new(model, config.input_width, config.input_height)
            .with_confidence_threshold(config.confidence_threshold)
            .with_nms_threshold(config.nms_threshold)
            .with_labels(labels);
        info!(
            input = ?detector.input_size(),
            confidence = detector.confidence_threshold(),
            classes = detector.labels().len(),
            "检测器就绪"
        );

        let store = FsArtifactStore::create(&config.output_dir)?;
        info!(output_dir = %store.output_dir().display(), "输出目录就绪");

        let namer = match &config.color_table {
            Some(table) => ColorNamer::new(table.clone()),
            None => ColorNamer::default(),
        };

        Ok(Self::new(Box::new(detector), store)
            .with_extractor(ColorExtractor::new(&config.colors))
            .with_namer(namer)
            .with_detect_timeout(config.detect_timeout_ms.map(Duration::from_millis)))
    }
}

impl<S: ArtifactStore> Drape<S> {
    pub fn new(detector: Box<dyn Detector>, store: S) -> Self {
        Self::with_shared_detector(Arc::new(Mutex::new(detector)), store)
    }

    /// 与其他编排器共用同一个检测器实例
    pub fn with_shared_detector(detector: SharedDetector, store: S) -> Self {
        Self {
            detector,
            extractor: ColorExtractor::default(),
            describer: DescriptionGenerator::default(),
            store,
            detect_timeout: None,
        }
    }

    pub fn with_extractor(mut self, extractor: ColorExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_namer(mut self, namer: ColorNamer) -> Self {
        self.describer = DescriptionGenerator::new(namer);
        self
    }

    pub fn with_detect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.detect_timeout = timeout;
        self
    }

    pub fn detector(&self) -> SharedDetector {
        Arc::clone(&self.detector)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 在检测器锁内执行一次推理；配置了超时则在工作线程中执行
    pub fn detect_image(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let Some(timeout) = self.detect_timeout else {
            return detect_locked(&self.detector, image);
        };

        let detector = Arc::clone(&self.detector);
        let image = image.clone();
        match run_with_deadline(timeout, move || detect_locked(&detector, &image)) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(DrapeError::DetectionTimeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(DrapeError::Worker {
                message: "检测线程异常退出".to_string(),
            }),
        }
    }

    /// 处理一张服装照片，并把写入的产物读回给调用方
    #[tracing::instrument(skip(self, image_path), fields(image = %image_path.display()))]
    pub fn process(&self, image_path: &Path, index: u32) -> Result<ProcessedGarment> {
        enter(Stage::Detecting);
        let image = image::open(image_path)
            .map_err(|source| DrapeError::ImageLoad {
                path: image_path.to_path_buf(),
                source,
            })
            .inspect_err(fail)?;

        let detections = match self.detect_image(&image) {
            Err(e @ DrapeError::DetectionTimeout { .. }) => {
                warn!(error = %e, "检测超时");
                fail(&e);
                return Err(e);
            }
            other => other.inspect_err(fail)?,
        };
        let Some(best) = select_best(&detections) else {
            info!("未检测到服装");
            let e = DrapeError::NoDetection;
            fail(&e);
            return Err(e);
        };
        debug!(category = %best.category, confidence = best.confidence, candidates = detections.len(), "选中检测结果");

        enter(Stage::Masking);
        let rgb = image.to_rgb8();
        let region = mask(rgb.width(), rgb.height(), &best.bbox);

        enter(Stage::ExtractingColor);
        debug!(clusters = self.extractor.cluster_count(), "提取主色");
        let colors = self.extractor.extract(&rgb, &region);

        enter(Stage::Describing);
        let description = self.describer.describe(&best.category, &colors);

        enter(Stage::Writing);
        let key = ArtifactKey::new(index, assign_slot(best));
        let metadata = Metadata {
            category: best.category.clone(),
            colors,
            description,
            confidence: Some(best.confidence),
            bbox: Some(best.bbox),
        };
        let segment = render_segment(&rgb, &region);
        self.store.write(&key, &segment, &metadata).inspect_err(|e| {
            error!(error = %e, stem = %key.stem(), "写入产物失败");
            fail(e);
        })?;

        enter(Stage::Retrieving);
        let garment = self.retrieve(image_path, index).inspect_err(|e| {
            error!(error = %e, "读取产物失败");
            fail(e);
        })?;

        enter(Stage::Done);
        info!(category = %garment.category, description = %garment.metadata.description, "服装处理完成");
        Ok(garment)
    }

    /// 读取索引下第一组可见产物（按固定探测顺序，不一定是刚写入的那组）
    pub fn retrieve(&self, original_image: &Path, index: u32) -> Result<ProcessedGarment> {
        let key = self
            .store
            .find_artifacts(index)
            .into_iter()
            .next()
            .ok_or(DrapeError::ArtifactMissing { index })?;
        let metadata = self.store.read(&key)?;

        Ok(ProcessedGarment {
            original_image: original_image.to_path_buf(),
            segmented_image: self.store.paths(&key).image,
            category: metadata.category,
            metadata: GarmentSummary {
                colors: metadata.colors,
                description: metadata.description,
            },
        })
    }
}

impl<S: ArtifactStore + 'static> Drape<S> {
    /// 在tokio的阻塞线程池中执行一次 [`Drape::process`]
    pub async fn process_async(self: Arc<Self>, image_path: PathBuf, index: u32) -> Result<ProcessedGarment> {
        tokio::task::spawn_blocking(move || self.process(&image_path, index))
            .await
            .map_err(|e| DrapeError::Worker {
                message: e.to_string(),
            })?
    }
}
