//! 检测结果后处理
//!
//! 负责处理模型输出，进行坐标转换、置信度过滤和非极大值抑制(NMS)，
//! 以及从候选结果中选出最佳检测。

use ndarray::{Array2, Axis};

use crate::config::DETECTIONS_CAPACITY;
use crate::detect::bounds::{BoundingBox, Detection};
use crate::detect::labels::ClassLabels;

/// 模型输入尺寸与原图尺寸
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleMessage {
    pub o_width: f32,
    pub o_height: f32,
    pub s_width: usize,
    pub s_height: usize,
}

impl ScaleMessage {
    fn scale_x(&self) -> f32 {
        self.o_width / self.s_width as f32
    }

    fn scale_y(&self) -> f32 {
        self.o_height / self.s_height as f32
    }
}

/// 处理模型输出，应用置信度和NMS阈值
///
/// # 参数
/// * `output` - 模型输出，每行 `[x1, y1, x2, y2, conf]` 或 `[x1, y1, x2, y2, conf, class_id]`，
///   坐标相对于模型输入尺寸
/// * `scale` - 原图与模型输入的尺寸
/// * `labels` - 类别名称表
///
/// # 返回值
/// 按置信度降序排列、经过NMS的检测结果，最多 `DETECTIONS_CAPACITY` 个
pub fn process_detections(
    output: &Array2<f32>,
    scale: &ScaleMessage,
    labels: &ClassLabels,
    confidence_threshold: f32,
    nms_threshold: f32,
) -> Vec<Detection> {
    let mut candidates: Vec<(BoundingBox, usize, f32)> = Vec::with_capacity(output.len_of(Axis(0)));

    for row in output.axis_iter(Axis(0)) {
        let prob = row[4];
        if prob.is_nan() || prob < confidence_threshold {
            continue;
        }
        let class_id = if row.len() > 5 { row[5].max(0.0) as usize } else { 0 };

        let bbox = BoundingBox::new(
            row[0] * scale.scale_x(),
            row[1] * scale.scale_y(),
            row[2] * scale.scale_x(),
            row[3] * scale.scale_y(),
        );
        if bbox.area() <= 0.0 {
            continue;
        }
        candidates.push((bbox, class_id, prob));
    }

    candidates.sort_by(|a, b| b.2.total_cmp(&a.2));

    apply_nms(&candidates, nms_threshold)
        .into_iter()
        .take(DETECTIONS_CAPACITY)
        .map(|(bbox, class_id, prob)| {
            Detection::new(labels.name(class_id), class_id, prob, bbox.to_pixels())
        })
        .collect()
}

/// 应用非极大值抑制
///
/// 输入须已按置信度降序排列，重叠度达到阈值的框只保留置信度最高的一个。
fn apply_nms(
    candidates: &[(BoundingBox, usize, f32)],
    nms_threshold: f32,
) -> Vec<(BoundingBox, usize, f32)> {
    let mut result = Vec::new();
    let mut suppressed = vec![false; candidates.len()];

    for i in 0..candidates.len() {
        if suppressed[i] {
            continue;
        }
        result.push(candidates[i]);

        for j in (i + 1)..candidates.len() {
            if !suppressed[j] && candidates[i].0.iou(&candidates[j].0) >= nms_threshold {
                suppressed[j] = true;
            }
        }
    }

    result
}

/// 选出置信度最高的检测结果，置信度相同时保留先出现的
pub fn select_best(detections: &[Detection]) -> Option<&Detection> {
    let mut best: Option<&Detection> = None;
    for detection in detections {
        match best {
            Some(b) if detection.confidence <= b.confidence => {}
            _ => best = Some(detection),
        }
    }
    best
}
