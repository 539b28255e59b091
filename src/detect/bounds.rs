use serde::{Deserialize, Serialize};

use crate::config::DRESS_CLASS_LABEL;

/// 边界框结构
///
/// 模型输出坐标换算到原图后的浮点矩形，只在后处理阶段使用。
#[derive(Debug, Clone, Default, Copy, PartialEq)]
pub struct BoundingBox {
    /// 左上角x坐标
    pub x1: f32,
    /// 左上角y坐标
    pub y1: f32,
    /// 右下角x坐标
    pub x2: f32,
    /// 右下角y坐标
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// 两个框的交集面积
    pub fn intersection(&self, other: &BoundingBox) -> f32 {
        let w = self.x2.min(other.x2) - self.x1.max(other.x1);
        let h = self.y2.min(other.y2) - self.y1.max(other.y1);
        if w <= 0.0 || h <= 0.0 { 0.0 } else { w * h }
    }

    /// 交并比
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let inter = self.intersection(other);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }

    /// 截断为整数像素坐标
    pub fn to_pixels(&self) -> PixelBox {
        PixelBox::new(
            self.x1 as i32,
            self.y1 as i32,
            self.x2 as i32,
            self.y2 as i32,
        )
    }
}

/// 整数像素坐标的边界框 `(x1, y1, x2, y2)`，右下角不包含在内
///
/// 序列化为四元素数组，与元数据文件中的 `bbox` 字段一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct PixelBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl PixelBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// 覆盖整幅图像的框
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    /// 裁剪到图像范围内，返回 `(x1, y1, x2, y2)`，保证 `x1 <= x2`、`y1 <= y2`
    pub fn clamped(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let clamp = |v: i32, max: u32| v.clamp(0, max as i32) as u32;
        let x1 = clamp(self.x1, width);
        let y1 = clamp(self.y1, height);
        let x2 = clamp(self.x2, width).max(x1);
        let y2 = clamp(self.y2, height).max(y1);
        (x1, y1, x2, y2)
    }
}

impl From<[i32; 4]> for PixelBox {
    fn from([x1, y1, x2, y2]: [i32; 4]) -> Self {
        Self::new(x1, y1, x2, y2)
    }
}

impl From<PixelBox> for [i32; 4] {
    fn from(b: PixelBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// 检测结果结构
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// 小写的类别名称
    pub category: String,
    pub class_id: usize,
    /// 置信度 (0.0 - 1.0)
    pub confidence: f32,
    pub bbox: PixelBox,
}

impl Detection {
    pub fn new(category: impl Into<String>, class_id: usize, confidence: f32, bbox: PixelBox) -> Self {
        Self {
            category: category.into(),
            class_id,
            confidence,
            bbox,
        }
    }

    pub fn is_dress(&self) -> bool {
        self.category == DRESS_CLASS_LABEL
    }
}
