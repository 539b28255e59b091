use serde::{Deserialize, Serialize};

use crate::config::UNKNOWN_CLASS_LABEL;
use crate::hue::value::ColorValue;

/// 参考颜色表中的一项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedColor {
    pub name: String,
    pub color: ColorValue,
}

impl NamedColor {
    pub fn new(name: impl Into<String>, color: ColorValue) -> Self {
        Self { name: name.into(), color }
    }
}

/// 基础颜色表，顺序即距离相同时的优先顺序
pub const BASIC_COLORS: [(&str, ColorValue); 8] = [
    ("red", ColorValue::new(0xFF, 0x00, 0x00)),
    ("green", ColorValue::new(0x00, 0xFF, 0x00)),
    ("blue", ColorValue::new(0x00, 0x00, 0xFF)),
    ("yellow", ColorValue::new(0xFF, 0xFF, 0x00)),
    ("purple", ColorValue::new(0xFF, 0x00, 0xFF)),
    ("cyan", ColorValue::new(0x00, 0xFF, 0xFF)),
    ("black", ColorValue::new(0x00, 0x00, 0x00)),
    ("white", ColorValue::new(0xFF, 0xFF, 0xFF)),
];

/// 颜色命名器：返回参考表中RGB欧氏距离最近的颜色名
#[derive(Debug, Clone, PartialEq)]
pub struct ColorNamer {
    table: Vec<NamedColor>,
}

impl Default for ColorNamer {
    fn default() -> Self {
        Self::new(
            BASIC_COLORS
                .iter()
                .map(|&(name, color)| NamedColor::new(name, color))
                .collect(),
        )
    }
}

impl ColorNamer {
    pub fn new(table: Vec<NamedColor>) -> Self {
        Self { table }
    }

    /// 表为空时返回 "unknown"
    pub fn name(&self, color: &ColorValue) -> &str {
        let mut closest = UNKNOWN_CLASS_LABEL;
        let mut min_distance = f32::INFINITY;
        for entry in &self.table {
            let distance = color.distance(&entry.color);
            if distance < min_distance {
                min_distance = distance;
                closest = &entry.name;
            }
        }
        closest
    }
}
