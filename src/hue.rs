//! Hue模块 - 服装区域的颜色分析
//!
//! - mask：边界框转二值掩码，渲染分割结果
//! - kmeans / extract：掩码区域的主色提取
//! - naming：最近参考色命名
//! - describe：类别与颜色拼成的描述

pub mod describe;
pub mod extract;
pub mod kmeans;
pub mod mask;
pub mod naming;
pub mod value;

pub use describe::DescriptionGenerator;
pub use extract::{ColorExtractor, EMPTY_MASK_FALLBACK};
pub use mask::{mask, render_segment};
pub use naming::{BASIC_COLORS, ColorNamer, NamedColor};
pub use value::ColorValue;
