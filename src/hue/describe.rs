use crate::hue::naming::ColorNamer;
use crate::hue::value::ColorValue;

/// 描述生成器：用调色板前两项的颜色名和类别拼出一句话
#[derive(Debug, Clone, Default)]
pub struct DescriptionGenerator {
    namer: ColorNamer,
}

impl DescriptionGenerator {
    pub fn new(namer: ColorNamer) -> Self {
        Self { namer }
    }

    /// `"A {color} {category}"` 或 `"A {color1} and {color2} {category}"`
    ///
    /// 按调色板顺序取前两项，类别原样使用。
    pub fn describe(&self, category: &str, palette: &[ColorValue]) -> String {
        let names: Vec<&str> = palette.iter().take(2).map(|c| self.namer.name(c)).collect();
        match names.as_slice() {
            [] => format!("A {}", category),
            [only] => format!("A {} {}", only, category),
            [first, second, ..] => format!("A {} and {} {}", first, second, category),
        }
    }
}
