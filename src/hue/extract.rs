use image::RgbImage;
use ndarray::Array2;
use palette::{FromColor, Hsv, Srgb, encoding};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::ColorConfig;
use crate::hue::kmeans::{KMeans, Point};
use crate::hue::mask::masked_pixels;
use crate::hue::value::ColorValue;

/// 掩码内没有像素时返回的调色板
pub const EMPTY_MASK_FALLBACK: [ColorValue; 1] = [ColorValue::BLACK];

/// 主色提取器
///
/// 对掩码内的像素做k-means聚类，把每个质心的饱和度和明度放大后输出为
/// 十六进制颜色。调色板顺序即聚类顺序，不按像素数量排序。
#[derive(Debug, Clone)]
pub struct ColorExtractor {
    kmeans: KMeans,
    saturation_boost: f32,
    seed: Option<u64>,
}

impl Default for ColorExtractor {
    fn default() -> Self {
        Self::new(&ColorConfig::default())
    }
}

impl ColorExtractor {
    pub fn new(config: &ColorConfig) -> Self {
        Self {
            kmeans: KMeans::from(config),
            saturation_boost: config.saturation_boost,
            seed: config.seed,
        }
    }

    /// 固定随机种子，同一输入总是得到同一调色板
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn cluster_count(&self) -> usize {
        self.kmeans.k
    }

    /// 提取掩码区域的调色板，长度为 `k`；掩码为空时返回 [`EMPTY_MASK_FALLBACK`]
    pub fn extract(&self, image: &RgbImage, mask: &Array2<u8>) -> Vec<ColorValue> {
        let points: Vec<Point> = masked_pixels(image, mask)
            .into_iter()
            .map(|[r, g, b]| [r as f32, g as f32, b as f32])
            .collect();

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        match self.kmeans.fit(&points, &mut rng) {
            Some(clustering) => clustering
                .centroids
                .iter()
                .map(|c| boost(c, self.saturation_boost))
                .collect(),
            None => EMPTY_MASK_FALLBACK.to_vec(),
        }
    }
}

/// 在HSV空间放大饱和度与明度（上限1.0），再转回RGB
///
/// 全程使用双精度，每个通道乘以255后向零截断。
pub fn boost(centroid: &Point, factor: f32) -> ColorValue {
    let factor = f64::from(factor);
    let rgb: Srgb<f64> = Srgb::new(
        f64::from(centroid[0]) / 255.0,
        f64::from(centroid[1]) / 255.0,
        f64::from(centroid[2]) / 255.0,
    );
    let mut hsv: Hsv<encoding::Srgb, f64> = Hsv::from_color(rgb);
    hsv.saturation = (hsv.saturation * factor).min(1.0);
    hsv.value = (hsv.value * factor).min(1.0);
    let out: Srgb<f64> = Srgb::from_color(hsv);
    ColorValue::new(to_channel(out.red), to_channel(out.green), to_channel(out.blue))
}

fn to_channel(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0) as u8
}
