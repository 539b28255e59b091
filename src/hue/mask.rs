use image::RgbImage;
use ndarray::{Array2, s};

use crate::detect::PixelBox;

pub const MASK_ON: u8 = 255;

/// 由边界框生成二值掩码
///
/// 掩码形状为 `(height, width)`，`[y1..y2, x1..x2)` 内为 255，其余为 0。
/// 超出图像范围的坐标会被裁剪而不是报错。
pub fn mask(width: u32, height: u32, bbox: &PixelBox) -> Array2<u8> {
    let mut field = Array2::zeros((height as usize, width as usize));
    let (x1, y1, x2, y2) = bbox.clamped(width, height);
    field
        .slice_mut(s![y1 as usize..y2 as usize, x1 as usize..x2 as usize])
        .fill(MASK_ON);
    field
}

/// 掩码内的所有像素
pub fn masked_pixels(image: &RgbImage, mask: &Array2<u8>) -> Vec<[u8; 3]> {
    image
        .enumerate_pixels()
        .filter(|(x, y, _)| {
            mask.get((*y as usize, *x as usize))
                .is_some_and(|&v| v != 0)
        })
        .map(|(_, _, p)| p.0)
        .collect()
}

/// 渲染分割结果：掩码外置黑，再裁剪到掩码的外接矩形
///
/// 掩码为空时返回与原图等大的全黑图像。
pub fn render_segment(image: &RgbImage, mask: &Array2<u8>) -> RgbImage {
    let mut region: Option<(u32, u32, u32, u32)> = None;
    for ((y, x), &v) in mask.indexed_iter() {
        if v == 0 {
            continue;
        }
        let (x, y) = (x as u32, y as u32);
        region = Some(match region {
            None => (x, y, x, y),
            Some((x1, y1, x2, y2)) => (x1.min(x), y1.min(y), x2.max(x), y2.max(y)),
        });
    }

    let Some((x1, y1, x2, y2)) = region else {
        return RgbImage::new(image.width(), image.height());
    };

    RgbImage::from_fn(x2 - x1 + 1, y2 - y1 + 1, |dx, dy| {
        let (x, y) = (x1 + dx, y1 + dy);
        let inside = mask.get((y as usize, x as usize)).is_some_and(|&v| v != 0);
        match image.get_pixel_checked(x, y) {
            Some(p) if inside => *p,
            _ => image::Rgb([0, 0, 0]),
        }
    })
}
