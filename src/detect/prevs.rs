use image::{DynamicImage, GenericImageView, imageops::FilterType};
use ndarray::{Array, Array4};

/// 调整图像大小以适应模型输入
///
/// 使用CatmullRom插值算法将图像调整为指定尺寸。
pub fn resize_image(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    img.resize_exact(width, height, FilterType::CatmullRom)
}

/// 将图像转换为模型输入张量
///
/// # 参数
/// * `img` - 已缩放到模型输入尺寸的图像
/// * `input_height` - 输入图像高度
/// * `input_width` - 输入图像宽度
///
/// # 返回值
/// 返回形状为(1, 3, height, width)的四维张量，通道顺序为RGB，像素值范围[0, 1]
pub fn image_to_tensor(img: &DynamicImage, input_height: usize, input_width: usize) -> Array4<f32> {
    let mut tensor = Array::zeros((1, 3, input_height, input_width));

    for (x, y, pixel) in img.pixels() {
        let (x, y) = (x as usize, y as usize);
        if x >= input_width || y >= input_height {
            continue;
        }
        let [r, g, b, _] = pixel.0;
        tensor[[0, 0, y, x]] = (r as f32) / 255.0;
        tensor[[0, 1, y, x]] = (g as f32) / 255.0;
        tensor[[0, 2, y, x]] = (b as f32) / 255.0;
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn tensor_is_nchw_and_normalized() {
        let mut img = RgbImage::new(4, 2);
        img.put_pixel(3, 1, Rgb([255, 0, 51]));
        let tensor = image_to_tensor(&DynamicImage::ImageRgb8(img), 2, 4);

        assert_eq!(tensor.shape(), &[1, 3, 2, 4]);
        assert_eq!(tensor[[0, 0, 1, 3]], 1.0);
        assert_eq!(tensor[[0, 1, 1, 3]], 0.0);
        assert!((tensor[[0, 2, 1, 3]] - 0.2).abs() < 1e-6);
        assert_eq!(tensor[[0, 0, 0, 0]], 0.0);
    }

    #[test]
    fn resize_matches_model_input() {
        let img = DynamicImage::new_rgb8(1920, 1080);
        let resized = resize_image(&img, 640, 640);
        assert_eq!(resized.dimensions(), (640, 640));
    }
}
