use image::{DynamicImage, GenericImageView, ImageBuffer};
use raqote::{DrawOptions, DrawTarget, LineJoin, PathBuilder, SolidSource, Source, StrokeStyle};

use crate::detect::bounds::Detection;
use crate::error::{DrapeError, Result};

/// 在图像上绘制检测结果
///
/// 连衣裙使用青色框，其他类别使用红色框。
pub fn draw_detections(image: &DynamicImage, detections: &[Detection]) -> Result<DynamicImage> {
    let (img_width, img_height) = image.dimensions();
    let mut dt = DrawTarget::new(img_width as i32, img_height as i32);

    let rgba_image = image.to_rgba8();
    let image_data: Vec<u32> = rgba_image
        .chunks(4)
        .map(|pixel| u32::from_le_bytes([pixel[2], pixel[1], pixel[0], pixel[3]]))
        .collect();

    let img = raqote::Image {
        width: img_width as i32,
        height: img_height as i32,
        data: &image_data,
    };
    dt.draw_image_at(0.0, 0.0, &img, &DrawOptions::new());

    for detection in detections {
        let (x1, y1, x2, y2) = detection.bbox.clamped(img_width, img_height);

        let mut pb = PathBuilder::new();
        pb.rect(x1 as f32, y1 as f32, (x2 - x1) as f32, (y2 - y1) as f32);
        let path = pb.finish();

        let color = if detection.is_dress() {
            SolidSource { r: 0x00, g: 0xFF, b: 0xFF, a: 0xFF }
        } else {
            SolidSource { r: 0xFF, g: 0x00, b: 0x00, a: 0xFF }
        };

        dt.stroke(
            &path,
            &Source::Solid(color),
            &StrokeStyle {
                join: LineJoin::Round,
                width: 2.0,
                ..StrokeStyle::default()
            },
            &DrawOptions::default(),
        );
    }

    // BGRA 转回 RGBA
    let pixels: Vec<u8> = dt
        .get_data()
        .iter()
        .flat_map(|&pixel| {
            let bytes = pixel.to_le_bytes();
            [bytes[2], bytes[1], bytes[0], bytes[3]]
        })
        .collect();

    ImageBuffer::from_raw(img_width, img_height, pixels)
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| DrapeError::Render {
            message: "绘制结果尺寸与原图不一致".to_string(),
        })
}
