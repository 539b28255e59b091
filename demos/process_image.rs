use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use drape::{Drape, DrapeConfig, draw_detections};
use tracing::Level;

fn init_logging() {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();
}

// 用法: process_image <图像路径> [索引] [配置文件]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let mut args = std::env::args().skip(1);
    let image_path = PathBuf::from(args.next().unwrap_or_else(|| "data/test/shirt.jpg".to_string()));
    let index: u32 = args.next().map(|s| s.parse::<u32>()).transpose()?.unwrap_or(0);
    let config = match args.next() {
        Some(path) => DrapeConfig::from_json_file(PathBuf::from(path).as_path())?,
        None => DrapeConfig::default(),
    };

    println!("Drape 服装处理示例");
    println!("==================");

    let drape = match Drape::from_config(&config) {
        Ok(drape) => Arc::new(drape),
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Err(e.into());
        }
    };

    // 先画出所有检测框作为预览
    let image = image::open(&image_path)?;
    let detections = drape.detect_image(&image)?;
    println!("检测到 {} 个目标", detections.len());
    for (i, detection) in detections.iter().enumerate() {
        println!(
            "  目标 {}: {} - 置信度: {:.2} - 位置: {:?}",
            i + 1,
            detection.category,
            detection.confidence,
            detection.bbox
        );
    }
    let preview_path = config.output_dir.join(format!("{:02}_preview.png", index));
    draw_detections(&image, &detections)?.save(&preview_path)?;
    println!("检测预览已保存到: {}", preview_path.display());

    let start = Instant::now();
    match Arc::clone(&drape).process_async(image_path, index).await {
        Ok(garment) => {
            println!("总处理耗时: {:?}", start.elapsed());
            println!("类别: {}", garment.display_category());
            println!("{}", serde_json::to_string_pretty(&garment)?);
        }
        Err(e) => {
            eprintln!("{} ({})", e.user_message(), e);
        }
    }

    Ok(())
}
