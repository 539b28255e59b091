//! 产物存储
//!
//! 写入阶段与读取阶段之间只通过输出目录中的文件命名约定通信：
//! `{index:02}{_suffix}.jpg` 保存分割图像，`{index:02}{_suffix}.json` 保存元数据。
//! 两个文件同时存在时，读取方才认为这组产物可见。

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use serde::{Deserialize, Serialize};

use crate::config::{IMAGE_EXTENSION, METADATA_EXTENSION, SEGMENT_JPEG_QUALITY};
use crate::detect::PixelBox;
use crate::error::{DrapeError, Result};
use crate::hue::ColorValue;

/// 同一索引下区分多个产物的后缀
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// 无后缀
    Bare,
    Dress,
    /// 单品槽位 `_0`
    Item0,
    Item1,
    Item2,
}

/// 读取时探测后缀的固定顺序
pub const PROBE_ORDER: [Slot; 4] = [Slot::Dress, Slot::Item0, Slot::Item1, Slot::Item2];

impl Slot {
    /// 单品槽位只有 `0`、`1`、`2` 三个，超出范围返回 `None`
    pub fn item(n: u8) -> Option<Slot> {
        match n {
            0 => Some(Slot::Item0),
            1 => Some(Slot::Item1),
            2 => Some(Slot::Item2),
            _ => None,
        }
    }

    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            Slot::Bare => None,
            Slot::Dress => Some("dress"),
            Slot::Item0 => Some("0"),
            Slot::Item1 => Some("1"),
            Slot::Item2 => Some("2"),
        }
    }

    fn marker(&self) -> String {
        self.suffix().map(|s| format!("_{}", s)).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub index: u32,
    pub slot: Slot,
}

impl ArtifactKey {
    pub fn new(index: u32, slot: Slot) -> Self {
        Self { index, slot }
    }

    /// 不含扩展名的文件名，如 `03_dress`
    pub fn stem(&self) -> String {
        format!("{:02}{}", self.index, self.slot.marker())
    }
}

/// 持久化的元数据记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub category: String,
    pub colors: Vec<ColorValue>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<PixelBox>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub image: PathBuf,
    pub metadata: PathBuf,
}

/// 产物的写入、枚举与读取
///
/// 编排层只依赖这个接口，命名方案可以整体替换。
pub trait ArtifactStore: Send + Sync {
    /// 先写图像再写元数据，任一步失败即整体失败
    fn write(&self, key: &ArtifactKey, image: &RgbImage, metadata: &Metadata) -> Result<ArtifactPaths>;

    /// 按 [`PROBE_ORDER`] 列出图像与元数据都存在的产物
    fn find_artifacts(&self, index: u32) -> Vec<ArtifactKey>;

    fn read(&self, key: &ArtifactKey) -> Result<Metadata>;

    fn paths(&self, key: &ArtifactKey) -> ArtifactPaths;
}

/// 基于输出目录的产物存储
///
/// 没有原子重命名，也没有按索引加锁：并发写同一索引时，
/// 读取方可能看到来自不同调用的图像和元数据。
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    output_dir: PathBuf,
}

impl FsArtifactStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// 创建输出目录（已存在则直接使用）
    pub fn create(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(output_dir);
        std::fs::create_dir_all(&store.output_dir).map_err(|e| DrapeError::io(&store.output_dir, e))?;
        Ok(store)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn write_image(&self, key: &ArtifactKey, image: &RgbImage) -> Result<PathBuf> {
        let path = self.paths(key).image;
        let file = File::create(&path).map_err(|e| DrapeError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut writer, SEGMENT_JPEG_QUALITY)
            .encode_image(image)
            .map_err(|source| DrapeError::ImageEncode {
                path: path.clone(),
                source,
            })?;
        writer.flush().map_err(|e| DrapeError::io(&path, e))?;
        Ok(path)
    }

    pub fn write_metadata(&self, key: &ArtifactKey, metadata: &Metadata) -> Result<PathBuf> {
        let path = self.paths(key).metadata;
        let json = serde_json::to_vec_pretty(metadata).map_err(|e| DrapeError::CorruptMetadata {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| DrapeError::io(&path, e))?;
        Ok(path)
    }
}

impl ArtifactStore for FsArtifactStore {
    fn write(&self, key: &ArtifactKey, image: &RgbImage, metadata: &Metadata) -> Result<ArtifactPaths> {
        let image = self.write_image(key, image)?;
        let metadata = self.write_metadata(key, metadata)?;
        tracing::debug!(stem = %key.stem(), "产物已写入");
        Ok(ArtifactPaths { image, metadata })
    }

    fn find_artifacts(&self, index: u32) -> Vec<ArtifactKey> {
        PROBE_ORDER
            .iter()
            .map(|&slot| ArtifactKey::new(index, slot))
            .filter(|key| {
                let paths = self.paths(key);
                paths.image.exists() && paths.metadata.exists()
            })
            .collect()
    }

    fn read(&self, key: &ArtifactKey) -> Result<Metadata> {
        let path = self.paths(key).metadata;
        let content = std::fs::read_to_string(&path).map_err(|e| DrapeError::io(&path, e))?;
        serde_json::from_str(&content).map_err(|e| DrapeError::CorruptMetadata {
            path,
            reason: e.to_string(),
        })
    }

    fn paths(&self, key: &ArtifactKey) -> ArtifactPaths {
        let stem = key.stem();
        ArtifactPaths {
            image: self.output_dir.join(format!("{}.{}", stem, IMAGE_EXTENSION)),
            metadata: self.output_dir.join(format!("{}.{}", stem, METADATA_EXTENSION)),
        }
    }
}
