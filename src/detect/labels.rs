//! 类别名称表

use std::path::Path;

use ort::session::Session;

use crate::config::{MODEL_NAMES_METADATA_KEY, UNKNOWN_CLASS_LABEL};
use crate::error::{DrapeError, Result};

/// 类别ID到类别名称的映射，名称统一为小写
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassLabels {
    labels: Vec<String>,
}

impl ClassLabels {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            labels: labels
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// 读取每行一个类别的文本文件，空行忽略
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DrapeError::io(path, e))?;
        Ok(Self::new(content.lines()))
    }

    /// 读取模型元数据中的类别表
    ///
    /// ultralytics导出的模型把类别写成 `{0: 'shirt', 1: 'dress'}` 形式的字符串，
    /// 元数据中没有该项时返回 `None`。
    pub fn from_model(model: &Session) -> Result<Option<Self>> {
        let names = model.metadata()?.custom(MODEL_NAMES_METADATA_KEY)?;
        Ok(names.map(|names| Self::parse_names(&names)))
    }

    /// 确定检测器使用的类别表
    ///
    /// 配置了类别文件时以文件为准，否则读取模型内嵌的类别表。
    /// 两者都拿不到类别时返回 [`DrapeError::Config`]。
    pub fn resolve<F>(classes_path: Option<&Path>, model_path: &Path, embedded: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Option<Self>>,
    {
        let labels = match classes_path {
            Some(path) => Self::from_file(path)?,
            None => embedded()?.unwrap_or_default(),
        };
        if labels.is_empty() {
            return Err(DrapeError::Config {
                path: classes_path.unwrap_or(model_path).to_path_buf(),
                message: "没有可用的类别表，请配置 classes_path 或使用带 names 元数据的模型".to_string(),
            });
        }
        Ok(labels)
    }

    /// 解析 `{id: 'name', ...}` 形式的类别表，缺失的ID记为 "unknown"
    pub fn parse_names(names: &str) -> Self {
        let mut entries: Vec<(usize, String)> = Vec::new();
        let mut rest = names;
        while let Some(start) = rest.find(|c: char| c.is_ascii_digit()) {
            rest = &rest[start..];
            let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            let Ok(id) = rest[..digits].parse::<usize>() else {
                break;
            };
            rest = &rest[digits..];

            let Some(open) = rest.find(['\'', '"']) else {
                break;
            };
            let quote = &rest[open..open + 1];
            rest = &rest[open + 1..];
            let Some(close) = rest.find(quote) else {
                break;
            };
            entries.push((id, rest[..close].trim().to_lowercase()));
            rest = &rest[close + 1..];
        }

        let len = entries.iter().map(|(id, _)| id + 1).max().unwrap_or(0);
        let mut labels = vec![UNKNOWN_CLASS_LABEL.to_string(); len];
        for (id, name) in entries {
            if !name.is_empty() {
                labels[id] = name;
            }
        }
        Self { labels }
    }

    pub fn name(&self, class_id: usize) -> &str {
        self.labels
            .get(class_id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_CLASS_LABEL)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
