// 该文件是 Yishang（衣裳）项目的一部分。
// src/config.rs - 运行配置与数据目录布局
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

use crate::output::OutputMode;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("置信度阈值必须位于 [0, 1]，实际为 {0}")]
  InvalidThreshold(f32),
  #[error("图像路径、图像 URL 与整个验证集三者必须恰好指定一个，实际指定了 {given} 个")]
  SourceSelection { given: usize },
  #[error("逐检测分段模式与整个验证集不能同时使用")]
  SegmentsWithAllSet,
  #[error("快照目录 {0} 中没有可用的模型")]
  NoSnapshots(PathBuf),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
}

/// 图像来源，三者恰好其一
#[derive(Debug, Clone)]
pub enum ImageSource {
  File(PathBuf),
  Url(Url),
  /// 验证集中的全部图像
  ValidationSet,
}

/// 数据目录布局。
///
/// 沿用数据集的目录约定：
/// `datasets/coco/images`、`datasets/coco/annotations`、
/// `results/snapshots`、`results/processedimages/{images,annotations}`。
#[derive(Debug, Clone)]
pub struct DataLayout {
  pub data_dir: PathBuf,
}

impl DataLayout {
  pub fn new(data_dir: impl Into<PathBuf>) -> Self {
    Self {
      data_dir: data_dir.into(),
    }
  }

  pub fn images_dir(&self) -> PathBuf {
    self.data_dir.join("datasets").join("coco").join("images")
  }

  pub fn validation_index(&self) -> PathBuf {
    self
      .data_dir
      .join("datasets")
      .join("coco")
      .join("annotations")
      .join("instances_val.json")
  }

  pub fn snapshots_dir(&self) -> PathBuf {
    self.data_dir.join("results").join("snapshots")
  }

  pub fn processed_images_dir(&self) -> PathBuf {
    self
      .data_dir
      .join("results")
      .join("processedimages")
      .join("images")
  }

  pub fn processed_annotations_dir(&self) -> PathBuf {
    self
      .data_dir
      .join("results")
      .join("processedimages")
      .join("annotations")
  }

  /// 默认模型：快照目录里结尾数字最大的文件，数字相同按文件名取大
  pub fn latest_snapshot(&self) -> Result<PathBuf, ConfigError> {
    let dir = self.snapshots_dir();
    let mut best: Option<(i64, String)> = None;
    for entry in std::fs::read_dir(&dir)? {
      let entry = entry?;
      if !entry.file_type()?.is_file() {
        continue;
      }
      let name = entry.file_name().to_string_lossy().into_owned();
      let key = (trailing_number(&name).map_or(-1, |n| n as i64), name);
      if best.as_ref().is_none_or(|b| key > *b) {
        best = Some(key);
      }
    }
    best
      .map(|(_, name)| dir.join(name))
      .ok_or(ConfigError::NoSnapshots(dir))
  }
}

/// 文件名末尾（扩展名之前）的十进制数字
fn trailing_number(name: &str) -> Option<u64> {
  let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
  let digits = stem
    .chars()
    .rev()
    .take_while(char::is_ascii_digit)
    .count();
  if digits == 0 {
    return None;
  }
  stem[stem.len() - digits..].parse().ok()
}

/// 一次运行的完整配置，显式传入流水线，不存在进程级可变状态
#[derive(Debug, Clone)]
pub struct RunConfig {
  pub source: ImageSource,
  pub mode: OutputMode,
  pub threshold_score: f32,
  /// 整个验证集模式下最多处理的图像数
  pub limit: Option<usize>,
  pub model_path: Option<PathBuf>,
  pub layout: DataLayout,
  pub font_path: Option<PathBuf>,
}

impl RunConfig {
  /// 处理开始前的配置校验，违反即拒绝整次运行
  pub fn validate(&self) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&self.threshold_score) {
      return Err(ConfigError::InvalidThreshold(self.threshold_score));
    }
    if matches!(self.source, ImageSource::ValidationSet)
      && matches!(
        self.mode,
        OutputMode::ViewSegments | OutputMode::SaveSegments(_)
      )
    {
      return Err(ConfigError::SegmentsWithAllSet);
    }
    Ok(())
  }

  /// 解析模型路径：显式指定优先，否则取最新快照
  pub fn resolve_model_path(&self) -> Result<PathBuf, ConfigError> {
    match &self.model_path {
      Some(path) => Ok(path.clone()),
      None => self.layout.latest_snapshot(),
    }
  }
}

/// 根据命令行给出的三个互斥来源构造 [`ImageSource`]
pub fn select_source(
  image_path: Option<PathBuf>,
  image_url: Option<Url>,
  all_set: bool,
) -> Result<ImageSource, ConfigError> {
  let given =
    usize::from(image_path.is_some()) + usize::from(image_url.is_some()) + usize::from(all_set);
  if given != 1 {
    return Err(ConfigError::SourceSelection { given });
  }
  Ok(match (image_path, image_url) {
    (Some(path), _) => ImageSource::File(path),
    (_, Some(url)) => ImageSource::Url(url),
    _ => ImageSource::ValidationSet,
  })
}

/// URL 来源在默认保存路径下使用的文件名
pub const URL_IMAGE_NAME: &str = "urlimg.jpg";

/// 来源对应的图像名称（用于派生默认保存路径）
pub fn source_image_name(path: &Path) -> String {
  path
    .file_name()
    .map_or_else(|| URL_IMAGE_NAME.to_string(), |n| n.to_string_lossy().into_owned())
}
