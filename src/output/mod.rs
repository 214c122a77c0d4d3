// 该文件是 Yishang（衣裳）项目的一部分。
// src/output/mod.rs - 输出路由
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

pub mod draw;

use std::path::{Path, PathBuf};
use std::process::Command;

use image::RgbImage;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
  annotation::{self, AnnotationError},
  config::DataLayout,
  postprocess::{Outcome, RenderKind},
};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  Image(#[from] image::ImageError),
  #[error("标注编码错误: {0}")]
  Annotation(#[from] AnnotationError),
  #[error("输出类型与渲染结果不匹配")]
  OutcomeMismatch,
}

/// 输出方式，命令行边界处一次性解析，之后单点分发。
///
/// 保存路径为 `None` 时落到数据目录布局下的默认位置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
  /// 整幅渲染图交给系统图像查看器
  ViewImage,
  /// 每个检测一张掩膜图，逐张交给查看器
  ViewSegments,
  /// 整幅渲染图保存为 JPEG
  SaveImage(Option<PathBuf>),
  /// 每个检测保存一张 JPEG，文件名后缀 `_segment_<n>.jpg`
  SaveSegments(Option<PathBuf>),
  /// 结构化标注返回给调用方并打印到标准输出
  EmitAnnotations,
  /// 结构化标注保存为单个 JSON 文档
  SaveAnnotations(Option<PathBuf>),
}

impl OutputMode {
  /// 该输出方式对应的渲染方式
  pub fn render_kind(&self) -> RenderKind {
    match self {
      OutputMode::ViewImage | OutputMode::SaveImage(_) => RenderKind::FullImage,
      OutputMode::ViewSegments | OutputMode::SaveSegments(_) => {
        RenderKind::Segments { captions: true }
      }
      OutputMode::EmitAnnotations | OutputMode::SaveAnnotations(_) => RenderKind::Annotations,
    }
  }
}

/// 逐检测保存时的文件路径：去掉扩展名后追加 `_segment_<n>.jpg`
pub fn segment_path(base: &Path, n: usize) -> PathBuf {
  base.with_extension("").with_file_name(format!(
    "{}_segment_{}.jpg",
    base.file_stem().map_or_else(String::new, |s| s.to_string_lossy().into_owned()),
    n
  ))
}

/// 渲染结果按输出方式写出。
///
/// 同一路径重复写入直接覆盖；保存目录不存在时先创建。
pub fn write_outcome(
  mode: &OutputMode,
  layout: &DataLayout,
  image_name: &str,
  outcome: &Outcome,
) -> Result<(), OutputError> {
  match (mode, outcome) {
    (OutputMode::ViewImage, Outcome::Canvas(canvas)) => {
      let path = std::env::temp_dir().join(image_name);
      save_image(canvas, &path)?;
      open_viewer(&path);
      Ok(())
    }
    (OutputMode::ViewSegments, Outcome::Segments(segments)) => {
      let base = std::env::temp_dir().join(image_name);
      for (n, segment) in segments.iter().enumerate() {
        let path = segment_path(&base, n);
        save_image(segment, &path)?;
        open_viewer(&path);
      }
      Ok(())
    }
    (OutputMode::SaveImage(save_path), Outcome::Canvas(canvas)) => {
      let path = resolve_image_path(save_path, layout, image_name);
      save_image(canvas, &path)?;
      info!("保存图像: {}", path.display());
      Ok(())
    }
    (OutputMode::SaveSegments(save_path), Outcome::Segments(segments)) => {
      let base = resolve_image_path(save_path, layout, image_name);
      for (n, segment) in segments.iter().enumerate() {
        let path = segment_path(&base, n);
        save_image(segment, &path)?;
        info!("保存分段图像: {}", path.display());
      }
      Ok(())
    }
    (OutputMode::EmitAnnotations, Outcome::Annotations(annotations)) => {
      // 无保存路径：标注直接打印到标准输出
      println!("{}", annotation::to_json(annotations)?);
      Ok(())
    }
    (OutputMode::SaveAnnotations(save_path), Outcome::Annotations(annotations)) => {
      let path = match save_path {
        Some(path) => path.clone(),
        None => layout
          .processed_annotations_dir()
          .join(Path::new(image_name).with_extension("json")),
      };
      write_json(&path, &annotation::to_json(annotations)?)?;
      info!("保存标注: {}", path.display());
      Ok(())
    }
    _ => Err(OutputError::OutcomeMismatch),
  }
}

fn resolve_image_path(save_path: &Option<PathBuf>, layout: &DataLayout, image_name: &str) -> PathBuf {
  match save_path {
    Some(path) => path.clone(),
    None => layout.processed_images_dir().join(image_name),
  }
}

fn save_image(image: &RgbImage, path: &Path) -> Result<(), OutputError> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)?;
  }
  image.save(path)?;
  Ok(())
}

fn write_json(path: &Path, text: &str) -> Result<(), OutputError> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(path, text)?;
  Ok(())
}

/// 交给系统图像查看器，失败只告警不终止
fn open_viewer(path: &Path) {
  #[cfg(target_os = "macos")]
  let command = "open";
  #[cfg(not(target_os = "macos"))]
  let command = "xdg-open";

  info!("打开图像: {}", path.display());
  if let Err(e) = Command::new(command).arg(path).spawn() {
    warn!("无法启动图像查看器 {}: {}", command, e);
  }
}
