// 该文件是 Yishang（衣裳）项目的一部分。
// src/annotation.rs - 标注记录与 JSON 编码
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::io::Cursor;

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotationError {
  #[error("图像错误: {0}")]
  Image(#[from] image::ImageError),
  #[error("JSON 错误: {0}")]
  Json(#[from] serde_json::Error),
  #[error("base64 解码错误: {0}")]
  Base64(#[from] base64::DecodeError),
}

/// 单个存活检测的标注。
///
/// 装配后不再修改；`part` 是掩膜外清零的合成图。
#[derive(Debug, Clone)]
pub struct Annotation {
  pub bbox: [i32; 4],
  pub score: f32,
  pub category: i64,
  pub part: RgbImage,
}

/// 持久化形式。
///
/// 原始像素缓冲不是合法的 JSON 值，`part` 以 base64 编码的 PNG 存储，
/// PNG 无损，bbox/score/category 与像素都能精确往返。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationRecord {
  pub bbox: [i32; 4],
  pub score: f32,
  pub category: i64,
  pub part: String,
}

impl Annotation {
  pub fn to_record(&self) -> Result<AnnotationRecord, AnnotationError> {
    let mut buffer = Cursor::new(Vec::new());
    self.part.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(AnnotationRecord {
      bbox: self.bbox,
      score: self.score,
      category: self.category,
      part: STANDARD.encode(buffer.into_inner()),
    })
  }

  pub fn from_record(record: &AnnotationRecord) -> Result<Self, AnnotationError> {
    let bytes = STANDARD.decode(&record.part)?;
    let part = image::load_from_memory(&bytes)?.into_rgb8();
    Ok(Annotation {
      bbox: record.bbox,
      score: record.score,
      category: record.category,
      part,
    })
  }
}

/// 标注列表编码为单个 JSON 文档
pub fn to_json(annotations: &[Annotation]) -> Result<String, AnnotationError> {
  let records = annotations
    .iter()
    .map(Annotation::to_record)
    .collect::<Result<Vec<_>, _>>()?;
  Ok(serde_json::to_string(&records)?)
}

/// 从 JSON 文档解码标注列表
pub fn from_json(text: &str) -> Result<Vec<Annotation>, AnnotationError> {
  let records: Vec<AnnotationRecord> = serde_json::from_str(text)?;
  records.iter().map(Annotation::from_record).collect()
}
