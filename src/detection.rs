// 该文件是 Yishang（衣裳）项目的一部分。
// src/detection.rs - 检测结果定义
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use ndarray::{Array2, Array3, Axis};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectionError {
  #[error("模型输出长度不一致: boxes={boxes}, scores={scores}, labels={labels}, masks={masks}")]
  LengthMismatch {
    boxes: usize,
    scores: usize,
    labels: usize,
    masks: usize,
  },
  #[error("检测 {index} 的类别 id {label} 超出掩膜通道数 {channels}")]
  LabelOutOfRange {
    index: usize,
    label: i64,
    channels: usize,
  },
}

/// 上游模型的单幅图像原始输出。
///
/// 四个序列按检测索引对齐；bbox 已由检测器换算回原图坐标。
/// 每个掩膜是 `H×W×C` 的浮点网格，通道维按类别 id 索引。
#[derive(Debug, Clone, Default)]
pub struct RawDetections {
  pub boxes: Vec<[f32; 4]>,
  pub scores: Vec<f32>,
  pub labels: Vec<i64>,
  pub masks: Vec<Array3<f32>>,
}

impl RawDetections {
  pub fn len(&self) -> usize {
    self.scores.len()
  }

  pub fn is_empty(&self) -> bool {
    self.scores.is_empty()
  }

  /// 校验四个序列长度一致
  pub fn validate(&self) -> Result<(), DetectionError> {
    if self.boxes.len() != self.scores.len()
      || self.labels.len() != self.scores.len()
      || self.masks.len() != self.scores.len()
    {
      return Err(DetectionError::LengthMismatch {
        boxes: self.boxes.len(),
        scores: self.scores.len(),
        labels: self.labels.len(),
        masks: self.masks.len(),
      });
    }
    Ok(())
  }

  /// 抽取第 `index` 个检测的类别掩膜通道 `mask[:, :, label]`
  pub fn mask_channel(&self, index: usize) -> Result<Array2<f32>, DetectionError> {
    let label = self.labels[index];
    let mask = &self.masks[index];
    let channels = mask.len_of(Axis(2));
    let channel = usize::try_from(label)
      .ok()
      .filter(|c| *c < channels)
      .ok_or(DetectionError::LabelOutOfRange {
        index,
        label,
        channels,
      })?;
    Ok(mask.index_axis(Axis(2), channel).to_owned())
  }
}

/// 通过置信度筛选的单个检测
#[derive(Debug, Clone)]
pub struct Detection {
  /// 整数像素坐标 [x1, y1, x2, y2]，已截断到图像边界
  pub bbox: [i32; 4],
  pub score: f32,
  pub label: i64,
  /// 已抽取的类别掩膜通道
  pub mask: Array2<f32>,
}

impl Detection {
  pub fn box_width(&self) -> i32 {
    self.bbox[2] - self.bbox[0]
  }

  pub fn box_height(&self) -> i32 {
    self.bbox[3] - self.bbox[1]
  }
}

/// 浮点 bbox 转整数像素坐标并截断到 `width × height` 边界
pub fn clamp_bbox(bbox: [f32; 4], width: u32, height: u32) -> [i32; 4] {
  let w = width as i32;
  let h = height as i32;
  [
    (bbox[0].floor() as i32).clamp(0, w),
    (bbox[1].floor() as i32).clamp(0, h),
    (bbox[2].ceil() as i32).clamp(0, w),
    (bbox[3].ceil() as i32).clamp(0, h),
  ]
}
