// 该文件是 Yishang（衣裳）项目的一部分。
// src/detector/mod.rs - 检测器定义
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

pub mod maskrcnn;

pub use maskrcnn::MaskRcnnDetector;

use anyhow::Result;

use crate::{detection::RawDetections, frame::BgrFrame};

/// 上游检测模型。
///
/// 对本项目而言模型是不透明的外部协作者：输入一帧 BGR 图像，
/// 返回四个按检测索引对齐的序列，bbox 已换算回原图坐标。
pub trait Detector {
  fn detect(&mut self, frame: &BgrFrame) -> Result<RawDetections>;
}
