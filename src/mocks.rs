// 该文件是 Yishang（衣裳）项目的一部分。
// src/mocks.rs - 测试用检测器替身
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use anyhow::Result;
use ndarray::Array3;

use crate::{detection::RawDetections, detector::Detector, frame::BgrFrame};

/// 返回固定检测结果的模型替身，并记录被调用的次数
#[derive(Debug, Clone, Default)]
pub struct MockDetector {
  pub canned: RawDetections,
  pub calls: usize,
}

impl MockDetector {
  pub fn new(canned: RawDetections) -> Self {
    Self { canned, calls: 0 }
  }

  /// 无检测结果的替身
  pub fn empty() -> Self {
    Self::default()
  }
}

impl Detector for MockDetector {
  fn detect(&mut self, _frame: &BgrFrame) -> Result<RawDetections> {
    self.calls += 1;
    Ok(self.canned.clone())
  }
}

/// 构造测试用原始输出：每个检测的掩膜在其类别通道上全为 1.0
pub fn canned_detections(items: &[([f32; 4], f32, i64)]) -> RawDetections {
  let mut raw = RawDetections::default();
  for (bbox, score, label) in items {
    let mut mask = Array3::zeros((28, 28, 13));
    if let Ok(channel) = usize::try_from(*label) {
      if channel < 13 {
        mask
          .index_axis_mut(ndarray::Axis(2), channel)
          .fill(1.0);
      }
    }
    raw.boxes.push(*bbox);
    raw.scores.push(*score);
    raw.labels.push(*label);
    raw.masks.push(mask);
  }
  raw
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::RgbImage;

  #[test]
  fn mock_counts_invocations() {
    let mut mock = MockDetector::new(canned_detections(&[([0.0, 0.0, 8.0, 8.0], 0.9, 5)]));
    let frame = BgrFrame::from_rgb(RgbImage::new(16, 16));
    let raw = mock.detect(&frame).unwrap();
    assert_eq!(raw.len(), 1);
    assert_eq!(mock.calls, 1);
  }

  #[test]
  fn canned_mask_fills_label_channel() {
    let raw = canned_detections(&[([0.0, 0.0, 8.0, 8.0], 0.9, 5)]);
    let channel = raw.mask_channel(0).unwrap();
    assert!(channel.iter().all(|v| *v == 1.0));
  }
}
