// 该文件是 Yishang（衣裳）项目的一部分。
// src/postprocess.rs - 检测结果后处理流水线
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

use image::{
  GrayImage, ImageBuffer, Luma, RgbImage,
  imageops::{self, FilterType},
};
use thiserror::Error;
use tracing::{debug, error};

use crate::{
  annotation::Annotation,
  category::label_color,
  detection::{Detection, DetectionError, RawDetections, clamp_bbox},
  frame::BgrFrame,
  output::draw::Draw,
};

/// 掩膜二值化阈值
pub const BINARIZE_THRESHOLD: f32 = 0.5;

#[derive(Error, Debug)]
pub enum PostProcessError {
  #[error(transparent)]
  Detection(#[from] DetectionError),
  #[error("检测 {index} 的 bbox 面积为零: {bbox:?}")]
  DegenerateBox { index: usize, bbox: [i32; 4] },
}

/// 渲染方式，在边界处一次性确定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
  /// 所有检测叠加到同一画布
  FullImage,
  /// 每个检测单独一张掩膜图
  Segments { captions: bool },
  /// 不渲染标注，输出结构化标注列表
  Annotations,
}

/// 后处理结果
pub enum Outcome {
  Canvas(RgbImage),
  Segments(Vec<RgbImage>),
  Annotations(Vec<Annotation>),
}

/// 按置信度筛选检测。
///
/// 上游输出名义上按置信度降序，但这里不依赖这一约定：
/// 先做稳定的降序排序（同分保持原始顺序），再在第一个低于阈值处截断。
pub fn filter_detections(
  raw: &RawDetections,
  threshold: f32,
  width: u32,
  height: u32,
) -> Result<Vec<Detection>, PostProcessError> {
  raw.validate()?;

  let mut order: Vec<usize> = (0..raw.len()).collect();
  order.sort_by(|a, b| {
    raw.scores[*b]
      .partial_cmp(&raw.scores[*a])
      .unwrap_or(std::cmp::Ordering::Equal)
  });

  let mut detections = Vec::new();
  for index in order {
    let score = raw.scores[index];
    if !(score >= threshold) {
      break;
    }
    detections.push(Detection {
      bbox: clamp_bbox(raw.boxes[index], width, height),
      score,
      label: raw.labels[index],
      mask: raw.mask_channel(index)?,
    });
  }
  Ok(detections)
}

/// 把检测的掩膜通道缩放到 bbox 尺寸并在 0.5 处二值化。
///
/// 结果是 bbox 宽×高的 0/1 灰度图；bbox 面积为零视为退化检测。
pub fn binarized_mask(det: &Detection, index: usize) -> Result<GrayImage, PostProcessError> {
  let (w, h) = (det.box_width(), det.box_height());
  if w <= 0 || h <= 0 {
    return Err(PostProcessError::DegenerateBox {
      index,
      bbox: det.bbox,
    });
  }

  let (rows, cols) = det.mask.dim();
  let grid: ImageBuffer<Luma<f32>, Vec<f32>> =
    ImageBuffer::from_fn(cols as u32, rows as u32, |x, y| {
      Luma([det.mask[(y as usize, x as usize)]])
    });
  let resized = imageops::resize(&grid, w as u32, h as u32, FilterType::Triangle);

  let mut mask = GrayImage::new(w as u32, h as u32);
  for (dst, Luma([value])) in mask.pixels_mut().zip(resized.pixels()) {
    dst.0[0] = u8::from(*value > BINARIZE_THRESHOLD);
  }
  Ok(mask)
}

/// 二值掩膜放置到整幅 `width × height` 画布上，bbox 之外为 0
pub fn full_frame_mask(
  det: &Detection,
  index: usize,
  width: u32,
  height: u32,
) -> Result<GrayImage, PostProcessError> {
  let binarized = binarized_mask(det, index)?;
  let mut frame = GrayImage::new(width, height);
  let [x1, y1, _, _] = det.bbox;
  for (x, y, pixel) in binarized.enumerate_pixels() {
    let fx = x1 + x as i32;
    let fy = y1 + y as i32;
    if fx >= 0 && fy >= 0 && (fx as u32) < width && (fy as u32) < height {
      frame.put_pixel(fx as u32, fy as u32, *pixel);
    }
  }
  Ok(frame)
}

/// 掩膜外清零：掩膜内像素与画布一致，掩膜外一律为黑
pub fn mask_only(canvas: &RgbImage, mask: &GrayImage) -> RgbImage {
  let mut out = canvas.clone();
  for (x, y, pixel) in out.enumerate_pixels_mut() {
    if mask.get_pixel(x, y).0[0] == 0 {
      pixel.0 = [0, 0, 0];
    }
  }
  out
}

/// 后处理入口：阈值筛选、掩膜二值化、合成与标注装配。
///
/// 退化检测（bbox 面积为零）只丢弃该检测本身，同图的其余检测照常处理。
pub fn process(
  frame: BgrFrame,
  raw: &RawDetections,
  kind: RenderKind,
  threshold: f32,
  draw: &Draw,
) -> Result<Outcome, PostProcessError> {
  let canvas = frame.into_rgb();
  let (width, height) = canvas.dimensions();
  let detections = filter_detections(raw, threshold, width, height)?;
  debug!("阈值 {} 以上的检测: {}", threshold, detections.len());

  match kind {
    RenderKind::FullImage => {
      let mut out = canvas;
      for (index, det) in detections.iter().enumerate() {
        let mask = match full_frame_mask(det, index, width, height) {
          Ok(mask) => mask,
          Err(e) => {
            error!("跳过检测 {}: {}", index, e);
            continue;
          }
        };
        let color = label_color(det.label);
        draw.draw_box(&mut out, det.bbox, color);
        draw.draw_mask(&mut out, &mask, color);
        draw.draw_caption(&mut out, det.bbox, &Draw::caption(det.label, det.score));
      }
      Ok(Outcome::Canvas(out))
    }
    RenderKind::Segments { captions } => {
      let mut segments = Vec::with_capacity(detections.len());
      for (index, det) in detections.iter().enumerate() {
        let mask = match full_frame_mask(det, index, width, height) {
          Ok(mask) => mask,
          Err(e) => {
            error!("跳过检测 {}: {}", index, e);
            continue;
          }
        };
        let mut segment = mask_only(&canvas, &mask);
        if captions {
          draw.draw_caption(&mut segment, det.bbox, &Draw::caption(det.label, det.score));
        }
        segments.push(segment);
      }
      Ok(Outcome::Segments(segments))
    }
    RenderKind::Annotations => {
      let mut annotations = Vec::with_capacity(detections.len());
      for (index, det) in detections.iter().enumerate() {
        let mask = match full_frame_mask(det, index, width, height) {
          Ok(mask) => mask,
          Err(e) => {
            error!("跳过检测 {}: {}", index, e);
            continue;
          }
        };
        annotations.push(Annotation {
          bbox: det.bbox,
          score: det.score,
          category: det.label,
          part: mask_only(&canvas, &mask),
        });
      }
      Ok(Outcome::Annotations(annotations))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;
  use ndarray::Array3;

  fn raw_one(bbox: [f32; 4], score: f32, label: i64) -> RawDetections {
    raw_many(&[(bbox, score, label)])
  }

  fn raw_many(items: &[([f32; 4], f32, i64)]) -> RawDetections {
    let mut raw = RawDetections::default();
    for (bbox, score, label) in items {
      raw.boxes.push(*bbox);
      raw.scores.push(*score);
      raw.labels.push(*label);
      raw.masks.push(Array3::from_elem((28, 28, 13), 1.0));
    }
    raw
  }

  fn checker_canvas(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
      if (x + y) % 2 == 0 {
        Rgb([200, 30, 90])
      } else {
        Rgb([10, 240, 60])
      }
    })
  }

  #[test]
  fn filtering_is_monotone_in_threshold() {
    let raw = raw_many(&[
      ([0.0, 0.0, 10.0, 10.0], 0.95, 0),
      ([0.0, 0.0, 10.0, 10.0], 0.70, 1),
      ([0.0, 0.0, 10.0, 10.0], 0.40, 2),
    ]);
    let low = filter_detections(&raw, 0.3, 100, 100).unwrap();
    let high = filter_detections(&raw, 0.8, 100, 100).unwrap();
    assert_eq!(low.len(), 3);
    assert_eq!(high.len(), 1);
    // 高阈值的存活集合是低阈值存活集合的子集
    for det in &high {
      assert!(low.iter().any(|d| d.bbox == det.bbox && d.score == det.score));
    }
  }

  #[test]
  fn filtering_sorts_unordered_upstream_output() {
    // 上游未按降序排列时也不能漏掉高分检测
    let raw = raw_many(&[
      ([0.0, 0.0, 10.0, 10.0], 0.40, 0),
      ([0.0, 0.0, 10.0, 10.0], 0.90, 1),
    ]);
    let kept = filter_detections(&raw, 0.5, 100, 100).unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].label, 1);
  }

  #[test]
  fn all_below_threshold_yields_empty_set() {
    let raw = raw_one([100.0, 100.0, 300.0, 300.0], 0.9, 5);
    let kept = filter_detections(&raw, 0.95, 800, 600).unwrap();
    assert!(kept.is_empty());
  }

  #[test]
  fn binarized_mask_matches_box_dimensions() {
    let raw = raw_one([100.0, 100.0, 300.0, 300.0], 0.9, 5);
    let det = &filter_detections(&raw, 0.5, 800, 600).unwrap()[0];
    let mask = binarized_mask(det, 0).unwrap();
    assert_eq!(mask.dimensions(), (200, 200));
    assert!(mask.pixels().all(|p| p.0[0] == 1));
  }

  #[test]
  fn degenerate_box_is_an_error() {
    let raw = raw_one([50.0, 50.0, 50.0, 80.0], 0.9, 0);
    let det = &filter_detections(&raw, 0.5, 100, 100).unwrap()[0];
    assert!(matches!(
      binarized_mask(det, 0),
      Err(PostProcessError::DegenerateBox { index: 0, .. })
    ));
  }

  #[test]
  fn mask_only_pixels_are_source_or_zero() {
    let canvas = checker_canvas(64, 48);
    let raw = raw_one([8.0, 8.0, 40.0, 32.0], 0.9, 3);
    let det = &filter_detections(&raw, 0.5, 64, 48).unwrap()[0];
    let mask = full_frame_mask(det, 0, 64, 48).unwrap();
    let out = mask_only(&canvas, &mask);

    for (x, y, pixel) in out.enumerate_pixels() {
      if mask.get_pixel(x, y).0[0] == 1 {
        assert_eq!(pixel, canvas.get_pixel(x, y));
      } else {
        assert_eq!(pixel.0, [0, 0, 0]);
      }
    }
  }

  #[test]
  fn dress_scenario_produces_single_annotation() {
    let frame = BgrFrame::from_rgb(checker_canvas(800, 600));
    let raw = raw_one([100.0, 100.0, 300.0, 300.0], 0.9, 5);
    let draw = Draw::without_font();

    let outcome = process(frame, &raw, RenderKind::Annotations, 0.5, &draw).unwrap();
    let annotations = match outcome {
      Outcome::Annotations(a) => a,
      _ => panic!("期望标注输出"),
    };
    assert_eq!(annotations.len(), 1);
    let ann = &annotations[0];
    assert_eq!(ann.bbox, [100, 100, 300, 300]);
    assert_eq!(ann.category, 5);
    assert_eq!(crate::category::category_name(ann.category), Some("dress"));
    assert_eq!(Draw::caption(ann.category, ann.score), "dress 0.900");
    // 掩膜区域非空
    assert!(ann.part.pixels().any(|p| p.0 != [0, 0, 0]));
  }

  #[test]
  fn rendering_is_deterministic() {
    let raw = raw_many(&[
      ([10.0, 10.0, 60.0, 70.0], 0.9, 2),
      ([30.0, 20.0, 90.0, 80.0], 0.8, 7),
    ]);
    let draw = Draw::without_font();
    let render = || {
      let frame = BgrFrame::from_rgb(checker_canvas(120, 100));
      match process(frame, &raw, RenderKind::FullImage, 0.5, &draw).unwrap() {
        Outcome::Canvas(c) => c,
        _ => panic!("期望整幅画布输出"),
      }
    };
    assert_eq!(render().into_raw(), render().into_raw());
  }

  #[test]
  fn empty_survivors_keep_canvas_untouched() {
    let canvas = checker_canvas(32, 32);
    let frame = BgrFrame::from_rgb(canvas.clone());
    let raw = raw_one([0.0, 0.0, 10.0, 10.0], 0.2, 0);
    let draw = Draw::without_font();
    match process(frame, &raw, RenderKind::FullImage, 0.5, &draw).unwrap() {
      Outcome::Canvas(out) => assert_eq!(out, canvas),
      _ => panic!("期望整幅画布输出"),
    }
  }

  #[test]
  fn degenerate_detection_does_not_abort_image() {
    let frame = BgrFrame::from_rgb(checker_canvas(100, 100));
    let raw = raw_many(&[
      ([20.0, 20.0, 20.0, 60.0], 0.95, 0), // 面积为零
      ([10.0, 10.0, 50.0, 50.0], 0.90, 1),
    ]);
    let draw = Draw::without_font();
    match process(frame, &raw, RenderKind::Segments { captions: false }, 0.5, &draw).unwrap() {
      Outcome::Segments(segments) => assert_eq!(segments.len(), 1),
      _ => panic!("期望分段输出"),
    }
  }
}
