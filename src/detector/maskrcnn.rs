// 该文件是 Yishang（衣裳）项目的一部分。
// src/detector/maskrcnn.rs - Mask R-CNN 检测器（ONNX Runtime 后端）
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use anyhow::{Context, Result, ensure};
use image::{RgbImage, imageops, imageops::FilterType};
use ndarray::{Array4, Ix2, Ix3, Ix5, s};
use ort::{
  execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
  session::{Session, builder::SessionBuilder},
  value::TensorRef,
};
use tracing::{debug, info};

use super::Detector;
use crate::{detection::RawDetections, frame::BgrFrame};

// 预处理约定：caffe 风格 BGR 均值减法，短边 800、长边不超过 1333
const BGR_MEAN: [f32; 3] = [103.939, 116.779, 123.68];
const MIN_SIDE: f32 = 800.0;
const MAX_SIDE: f32 = 1333.0;

pub struct MaskRcnnDetector {
  session: Session,
  input_name: String,
  output_names: Vec<String>,
}

impl MaskRcnnDetector {
  pub fn new(model_path: &Path) -> Result<Self> {
    info!("加载模型文件: {}", model_path.display());
    let session = SessionBuilder::new()
      .context("初始化推理会话失败")?
      .with_execution_providers([
        TensorRTExecutionProvider::default().build(),
        CUDAExecutionProvider::default().build(),
      ])
      .context("设置执行后端失败")?
      .commit_from_file(model_path)
      .with_context(|| format!("读取模型文件失败: {}", model_path.display()))?;

    let input_name = session.inputs[0].name.clone();
    let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
    // 与上游导出约定一致：最后四个输出依次为 boxes、scores、labels、masks
    ensure!(
      output_names.len() >= 4,
      "模型输出数量不足: 期望至少 4 个，实际 {} 个",
      output_names.len()
    );
    info!("模型加载完成，输出: {:?}", output_names);

    Ok(Self {
      session,
      input_name,
      output_names,
    })
  }
}

/// 短边缩放到 800，同时保证长边不超过 1333
fn network_scale(width: u32, height: u32) -> f32 {
  let smallest = width.min(height) as f32;
  let largest = width.max(height) as f32;
  let mut scale = MIN_SIDE / smallest;
  if largest * scale > MAX_SIDE {
    scale = MAX_SIDE / largest;
  }
  scale
}

/// BGR 图像缩放并减均值，得到 NHWC 浮点张量
fn preprocess(bgr: &RgbImage) -> (Array4<f32>, f32) {
  let scale = network_scale(bgr.width(), bgr.height());
  let width = (bgr.width() as f32 * scale).round() as u32;
  let height = (bgr.height() as f32 * scale).round() as u32;
  let resized = imageops::resize(bgr, width, height, FilterType::Triangle);

  let mut tensor = Array4::<f32>::zeros((1, height as usize, width as usize, 3));
  for (x, y, pixel) in resized.enumerate_pixels() {
    for c in 0..3 {
      tensor[[0, y as usize, x as usize, c]] = pixel.0[c] as f32 - BGR_MEAN[c];
    }
  }
  (tensor, scale)
}

impl Detector for MaskRcnnDetector {
  fn detect(&mut self, frame: &BgrFrame) -> Result<RawDetections> {
    let (tensor, scale) = preprocess(frame.as_bgr());
    debug!(
      "网络输入: {}x{}, 缩放比 {:.4}",
      tensor.shape()[2],
      tensor.shape()[1],
      scale
    );

    let total = self.output_names.len();
    let outputs = self
      .session
      .run(ort::inputs![self.input_name.as_str() => TensorRef::from_array_view(&tensor)?])
      .context("模型推理失败")?;

    let boxes = outputs[self.output_names[total - 4].as_str()]
      .try_extract_array::<f32>()?
      .into_dimensionality::<Ix3>()
      .context("boxes 输出形状不符")?
      .to_owned();
    let scores = outputs[self.output_names[total - 3].as_str()]
      .try_extract_array::<f32>()?
      .into_dimensionality::<Ix2>()
      .context("scores 输出形状不符")?
      .to_owned();
    // 导出方式不同，labels 可能是整型或浮点张量
    let labels: Vec<i64> =
      match outputs[self.output_names[total - 2].as_str()].try_extract_array::<i64>() {
        Ok(raw) => raw.iter().copied().collect(),
        Err(_) => outputs[self.output_names[total - 2].as_str()]
          .try_extract_array::<f32>()?
          .iter()
          .map(|v| *v as i64)
          .collect(),
      };
    let masks = outputs[self.output_names[total - 1].as_str()]
      .try_extract_array::<f32>()?
      .into_dimensionality::<Ix5>()
      .context("masks 输出形状不符")?
      .to_owned();

    let mut raw = RawDetections::default();
    for i in 0..scores.shape()[1] {
      let score = scores[[0, i]];
      // 上游把检测数补齐到固定长度，填充项的置信度为 -1
      if score < 0.0 {
        continue;
      }
      raw.boxes.push([
        boxes[[0, i, 0]] / scale,
        boxes[[0, i, 1]] / scale,
        boxes[[0, i, 2]] / scale,
        boxes[[0, i, 3]] / scale,
      ]);
      raw.scores.push(score);
      raw.labels.push(labels[i]);
      raw.masks.push(masks.slice(s![0, i, .., .., ..]).to_owned());
    }
    raw.validate()?;

    debug!("有效检测数: {}", raw.len());
    Ok(raw)
  }
}
