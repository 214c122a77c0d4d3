// 该文件是 Yishang（衣裳）项目的一部分。
// src/frame.rs - BGR 帧定义
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

use image::{DynamicImage, Rgb, RgbImage};

/// 按 BGR 通道顺序保存的帧。
///
/// 检测器的预处理约定使用 BGR 均值减法，因此解码后立即换到 BGR，
/// 绘制前通过 [`BgrFrame::into_rgb`] 换回 RGB。该方法按值消耗帧，
/// 保证从加载到绘制恰好发生一次颜色转换。
pub struct BgrFrame {
  // 像素容器复用 Rgb<u8>，通道实际按 B、G、R 排列
  data: RgbImage,
}

impl BgrFrame {
  /// 从解码结果构造 BGR 帧
  pub fn from_decoded(image: DynamicImage) -> Self {
    Self::from_rgb(image.into_rgb8())
  }

  /// 从 RGB 图像构造 BGR 帧
  pub fn from_rgb(mut image: RgbImage) -> Self {
    for Rgb(pixel) in image.pixels_mut() {
      pixel.swap(0, 2);
    }
    Self { data: image }
  }

  pub fn width(&self) -> u32 {
    self.data.width()
  }

  pub fn height(&self) -> u32 {
    self.data.height()
  }

  /// 原始 BGR 像素，供检测器预处理使用
  pub fn as_bgr(&self) -> &RgbImage {
    &self.data
  }

  /// 唯一一次颜色转换，产生用于绘制的 RGB 画布
  pub fn into_rgb(self) -> RgbImage {
    let mut image = self.data;
    for Rgb(pixel) in image.pixels_mut() {
      pixel.swap(0, 2);
    }
    image
  }
}
