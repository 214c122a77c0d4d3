// 该文件是 Yishang（衣裳）项目的一部分。
// src/output/draw.rs - 检测结果可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::{distance_transform::Norm, morphology::erode};
use tracing::warn;

use crate::category::category_name;

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_HEIGHT: i32 = 24;
const LABEL_CHAR_WIDTH: f32 = 11.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;

// 掩膜边界宽度（腐蚀核半径）
const MASK_BORDER_RADIUS: u8 = 2;

// 常见系统字体位置，未指定 --font 时依次尝试
const FONT_CANDIDATES: [&str; 3] = [
  "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/TTF/DejaVuSans.ttf",
  "/System/Library/Fonts/Helvetica.ttc",
];

pub struct Draw {
  font: Option<FontVec>,
  font_size: f32,
  label_text_height: i32,
  label_char_width: f32,
  label_text_vertical_padding: i32,
}

impl Draw {
  /// 加载字体并构造绘制器。
  ///
  /// 指定路径加载失败或未找到任何系统字体时不渲染文字标题，
  /// 其余绘制不受影响。
  pub fn new(font_path: Option<&Path>) -> Self {
    let font = match font_path {
      Some(path) => load_font(path),
      None => FONT_CANDIDATES
        .iter()
        .find_map(|candidate| {
          let path = Path::new(candidate);
          path.exists().then(|| load_font(path)).flatten()
        }),
    };
    if font.is_none() {
      warn!("未找到可用字体，跳过文字标题渲染");
    }

    Self {
      font,
      font_size: LABEL_FONT_SIZE,
      label_text_height: LABEL_TEXT_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
    }
  }

  /// 不带字体的绘制器，渲染结果与运行环境无关
  pub fn without_font() -> Self {
    Self {
      font: None,
      font_size: LABEL_FONT_SIZE,
      label_text_height: LABEL_TEXT_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
    }
  }

  /// 检测标题文本，如 `dress 0.900`
  pub fn caption(label: i64, score: f32) -> String {
    match category_name(label) {
      Some(name) => format!("{} {:.3}", name, score),
      None => format!("{} {:.3}", label, score),
    }
  }

  /// 在图像上绘制 2 像素宽的矩形边框，bbox 为像素坐标 [x1, y1, x2, y2]
  pub fn draw_box(&self, image: &mut RgbImage, bbox: [i32; 4], color: [u8; 3]) {
    let (w, h) = (image.width() as i32, image.height() as i32);

    let x_min = bbox[0].clamp(0, w - 1);
    let y_min = bbox[1].clamp(0, h - 1);
    let x_max = bbox[2].clamp(0, w - 1);
    let y_max = bbox[3].clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    for thickness in 0..2 {
      let x_min_t = (x_min + thickness).min(w - 1);
      let y_min_t = (y_min + thickness).min(h - 1);
      let x_max_t = (x_max - thickness).max(0);
      let y_max_t = (y_max - thickness).max(0);

      for x in x_min_t..=x_max_t {
        image.put_pixel(x as u32, y_min_t as u32, Rgb(color));
        image.put_pixel(x as u32, y_max_t as u32, Rgb(color));
      }
      for y in y_min_t..=y_max_t {
        image.put_pixel(x_min_t as u32, y as u32, Rgb(color));
        image.put_pixel(x_max_t as u32, y as u32, Rgb(color));
      }
    }
  }

  /// 按类别颜色叠加整幅二值掩膜：内部 50% 混合，边界描白。
  ///
  /// `mask` 必须与 `image` 同尺寸，值为 0/1。
  pub fn draw_mask(&self, image: &mut RgbImage, mask: &GrayImage, color: [u8; 3]) {
    let interior = erode(mask, Norm::LInf, MASK_BORDER_RADIUS);

    for (x, y, pixel) in image.enumerate_pixels_mut() {
      if mask.get_pixel(x, y).0[0] == 0 {
        continue;
      }
      if interior.get_pixel(x, y).0[0] == 0 {
        // 掩膜边界
        pixel.0 = [255, 255, 255];
      } else {
        pixel.0 = [
          ((pixel.0[0] as u16 + color[0] as u16) / 2) as u8,
          ((pixel.0[1] as u16 + color[1] as u16) / 2) as u8,
          ((pixel.0[2] as u16 + color[2] as u16) / 2) as u8,
        ];
      }
    }
  }

  /// 在 bbox 上方绘制文字标题；无字体时为空操作
  pub fn draw_caption(&self, image: &mut RgbImage, bbox: [i32; 4], caption: &str) {
    let Some(font) = &self.font else {
      return;
    };

    let (w, _h) = (image.width() as i32, image.height() as i32);
    let scale = PxScale::from(self.font_size);
    let text_color = Rgb([255u8, 255u8, 255u8]);

    // 估算文本大小（粗略估计）
    let text_width = (caption.len() as f32 * self.label_char_width) as i32;
    let text_height = self.label_text_height;

    let label_x = bbox[0].clamp(0, w - 1);
    let label_y = (bbox[1] - text_height).max(0);

    let max_width = (w - label_x).max(0);
    let label_width = text_width.min(max_width) as u32;
    let label_height = text_height as u32;

    if label_width > 0 && label_height > 0 {
      let rect = imageproc::rect::Rect::at(label_x, label_y).of_size(label_width, label_height);
      draw_filled_rect_mut(image, rect, Rgb([0, 0, 0]));
      draw_text_mut(
        image,
        text_color,
        label_x,
        label_y + self.label_text_vertical_padding,
        scale,
        font,
        caption,
      );
    }
  }
}

fn load_font(path: &Path) -> Option<FontVec> {
  match std::fs::read(path) {
    Ok(data) => match FontVec::try_from_vec(data) {
      Ok(font) => Some(font),
      Err(e) => {
        warn!("字体文件 {} 无法解析: {}", path.display(), e);
        None
      }
    },
    Err(e) => {
      warn!("字体文件 {} 读取失败: {}", path.display(), e);
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn caption_uses_three_decimal_places() {
    assert_eq!(Draw::caption(5, 0.9), "dress 0.900");
    assert_eq!(Draw::caption(0, 0.7512), "bag 0.751");
    // 未知类别退回 id
    assert_eq!(Draw::caption(42, 0.5), "42 0.500");
  }

  #[test]
  fn box_outline_is_drawn_in_color() {
    let mut image = RgbImage::new(50, 50);
    let draw = Draw::without_font();
    draw.draw_box(&mut image, [10, 10, 40, 40], [255, 0, 0]);

    assert_eq!(image.get_pixel(10, 10), &Rgb([255, 0, 0]));
    assert_eq!(image.get_pixel(25, 10), &Rgb([255, 0, 0]));
    assert_eq!(image.get_pixel(10, 25), &Rgb([255, 0, 0]));
    // 内部不受影响
    assert_eq!(image.get_pixel(25, 25), &Rgb([0, 0, 0]));
  }

  #[test]
  fn degenerate_box_draws_nothing() {
    let mut image = RgbImage::new(20, 20);
    let before = image.clone();
    let draw = Draw::without_font();
    draw.draw_box(&mut image, [5, 5, 5, 15], [255, 0, 0]);
    assert_eq!(image, before);
  }

  #[test]
  fn mask_overlay_blends_interior() {
    let mut image = RgbImage::from_pixel(20, 20, Rgb([100, 100, 100]));
    let mut mask = GrayImage::new(20, 20);
    for y in 4..16 {
      for x in 4..16 {
        mask.put_pixel(x, y, image::Luma([1]));
      }
    }
    let draw = Draw::without_font();
    draw.draw_mask(&mut image, &mask, [200, 0, 0]);

    // 中心为 50% 混合
    assert_eq!(image.get_pixel(10, 10), &Rgb([150, 50, 50]));
    // 边界描白
    assert_eq!(image.get_pixel(4, 10), &Rgb([255, 255, 255]));
    // 掩膜外不变
    assert_eq!(image.get_pixel(0, 0), &Rgb([100, 100, 100]));
  }

  #[test]
  fn caption_without_font_is_a_noop() {
    let mut image = RgbImage::from_pixel(30, 30, Rgb([9, 9, 9]));
    let before = image.clone();
    let draw = Draw::without_font();
    draw.draw_caption(&mut image, [5, 20, 25, 28], "dress 0.900");
    assert_eq!(image, before);
  }
}
