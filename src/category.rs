// 该文件是 Yishang（衣裳）项目的一部分。
// src/category.rs - ModaNet 类别表与调色板
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use tracing::warn;

/// ModaNet 数据集类别名称
pub const MODANET_CLASSES: [&str; 13] = [
  "bag",
  "belt",
  "boots",
  "footwear",
  "outer",
  "dress",
  "sunglasses",
  "pants",
  "top",
  "shorts",
  "skirt",
  "headwear",
  "scarf/tie",
];

// 每个类别的固定 RGB 颜色，保证重复运行得到相同的可视化结果
const LABEL_COLORS: [[u8; 3]; 13] = [
  [31, 119, 180],
  [255, 127, 14],
  [44, 160, 44],
  [214, 39, 40],
  [148, 103, 189],
  [140, 86, 75],
  [227, 119, 194],
  [127, 127, 127],
  [188, 189, 34],
  [23, 190, 207],
  [174, 199, 232],
  [255, 187, 120],
  [152, 223, 138],
];

const FALLBACK_COLOR: [u8; 3] = [0, 255, 0];

/// 类别 id 对应的名称，超出范围返回 `None`
pub fn category_name(label: i64) -> Option<&'static str> {
  usize::try_from(label)
    .ok()
    .and_then(|idx| MODANET_CLASSES.get(idx).copied())
}

/// 类别 id 对应的颜色，相同 id 恒定返回相同颜色
pub fn label_color(label: i64) -> [u8; 3] {
  match usize::try_from(label).ok().and_then(|idx| LABEL_COLORS.get(idx)) {
    Some(color) => *color,
    None => {
      warn!("类别 id {} 超出调色板范围，使用默认颜色", label);
      FALLBACK_COLOR
    }
  }
}
