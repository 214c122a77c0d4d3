// 该文件是 Yishang（衣裳）项目的一部分。
// src/input.rs - 图像来源
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::io::Read;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  config::{DataLayout, ImageSource, URL_IMAGE_NAME},
  frame::BgrFrame,
};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("图像解码错误: {0}")]
  Image(#[from] image::ImageError),
  #[error("下载失败: {0}")]
  Http(#[from] Box<ureq::Error>),
  #[error("验证集索引解析失败: {0}")]
  Index(#[from] serde_json::Error),
}

/// 单个待处理图像的定位信息
#[derive(Debug, Clone)]
pub enum Locator {
  Path(PathBuf),
  Url(Url),
}

/// 待处理图像条目，按来源顺序编号
#[derive(Debug, Clone)]
pub struct ImageEntry {
  pub index: usize,
  /// 用于派生默认保存路径的文件名
  pub name: String,
  pub locator: Locator,
}

// instances_val.json 中用到的字段
#[derive(Debug, Deserialize)]
struct ValidationIndex {
  images: Vec<ValidationImage>,
}

#[derive(Debug, Deserialize)]
struct ValidationImage {
  file_name: String,
}

/// 把配置的来源展开为有序的图像条目列表。
///
/// 验证集模式读取 `instances_val.json`，图像按索引文件中的顺序处理。
pub fn resolve_entries(
  source: &ImageSource,
  layout: &DataLayout,
) -> Result<Vec<ImageEntry>, InputError> {
  match source {
    ImageSource::File(path) => Ok(vec![ImageEntry {
      index: 0,
      name: crate::config::source_image_name(path),
      locator: Locator::Path(path.clone()),
    }]),
    ImageSource::Url(url) => Ok(vec![ImageEntry {
      index: 0,
      name: URL_IMAGE_NAME.to_string(),
      locator: Locator::Url(url.clone()),
    }]),
    ImageSource::ValidationSet => {
      let index_path = layout.validation_index();
      info!("读取验证集索引: {}", index_path.display());
      let text = std::fs::read_to_string(&index_path)?;
      let index: ValidationIndex = serde_json::from_str(&text)?;
      let images_dir = layout.images_dir();
      Ok(
        index
          .images
          .into_iter()
          .enumerate()
          .map(|(i, img)| ImageEntry {
            index: i,
            locator: Locator::Path(images_dir.join(&img.file_name)),
            name: img.file_name,
          })
          .collect(),
      )
    }
  }
}

/// 加载一个条目，产出 BGR 帧。
///
/// 网络获取不做重试，失败即向上传播，由任务层决定终止整次运行。
pub fn load_frame(entry: &ImageEntry) -> Result<BgrFrame, InputError> {
  let image = match &entry.locator {
    Locator::Path(path) => image::ImageReader::open(path)?.decode()?,
    Locator::Url(url) => {
      info!("下载图像: {}", url);
      let response = ureq::get(url.as_str()).call().map_err(Box::new)?;
      let mut bytes = Vec::new();
      response.into_reader().read_to_end(&mut bytes)?;
      image::load_from_memory(&bytes)?
    }
  };
  Ok(BgrFrame::from_decoded(image))
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  #[test]
  fn single_file_source_yields_one_entry() {
    let layout = DataLayout::new("data");
    let entries =
      resolve_entries(&ImageSource::File("photos/01234.jpg".into()), &layout).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].index, 0);
    assert_eq!(entries[0].name, "01234.jpg");
  }

  #[test]
  fn url_source_is_named_urlimg() {
    let layout = DataLayout::new("data");
    let url: Url = "https://example.com/photo.jpg".parse().unwrap();
    let entries = resolve_entries(&ImageSource::Url(url), &layout).unwrap();
    assert_eq!(entries[0].name, "urlimg.jpg");
  }

  #[test]
  fn validation_set_preserves_index_order() {
    let dir = tempfile::tempdir().unwrap();
    let layout = DataLayout::new(dir.path());
    let index_path = layout.validation_index();
    std::fs::create_dir_all(index_path.parent().unwrap()).unwrap();
    std::fs::write(
      &index_path,
      r#"{"images": [{"file_name": "b.jpg"}, {"file_name": "a.jpg"}, {"file_name": "c.jpg"}]}"#,
    )
    .unwrap();

    let entries = resolve_entries(&ImageSource::ValidationSet, &layout).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["b.jpg", "a.jpg", "c.jpg"]);
    assert_eq!(entries[2].index, 2);
  }

  #[test]
  fn load_frame_decodes_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.png");
    RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]))
      .save(&path)
      .unwrap();

    let entry = ImageEntry {
      index: 0,
      name: "t.png".into(),
      locator: Locator::Path(path),
    };
    let frame = load_frame(&entry).unwrap();
    assert_eq!((frame.width(), frame.height()), (4, 4));
    // 加载即为 BGR
    assert_eq!(frame.as_bgr().get_pixel(0, 0), &Rgb([3, 2, 1]));
  }

  #[test]
  fn missing_file_aborts_loading() {
    let entry = ImageEntry {
      index: 0,
      name: "missing.jpg".into(),
      locator: Locator::Path("no/such/file.jpg".into()),
    };
    assert!(matches!(load_frame(&entry), Err(InputError::Io(_))));
  }
}
