// 该文件是 Yishang（衣裳）项目的一部分。
// src/args.rs - 命令行参数
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use url::Url;

use yishang::{
  config::{self, ConfigError, DataLayout, RunConfig},
  output::OutputMode,
};

/// Yishang 时尚单品实例分割后处理工具
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// 处理图像并在屏幕上查看结果
  View {
    #[command(subcommand)]
    target: ViewTarget,
  },
  /// 处理图像并把结果保存到磁盘
  Save {
    #[command(subcommand)]
    target: SaveTarget,
  },
}

#[derive(Subcommand, Debug)]
pub enum ViewTarget {
  /// 查看叠加了掩膜、检测框与标签的渲染图
  Image {
    #[command(flatten)]
    common: CommonOpts,

    /// 每个检测单独渲染一张仅保留掩膜区域的图像
    #[arg(short, long)]
    segments: bool,
  },
  /// 把结构化标注打印到标准输出
  Annotations {
    #[command(flatten)]
    common: CommonOpts,
  },
}

#[derive(Subcommand, Debug)]
pub enum SaveTarget {
  /// 保存渲染图为 JPEG
  Image {
    #[command(flatten)]
    common: CommonOpts,

    /// 每个检测单独保存一张仅保留掩膜区域的图像
    #[arg(short, long)]
    segments: bool,

    #[command(flatten)]
    save: SaveOpts,
  },
  /// 保存结构化标注为 JSON 文档
  Annotations {
    #[command(flatten)]
    common: CommonOpts,

    #[command(flatten)]
    save: SaveOpts,
  },
}

/// 所有子命令共享的参数
#[derive(ClapArgs, Debug)]
pub struct CommonOpts {
  /// 本地图像文件路径
  #[arg(short = 'p', long, value_name = "FILE")]
  pub image_path: Option<PathBuf>,

  /// 图像下载地址
  #[arg(short = 'u', long, value_name = "URL")]
  pub image_url: Option<Url>,

  /// 处理验证集中的全部图像
  #[arg(short, long)]
  pub all_set: bool,

  /// 置信度阈值 (0.0 - 1.0)，低于该值的检测被丢弃
  #[arg(short, long, default_value = "0.5", value_name = "THRESHOLD")]
  pub threshold_score: f32,

  /// 模型文件路径，缺省时使用快照目录中最新的一个
  #[arg(short, long, value_name = "FILE")]
  pub model_path: Option<PathBuf>,

  /// 数据目录（数据集、快照与处理结果的根目录）
  #[arg(long, default_value = "data", value_name = "DIR")]
  pub data_dir: PathBuf,

  /// 标签字体文件，缺省时在系统字体目录中查找
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,
}

/// 保存类子命令的额外参数
#[derive(ClapArgs, Debug)]
pub struct SaveOpts {
  /// 保存路径，缺省时写入数据目录下的默认位置
  #[arg(long, value_name = "PATH")]
  pub save_path: Option<PathBuf>,

  /// 验证集模式下最多处理的图像数
  #[arg(short, long, value_name = "COUNT")]
  pub limit: Option<usize>,
}

impl Args {
  /// 命令行参数换算为运行配置，来源互斥等约束在此处拒绝
  pub fn into_config(self) -> Result<RunConfig, ConfigError> {
    let (common, mode, limit) = match self.command {
      Command::View {
        target: ViewTarget::Image { common, segments },
      } => {
        let mode = if segments {
          OutputMode::ViewSegments
        } else {
          OutputMode::ViewImage
        };
        (common, mode, None)
      }
      Command::View {
        target: ViewTarget::Annotations { common },
      } => (common, OutputMode::EmitAnnotations, None),
      Command::Save {
        target: SaveTarget::Image {
          common,
          segments,
          save,
        },
      } => {
        let mode = if segments {
          OutputMode::SaveSegments(save.save_path)
        } else {
          OutputMode::SaveImage(save.save_path)
        };
        (common, mode, save.limit)
      }
      Command::Save {
        target: SaveTarget::Annotations { common, save },
      } => (common, OutputMode::SaveAnnotations(save.save_path), save.limit),
    };

    let source = config::select_source(common.image_path, common.image_url, common.all_set)?;
    let config = RunConfig {
      source,
      mode,
      threshold_score: common.threshold_score,
      limit,
      model_path: common.model_path,
      layout: DataLayout::new(common.data_dir),
      font_path: common.font,
    };
    config.validate()?;
    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use yishang::config::ImageSource;

  #[test]
  fn save_image_maps_to_save_mode() {
    let args = Args::parse_from([
      "yishang", "save", "image", "-p", "photo.jpg", "--save-path", "out.jpg",
    ]);
    let config = args.into_config().unwrap();
    assert!(matches!(config.source, ImageSource::File(_)));
    assert!(matches!(config.mode, OutputMode::SaveImage(Some(_))));
    assert_eq!(config.threshold_score, 0.5);
  }

  #[test]
  fn segments_flag_switches_mode() {
    let args = Args::parse_from(["yishang", "view", "image", "-p", "photo.jpg", "-s"]);
    let config = args.into_config().unwrap();
    assert_eq!(config.mode, OutputMode::ViewSegments);
  }

  #[test]
  fn annotations_without_save_path_print_to_stdout() {
    let args = Args::parse_from(["yishang", "view", "annotations", "-p", "photo.jpg"]);
    let config = args.into_config().unwrap();
    assert_eq!(config.mode, OutputMode::EmitAnnotations);
  }

  #[test]
  fn limit_is_carried_in_save_mode() {
    let args = Args::parse_from(["yishang", "save", "image", "-a", "-l", "30"]);
    let config = args.into_config().unwrap();
    assert!(matches!(config.source, ImageSource::ValidationSet));
    assert_eq!(config.limit, Some(30));
  }

  #[test]
  fn conflicting_sources_are_rejected() {
    let args = Args::parse_from(["yishang", "view", "image", "-p", "photo.jpg", "-a"]);
    assert!(matches!(
      args.into_config(),
      Err(ConfigError::SourceSelection { given: 2 })
    ));
  }

  #[test]
  fn all_set_segments_is_rejected() {
    let args = Args::parse_from(["yishang", "view", "image", "-a", "-s"]);
    assert!(matches!(
      args.into_config(),
      Err(ConfigError::SegmentsWithAllSet)
    ));
  }
}
