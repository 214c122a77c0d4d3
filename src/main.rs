// 该文件是 Yishang（衣裳）项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use yishang::{detector::MaskRcnnDetector, output::draw::Draw, task};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let config = args::Args::parse().into_config()?;

  let model_path = config
    .resolve_model_path()
    .context("确定模型文件失败")?;
  let mut detector = MaskRcnnDetector::new(&model_path)?;
  let draw = Draw::new(config.font_path.as_deref());

  let processed = task::run(&config, &mut detector, &draw)?;
  info!("共处理 {} 张图像", processed);
  Ok(())
}
