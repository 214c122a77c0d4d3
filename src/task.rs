// 该文件是 Yishang（衣裳）项目的一部分。
// src/task.rs - 处理任务循环
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

use std::{thread, time::Duration};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::{
  config::RunConfig,
  detector::Detector,
  input, output,
  output::draw::Draw,
  postprocess,
};

/// 顺序处理配置指定的全部图像：加载 → 推理 → 后处理 → 输出。
///
/// 单线程阻塞执行，一张图像完全处理完才开始下一张。
/// Ctrl+C 在两张图像之间优雅退出，已写出的结果保留。
/// 资源错误（图像无法解码、下载失败、写入失败）终止整次运行，
/// 错误信息带上出错图像的序号。返回实际处理的图像数。
pub fn run<D: Detector>(config: &RunConfig, detector: &mut D, draw: &Draw) -> Result<usize> {
  config.validate()?;

  let entries = input::resolve_entries(&config.source, &config.layout)?;
  info!("待处理图像: {}", entries.len());

  let (tx, rx) = std::sync::mpsc::channel();
  if let Err(e) = ctrlc::set_handler(move || {
    let _ = tx.send(());
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  }) {
    // 同一进程内重复注册（如测试）只告警
    warn!("无法注册中断处理器: {}", e);
  }

  let kind = config.mode.render_kind();
  let mut processed = 0usize;

  for entry in &entries {
    if let Some(limit) = config.limit
      && processed >= limit
    {
      info!("达到图像数上限 {}, 退出处理循环", limit);
      break;
    }
    if rx.try_recv().is_ok() {
      warn!("收到中断信号，停止处理");
      break;
    }

    info!("处理第 {} 张图像: {}", entry.index, entry.name);
    let frame = input::load_frame(entry)
      .with_context(|| format!("图像 {} ({}) 加载失败", entry.index, entry.name))?;

    let now = std::time::Instant::now();
    let raw = detector
      .detect(&frame)
      .with_context(|| format!("图像 {} ({}) 推理失败", entry.index, entry.name))?;
    let inference_elapsed = now.elapsed();

    let outcome = postprocess::process(frame, &raw, kind, config.threshold_score, draw)
      .with_context(|| format!("图像 {} ({}) 后处理失败", entry.index, entry.name))?;
    output::write_outcome(&config.mode, &config.layout, &entry.name, &outcome)
      .with_context(|| format!("图像 {} ({}) 输出失败", entry.index, entry.name))?;

    info!(
      "处理完成，耗时: {:.2?} / {:.2?}",
      inference_elapsed,
      now.elapsed()
    );
    processed += 1;
  }

  info!("任务完成，共处理 {} 张图像", processed);
  Ok(processed)
}
