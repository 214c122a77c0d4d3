// 该文件是 Yishang（衣裳）项目的一部分。
// src/lib.rs - 库入口
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

//! 时尚单品实例分割的后处理流水线。
//!
//! 把 ModaNet 系 Mask R-CNN 模型的原始输出（检测框、置信度、
//! 类别与掩膜）变成可交付的结果：渲染图、逐检测掩膜图或
//! 结构化标注，并负责图像的加载与结果的保存 / 查看。

pub mod annotation;
pub mod category;
pub mod config;
pub mod detection;
pub mod detector;
pub mod frame;
pub mod input;
pub mod mocks;
pub mod output;
pub mod postprocess;
pub mod task;
