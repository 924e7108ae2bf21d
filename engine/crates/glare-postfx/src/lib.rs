//! 多算法 bloom 后处理管线
//!
//! 从 HDR 场景渲染中提取亮度，使用八种可互换的模糊算法之一生成泛光，
//! 再与原图合成。运行时可切换算法与强度档位，切换不产生任何分配。

pub mod blur;
pub mod compose;
pub mod config;
pub mod controller;
pub mod downsample;
pub mod executor;
pub mod frame_state;
pub mod graph;
pub mod kernel;
pub mod ping_pong;
pub mod pipeline;
pub mod scheduler;
