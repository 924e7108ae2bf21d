//! 帧内 pass 的声明式依赖描述
//!
//! 每个 pass 声明自己读写哪些 image 以及期望的 [`state::FxImageState`]，
//! 录制时由 [`barrier::BarrierCalculator`] 对比 registry 中记录的当前状态，
//! 自动插入 image barrier，pass 代码中不出现任何手写同步。

pub mod barrier;
pub mod handle;
pub mod pass;
pub mod registry;
pub mod state;
