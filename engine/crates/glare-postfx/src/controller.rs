//! 运行时重配置入口
//!
//! 持有当前的 bloom 配置，每次变更把所有 swapchain image 的
//! 帧状态标脏，重录与参数上传由各帧惰性完成。

use crate::config::{BloomConfig, BlurMode};
use crate::frame_state::PerFrameState;

pub struct ReconfigurationController {
    config: BloomConfig,
}

// new & init
impl ReconfigurationController {
    pub fn new(config: BloomConfig) -> Self {
        Self { config }
    }
}

// getters
impl ReconfigurationController {
    #[inline]
    pub fn config(&self) -> BloomConfig {
        self.config
    }

    #[inline]
    pub fn mode(&self) -> BlurMode {
        self.config.mode
    }

    /// 状态栏文本，例如 "Gaussian (Linear Sampling) [tier 2 (default)]"
    pub fn description(&self) -> String {
        if self.config.mode == BlurMode::NoBloom {
            self.config.mode.label().to_string()
        } else {
            let mut text = format!("{} [{}]", self.config.mode.label(), self.config.tier_config().label);
            if self.config.bloom_only {
                text.push_str(" (bloom only)");
            }
            text
        }
    }
}

// 重配置操作
impl ReconfigurationController {
    pub fn next_mode(&mut self, frames: &mut [PerFrameState]) {
        self.config.mode = self.config.mode.next();
        log::info!("switch blur mode: {}", self.config.mode.label());
        Self::invalidate(frames);
    }

    pub fn prev_mode(&mut self, frames: &mut [PerFrameState]) {
        self.config.mode = self.config.mode.prev();
        log::info!("switch blur mode: {}", self.config.mode.label());
        Self::invalidate(frames);
    }

    pub fn next_tier(&mut self, frames: &mut [PerFrameState]) {
        self.config.next_tier();
        log::info!("switch blur tier: {}", self.config.tier_config().label);
        Self::invalidate(frames);
    }

    pub fn prev_tier(&mut self, frames: &mut [PerFrameState]) {
        self.config.prev_tier();
        log::info!("switch blur tier: {}", self.config.tier_config().label);
        Self::invalidate(frames);
    }

    pub fn toggle_bloom_only(&mut self, frames: &mut [PerFrameState]) {
        self.config.bloom_only = !self.config.bloom_only;
        log::info!("bloom only: {}", self.config.bloom_only);
        Self::invalidate(frames);
    }

    fn invalidate(frames: &mut [PerFrameState]) {
        for frame in frames {
            frame.mark_stale();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_state::RecordState;

    fn recorded_frames(count: usize) -> Vec<PerFrameState> {
        (0..count)
            .map(|_| {
                let mut state = PerFrameState::default();
                state.on_config_written();
                state.on_recorded();
                state
            })
            .collect()
    }

    #[test]
    fn mode_switch_invalidates_every_frame() {
        let mut frames = recorded_frames(3);
        let mut controller = ReconfigurationController::new(BloomConfig::default());

        controller.next_mode(&mut frames);
        for frame in &frames {
            assert_eq!(frame.record_state(), RecordState::Stale);
            assert!(frame.must_record());
            assert!(frame.must_update_config());
        }
    }

    #[test]
    fn tier_switch_invalidates_every_frame() {
        let mut frames = recorded_frames(2);
        let mut controller = ReconfigurationController::new(BloomConfig::default());

        controller.prev_tier(&mut frames);
        assert!(frames.iter().all(|f| f.must_record()));
    }

    #[test]
    fn description_mentions_mode_and_tier() {
        let controller = ReconfigurationController::new(BloomConfig::default());
        let text = controller.description();
        assert!(text.contains("Gaussian"));
        assert!(text.contains("tier 2"));
    }

    #[test]
    fn description_for_no_bloom_has_no_tier() {
        let mut config = BloomConfig::default();
        config.mode = BlurMode::NoBloom;
        let controller = ReconfigurationController::new(config);
        assert_eq!(controller.description(), "No Bloom");
    }
}
