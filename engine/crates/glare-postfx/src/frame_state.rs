//! 每个 swapchain image 的录制状态机
//!
//! 命令录制与参数上传都是惰性的：配置变化只把所有帧标脏，
//! 真正的重录/重传发生在该 swapchain image 下一次被取得时。

/// 单个 swapchain image 的命令缓冲状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordState {
    /// 尚未写入过配置参数
    Unconfigured,
    /// 参数已写入，命令未录制
    Configured,
    /// 命令与参数一致，可以直接提交
    CommandsRecorded,
    /// 配置已变化，命令与参数都已过期
    Stale,
}

/// 单个 swapchain image 的脏标记
#[derive(Clone, Copy, Debug)]
pub struct PerFrameState {
    record_state: RecordState,
    must_record: bool,
    must_update_config: bool,
}

impl Default for PerFrameState {
    fn default() -> Self {
        Self {
            record_state: RecordState::Unconfigured,
            must_record: true,
            must_update_config: true,
        }
    }
}

// getters
impl PerFrameState {
    #[inline]
    pub fn record_state(&self) -> RecordState {
        self.record_state
    }

    #[inline]
    pub fn must_record(&self) -> bool {
        self.must_record
    }

    #[inline]
    pub fn must_update_config(&self) -> bool {
        self.must_update_config
    }
}

// 状态迁移
impl PerFrameState {
    /// 配置发生变化，参数与命令都需要重建
    pub fn mark_stale(&mut self) {
        self.must_record = true;
        self.must_update_config = true;
        if self.record_state != RecordState::Unconfigured {
            self.record_state = RecordState::Stale;
        }
    }

    /// 参数已写入 GPU 可见内存
    pub fn on_config_written(&mut self) {
        self.must_update_config = false;
        if self.record_state != RecordState::CommandsRecorded || self.must_record {
            self.record_state = RecordState::Configured;
        }
    }

    /// 命令已按当前参数录制完成
    ///
    /// 必须先写配置再录制，录制时参数不允许是脏的
    pub fn on_recorded(&mut self) {
        debug_assert!(!self.must_update_config, "config must be written before recording");
        self.must_record = false;
        self.record_state = RecordState::CommandsRecorded;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_frame_needs_both_updates() {
        let state = PerFrameState::default();
        assert_eq!(state.record_state(), RecordState::Unconfigured);
        assert!(state.must_record());
        assert!(state.must_update_config());
    }

    #[test]
    fn normal_frame_cycle() {
        let mut state = PerFrameState::default();
        state.on_config_written();
        assert_eq!(state.record_state(), RecordState::Configured);
        state.on_recorded();
        assert_eq!(state.record_state(), RecordState::CommandsRecorded);
        assert!(!state.must_record());
        assert!(!state.must_update_config());
    }

    #[test]
    fn reconfiguration_marks_everything_dirty() {
        let mut state = PerFrameState::default();
        state.on_config_written();
        state.on_recorded();

        state.mark_stale();
        assert_eq!(state.record_state(), RecordState::Stale);
        assert!(state.must_record());
        assert!(state.must_update_config());

        state.on_config_written();
        state.on_recorded();
        assert_eq!(state.record_state(), RecordState::CommandsRecorded);
    }

    #[test]
    fn repeated_staleness_is_idempotent() {
        let mut state = PerFrameState::default();
        state.on_config_written();
        state.on_recorded();

        state.mark_stale();
        state.mark_stale();
        assert_eq!(state.record_state(), RecordState::Stale);

        state.on_config_written();
        state.on_recorded();
        assert!(!state.must_record());
    }
}
