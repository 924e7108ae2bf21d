//! 同族双 queue 的交替提交
//!
//! 队列族提供多个 queue 时，相邻帧轮流提交到两个 queue，
//! 减少 present engine 与下一帧录制之间的串行等待。
//! 每帧的 submit 与 present 必须使用同一个 queue。
//! 前提：每帧只读写自己那组中间 image（见 ping_pong 模块），
//! queue 之间没有共享的可写资源，不需要跨 queue 同步。

/// 帧序号到 queue 下标的映射
#[derive(Clone, Copy, Debug)]
pub struct QueueScheduler {
    use_multi_queue: bool,
}

// new & init
impl QueueScheduler {
    pub fn new(queue_count: usize) -> Self {
        let use_multi_queue = queue_count >= 2;
        if use_multi_queue {
            log::info!("frame scheduler: alternating between 2 queues");
        } else {
            log::info!("frame scheduler: single queue");
        }
        Self { use_multi_queue }
    }
}

// getters
impl QueueScheduler {
    #[inline]
    pub fn use_multi_queue(&self) -> bool {
        self.use_multi_queue
    }

    /// 第 frame_index 帧使用的 queue 下标
    #[inline]
    pub fn queue_index(&self, frame_index: u64) -> usize {
        if self.use_multi_queue {
            (frame_index % 2) as usize
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_queue_never_alternates() {
        let scheduler = QueueScheduler::new(1);
        assert!(!scheduler.use_multi_queue());
        for frame in 0..8 {
            assert_eq!(scheduler.queue_index(frame), 0);
        }
    }

    #[test]
    fn dual_queue_alternates_every_frame() {
        let scheduler = QueueScheduler::new(2);
        assert!(scheduler.use_multi_queue());
        for frame in 0..8 {
            assert_eq!(scheduler.queue_index(frame), (frame % 2) as usize);
            assert_ne!(scheduler.queue_index(frame), scheduler.queue_index(frame + 1));
        }
    }

    #[test]
    fn extra_queues_do_not_widen_rotation() {
        let scheduler = QueueScheduler::new(4);
        for frame in 0..8 {
            assert!(scheduler.queue_index(frame) < 2);
        }
    }
}
