use ash::vk;
use glare_gfx::commands::barrier::GfxImageBarrier;

use crate::graph::state::FxImageState;

/// 两个使用状态之间需要的 barrier 描述
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FxBarrierDesc {
    pub src: FxImageState,
    pub dst: FxImageState,
}

impl FxBarrierDesc {
    /// 转为可提交的 image barrier
    pub fn to_gfx_barrier(&self, image: vk::Image) -> GfxImageBarrier {
        GfxImageBarrier::new()
            .image(image)
            .image_aspect_flag(vk::ImageAspectFlags::COLOR)
            .layout_transfer(self.src.layout, self.dst.layout)
            .src_mask(self.src.stage, self.src.src_access())
            .dst_mask(self.dst.stage, self.dst.access)
    }
}

/// 根据前后两个使用状态决定是否需要 barrier
pub struct BarrierCalculator;

impl BarrierCalculator {
    /// read 后接同 layout 的 read 不需要 barrier；
    /// 其余情况（layout 变化，或任一端是 write）都需要
    pub fn compute(current: FxImageState, required: FxImageState) -> Option<FxBarrierDesc> {
        let layout_change = current.layout != required.layout;
        let hazard = current.is_write() || required.is_write();
        if layout_change || hazard {
            Some(FxBarrierDesc { src: current, dst: required })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_after_read_same_layout_is_elided() {
        let barrier =
            BarrierCalculator::compute(FxImageState::SHADER_READ_FRAGMENT, FxImageState::SHADER_READ_COMPUTE);
        assert!(barrier.is_none());
    }

    #[test]
    fn read_after_write_needs_barrier() {
        let barrier =
            BarrierCalculator::compute(FxImageState::COLOR_ATTACHMENT_WRITE, FxImageState::SHADER_READ_FRAGMENT)
                .unwrap();
        assert_eq!(barrier.src.layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(barrier.dst.layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    }

    #[test]
    fn write_after_write_same_layout_needs_barrier() {
        let barrier =
            BarrierCalculator::compute(FxImageState::STORAGE_WRITE_COMPUTE, FxImageState::STORAGE_WRITE_COMPUTE);
        assert!(barrier.is_some());
    }

    #[test]
    fn first_use_transitions_from_undefined() {
        let barrier =
            BarrierCalculator::compute(FxImageState::UNDEFINED, FxImageState::COLOR_ATTACHMENT_WRITE).unwrap();
        assert_eq!(barrier.src.layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(barrier.src.src_access(), vk::AccessFlags2::empty());
    }

    #[test]
    fn write_after_merged_reads_waits_on_both_stages() {
        let merged =
            FxImageState::after_access(FxImageState::SHADER_READ_FRAGMENT, FxImageState::SHADER_READ_COMPUTE);
        let barrier = BarrierCalculator::compute(merged, FxImageState::COLOR_ATTACHMENT_WRITE).unwrap();
        assert!(barrier.src.stage.contains(vk::PipelineStageFlags2::FRAGMENT_SHADER));
        assert!(barrier.src.stage.contains(vk::PipelineStageFlags2::COMPUTE_SHADER));
    }

    #[test]
    fn present_transition_needs_barrier() {
        let barrier = BarrierCalculator::compute(FxImageState::COLOR_ATTACHMENT_WRITE, FxImageState::PRESENT);
        assert!(barrier.is_some());
    }
}
