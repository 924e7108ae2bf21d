use ash::vk;

/// image 在某个 pass 中的使用方式：stage + access + layout 的组合
///
/// 只枚举 bloom 管线实际出现的组合，以关联常量的形式提供
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FxImageState {
    pub stage: vk::PipelineStageFlags2,
    pub access: vk::AccessFlags2,
    pub layout: vk::ImageLayout,
}

impl FxImageState {
    /// 未使用过，内容无效
    pub const UNDEFINED: Self = Self {
        stage: vk::PipelineStageFlags2::TOP_OF_PIPE,
        access: vk::AccessFlags2::empty(),
        layout: vk::ImageLayout::UNDEFINED,
    };

    /// color attachment 写入
    pub const COLOR_ATTACHMENT_WRITE: Self = Self {
        stage: vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
        access: vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    };

    /// color attachment 写入，且 blend 需要读取现有内容
    pub const COLOR_ATTACHMENT_READ_WRITE: Self = Self {
        stage: vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
        access: vk::AccessFlags2::from_raw(
            vk::AccessFlags2::COLOR_ATTACHMENT_READ.as_raw() | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE.as_raw(),
        ),
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    };

    /// fragment shader 采样
    pub const SHADER_READ_FRAGMENT: Self = Self {
        stage: vk::PipelineStageFlags2::FRAGMENT_SHADER,
        access: vk::AccessFlags2::SHADER_SAMPLED_READ,
        layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    };

    /// compute shader 采样
    pub const SHADER_READ_COMPUTE: Self = Self {
        stage: vk::PipelineStageFlags2::COMPUTE_SHADER,
        access: vk::AccessFlags2::SHADER_SAMPLED_READ,
        layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    };

    /// compute shader storage image 写入
    pub const STORAGE_WRITE_COMPUTE: Self = Self {
        stage: vk::PipelineStageFlags2::COMPUTE_SHADER,
        access: vk::AccessFlags2::SHADER_STORAGE_WRITE,
        layout: vk::ImageLayout::GENERAL,
    };

    /// blit / clear 的源
    pub const TRANSFER_SRC: Self = Self {
        stage: vk::PipelineStageFlags2::TRANSFER,
        access: vk::AccessFlags2::TRANSFER_READ,
        layout: vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
    };

    /// blit / clear 的目标
    pub const TRANSFER_DST: Self = Self {
        stage: vk::PipelineStageFlags2::TRANSFER,
        access: vk::AccessFlags2::TRANSFER_WRITE,
        layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
    };

    /// 交给 present engine
    pub const PRESENT: Self = Self {
        stage: vk::PipelineStageFlags2::BOTTOM_OF_PIPE,
        access: vk::AccessFlags2::empty(),
        layout: vk::ImageLayout::PRESENT_SRC_KHR,
    };
}

// tools
impl FxImageState {
    /// 是否包含写访问
    #[inline]
    pub fn is_write(&self) -> bool {
        self.access.intersects(
            vk::AccessFlags2::SHADER_WRITE
                | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE
                | vk::AccessFlags2::TRANSFER_WRITE
                | vk::AccessFlags2::SHADER_STORAGE_WRITE
                | vk::AccessFlags2::MEMORY_WRITE,
        )
    }

    /// 作为 barrier 的 src 端时使用的 access mask
    ///
    /// read access 不需要被 make available，只保留 write 位
    #[inline]
    pub fn src_access(&self) -> vk::AccessFlags2 {
        self.access
            & !(vk::AccessFlags2::SHADER_READ
                | vk::AccessFlags2::SHADER_SAMPLED_READ
                | vk::AccessFlags2::SHADER_STORAGE_READ
                | vk::AccessFlags2::COLOR_ATTACHMENT_READ
                | vk::AccessFlags2::TRANSFER_READ
                | vk::AccessFlags2::MEMORY_READ)
    }

    /// 一次访问落地之后 image 所处的状态
    ///
    /// 同 layout 的连续只读访问合并 stage 与 access，
    /// 之后的写 barrier 在 src 端会等到全部读取方
    pub fn after_access(current: Self, required: Self) -> Self {
        let both_read = !current.is_write() && !required.is_write();
        if both_read && current.layout == required.layout {
            Self {
                stage: current.stage | required.stage,
                access: current.access | required.access,
                layout: required.layout,
            }
        } else {
            required
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_detection() {
        assert!(FxImageState::COLOR_ATTACHMENT_WRITE.is_write());
        assert!(FxImageState::STORAGE_WRITE_COMPUTE.is_write());
        assert!(FxImageState::TRANSFER_DST.is_write());
        assert!(!FxImageState::SHADER_READ_FRAGMENT.is_write());
        assert!(!FxImageState::TRANSFER_SRC.is_write());
        assert!(!FxImageState::PRESENT.is_write());
    }

    #[test]
    fn src_access_strips_reads() {
        assert_eq!(FxImageState::SHADER_READ_FRAGMENT.src_access(), vk::AccessFlags2::empty());
        assert_eq!(FxImageState::TRANSFER_SRC.src_access(), vk::AccessFlags2::empty());
        assert_eq!(FxImageState::TRANSFER_DST.src_access(), vk::AccessFlags2::TRANSFER_WRITE);
    }

    #[test]
    fn consecutive_reads_accumulate_stages() {
        let merged =
            FxImageState::after_access(FxImageState::SHADER_READ_FRAGMENT, FxImageState::SHADER_READ_COMPUTE);
        assert!(merged.stage.contains(vk::PipelineStageFlags2::FRAGMENT_SHADER));
        assert!(merged.stage.contains(vk::PipelineStageFlags2::COMPUTE_SHADER));
        assert_eq!(merged.layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert!(!merged.is_write());
    }

    #[test]
    fn write_replaces_accumulated_reads() {
        let merged =
            FxImageState::after_access(FxImageState::SHADER_READ_FRAGMENT, FxImageState::SHADER_READ_COMPUTE);
        let after_write = FxImageState::after_access(merged, FxImageState::COLOR_ATTACHMENT_WRITE);
        assert_eq!(after_write, FxImageState::COLOR_ATTACHMENT_WRITE);
    }

    #[test]
    fn layout_change_replaces_state() {
        let after = FxImageState::after_access(FxImageState::SHADER_READ_FRAGMENT, FxImageState::TRANSFER_SRC);
        assert_eq!(after, FxImageState::TRANSFER_SRC);
        let first_use = FxImageState::after_access(FxImageState::UNDEFINED, FxImageState::SHADER_READ_FRAGMENT);
        assert_eq!(first_use, FxImageState::SHADER_READ_FRAGMENT);
    }
}
