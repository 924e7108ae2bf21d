use ash::vk;

use crate::graph::handle::FxImageHandle;
use crate::graph::state::FxImageState;

/// pass 的 push descriptor 绑定
#[derive(Clone, Debug)]
pub enum FxBinding {
    /// combined image sampler，layout 与声明的读状态一致
    SampledImage {
        binding: u32,
        image: FxImageHandle,
        sampler: vk::Sampler,
        layout: vk::ImageLayout,
    },
    StorageImage {
        binding: u32,
        image: FxImageHandle,
    },
    UniformBuffer {
        binding: u32,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        range: vk::DeviceSize,
    },
}

/// pass 的执行方式
#[derive(Clone, Debug)]
pub enum FxPassKind {
    /// 全屏三角形的 graphics pass，向单个 color attachment 输出
    Graphics {
        pipeline: vk::Pipeline,
        pipeline_layout: vk::PipelineLayout,
        color_target: FxImageHandle,
        load_op: vk::AttachmentLoadOp,
        clear_value: [f32; 4],
    },
    Compute {
        pipeline: vk::Pipeline,
        pipeline_layout: vk::PipelineLayout,
        group_count: glam::UVec3,
    },
    /// 整图 blit，双线性下采样时使用
    Blit {
        src: FxImageHandle,
        dst: FxImageHandle,
        filter: vk::Filter,
    },
    /// 纯色清屏，场景渲染的替身
    ClearColor {
        target: FxImageHandle,
        color: [f32; 4],
    },
}

/// 一个 pass 的完整声明：读写集合 + 绑定 + 执行方式
///
/// reads/writes 决定 barrier，bindings/push_constants 决定 descriptor，
/// 录制器不需要知道 pass 的语义
#[derive(Clone, Debug)]
pub struct FxPassDesc {
    pub name: String,
    pub reads: Vec<(FxImageHandle, FxImageState)>,
    pub writes: Vec<(FxImageHandle, FxImageState)>,
    pub bindings: Vec<FxBinding>,
    pub push_constants: Vec<u8>,
    pub push_stages: vk::ShaderStageFlags,
    pub kind: FxPassKind,
}

// new & init
impl FxPassDesc {
    /// 全屏 graphics pass，color target 自动计入 writes
    pub fn graphics(
        name: impl Into<String>,
        pipeline: vk::Pipeline,
        pipeline_layout: vk::PipelineLayout,
        color_target: FxImageHandle,
    ) -> Self {
        Self {
            name: name.into(),
            reads: Vec::new(),
            writes: vec![(color_target, FxImageState::COLOR_ATTACHMENT_WRITE)],
            bindings: Vec::new(),
            push_constants: Vec::new(),
            push_stages: vk::ShaderStageFlags::FRAGMENT,
            kind: FxPassKind::Graphics {
                pipeline,
                pipeline_layout,
                color_target,
                load_op: vk::AttachmentLoadOp::DONT_CARE,
                clear_value: [0.0; 4],
            },
        }
    }

    pub fn compute(
        name: impl Into<String>,
        pipeline: vk::Pipeline,
        pipeline_layout: vk::PipelineLayout,
        group_count: glam::UVec3,
    ) -> Self {
        Self {
            name: name.into(),
            reads: Vec::new(),
            writes: Vec::new(),
            bindings: Vec::new(),
            push_constants: Vec::new(),
            push_stages: vk::ShaderStageFlags::COMPUTE,
            kind: FxPassKind::Compute { pipeline, pipeline_layout, group_count },
        }
    }

    pub fn blit(name: impl Into<String>, src: FxImageHandle, dst: FxImageHandle, filter: vk::Filter) -> Self {
        Self {
            name: name.into(),
            reads: vec![(src, FxImageState::TRANSFER_SRC)],
            writes: vec![(dst, FxImageState::TRANSFER_DST)],
            bindings: Vec::new(),
            push_constants: Vec::new(),
            push_stages: vk::ShaderStageFlags::empty(),
            kind: FxPassKind::Blit { src, dst, filter },
        }
    }

    pub fn clear_color(name: impl Into<String>, target: FxImageHandle, color: [f32; 4]) -> Self {
        Self {
            name: name.into(),
            reads: Vec::new(),
            writes: vec![(target, FxImageState::TRANSFER_DST)],
            bindings: Vec::new(),
            push_constants: Vec::new(),
            push_stages: vk::ShaderStageFlags::empty(),
            kind: FxPassKind::ClearColor { target, color },
        }
    }
}

// builders
impl FxPassDesc {
    /// 声明一次采样读取，同时生成对应的 descriptor 绑定
    pub fn sample_image(mut self, binding: u32, image: FxImageHandle, sampler: vk::Sampler, state: FxImageState) -> Self {
        self.reads.push((image, state));
        self.bindings.push(FxBinding::SampledImage {
            binding,
            image,
            sampler,
            layout: state.layout,
        });
        self
    }

    /// 声明一次 storage image 写入，同时生成对应的 descriptor 绑定
    pub fn write_storage_image(mut self, binding: u32, image: FxImageHandle) -> Self {
        self.writes.push((image, FxImageState::STORAGE_WRITE_COMPUTE));
        self.bindings.push(FxBinding::StorageImage { binding, image });
        self
    }

    pub fn uniform_buffer(mut self, binding: u32, buffer: vk::Buffer, offset: vk::DeviceSize, range: vk::DeviceSize) -> Self {
        self.bindings.push(FxBinding::UniformBuffer { binding, buffer, offset, range });
        self
    }

    pub fn push_constants<T: bytemuck::NoUninit>(mut self, data: &T) -> Self {
        self.push_constants = bytemuck::bytes_of(data).to_vec();
        self
    }

    /// additive blend 写入：保留 target 现有内容，写状态改为 read+write
    pub fn blend_with_target(mut self) -> Self {
        if let FxPassKind::Graphics { load_op, color_target, .. } = &mut self.kind {
            *load_op = vk::AttachmentLoadOp::LOAD;
            let target = *color_target;
            for (handle, state) in &mut self.writes {
                if *handle == target {
                    *state = FxImageState::COLOR_ATTACHMENT_READ_WRITE;
                }
            }
        }
        self
    }
}

// tools
impl FxPassDesc {
    /// 本 pass 涉及的全部 (image, state)，reads 在前
    pub fn accesses(&self) -> impl Iterator<Item = (FxImageHandle, FxImageState)> + '_ {
        self.reads.iter().chain(self.writes.iter()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn mint_handles(count: usize) -> Vec<FxImageHandle> {
        let mut map: SlotMap<FxImageHandle, ()> = SlotMap::with_key();
        (0..count).map(|_| map.insert(())).collect()
    }

    #[test]
    fn graphics_pass_declares_color_target_write() {
        let handles = mint_handles(2);
        let pass = FxPassDesc::graphics("blur-h", vk::Pipeline::null(), vk::PipelineLayout::null(), handles[1])
            .sample_image(0, handles[0], vk::Sampler::null(), FxImageState::SHADER_READ_FRAGMENT);

        assert_eq!(pass.writes, vec![(handles[1], FxImageState::COLOR_ATTACHMENT_WRITE)]);
        assert_eq!(pass.reads, vec![(handles[0], FxImageState::SHADER_READ_FRAGMENT)]);
        assert_eq!(pass.bindings.len(), 1);
    }

    #[test]
    fn compute_pass_collects_storage_writes() {
        let handles = mint_handles(2);
        let pass = FxPassDesc::compute("blur-cs", vk::Pipeline::null(), vk::PipelineLayout::null(), glam::uvec3(1, 32, 1))
            .sample_image(0, handles[0], vk::Sampler::null(), FxImageState::SHADER_READ_COMPUTE)
            .write_storage_image(1, handles[1]);

        assert_eq!(pass.writes, vec![(handles[1], FxImageState::STORAGE_WRITE_COMPUTE)]);
        assert_eq!(pass.bindings.len(), 2);
    }

    #[test]
    fn accesses_orders_reads_before_writes() {
        let handles = mint_handles(2);
        let pass = FxPassDesc::blit("downsample", handles[0], handles[1], vk::Filter::LINEAR);
        let accesses: Vec<_> = pass.accesses().collect();
        assert_eq!(accesses[0], (handles[0], FxImageState::TRANSFER_SRC));
        assert_eq!(accesses[1], (handles[1], FxImageState::TRANSFER_DST));
    }
}
