//! 初始下采样：把全分辨率场景图缩到模糊分辨率
//!
//! 4 次双线性采样取 16 texel 的均值，同时完成亮度提取端的
//! 分辨率压缩，输出写入 ping-pong 的 0 号，是所有模糊算法的输入。

use ash::vk;
use glare_gfx::pipelines::graphics_pipeline::{GraphicsPipeline, GraphicsPipelineCreateInfo};

use crate::blur::TexelPush;
use crate::graph::handle::FxImageHandle;
use crate::graph::pass::FxPassDesc;
use crate::graph::state::FxImageState;
use crate::pipeline::{FxSharedLayouts, FULLSCREEN_VERT_SPV};

const DOWNSAMPLE_FRAG_SPV: &str = "shaders/downsample4x4.frag.spv";

pub struct Downsample {
    pipeline: GraphicsPipeline,
}

// new & init
impl Downsample {
    pub fn new(layouts: &FxSharedLayouts, blur_format: vk::Format) -> Self {
        let mut create_info = GraphicsPipelineCreateInfo::default();
        create_info
            .vertex_shader_stage(FULLSCREEN_VERT_SPV, c"main")
            .fragment_shader_stage(DOWNSAMPLE_FRAG_SPV, c"main")
            .attach_info(vec![blur_format], None, None)
            .color_attach_write_all(1);

        Self {
            pipeline: GraphicsPipeline::new(&create_info, layouts.fragment_simple.clone(), "downsample-4x4"),
        }
    }
}

// 规划
impl Downsample {
    /// source 是全分辨率场景图，target 是模糊分辨率的 ping-pong 0 号
    pub fn plan(
        &self,
        source: FxImageHandle,
        source_extent: vk::Extent2D,
        target: FxImageHandle,
        sampler: vk::Sampler,
    ) -> FxPassDesc {
        FxPassDesc::graphics("downsample", self.pipeline.handle(), self.pipeline.layout(), target)
            .sample_image(0, source, sampler, FxImageState::SHADER_READ_FRAGMENT)
            .push_constants(&TexelPush::of(source_extent))
    }
}
