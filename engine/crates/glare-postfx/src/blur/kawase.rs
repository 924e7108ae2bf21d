//! Kawase 模糊：固定 4 个对角采样点，距离随迭代递增
//!
//! 每次迭代在 ping-pong 对之间交替，采样点位于
//! (kernel + 0.5) * texel 的四个对角方向，双线性 sampler 一次取 4 texel。

use ash::vk;
use glare_gfx::pipelines::graphics_pipeline::{GraphicsPipeline, GraphicsPipelineCreateInfo};

use crate::blur::BlurFrameContext;
use crate::graph::pass::FxPassDesc;
use crate::graph::state::FxImageState;
use crate::pipeline::{FxSharedLayouts, FULLSCREEN_VERT_SPV};

const KAWASE_FRAG_SPV: &str = "shaders/kawase.frag.spv";

/// 单次迭代的 push constant
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct KawasePush {
    pub texel_size: [f32; 2],
    /// 本次迭代的采样距离（texel），shader 内再 +0.5 取 texel 间隙
    pub kernel: f32,
    pub _pad: f32,
}

pub struct KawaseBlur {
    pipeline: GraphicsPipeline,
}

// new & init
impl KawaseBlur {
    pub fn new(layouts: &FxSharedLayouts, blur_format: vk::Format) -> Self {
        let mut create_info = GraphicsPipelineCreateInfo::default();
        create_info
            .vertex_shader_stage(FULLSCREEN_VERT_SPV, c"main")
            .fragment_shader_stage(KAWASE_FRAG_SPV, c"main")
            .attach_info(vec![blur_format], None, None)
            .color_attach_write_all(1);

        Self {
            pipeline: GraphicsPipeline::new(&create_info, layouts.fragment_simple.clone(), "kawase"),
        }
    }
}

// 规划
impl KawaseBlur {
    pub fn plan(&self, ctx: &BlurFrameContext) -> Vec<FxPassDesc> {
        plan_iterations(self.pipeline.handle(), self.pipeline.layout(), ctx)
    }
}

fn plan_iterations(pipeline: vk::Pipeline, layout: vk::PipelineLayout, ctx: &BlurFrameContext) -> Vec<FxPassDesc> {
    let kawase = &ctx.tier.kawase;
    let texel_size = [1.0 / ctx.blur_extent.width as f32, 1.0 / ctx.blur_extent.height as f32];

    (0..kawase.iterations)
        .map(|i| {
            let (read, write) = ctx.ping_pong.acquire(i);
            let push = KawasePush {
                texel_size,
                kernel: kawase.kernels[i] as f32,
                _pad: 0.0,
            };
            FxPassDesc::graphics(format!("kawase-{i}"), pipeline, layout, write)
                .sample_image(0, read, ctx.sampler, FxImageState::SHADER_READ_FRAGMENT)
                .push_constants(&push)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blur::test_support;
    use crate::config::BLUR_CONFIGURATIONS;
    use crate::ping_pong::PingPongImages;

    fn null_plan(ctx: &BlurFrameContext<'_>) -> Vec<FxPassDesc> {
        plan_iterations(vk::Pipeline::null(), vk::PipelineLayout::null(), ctx)
    }

    #[test]
    fn pass_count_matches_tier_iterations() {
        let ping_pong = PingPongImages::minted();
        for tier in 0..BLUR_CONFIGURATIONS.len() {
            let ctx = test_support::context(&ping_pong, tier);
            assert_eq!(null_plan(&ctx).len(), BLUR_CONFIGURATIONS[tier].kawase.iterations);
        }
    }

    #[test]
    fn iterations_alternate_read_write() {
        let ping_pong = PingPongImages::minted();
        let ctx = test_support::context(&ping_pong, 4);
        let passes = null_plan(&ctx);

        for pair in passes.windows(2) {
            // 每次迭代读上一次的输出
            assert_eq!(pair[1].reads[0].0, pair[0].writes[0].0);
            assert_ne!(pair[1].reads[0].0, pair[1].writes[0].0);
        }
    }

    #[test]
    fn kernels_follow_tier_table() {
        let ping_pong = PingPongImages::minted();
        let ctx = test_support::context(&ping_pong, 4);
        let passes = null_plan(&ctx);

        let kernels: Vec<f32> = passes
            .iter()
            .map(|p| bytemuck::from_bytes::<KawasePush>(&p.push_constants).kernel)
            .collect();
        assert_eq!(kernels, vec![0.0, 0.0, 1.0, 1.0, 2.0]);
    }
}
