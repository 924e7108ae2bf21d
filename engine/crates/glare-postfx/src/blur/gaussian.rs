//! fragment shader 的可分离 Gaussian 模糊
//!
//! Original / Linear / Truncated 三种模式共用 shader 与 UBO 布局，
//! 区别在 kernel 内容（由 [`super::kernel_for_mode`] 生成）以及
//! 折叠后的采样模式：有独立中心 tap 和无中心 tap 各一条 pipeline，
//! 由 specialization constant 在创建时固定。

use ash::vk;
use glare_gfx::pipelines::graphics_pipeline::{GraphicsPipeline, GraphicsPipelineCreateInfo};
use glare_gfx::pipelines::shader::GfxSpecialization;

use crate::blur::{BlurFrameContext, DirectionPush};
use crate::graph::pass::FxPassDesc;
use crate::graph::state::FxImageState;
use crate::kernel::FoldedPattern;
use crate::pipeline::{FxSharedLayouts, FULLSCREEN_VERT_SPV};

const GAUSSIAN_FRAG_SPV: &str = "shaders/gaussian1d.frag.spv";

pub struct GaussianBlur {
    /// 半边 kernel 首个 tap 是中心 texel
    center_tap: GraphicsPipeline,
    /// 中心权重已拆分进两侧的双线性采样
    split_center: GraphicsPipeline,
}

// new & init
impl GaussianBlur {
    pub fn new(layouts: &FxSharedLayouts, blur_format: vk::Format) -> Self {
        let build = |center_tap: u32, name: &str| {
            let mut create_info = GraphicsPipelineCreateInfo::default();
            create_info
                .vertex_shader_stage(FULLSCREEN_VERT_SPV, c"main")
                .fragment_shader_stage_specialized(
                    GAUSSIAN_FRAG_SPV,
                    c"main",
                    GfxSpecialization::new().constant_u32(0, center_tap),
                )
                .attach_info(vec![blur_format], None, None)
                .color_attach_write_all(1);
            GraphicsPipeline::new(&create_info, layouts.fragment_blur.clone(), name)
        };

        Self {
            center_tap: build(1, "gaussian-1d-center"),
            split_center: build(0, "gaussian-1d-split"),
        }
    }
}

// 规划
impl GaussianBlur {
    /// 水平 + 垂直两个 pass，结果落在 ping-pong 的 0 号
    pub fn plan(&self, ctx: &BlurFrameContext, pattern: FoldedPattern) -> Vec<FxPassDesc> {
        let pipeline = self.pipeline_for(pattern);
        vec![
            plan_directional(pipeline.handle(), pipeline.layout(), ctx, 0),
            plan_directional(pipeline.handle(), pipeline.layout(), ctx, 1),
        ]
    }

    /// 仅垂直 pass，Hybrid 模式的后半段
    pub(crate) fn vertical_pass(&self, ctx: &BlurFrameContext, pattern: FoldedPattern) -> FxPassDesc {
        let pipeline = self.pipeline_for(pattern);
        plan_directional(pipeline.handle(), pipeline.layout(), ctx, 1)
    }

    fn pipeline_for(&self, pattern: FoldedPattern) -> &GraphicsPipeline {
        match pattern {
            FoldedPattern::CenterTap => &self.center_tap,
            FoldedPattern::SplitCenter => &self.split_center,
        }
    }
}

/// iteration 0 为水平（读 0 写 1），iteration 1 为垂直（读 1 写 0）
fn plan_directional(
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
    ctx: &BlurFrameContext,
    iteration: usize,
) -> FxPassDesc {
    let (read, write) = ctx.ping_pong.acquire(iteration);
    let (name, push) = if iteration == 0 {
        ("gaussian-horizontal", DirectionPush::horizontal(ctx.blur_extent))
    } else {
        ("gaussian-vertical", DirectionPush::vertical(ctx.blur_extent))
    };

    FxPassDesc::graphics(name, pipeline, layout, write)
        .sample_image(0, read, ctx.sampler, FxImageState::SHADER_READ_FRAGMENT)
        .uniform_buffer(1, ctx.kernel_ubo, ctx.fragment_kernel_region.0, ctx.fragment_kernel_region.1)
        .push_constants(&push)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blur::test_support;
    use crate::graph::pass::FxPassKind;
    use crate::ping_pong::PingPongImages;

    fn plan_with_null(ctx: &BlurFrameContext) -> Vec<FxPassDesc> {
        vec![
            plan_directional(vk::Pipeline::null(), vk::PipelineLayout::null(), ctx, 0),
            plan_directional(vk::Pipeline::null(), vk::PipelineLayout::null(), ctx, 1),
        ]
    }

    #[test]
    fn two_passes_ping_pong_without_aliasing() {
        let ping_pong = PingPongImages::minted();
        let ctx = test_support::context(&ping_pong, 2);
        let passes = plan_with_null(&ctx);

        assert_eq!(passes.len(), 2);
        // 水平：读 0 写 1
        assert_eq!(passes[0].reads[0].0, ping_pong.front());
        assert_eq!(passes[0].writes[0].0, ping_pong.back());
        // 垂直：读 1 写 0
        assert_eq!(passes[1].reads[0].0, ping_pong.back());
        assert_eq!(passes[1].writes[0].0, ping_pong.front());
    }

    #[test]
    fn plan_is_idempotent() {
        let ping_pong = PingPongImages::minted();
        let ctx = test_support::context(&ping_pong, 0);
        let first = plan_with_null(&ctx);
        let second = plan_with_null(&ctx);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.reads, b.reads);
            assert_eq!(a.writes, b.writes);
            assert_eq!(a.push_constants, b.push_constants);
        }
    }

    #[test]
    fn push_constants_carry_texel_step() {
        let ping_pong = PingPongImages::minted();
        let ctx = test_support::context(&ping_pong, 2);
        let passes = plan_with_null(&ctx);

        let horizontal: &DirectionPush = bytemuck::from_bytes(&passes[0].push_constants);
        assert!(horizontal.texel_step[0] > 0.0);
        assert_eq!(horizontal.texel_step[1], 0.0);

        let vertical: &DirectionPush = bytemuck::from_bytes(&passes[1].push_constants);
        assert_eq!(vertical.texel_step[0], 0.0);
        assert!(vertical.texel_step[1] > 0.0);
    }

    #[test]
    fn both_passes_are_graphics() {
        let ping_pong = PingPongImages::minted();
        let ctx = test_support::context(&ping_pong, 2);
        for pass in plan_with_null(&ctx) {
            assert!(matches!(pass.kind, FxPassKind::Graphics { .. }));
        }
    }
}
