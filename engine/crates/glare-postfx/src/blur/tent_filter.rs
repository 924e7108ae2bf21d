//! Tent Filter 模糊：blit 下采样链 + 3x3 tent 上采样链
//!
//! 下采样优先使用双线性 blit，格式不支持时退回 fragment pass。
//! 上采样使用 9 tap tent kernel，以 additive blend 写入目标级，
//! 与该级的下采样内容逐级累积。最后一次上采样并入合成 pass。

use ash::vk;
use glare_gfx::pipelines::graphics_pipeline::{GraphicsPipeline, GraphicsPipelineCreateInfo};

use crate::blur::dual_filter::{chain_source, ChainStage};
use crate::blur::{BlurFrameContext, TexelPush};
use crate::graph::pass::FxPassDesc;
use crate::graph::state::FxImageState;
use crate::pipeline::{FxSharedLayouts, FULLSCREEN_VERT_SPV};

const DOWN_FRAG_SPV: &str = "shaders/tentfilter_down.frag.spv";
const UP_FRAG_SPV: &str = "shaders/tentfilter_up.frag.spv";

pub struct TentFilterBlur {
    down: GraphicsPipeline,
    up: GraphicsPipeline,
    use_blit: bool,
}

// new & init
impl TentFilterBlur {
    pub fn new(layouts: &FxSharedLayouts, blur_format: vk::Format, use_blit: bool) -> Self {
        let mut down_info = GraphicsPipelineCreateInfo::default();
        down_info
            .vertex_shader_stage(FULLSCREEN_VERT_SPV, c"main")
            .fragment_shader_stage(DOWN_FRAG_SPV, c"main")
            .attach_info(vec![blur_format], None, None)
            .color_attach_write_all(1);

        let mut up_info = GraphicsPipelineCreateInfo::default();
        up_info
            .vertex_shader_stage(FULLSCREEN_VERT_SPV, c"main")
            .fragment_shader_stage(UP_FRAG_SPV, c"main")
            .attach_info(vec![blur_format], None, None)
            .color_attach_additive(1);

        Self {
            down: GraphicsPipeline::new(&down_info, layouts.fragment_simple.clone(), "tentfilter-down"),
            up: GraphicsPipeline::new(&up_info, layouts.fragment_simple.clone(), "tentfilter-up"),
            use_blit,
        }
    }
}

// 规划
impl TentFilterBlur {
    pub fn plan(&self, ctx: &BlurFrameContext) -> Vec<FxPassDesc> {
        plan_chain(self.down.handle(), self.down.layout(), self.up.handle(), self.up.layout(), ctx, self.use_blit)
    }
}

fn plan_chain(
    down_pipeline: vk::Pipeline,
    down_layout: vk::PipelineLayout,
    up_pipeline: vk::Pipeline,
    up_layout: vk::PipelineLayout,
    ctx: &BlurFrameContext,
    use_blit: bool,
) -> Vec<FxPassDesc> {
    let half = ctx.tier.filter_passes / 2;
    let mut passes = Vec::with_capacity(ctx.tier.filter_passes - 1);

    for j in 0..half {
        let (read, read_extent) = chain_source(ctx, half, ChainStage::Down, j);
        let write = ctx.ping_pong.pyramid_level(j);
        if use_blit {
            passes.push(FxPassDesc::blit(format!("tent-down-{j}"), read, write, vk::Filter::LINEAR));
        } else {
            passes.push(
                FxPassDesc::graphics(format!("tent-down-{j}"), down_pipeline, down_layout, write)
                    .sample_image(0, read, ctx.sampler, FxImageState::SHADER_READ_FRAGMENT)
                    .push_constants(&TexelPush::of(read_extent)),
            );
        }
    }

    for j in 0..half - 1 {
        let (read, read_extent) = chain_source(ctx, half, ChainStage::Up, j);
        let write = ctx.ping_pong.upsample_target(ctx.tier.filter_passes, j).unwrap();
        passes.push(
            FxPassDesc::graphics(format!("tent-up-{j}"), up_pipeline, up_layout, write)
                .sample_image(0, read, ctx.sampler, FxImageState::SHADER_READ_FRAGMENT)
                .push_constants(&TexelPush::of(read_extent))
                .blend_with_target(),
        );
    }

    passes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blur::test_support;
    use crate::graph::pass::FxPassKind;
    use crate::ping_pong::PingPongImages;

    fn null_plan(ctx: &BlurFrameContext<'_>, use_blit: bool) -> Vec<FxPassDesc> {
        plan_chain(
            vk::Pipeline::null(),
            vk::PipelineLayout::null(),
            vk::Pipeline::null(),
            vk::PipelineLayout::null(),
            ctx,
            use_blit,
        )
    }

    #[test]
    fn blit_downsample_when_supported() {
        let ping_pong = PingPongImages::minted();
        let ctx = test_support::context(&ping_pong, 2);
        let passes = null_plan(&ctx, true);
        let half = ctx.tier.filter_passes / 2;

        for pass in &passes[..half] {
            assert!(matches!(pass.kind, FxPassKind::Blit { .. }));
        }
        for pass in &passes[half..] {
            assert!(matches!(pass.kind, FxPassKind::Graphics { .. }));
        }
    }

    #[test]
    fn fragment_fallback_without_blit_support() {
        let ping_pong = PingPongImages::minted();
        let ctx = test_support::context(&ping_pong, 2);
        let passes = null_plan(&ctx, false);

        assert!(passes.iter().all(|p| matches!(p.kind, FxPassKind::Graphics { .. })));
    }

    #[test]
    fn upsample_accumulates_into_existing_levels() {
        let ping_pong = PingPongImages::minted();
        let ctx = test_support::context(&ping_pong, 3);
        let passes = null_plan(&ctx, true);
        let half = ctx.tier.filter_passes / 2;

        for pass in &passes[half..] {
            assert_eq!(pass.writes[0].1, FxImageState::COLOR_ATTACHMENT_READ_WRITE);
        }
    }
}
