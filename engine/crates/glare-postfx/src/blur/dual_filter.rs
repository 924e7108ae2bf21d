//! Dual Filter 模糊：下采样链 + 上采样链
//!
//! 下采样 pass 用 5 tap（四角 + 中心）写入金字塔的下一级，
//! 上采样 pass 用 8 tap 按相反顺序重写金字塔各级。
//! 最后一次上采样与合成 pass 合并，由 [`crate::compose`] 负责。

use ash::vk;
use glare_gfx::pipelines::graphics_pipeline::{GraphicsPipeline, GraphicsPipelineCreateInfo};

use crate::blur::{BlurFrameContext, TexelPush};
use crate::graph::handle::FxImageHandle;
use crate::graph::pass::FxPassDesc;
use crate::graph::state::FxImageState;
use crate::ping_pong::PingPongImages;
use crate::pipeline::{FxSharedLayouts, FULLSCREEN_VERT_SPV};

const DOWN_FRAG_SPV: &str = "shaders/dualfilter_down.frag.spv";
const UP_FRAG_SPV: &str = "shaders/dualfilter_up.frag.spv";

pub struct DualFilterBlur {
    down: GraphicsPipeline,
    up: GraphicsPipeline,
}

// new & init
impl DualFilterBlur {
    pub fn new(layouts: &FxSharedLayouts, blur_format: vk::Format) -> Self {
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
            .color_attach_write_all(1);

        Self {
            down: GraphicsPipeline::new(&down_info, layouts.fragment_simple.clone(), "dualfilter-down"),
            up: GraphicsPipeline::new(&up_info, layouts.fragment_simple.clone(), "dualfilter-up"),
        }
    }
}

// 规划
impl DualFilterBlur {
    pub fn plan(&self, ctx: &BlurFrameContext) -> Vec<FxPassDesc> {
        plan_chain(self.down.handle(), self.down.layout(), self.up.handle(), self.up.layout(), ctx, false)
    }
}

/// down/up 链的读写编排，dual 与 tent 共用
///
/// blend_up 时上采样 pass 以 additive blend 写入，保留目标级的下采样内容
pub(crate) fn plan_chain(
    down_pipeline: vk::Pipeline,
    down_layout: vk::PipelineLayout,
    up_pipeline: vk::Pipeline,
    up_layout: vk::PipelineLayout,
    ctx: &BlurFrameContext,
    blend_up: bool,
) -> Vec<FxPassDesc> {
    let half = ctx.tier.filter_passes / 2;
    let mut passes = Vec::with_capacity(ctx.tier.filter_passes - 1);

    for j in 0..half {
        let (read, read_extent) = chain_source(ctx, half, ChainStage::Down, j);
        let write = ctx.ping_pong.pyramid_level(j);
        passes.push(
            FxPassDesc::graphics(format!("filter-down-{j}"), down_pipeline, down_layout, write)
                .sample_image(0, read, ctx.sampler, FxImageState::SHADER_READ_FRAGMENT)
                .push_constants(&TexelPush::of(read_extent)),
        );
    }

    // 最后一次上采样（j == half-1）并入合成 pass，这里不生成
    for j in 0..half - 1 {
        let (read, read_extent) = chain_source(ctx, half, ChainStage::Up, j);
        let write = ctx.ping_pong.upsample_target(ctx.tier.filter_passes, j).unwrap();
        let mut pass = FxPassDesc::graphics(format!("filter-up-{j}"), up_pipeline, up_layout, write)
            .sample_image(0, read, ctx.sampler, FxImageState::SHADER_READ_FRAGMENT)
            .push_constants(&TexelPush::of(read_extent));
        if blend_up {
            pass = pass.blend_with_target();
        }
        passes.push(pass);
    }

    passes
}

#[derive(Clone, Copy)]
pub(crate) enum ChainStage {
    Down,
    Up,
}

/// 链上第 j 个 pass 的输入图像与其分辨率
pub(crate) fn chain_source(
    ctx: &BlurFrameContext,
    half: usize,
    stage: ChainStage,
    j: usize,
) -> (FxImageHandle, vk::Extent2D) {
    match stage {
        ChainStage::Down => {
            if j == 0 {
                (ctx.ping_pong.front(), ctx.blur_extent)
            } else {
                (ctx.ping_pong.pyramid_level(j - 1), PingPongImages::level_extent(ctx.blur_extent, j - 1))
            }
        }
        ChainStage::Up => {
            let level = half - 1 - j;
            (ctx.ping_pong.pyramid_level(level), PingPongImages::level_extent(ctx.blur_extent, level))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blur::test_support;
    use crate::config::BLUR_CONFIGURATIONS;

    fn null_plan(ctx: &BlurFrameContext<'_>, blend_up: bool) -> Vec<FxPassDesc> {
        plan_chain(
            vk::Pipeline::null(),
            vk::PipelineLayout::null(),
            vk::Pipeline::null(),
            vk::PipelineLayout::null(),
            ctx,
            blend_up,
        )
    }

    #[test]
    fn pass_count_excludes_merged_upsample() {
        let ping_pong = PingPongImages::minted();
        for tier in 0..BLUR_CONFIGURATIONS.len() {
            let ctx = test_support::context(&ping_pong, tier);
            // 总 pass 数减去并入合成的最后一次上采样
            assert_eq!(null_plan(&ctx, false).len(), BLUR_CONFIGURATIONS[tier].filter_passes - 1);
        }
    }

    #[test]
    fn downsample_chain_descends_pyramid() {
        let ping_pong = PingPongImages::minted();
        let ctx = test_support::context(&ping_pong, 2);
        let passes = null_plan(&ctx, false);
        let half = ctx.tier.filter_passes / 2;

        assert_eq!(passes[0].reads[0].0, ping_pong.front());
        for j in 1..half {
            assert_eq!(passes[j].reads[0].0, ping_pong.pyramid_level(j - 1));
            assert_eq!(passes[j].writes[0].0, ping_pong.pyramid_level(j));
        }
    }

    #[test]
    fn upsample_chain_mirrors_levels() {
        let ping_pong = PingPongImages::minted();
        let ctx = test_support::context(&ping_pong, 2);
        let passes = null_plan(&ctx, false);
        let half = ctx.tier.filter_passes / 2;

        // tier 2 共 6 pass：up 0 读 level 2 写 level 1，up 1 读 level 1 写 level 0
        let up = &passes[half..];
        assert_eq!(up.len(), half - 1);
        for (j, pass) in up.iter().enumerate() {
            assert_eq!(pass.reads[0].0, ping_pong.pyramid_level(half - 1 - j));
            assert_eq!(pass.writes[0].0, ping_pong.pyramid_level(half - 2 - j));
        }
    }

    #[test]
    fn blend_up_loads_target_contents() {
        let ping_pong = PingPongImages::minted();
        let ctx = test_support::context(&ping_pong, 2);
        let passes = null_plan(&ctx, true);
        let half = ctx.tier.filter_passes / 2;

        for pass in &passes[half..] {
            assert_eq!(pass.writes[0].1, FxImageState::COLOR_ATTACHMENT_READ_WRITE);
        }
        for pass in &passes[..half] {
            assert_eq!(pass.writes[0].1, FxImageState::COLOR_ATTACHMENT_WRITE);
        }
    }
}
