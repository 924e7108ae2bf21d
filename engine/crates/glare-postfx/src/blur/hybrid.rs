//! 混合 Gaussian：水平用 compute 滑动平均，垂直用 fragment 线性采样
//!
//! 水平方向 compute shader 按行访问，cache 友好；垂直方向按列访问
//! 对 compute 不利，改用 fragment 的折叠 kernel。两段使用各自的 UBO 区域。

use crate::blur::compute::ComputeGaussianBlur;
use crate::blur::gaussian::GaussianBlur;
use crate::blur::{kernel_for_mode, BlurFrameContext};
use crate::config::BlurMode;
use crate::graph::pass::FxPassDesc;

pub fn plan(compute: &ComputeGaussianBlur, gaussian: &GaussianBlur, ctx: &BlurFrameContext) -> Vec<FxPassDesc> {
    // 垂直段消费 Truncated Linear 的折叠 kernel，采样模式随之而定
    let pattern = kernel_for_mode(BlurMode::GaussianLinearTruncated, ctx.tier).pattern;
    vec![compute.horizontal_pass(ctx), gaussian.vertical_pass(ctx, pattern)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blur::test_support;
    use crate::graph::state::FxImageState;
    use crate::graph::pass::{FxPassDesc, FxPassKind};
    use crate::ping_pong::PingPongImages;
    use ash::vk;

    // 与 plan 相同的读写编排，不经过真实 pipeline
    fn null_plan(ctx: &BlurFrameContext) -> Vec<FxPassDesc> {
        let (read0, write0) = ctx.ping_pong.acquire(0);
        let (read1, write1) = ctx.ping_pong.acquire(1);
        vec![
            FxPassDesc::compute("h", vk::Pipeline::null(), vk::PipelineLayout::null(), glam::uvec3(9, 1, 1))
                .sample_image(0, read0, vk::Sampler::null(), FxImageState::SHADER_READ_COMPUTE)
                .write_storage_image(1, write0),
            FxPassDesc::graphics("v", vk::Pipeline::null(), vk::PipelineLayout::null(), write1)
                .sample_image(0, read1, vk::Sampler::null(), FxImageState::SHADER_READ_FRAGMENT),
        ]
    }

    #[test]
    fn compute_feeds_fragment_stage() {
        let ping_pong = PingPongImages::minted();
        let ctx = test_support::context(&ping_pong, 2);
        let passes = null_plan(&ctx);

        assert_eq!(passes.len(), 2);
        assert!(matches!(passes[0].kind, FxPassKind::Compute { .. }));
        assert!(matches!(passes[1].kind, FxPassKind::Graphics { .. }));
        // compute 的输出就是 fragment 的输入
        assert_eq!(passes[0].writes[0].0, passes[1].reads[0].0);
        // 最终结果回到 0 号，与其它两 pass 算法一致
        assert_eq!(passes[1].writes[0].0, ping_pong.front());
    }
}
