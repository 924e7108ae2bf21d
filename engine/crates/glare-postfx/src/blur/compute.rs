//! compute shader 的滑动平均 Gaussian 模糊
//!
//! 每个线程负责一整行（或一整列），维护一个 kernel 宽度的环形颜色缓存，
//! 窗口每滑动一格只取一个新 texel，采样开销与 kernel 尺寸无关。
//! 权重从 UBO 读取，布局见 [`super::ComputeKernelParams`]。

use ash::vk;
use glare_gfx::pipelines::compute_pipeline::ComputePipeline;

use crate::blur::BlurFrameContext;
use crate::graph::pass::FxPassDesc;
use crate::graph::state::FxImageState;
use crate::pipeline::FxSharedLayouts;

const BLUR_H_COMP_SPV: &str = "shaders/gaussian_sliding_h.comp.spv";
const BLUR_V_COMP_SPV: &str = "shaders/gaussian_sliding_v.comp.spv";

/// workgroup 在行/列方向的线程数，与 shader 的 local_size 一致
const LOCAL_SIZE: u32 = 32;

pub struct ComputeGaussianBlur {
    horizontal: ComputePipeline,
    vertical: ComputePipeline,
}

// new & init
impl ComputeGaussianBlur {
    pub fn new(layouts: &FxSharedLayouts) -> Self {
        Self {
            horizontal: ComputePipeline::new(
                BLUR_H_COMP_SPV,
                c"main",
                None,
                layouts.compute_blur.clone(),
                "gaussian-sliding-h",
            ),
            vertical: ComputePipeline::new(
                BLUR_V_COMP_SPV,
                c"main",
                None,
                layouts.compute_blur.clone(),
                "gaussian-sliding-v",
            ),
        }
    }
}

// 规划
impl ComputeGaussianBlur {
    pub fn plan(&self, ctx: &BlurFrameContext) -> Vec<FxPassDesc> {
        vec![self.horizontal_pass(ctx), self.vertical_pass(ctx)]
    }

    /// 水平：每线程一行，读 0 写 1。Hybrid 模式的前半段
    pub(crate) fn horizontal_pass(&self, ctx: &BlurFrameContext) -> FxPassDesc {
        let (read, write) = ctx.ping_pong.acquire(0);
        let groups = ctx.blur_extent.height.div_ceil(LOCAL_SIZE);
        plan_pass("compute-gaussian-h", &self.horizontal, ctx, read, write, groups)
    }

    /// 垂直：每线程一列，读 1 写 0
    fn vertical_pass(&self, ctx: &BlurFrameContext) -> FxPassDesc {
        let (read, write) = ctx.ping_pong.acquire(1);
        let groups = ctx.blur_extent.width.div_ceil(LOCAL_SIZE);
        plan_pass("compute-gaussian-v", &self.vertical, ctx, read, write, groups)
    }
}

fn plan_pass(
    name: &str,
    pipeline: &ComputePipeline,
    ctx: &BlurFrameContext,
    read: crate::graph::handle::FxImageHandle,
    write: crate::graph::handle::FxImageHandle,
    groups: u32,
) -> FxPassDesc {
    FxPassDesc::compute(name, pipeline.handle(), pipeline.layout(), glam::uvec3(groups, 1, 1))
        .sample_image(0, read, ctx.sampler, FxImageState::SHADER_READ_COMPUTE)
        .write_storage_image(1, write)
        .uniform_buffer(2, ctx.kernel_ubo, ctx.compute_kernel_region.0, ctx.compute_kernel_region.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blur::test_support;
    use crate::graph::pass::{FxBinding, FxPassKind};
    use crate::ping_pong::PingPongImages;

    fn null_pass(ctx: &BlurFrameContext, iteration: usize, groups: u32) -> FxPassDesc {
        let (read, write) = ctx.ping_pong.acquire(iteration);
        FxPassDesc::compute("test", vk::Pipeline::null(), vk::PipelineLayout::null(), glam::uvec3(groups, 1, 1))
            .sample_image(0, read, vk::Sampler::null(), FxImageState::SHADER_READ_COMPUTE)
            .write_storage_image(1, write)
            .uniform_buffer(2, ctx.kernel_ubo, ctx.compute_kernel_region.0, ctx.compute_kernel_region.1)
    }

    #[test]
    fn horizontal_groups_cover_all_rows() {
        assert_eq!(270u32.div_ceil(LOCAL_SIZE), 9);
        assert_eq!(256u32.div_ceil(LOCAL_SIZE), 8);
    }

    #[test]
    fn passes_alternate_between_pair() {
        let ping_pong = PingPongImages::minted();
        let ctx = test_support::context(&ping_pong, 2);

        let horizontal = null_pass(&ctx, 0, 9);
        let vertical = null_pass(&ctx, 1, 15);
        assert_eq!(horizontal.writes[0].0, vertical.reads[0].0);
        assert_eq!(vertical.writes[0].0, horizontal.reads[0].0);
        assert!(matches!(horizontal.kind, FxPassKind::Compute { .. }));
    }

    #[test]
    fn storage_write_binding_uses_general_layout() {
        let ping_pong = PingPongImages::minted();
        let ctx = test_support::context(&ping_pong, 2);
        let pass = null_pass(&ctx, 0, 9);

        assert_eq!(pass.writes[0].1, FxImageState::STORAGE_WRITE_COMPUTE);
        assert!(matches!(pass.bindings[1], FxBinding::StorageImage { binding: 1, .. }));
    }
}
