//! 八种模糊算法的 pass 规划
//!
//! 每个算法只负责把当前配置翻译成 [`FxPassDesc`] 列表，
//! 不持有 image，不录制命令。所有算法共享同一组 ping-pong image，
//! 算法切换只改变 pass 列表与 kernel 参数，不产生任何分配。

pub mod compute;
pub mod dual_filter;
pub mod gaussian;
pub mod hybrid;
pub mod kawase;
pub mod tent_filter;

use ash::vk;
use glare_gfx::resources::buffer::GfxBuffer;

use crate::config::{BlurMode, BlurTierConfig, MIN_ACCEPTABLE_COEFFICIENT};
use crate::graph::handle::FxImageHandle;
use crate::graph::pass::FxPassDesc;
use crate::kernel::{self, KernelTable};
use crate::pipeline::FxSharedLayouts;
use crate::ping_pong::PingPongImages;

/// fragment 系 Gaussian 的 UBO 槽位数，容纳 51 tap kernel 的非负半边
pub const MAX_KERNEL_TAPS: usize = 26;
/// compute 系 Gaussian 的 UBO 槽位数，完整 kernel
pub const MAX_COMPUTE_KERNEL_SLOTS: usize = 52;

/// fragment shader 的 kernel 参数，std140 布局
///
/// 只上传非负偏移的半边，shader 利用对称性对 ±offset 各采样一次。
/// 每个 tap 占一个 vec4：x = 权重，y = 偏移（texel）
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct KernelParams {
    pub taps: [[f32; 4]; MAX_KERNEL_TAPS],
    pub tap_count: u32,
    pub _pad: [u32; 3],
}

impl KernelParams {
    pub fn from_table(table: &KernelTable) -> Self {
        let (weights, offsets) = table.half_f32();
        assert!(weights.len() <= MAX_KERNEL_TAPS, "kernel with {} half taps exceeds ubo capacity", weights.len());
        let mut taps = [[0.0f32; 4]; MAX_KERNEL_TAPS];
        for (i, (weight, offset)) in weights.iter().zip(offsets.iter()).enumerate() {
            taps[i] = [*weight, *offset, 0.0, 0.0];
        }
        Self {
            taps,
            tap_count: weights.len() as u32,
            _pad: [0; 3],
        }
    }
}

/// compute shader 的 kernel 参数，std140 布局
///
/// 权重在 vec4 的四个通道中重复，shader 以标量下标访问时不需要 swizzle 分支
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ComputeKernelParams {
    pub weights: [[f32; 4]; MAX_COMPUTE_KERNEL_SLOTS],
    pub kernel_size: u32,
    pub half_kernel: u32,
    pub _pad: [u32; 2],
}

impl ComputeKernelParams {
    pub fn from_table(table: &KernelTable) -> Self {
        assert!(table.len() <= MAX_COMPUTE_KERNEL_SLOTS);
        let mut weights = [[0.0f32; 4]; MAX_COMPUTE_KERNEL_SLOTS];
        for (i, weight) in table.weights.iter().enumerate() {
            let w = *weight as f32;
            weights[i] = [w, w, w, w];
        }
        Self {
            weights,
            kernel_size: table.len() as u32,
            half_kernel: (table.len() / 2) as u32,
            _pad: [0; 2],
        }
    }
}

/// 模糊 pass 的 push constant：一维模糊的采样步长
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DirectionPush {
    pub texel_step: [f32; 2],
    pub _pad: [f32; 2],
}

impl DirectionPush {
    pub fn horizontal(extent: vk::Extent2D) -> Self {
        Self {
            texel_step: [1.0 / extent.width as f32, 0.0],
            _pad: [0.0; 2],
        }
    }

    pub fn vertical(extent: vk::Extent2D) -> Self {
        Self {
            texel_step: [0.0, 1.0 / extent.height as f32],
            _pad: [0.0; 2],
        }
    }
}

/// down/up-sample pass 的 push constant：源 image 的 texel 尺寸
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TexelPush {
    pub texel_size: [f32; 2],
    pub _pad: [f32; 2],
}

impl TexelPush {
    pub fn of(extent: vk::Extent2D) -> Self {
        Self {
            texel_size: [1.0 / extent.width as f32, 1.0 / extent.height as f32],
            _pad: [0.0; 2],
        }
    }
}

/// 算法规划 pass 时需要的只读帧上下文
pub struct BlurFrameContext<'a> {
    pub ping_pong: &'a PingPongImages,
    /// 双线性 clamp sampler
    pub sampler: vk::Sampler,
    /// 本帧的 kernel UBO
    pub kernel_ubo: vk::Buffer,
    /// fragment kernel 在 UBO 中的 (offset, range)
    pub fragment_kernel_region: (vk::DeviceSize, vk::DeviceSize),
    /// compute kernel 在 UBO 中的 (offset, range)
    pub compute_kernel_region: (vk::DeviceSize, vk::DeviceSize),
    pub blur_extent: vk::Extent2D,
    pub tier: &'static BlurTierConfig,
}

/// 全部算法实例，按 [`BlurMode`] 枚举分发
///
/// 一个 mode 一个分支，没有 trait object
pub struct BlurAlgorithms {
    gaussian: gaussian::GaussianBlur,
    compute: compute::ComputeGaussianBlur,
    kawase: kawase::KawaseBlur,
    dual_filter: dual_filter::DualFilterBlur,
    tent_filter: tent_filter::TentFilterBlur,
}

// new & init
impl BlurAlgorithms {
    pub fn new(layouts: &FxSharedLayouts, blur_format: vk::Format, tent_use_blit: bool) -> Self {
        Self {
            gaussian: gaussian::GaussianBlur::new(layouts, blur_format),
            compute: compute::ComputeGaussianBlur::new(layouts),
            kawase: kawase::KawaseBlur::new(layouts, blur_format),
            dual_filter: dual_filter::DualFilterBlur::new(layouts, blur_format),
            tent_filter: tent_filter::TentFilterBlur::new(layouts, blur_format, tent_use_blit),
        }
    }
}

// 规划
impl BlurAlgorithms {
    /// 当前 mode 的全部模糊 pass，NoBloom 为空
    pub fn plan(&self, mode: BlurMode, ctx: &BlurFrameContext) -> Vec<FxPassDesc> {
        match mode {
            BlurMode::NoBloom => Vec::new(),
            BlurMode::GaussianOriginal | BlurMode::GaussianLinear | BlurMode::GaussianLinearTruncated => {
                self.gaussian.plan(ctx, kernel_for_mode(mode, ctx.tier).pattern)
            }
            BlurMode::ComputeGaussian => self.compute.plan(ctx),
            BlurMode::HybridGaussian => hybrid::plan(&self.compute, &self.gaussian, ctx),
            BlurMode::Kawase => self.kawase.plan(ctx),
            BlurMode::DualFilter => self.dual_filter.plan(ctx),
            BlurMode::TentFilter => self.tent_filter.plan(ctx),
        }
    }

    /// 把当前 (mode, tier) 的 kernel 参数写入本帧的 UBO
    pub fn write_kernel(&self, mode: BlurMode, tier: &BlurTierConfig, ubo: &GfxBuffer, ctx_regions: ((vk::DeviceSize, vk::DeviceSize), (vk::DeviceSize, vk::DeviceSize))) {
        let (fragment_region, compute_region) = ctx_regions;
        match mode {
            BlurMode::NoBloom | BlurMode::Kawase | BlurMode::DualFilter | BlurMode::TentFilter => {}
            BlurMode::GaussianOriginal | BlurMode::GaussianLinear | BlurMode::GaussianLinearTruncated => {
                let table = kernel_for_mode(mode, tier);
                let params = KernelParams::from_table(&table);
                ubo.transfer_region_by_mmap(fragment_region.0, bytemuck::bytes_of(&params));
            }
            BlurMode::ComputeGaussian => {
                let table = kernel_for_mode(mode, tier);
                let params = ComputeKernelParams::from_table(&table);
                ubo.transfer_region_by_mmap(compute_region.0, bytemuck::bytes_of(&params));
            }
            BlurMode::HybridGaussian => {
                // 水平 compute + 垂直 fragment，两份参数都要写
                let table = kernel_for_mode(BlurMode::ComputeGaussian, tier);
                let params = ComputeKernelParams::from_table(&table);
                ubo.transfer_region_by_mmap(compute_region.0, bytemuck::bytes_of(&params));

                let table = kernel_for_mode(BlurMode::GaussianLinearTruncated, tier);
                let params = KernelParams::from_table(&table);
                ubo.transfer_region_by_mmap(fragment_region.0, bytemuck::bytes_of(&params));
            }
        }
    }
}

/// 模糊结果所在的 image，NoBloom 没有结果
pub fn blurred_result(mode: BlurMode, ctx: &BlurFrameContext) -> Option<FxImageHandle> {
    match mode {
        BlurMode::NoBloom => None,
        BlurMode::GaussianOriginal
        | BlurMode::GaussianLinear
        | BlurMode::GaussianLinearTruncated
        | BlurMode::ComputeGaussian
        | BlurMode::HybridGaussian => Some(ctx.ping_pong.result_of(2)),
        BlurMode::Kawase => Some(ctx.ping_pong.result_of(ctx.tier.kawase.iterations)),
        // 最后一次上采样与合成合并，其输入是 level 0
        BlurMode::DualFilter | BlurMode::TentFilter => Some(ctx.ping_pong.pyramid_level(0)),
    }
}

/// mode 对应的 kernel 表
pub fn kernel_for_mode(mode: BlurMode, tier: &BlurTierConfig) -> KernelTable {
    match mode {
        BlurMode::GaussianOriginal => kernel::gaussian_kernel(tier.gaussian_kernel, false, false, MIN_ACCEPTABLE_COEFFICIENT),
        BlurMode::GaussianLinear => kernel::gaussian_kernel(tier.gaussian_kernel, true, false, MIN_ACCEPTABLE_COEFFICIENT),
        BlurMode::GaussianLinearTruncated => {
            kernel::gaussian_kernel(tier.truncated_kernel, true, true, MIN_ACCEPTABLE_COEFFICIENT)
        }
        BlurMode::ComputeGaussian | BlurMode::HybridGaussian => {
            kernel::gaussian_kernel(tier.gaussian_kernel, false, false, MIN_ACCEPTABLE_COEFFICIENT)
        }
        _ => unreachable!("mode {mode:?} does not use a gaussian kernel"),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::BLUR_CONFIGURATIONS;

    pub fn context(ping_pong: &PingPongImages, tier: usize) -> BlurFrameContext<'_> {
        BlurFrameContext {
            ping_pong,
            sampler: vk::Sampler::null(),
            kernel_ubo: vk::Buffer::null(),
            fragment_kernel_region: (0, size_of::<KernelParams>() as vk::DeviceSize),
            compute_kernel_region: (1024, size_of::<ComputeKernelParams>() as vk::DeviceSize),
            blur_extent: vk::Extent2D { width: 480, height: 270 },
            tier: &BLUR_CONFIGURATIONS[tier],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BLUR_CONFIGURATIONS;
    use crate::ping_pong::PingPongImages;

    #[test]
    fn only_no_bloom_lacks_a_result_image() {
        let ping_pong = PingPongImages::minted();
        let ctx = test_support::context(&ping_pong, 2);

        for mode in BlurMode::CYCLE {
            assert_eq!(blurred_result(mode, &ctx).is_none(), !mode.has_blur());
        }
    }

    #[test]
    fn iterative_modes_land_on_even_image() {
        let ping_pong = PingPongImages::minted();
        let ctx = test_support::context(&ping_pong, 2);

        // 两次一维模糊后结果回到 front；tier 2 的 Kawase 是 4 次迭代，同样回到 front
        assert_eq!(blurred_result(BlurMode::GaussianLinear, &ctx), Some(ping_pong.front()));
        assert_eq!(blurred_result(BlurMode::Kawase, &ctx), Some(ping_pong.front()));
        assert_eq!(blurred_result(BlurMode::DualFilter, &ctx), Some(ping_pong.pyramid_level(0)));
    }

    #[test]
    fn kernel_params_pack_half_table() {
        // size 25 折叠为 13 个采样，半边是中心 + 6 个正偏移 tap
        let table = kernel_for_mode(BlurMode::GaussianLinear, &BLUR_CONFIGURATIONS[2]);
        let params = KernelParams::from_table(&table);
        assert_eq!(params.tap_count, 7);
        assert_eq!(params.taps[0][1], 0.0);

        // shader 对非中心 tap 各采样两次，总权重回到 1
        let sum: f32 = params.taps[0][0]
            + 2.0 * params.taps[1..params.tap_count as usize].iter().map(|t| t[0]).sum::<f32>();
        assert!((sum - 1.0).abs() < 1e-4);
    }

    #[test]
    fn split_center_half_has_no_center_tap() {
        let table = kernel_for_mode(BlurMode::GaussianLinear, &BLUR_CONFIGURATIONS[1]);
        assert_eq!(table.pattern, crate::kernel::FoldedPattern::SplitCenter);

        let params = KernelParams::from_table(&table);
        assert!(params.taps[0][1] > 0.0);
        let sum: f32 = 2.0 * params.taps[..params.tap_count as usize].iter().map(|t| t[0]).sum::<f32>();
        assert!((sum - 1.0).abs() < 1e-4);
    }

    #[test]
    fn compute_kernel_duplicates_weight_lanes() {
        let table = kernel_for_mode(BlurMode::ComputeGaussian, &BLUR_CONFIGURATIONS[4]);
        let params = ComputeKernelParams::from_table(&table);
        assert_eq!(params.kernel_size, 51);
        assert_eq!(params.half_kernel, 25);
        for slot in &params.weights[..51] {
            assert_eq!(slot[0], slot[1]);
            assert_eq!(slot[0], slot[3]);
        }
    }

    #[test]
    fn largest_kernels_fit_ubo_capacity() {
        for tier in &BLUR_CONFIGURATIONS {
            for mode in [BlurMode::GaussianOriginal, BlurMode::GaussianLinear, BlurMode::GaussianLinearTruncated] {
                let table = kernel_for_mode(mode, tier);
                assert!(table.half_f32().0.len() <= MAX_KERNEL_TAPS);
            }
        }
    }
}
