//! 合成 pass：场景原图 + 模糊结果 → swapchain image
//!
//! 三类 pipeline 变体由 specialization constant 在创建时固定：
//! - constant_id 0：显示模式，0 = 原图 + bloom，1 = 仅 bloom，2 = 仅原图
//!
//! Dual/Tent Filter 的最后一次上采样并入本 pass，由专用 shader
//! 在合成的同时完成最后一级 up-sample，省掉一次全分辨率 pass。

use ash::vk;
use glare_gfx::pipelines::graphics_pipeline::{GraphicsPipeline, GraphicsPipelineCreateInfo};
use glare_gfx::pipelines::shader::GfxSpecialization;

use crate::config::BlurMode;
use crate::graph::handle::FxImageHandle;
use crate::graph::pass::FxPassDesc;
use crate::graph::state::FxImageState;
use crate::pipeline::{FxSharedLayouts, FULLSCREEN_VERT_SPV};

const COMPOSITE_FRAG_SPV: &str = "shaders/composite.frag.spv";
const COMPOSITE_DUAL_FRAG_SPV: &str = "shaders/composite_dualfilter_up.frag.spv";
const COMPOSITE_TENT_FRAG_SPV: &str = "shaders/composite_tentfilter_up.frag.spv";

/// 显示模式，值与 shader 的 specialization constant 一致
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositionVariant {
    Default = 0,
    BloomOnly = 1,
    OriginalOnly = 2,
}

/// 合并上采样的种类
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergedUpsample {
    None,
    DualFilter,
    TentFilter,
}

/// mode 对应的合并上采样种类；只有 Dual/Tent 把最后一级并入合成
pub fn merged_for(mode: BlurMode) -> MergedUpsample {
    match mode {
        BlurMode::DualFilter => MergedUpsample::DualFilter,
        BlurMode::TentFilter => MergedUpsample::TentFilter,
        _ => MergedUpsample::None,
    }
}

/// 合成 pass 的 push constant
///
/// texel_size 只在合并上采样时被 shader 读取，exposure 所有变体都使用
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CompositePush {
    pub texel_size: [f32; 2],
    /// 线性曝光，合成前乘到输出颜色上
    pub exposure: f32,
    pub _pad: f32,
}

impl CompositePush {
    pub fn new(bloom_extent: vk::Extent2D, exposure: f32) -> Self {
        Self {
            texel_size: [1.0 / bloom_extent.width as f32, 1.0 / bloom_extent.height as f32],
            exposure,
            _pad: 0.0,
        }
    }
}

pub struct Composition {
    /// 标准合成，按 [`CompositionVariant`] 下标
    standard: [GraphicsPipeline; 3],
    /// Dual Filter 合并上采样：default / bloom only
    dual_merged: [GraphicsPipeline; 2],
    /// Tent Filter 合并上采样：default / bloom only
    tent_merged: [GraphicsPipeline; 2],
}

// new & init
impl Composition {
    pub fn new(layouts: &FxSharedLayouts, swapchain_format: vk::Format) -> Self {
        let build = |frag: &str, variant: u32, name: &str| {
            let mut create_info = GraphicsPipelineCreateInfo::default();
            create_info
                .vertex_shader_stage(FULLSCREEN_VERT_SPV, c"main")
                .fragment_shader_stage_specialized(frag, c"main", GfxSpecialization::new().constant_u32(0, variant))
                .attach_info(vec![swapchain_format], None, None)
                .color_attach_write_all(1);
            GraphicsPipeline::new(&create_info, layouts.compose.clone(), name)
        };

        Self {
            standard: [
                build(COMPOSITE_FRAG_SPV, 0, "composite-default"),
                build(COMPOSITE_FRAG_SPV, 1, "composite-bloom-only"),
                build(COMPOSITE_FRAG_SPV, 2, "composite-original-only"),
            ],
            dual_merged: [
                build(COMPOSITE_DUAL_FRAG_SPV, 0, "composite-dual-up"),
                build(COMPOSITE_DUAL_FRAG_SPV, 1, "composite-dual-up-bloom-only"),
            ],
            tent_merged: [
                build(COMPOSITE_TENT_FRAG_SPV, 0, "composite-tent-up"),
                build(COMPOSITE_TENT_FRAG_SPV, 1, "composite-tent-up-bloom-only"),
            ],
        }
    }
}

// 规划
impl Composition {
    /// 生成合成 pass
    ///
    /// * bloom - 模糊结果；NoBloom 时为 None，变体必须是 OriginalOnly
    /// * bloom_extent - 模糊结果的分辨率，合并上采样的 push constant 需要
    /// * exposure - 线性曝光
    #[allow(clippy::too_many_arguments)]
    pub fn plan(
        &self,
        variant: CompositionVariant,
        merged: MergedUpsample,
        original: FxImageHandle,
        bloom: Option<FxImageHandle>,
        bloom_extent: vk::Extent2D,
        exposure: f32,
        target: FxImageHandle,
        sampler: vk::Sampler,
    ) -> FxPassDesc {
        let pipeline = match merged {
            MergedUpsample::None => &self.standard[variant as usize],
            MergedUpsample::DualFilter => {
                debug_assert_ne!(variant, CompositionVariant::OriginalOnly);
                &self.dual_merged[variant as usize]
            }
            MergedUpsample::TentFilter => {
                debug_assert_ne!(variant, CompositionVariant::OriginalOnly);
                &self.tent_merged[variant as usize]
            }
        };
        plan_composite(pipeline.handle(), pipeline.layout(), original, bloom, bloom_extent, exposure, target, sampler)
    }
}

#[allow(clippy::too_many_arguments)]
fn plan_composite(
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
    original: FxImageHandle,
    bloom: Option<FxImageHandle>,
    bloom_extent: vk::Extent2D,
    exposure: f32,
    target: FxImageHandle,
    sampler: vk::Sampler,
) -> FxPassDesc {
    // OriginalOnly 时 bloom 绑定也要有效，重复绑定原图，shader 不会读取
    let bloom_image = bloom.unwrap_or(original);
    FxPassDesc::graphics("composite", pipeline, layout, target)
        .sample_image(0, original, sampler, FxImageState::SHADER_READ_FRAGMENT)
        .sample_image(1, bloom_image, sampler, FxImageState::SHADER_READ_FRAGMENT)
        .push_constants(&CompositePush::new(bloom_extent, exposure))
}

/// 当前配置对应的显示模式
pub fn variant_for(no_bloom: bool, bloom_only: bool) -> CompositionVariant {
    if no_bloom {
        CompositionVariant::OriginalOnly
    } else if bloom_only {
        CompositionVariant::BloomOnly
    } else {
        CompositionVariant::Default
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

    fn null_composite(original: FxImageHandle, bloom: Option<FxImageHandle>, target: FxImageHandle) -> FxPassDesc {
        plan_composite(
            vk::Pipeline::null(),
            vk::PipelineLayout::null(),
            original,
            bloom,
            vk::Extent2D { width: 120, height: 67 },
            1.0,
            target,
            vk::Sampler::null(),
        )
    }

    #[test]
    fn variant_selection() {
        assert_eq!(variant_for(true, false), CompositionVariant::OriginalOnly);
        assert_eq!(variant_for(true, true), CompositionVariant::OriginalOnly);
        assert_eq!(variant_for(false, true), CompositionVariant::BloomOnly);
        assert_eq!(variant_for(false, false), CompositionVariant::Default);
    }

    #[test]
    fn merged_upsample_only_for_pyramid_modes() {
        assert_eq!(merged_for(BlurMode::DualFilter), MergedUpsample::DualFilter);
        assert_eq!(merged_for(BlurMode::TentFilter), MergedUpsample::TentFilter);
        assert_eq!(merged_for(BlurMode::NoBloom), MergedUpsample::None);
        assert_eq!(merged_for(BlurMode::GaussianLinear), MergedUpsample::None);
        assert_eq!(merged_for(BlurMode::Kawase), MergedUpsample::None);
    }

    #[test]
    fn no_bloom_reads_original_on_both_bindings() {
        // 没有模糊结果时 binding 1 退回原图，pass 不依赖任何 ping-pong image
        let handles = mint_handles(2);
        let pass = null_composite(handles[0], None, handles[1]);

        assert_eq!(pass.reads.len(), 2);
        assert_eq!(pass.reads[0].0, handles[0]);
        assert_eq!(pass.reads[1].0, handles[0]);
        assert_eq!(pass.writes[0].0, handles[1]);
    }

    #[test]
    fn bloom_result_feeds_second_binding() {
        let handles = mint_handles(3);
        let pass = null_composite(handles[0], Some(handles[1]), handles[2]);

        assert_eq!(pass.reads[0].0, handles[0]);
        assert_eq!(pass.reads[1].0, handles[1]);
    }

    #[test]
    fn push_constants_carry_exposure() {
        let push = CompositePush::new(vk::Extent2D { width: 480, height: 270 }, 0.85);
        let bytes = bytemuck::bytes_of(&push);
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytemuck::from_bytes::<CompositePush>(bytes).exposure, 0.85);
    }
}
