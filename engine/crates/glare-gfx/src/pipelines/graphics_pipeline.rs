use std::{ffi::CStr, rc::Rc};

use ash::vk;
use itertools::Itertools;

use crate::gfx::Gfx;
use crate::pipelines::shader::{GfxSpecialization, ShaderModuleCache};
use crate::{foundation::debug_messenger::DebugType, pipelines::shader::ShaderStageInfo};

pub struct PipelineLayout {
    handle: vk::PipelineLayout,
}
impl PipelineLayout {
    pub fn new(
        descriptor_set_layouts: &[vk::DescriptorSetLayout],
        push_constant_ranges: &[vk::PushConstantRange],
        debug_name: impl AsRef<str>,
    ) -> Self {
        let pipeline_layout_create_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(descriptor_set_layouts)
            .push_constant_ranges(push_constant_ranges);
        let gfx_device = Gfx::get().gfx_device();
        let handle = unsafe { gfx_device.create_pipeline_layout(&pipeline_layout_create_info, None).unwrap() };
        let layout = PipelineLayout { handle };
        gfx_device.set_debug_name(&layout, debug_name);
        layout
    }

    #[inline]
    pub fn handle(&self) -> vk::PipelineLayout {
        self.handle
    }

    #[inline]
    pub fn destroy(self) {
        // drop
    }
}
impl Drop for PipelineLayout {
    fn drop(&mut self) {
        unsafe {
            Gfx::get().gfx_device().destroy_pipeline_layout(self.handle, None);
        }
    }
}
impl DebugType for PipelineLayout {
    fn debug_type_name() -> &'static str {
        "GfxPipelineLayout"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}

pub struct GraphicsPipeline {
    pipeline: vk::Pipeline,

    /// 因为多个 pipeline 可以使用同一个 pipeline layout，所以这里使用 Rc
    pipeline_layout: Rc<PipelineLayout>,
}
impl GraphicsPipeline {
    pub fn new(
        create_info: &GraphicsPipelineCreateInfo,
        pipeline_layout: Rc<PipelineLayout>,
        debug_name: &str,
    ) -> Self {
        // dynamic rendering 需要的 framebuffer 信息
        let mut attach_info = vk::PipelineRenderingCreateInfo::default()
            .color_attachment_formats(&create_info.color_attach_formats)
            .depth_attachment_format(create_info.depth_attach_format)
            .stencil_attachment_format(create_info.stencil_attach_format);

        let mut shader_modules_cache = ShaderModuleCache::new();

        // spec info 借用了 stage 的数据，需要先于 stage info 构建出来
        let spec_infos = create_info
            .shader_stages
            .iter()
            .map(|stage| stage.specialization.as_ref().map(GfxSpecialization::info))
            .collect_vec();
        let shader_stages_info = create_info
            .shader_stages
            .iter()
            .zip(spec_infos.iter())
            .map(|(stage, spec_info)| {
                let mut stage_info = vk::PipelineShaderStageCreateInfo::default()
                    .stage(stage.stage)
                    .module(shader_modules_cache.get_or_load(stage.path()).handle())
                    .name(stage.entry_point);
                if let Some(spec_info) = spec_info {
                    stage_info = stage_info.specialization_info(spec_info);
                }
                stage_info
            })
            .collect_vec();

        // 全屏三角形在 vertex shader 内生成，不需要 vertex input
        let vertex_input_state_info = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&create_info.vertex_binding_desc)
            .vertex_attribute_descriptions(&create_info.vertex_attribute_desc);

        let input_assembly_info = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(create_info.primitive_topology)
            .primitive_restart_enable(false);

        // viewport 和 scissor 具体值由 dynamic 决定，但是数量由该 create info 决定
        let viewport_info = vk::PipelineViewportStateCreateInfo {
            viewport_count: 1,
            scissor_count: 1,
            ..Default::default()
        };

        let msaa_info = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        // 混合设置：需要为每个 color attachment 分别指定
        let color_blend_info = create_info.blend_info.attachments(&create_info.color_attach_blend_states);

        let dynamic_state_info =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&create_info.dynamic_states);

        // =======================================
        // === 创建 pipeline

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages_info)
            .vertex_input_state(&vertex_input_state_info)
            .input_assembly_state(&input_assembly_info)
            .viewport_state(&viewport_info)
            .rasterization_state(&create_info.rasterize_state_info)
            .multisample_state(&msaa_info)
            .color_blend_state(&color_blend_info)
            .depth_stencil_state(&create_info.depth_stencil_info)
            .layout(pipeline_layout.handle)
            .dynamic_state(&dynamic_state_info)
            .push_next(&mut attach_info);

        let gfx_device = Gfx::get().gfx_device();
        let pipeline = unsafe {
            gfx_device
                .create_graphics_pipelines(vk::PipelineCache::null(), std::slice::from_ref(&pipeline_info), None)
                .unwrap()[0]
        };
        let pipeline = GraphicsPipeline {
            pipeline,
            pipeline_layout,
        };

        gfx_device.set_debug_name(&pipeline, debug_name);

        shader_modules_cache.destroy();

        pipeline
    }

    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    #[inline]
    pub fn layout(&self) -> vk::PipelineLayout {
        self.pipeline_layout.handle
    }

    #[inline]
    pub fn destroy(self) {
        // drop
    }
}
impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        unsafe {
            Gfx::get().gfx_device().destroy_pipeline(self.pipeline, None);
        }
    }
}
impl DebugType for GraphicsPipeline {
    fn debug_type_name() -> &'static str {
        "GfxGraphicsPipeline"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.pipeline
    }
}

pub struct GraphicsPipelineCreateInfo {
    /// dynamic render 需要的 framebuffer 信息
    color_attach_formats: Vec<vk::Format>,
    /// dynamic render 需要的 framebuffer 信息
    depth_attach_format: vk::Format,
    /// dynamic render 需要的 framebuffer 信息
    stencil_attach_format: vk::Format,

    shader_stages: Vec<ShaderStageInfo>,

    vertex_binding_desc: Vec<vk::VertexInputBindingDescription>,
    vertex_attribute_desc: Vec<vk::VertexInputAttributeDescription>,

    primitive_topology: vk::PrimitiveTopology,

    rasterize_state_info: vk::PipelineRasterizationStateCreateInfo<'static>,

    color_attach_blend_states: Vec<vk::PipelineColorBlendAttachmentState>,
    blend_info: vk::PipelineColorBlendStateCreateInfo<'static>,

    depth_stencil_info: vk::PipelineDepthStencilStateCreateInfo<'static>,

    dynamic_states: Vec<vk::DynamicState>,
}
impl Default for GraphicsPipelineCreateInfo {
    fn default() -> Self {
        Self {
            color_attach_formats: vec![],

            // format = undefined 表示不使用这个 attachment
            depth_attach_format: vk::Format::UNDEFINED,
            stencil_attach_format: vk::Format::UNDEFINED,

            shader_stages: vec![],

            vertex_binding_desc: vec![],
            vertex_attribute_desc: vec![],

            primitive_topology: vk::PrimitiveTopology::TRIANGLE_LIST,

            rasterize_state_info: vk::PipelineRasterizationStateCreateInfo::default()
                .depth_clamp_enable(false)
                .rasterizer_discard_enable(false)
                .polygon_mode(vk::PolygonMode::FILL)
                .line_width(1.0)
                // 后处理全屏三角形不需要剔除
                .cull_mode(vk::CullModeFlags::NONE)
                .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
                .depth_bias_enable(false),

            color_attach_blend_states: vec![],
            blend_info: vk::PipelineColorBlendStateCreateInfo::default()
                .logic_op_enable(false)
                .blend_constants([0.0, 0.0, 0.0, 0.0]),

            depth_stencil_info: vk::PipelineDepthStencilStateCreateInfo::default()
                .depth_test_enable(false)
                .depth_write_enable(false)
                .depth_bounds_test_enable(false)
                .stencil_test_enable(false),
            dynamic_states: vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR],
        }
    }
}
// builder
impl GraphicsPipelineCreateInfo {
    /// builder
    #[inline]
    pub fn attach_info(
        &mut self,
        color_attach_formats: Vec<vk::Format>,
        depth_format: Option<vk::Format>,
        stencil_format: Option<vk::Format>,
    ) -> &mut Self {
        self.color_attach_formats = color_attach_formats;
        self.depth_attach_format = depth_format.unwrap_or(vk::Format::UNDEFINED);
        self.stencil_attach_format = stencil_format.unwrap_or(vk::Format::UNDEFINED);

        self
    }

    /// builder
    #[inline]
    pub fn vertex_shader_stage(&mut self, path: &str, entry_point: &'static CStr) -> &mut Self {
        self.shader_stages.push(ShaderStageInfo {
            stage: vk::ShaderStageFlags::VERTEX,
            entry_point,
            path: path.to_string(),
            specialization: None,
        });
        self
    }

    /// builder
    #[inline]
    pub fn fragment_shader_stage(&mut self, path: &str, entry_point: &'static CStr) -> &mut Self {
        self.shader_stages.push(ShaderStageInfo {
            stage: vk::ShaderStageFlags::FRAGMENT,
            entry_point,
            path: path.to_string(),
            specialization: None,
        });
        self
    }

    /// builder
    ///
    /// 带有 specialization constant 的 fragment shader
    #[inline]
    pub fn fragment_shader_stage_specialized(
        &mut self,
        path: &str,
        entry_point: &'static CStr,
        specialization: GfxSpecialization,
    ) -> &mut Self {
        self.shader_stages.push(ShaderStageInfo {
            stage: vk::ShaderStageFlags::FRAGMENT,
            entry_point,
            path: path.to_string(),
            specialization: Some(specialization),
        });
        self
    }

    /// 为每个 color attachment 指定 blend 操作
    #[inline]
    pub fn color_blend(
        &mut self,
        states: Vec<vk::PipelineColorBlendAttachmentState>,
        blend_constants: [f32; 4],
    ) -> &mut Self {
        self.color_attach_blend_states = states;
        self.blend_info.blend_constants = blend_constants;
        self.blend_info.logic_op_enable = vk::FALSE;
        self
    }

    /// 不混合，直接写入
    #[inline]
    pub fn color_attach_write_all(&mut self, attach_count: usize) -> &mut Self {
        self.color_attach_blend_states = vec![
            vk::PipelineColorBlendAttachmentState::default()
                .blend_enable(false)
                .color_write_mask(vk::ColorComponentFlags::RGBA);
            attach_count
        ];
        self
    }

    /// additive blend：dst = src + dst，up-sample 链的合并写入使用
    #[inline]
    pub fn color_attach_additive(&mut self, attach_count: usize) -> &mut Self {
        self.color_attach_blend_states = vec![
            vk::PipelineColorBlendAttachmentState::default()
                .blend_enable(true)
                .src_color_blend_factor(vk::BlendFactor::ONE)
                .dst_color_blend_factor(vk::BlendFactor::ONE)
                .color_blend_op(vk::BlendOp::ADD)
                .src_alpha_blend_factor(vk::BlendFactor::ONE)
                .dst_alpha_blend_factor(vk::BlendFactor::ONE)
                .alpha_blend_op(vk::BlendOp::ADD)
                .color_write_mask(vk::ColorComponentFlags::RGBA);
            attach_count
        ];
        self
    }
}
