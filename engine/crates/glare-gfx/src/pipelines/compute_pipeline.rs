use std::{ffi::CStr, rc::Rc};

use ash::vk;

use crate::{
    foundation::debug_messenger::DebugType,
    gfx::Gfx,
    pipelines::{
        graphics_pipeline::PipelineLayout,
        shader::{GfxSpecialization, ShaderModule},
    },
};

pub struct ComputePipeline {
    pipeline: vk::Pipeline,

    pipeline_layout: Rc<PipelineLayout>,
}
// new & init
impl ComputePipeline {
    pub fn new(
        shader_path: &str,
        entry_point: &'static CStr,
        specialization: Option<GfxSpecialization>,
        pipeline_layout: Rc<PipelineLayout>,
        debug_name: &str,
    ) -> Self {
        let shader_module = ShaderModule::new(std::path::Path::new(shader_path));

        // spec info 借用了 specialization 的数据，需要在 pipeline 创建完成前存活
        let spec_info = specialization.as_ref().map(GfxSpecialization::info);
        let mut stage_info = vk::PipelineShaderStageCreateInfo::default()
            .module(shader_module.handle())
            .stage(vk::ShaderStageFlags::COMPUTE)
            .name(entry_point);
        if let Some(spec_info) = &spec_info {
            stage_info = stage_info.specialization_info(spec_info);
        }

        let pipeline_ci = vk::ComputePipelineCreateInfo::default().stage(stage_info).layout(pipeline_layout.handle());
        let gfx_device = Gfx::get().gfx_device();
        let pipeline = unsafe {
            gfx_device
                .create_compute_pipelines(vk::PipelineCache::null(), std::slice::from_ref(&pipeline_ci), None)
                .unwrap()[0]
        };

        shader_module.destroy();

        let pipeline = Self {
            pipeline,
            pipeline_layout,
        };
        gfx_device.set_debug_name(&pipeline, debug_name);
        pipeline
    }
}
// getters
impl ComputePipeline {
    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    #[inline]
    pub fn layout(&self) -> vk::PipelineLayout {
        self.pipeline_layout.handle()
    }
}
// destroy
impl ComputePipeline {
    #[inline]
    pub fn destroy(self) {
        // drop
    }
}
impl Drop for ComputePipeline {
    fn drop(&mut self) {
        unsafe {
            Gfx::get().gfx_device().destroy_pipeline(self.pipeline, None);
        }
    }
}
impl DebugType for ComputePipeline {
    fn debug_type_name() -> &'static str {
        "GfxComputePipeline"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.pipeline
    }
}
