use ash::vk;
use itertools::Itertools;

use crate::{
    basic::color::LabelColor,
    commands::{barrier::GfxImageBarrier, command_pool::GfxCommandPool},
    foundation::debug_messenger::DebugType,
    gfx::Gfx,
};

/// 命令缓冲封装
///
/// 封装 Vulkan CommandBuffer，提供类型安全的命令录制接口。
/// 支持图形、计算、屏障、调试标签等功能。
///
/// # 使用示例
/// ```ignore
/// let cmd = GfxCommandBuffer::new(&pool, "my-pass");
/// cmd.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT, "my-pass");
/// cmd.cmd_bind_pipeline(vk::PipelineBindPoint::GRAPHICS, pipeline);
/// // 绘制命令...
/// cmd.end();
/// ```
#[derive(Clone)]
pub struct GfxCommandBuffer {
    vk_handle: vk::CommandBuffer,
    _command_pool_handle: vk::CommandPool,

    #[cfg(debug_assertions)]
    name: String,
}
// new & init
impl GfxCommandBuffer {
    pub fn new(command_pool: &GfxCommandPool, debug_name: &str) -> Self {
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool.handle())
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffer = unsafe { Gfx::get().gfx_device().allocate_command_buffers(&info).unwrap()[0] };
        let cmd_buffer = GfxCommandBuffer {
            vk_handle: command_buffer,
            _command_pool_handle: command_pool.handle(),

            #[cfg(debug_assertions)]
            name: debug_name.to_string(),
        };
        Gfx::get().gfx_device().set_debug_name(&cmd_buffer, debug_name);
        cmd_buffer
    }
}
// Basic 命令
impl GfxCommandBuffer {
    /// 开始录制 command
    ///
    /// 自动设置 debug label
    #[inline]
    pub fn begin(&self, usage_flag: vk::CommandBufferUsageFlags, debug_label_name: &str) {
        unsafe {
            Gfx::get()
                .gfx_device()
                .begin_command_buffer(self.vk_handle, &vk::CommandBufferBeginInfo::default().flags(usage_flag))
                .unwrap();
        }
        self.begin_label(debug_label_name, LabelColor::COLOR_CMD);
    }

    /// 结束录制 command
    ///
    /// 结束 debug label
    #[inline]
    pub fn end(&self) {
        self.end_label();
        unsafe { Gfx::get().gfx_device().end_command_buffer(self.vk_handle).unwrap() }
    }
}
// getters
impl GfxCommandBuffer {
    /// getter
    #[inline]
    pub fn vk_handle(&self) -> vk::CommandBuffer {
        self.vk_handle
    }
}
// 数据传输类型
impl GfxCommandBuffer {
    /// - command type: action
    /// - 支持的 queue：graphics
    #[inline]
    pub fn cmd_blit_image(&self, blit_info: &vk::BlitImageInfo2) {
        unsafe { Gfx::get().gfx_device().cmd_blit_image2(self.vk_handle, blit_info) }
    }

    /// - command type: action
    /// - 支持的 queue：graphics, compute
    #[inline]
    pub fn cmd_clear_color_image(
        &self,
        image: vk::Image,
        layout: vk::ImageLayout,
        clear_color: &vk::ClearColorValue,
        ranges: &[vk::ImageSubresourceRange],
    ) {
        unsafe {
            Gfx::get().gfx_device().cmd_clear_color_image(self.vk_handle, image, layout, clear_color, ranges);
        }
    }

    /// - command type: state
    /// - 支持的 queue: graphics, compute
    #[inline]
    pub fn cmd_push_constants(
        &self,
        pipeline_layout: vk::PipelineLayout,
        stage: vk::ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) {
        unsafe {
            Gfx::get().gfx_device().cmd_push_constants(self.vk_handle, pipeline_layout, stage, offset, data);
        }
    }
}
// 绘制类型的命令
impl GfxCommandBuffer {
    /// - command type: action, state
    /// - supported queue types: graphics
    #[inline]
    pub fn cmd_begin_rendering(&self, render_info: &vk::RenderingInfo) {
        unsafe {
            Gfx::get().gfx_device().dynamic_rendering.cmd_begin_rendering(self.vk_handle, render_info);
        }
    }

    /// - command type: action, state
    /// - supported queue types: graphics
    #[inline]
    pub fn end_rendering(&self) {
        unsafe {
            Gfx::get().gfx_device().dynamic_rendering.cmd_end_rendering(self.vk_handle);
        }
    }

    /// - command type: action
    /// - supported queue types: graphics
    ///
    /// 不使用 index buffer 的绘制
    #[inline]
    pub fn cmd_draw(&self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        unsafe {
            Gfx::get().gfx_device().cmd_draw(
                self.vk_handle,
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            );
        }
    }

    /// - command type: state
    /// - supported queue types: graphics, compute
    #[inline]
    pub fn cmd_bind_pipeline(&self, bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline) {
        unsafe {
            Gfx::get().gfx_device().cmd_bind_pipeline(self.vk_handle, bind_point, pipeline);
        }
    }

    /// 无需事先分配 descriptor set，直接将 descriptor 写入 command buffer
    /// - command type: state
    /// - supported queue types: graphics, compute
    #[inline]
    pub fn cmd_push_descriptor_set(
        &self,
        bind_point: vk::PipelineBindPoint,
        pipeline_layout: vk::PipelineLayout,
        set: u32,
        writes: &[vk::WriteDescriptorSet],
    ) {
        unsafe {
            Gfx::get().gfx_device().push_descriptor.cmd_push_descriptor_set(
                self.vk_handle,
                bind_point,
                pipeline_layout,
                set,
                writes,
            );
        }
    }

    /// - command type: state
    /// - supported queue types: graphics
    #[inline]
    pub fn cmd_set_viewport(&self, first_viewport: u32, viewports: &[vk::Viewport]) {
        unsafe {
            Gfx::get().gfx_device().cmd_set_viewport(self.vk_handle, first_viewport, viewports);
        }
    }

    /// - command type: state
    /// - supported queue types: graphics
    #[inline]
    pub fn cmd_set_scissor(&self, first_scissor: u32, scissors: &[vk::Rect2D]) {
        unsafe {
            Gfx::get().gfx_device().cmd_set_scissor(self.vk_handle, first_scissor, scissors);
        }
    }
}
// 计算着色器相关命令
impl GfxCommandBuffer {
    #[inline]
    pub fn cmd_dispatch(&self, group_cnt: glam::UVec3) {
        unsafe {
            Gfx::get().gfx_device().cmd_dispatch(self.vk_handle, group_cnt.x, group_cnt.y, group_cnt.z);
        }
    }
}
// 同步相关命令
impl GfxCommandBuffer {
    /// - command type: synchronize
    /// - supported queue types: graphics, compute, transfer
    #[inline]
    pub fn image_memory_barrier(&self, dependency_flags: vk::DependencyFlags, barriers: &[GfxImageBarrier]) {
        let barriers = barriers.iter().map(|b| *b.inner()).collect_vec();
        let dependency_info =
            vk::DependencyInfo::default().image_memory_barriers(&barriers).dependency_flags(dependency_flags);
        unsafe {
            Gfx::get().gfx_device().cmd_pipeline_barrier2(self.vk_handle, &dependency_info);
        }
    }
}
// debug 相关命令
impl GfxCommandBuffer {
    /// - command type: state, action
    /// - supported queue type: graphics, compute
    #[inline]
    pub fn begin_label(&self, label_name: &str, label_color: glam::Vec4) {
        let name = std::ffi::CString::new(label_name).unwrap();
        unsafe {
            Gfx::get().gfx_device().debug_utils.cmd_begin_debug_utils_label(
                self.vk_handle,
                &vk::DebugUtilsLabelEXT::default().label_name(name.as_c_str()).color(label_color.into()),
            );
        }
    }

    /// - command type: state, action
    /// - supported queue type: graphics, compute
    #[inline]
    pub fn end_label(&self) {
        unsafe {
            Gfx::get().gfx_device().debug_utils.cmd_end_debug_utils_label(self.vk_handle);
        }
    }

    /// - command type: action
    /// - supported queue type: graphics, compute
    #[inline]
    pub fn insert_label(&self, label_name: &str, label_color: glam::Vec4) {
        let name = std::ffi::CString::new(label_name).unwrap();
        unsafe {
            Gfx::get().gfx_device().debug_utils.cmd_insert_debug_utils_label(
                self.vk_handle,
                &vk::DebugUtilsLabelEXT::default().label_name(name.as_c_str()).color(label_color.into()),
            );
        }
    }
}
impl DebugType for GfxCommandBuffer {
    fn debug_type_name() -> &'static str {
        "GfxCommandBuffer"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.vk_handle
    }
}
