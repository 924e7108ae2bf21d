use ash::vk;

use crate::{foundation::debug_messenger::DebugType, gfx::Gfx};

/// 描述符集布局
///
/// 全部 layout 都带有 PUSH_DESCRIPTOR 标记，
/// 录制时通过 vkCmdPushDescriptorSetKHR 直接写入，无需 descriptor pool
pub struct GfxDescriptorSetLayout {
    layout: vk::DescriptorSetLayout,
}
// new & init
impl GfxDescriptorSetLayout {
    pub fn new(bindings: &[vk::DescriptorSetLayoutBinding], debug_name: impl AsRef<str>) -> Self {
        let create_info = vk::DescriptorSetLayoutCreateInfo::default()
            .flags(vk::DescriptorSetLayoutCreateFlags::PUSH_DESCRIPTOR_KHR)
            .bindings(bindings);

        let gfx_device = Gfx::get().gfx_device();
        let layout = unsafe { gfx_device.create_descriptor_set_layout(&create_info, None).unwrap() };
        let layout = Self { layout };
        gfx_device.set_debug_name(&layout, debug_name);
        layout
    }

    #[inline]
    pub fn destroy(self) {
        // drop
    }
}
// getters
impl GfxDescriptorSetLayout {
    #[inline]
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}
impl Drop for GfxDescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            Gfx::get().gfx_device().destroy_descriptor_set_layout(self.layout, None);
        }
    }
}
impl DebugType for GfxDescriptorSetLayout {
    fn debug_type_name() -> &'static str {
        "GfxDescriptorSetLayout"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.layout
    }
}

/// binding 构造的快捷方式
pub struct GfxDescriptorBinding;
impl GfxDescriptorBinding {
    #[inline]
    pub fn combined_image_sampler(binding: u32, stage: vk::ShaderStageFlags) -> vk::DescriptorSetLayoutBinding<'static> {
        vk::DescriptorSetLayoutBinding {
            binding,
            descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: 1,
            stage_flags: stage,
            ..Default::default()
        }
    }

    #[inline]
    pub fn storage_image(binding: u32, stage: vk::ShaderStageFlags) -> vk::DescriptorSetLayoutBinding<'static> {
        vk::DescriptorSetLayoutBinding {
            binding,
            descriptor_type: vk::DescriptorType::STORAGE_IMAGE,
            descriptor_count: 1,
            stage_flags: stage,
            ..Default::default()
        }
    }

    #[inline]
    pub fn uniform_buffer(binding: u32, stage: vk::ShaderStageFlags) -> vk::DescriptorSetLayoutBinding<'static> {
        vk::DescriptorSetLayoutBinding {
            binding,
            descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: 1,
            stage_flags: stage,
            ..Default::default()
        }
    }
}
