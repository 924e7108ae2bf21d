use std::ffi::CStr;

use ash::vk;
use itertools::Itertools;

use crate::{commands::command_queue::GfxQueueFamily, foundation::debug_messenger::DebugType};

/// 表示一张物理显卡
pub struct GfxPhysicalDevice {
    pub(crate) vk_handle: vk::PhysicalDevice,

    /// 当前 gpu 支持的 features
    pub(crate) _features: vk::PhysicalDeviceFeatures,

    /// 当前 gpu 支持的 device extensions
    pub(crate) _device_extensions: Vec<vk::ExtensionProperties>,

    /// 当前 gpu 的基础属性
    pub(crate) basic_props: vk::PhysicalDeviceProperties,

    pub(crate) _mem_props: vk::PhysicalDeviceMemoryProperties,

    /// 全能 queue family：graphics + compute + transfer
    pub(crate) gfx_queue_family: GfxQueueFamily,
}

impl GfxPhysicalDevice {
    /// 创建一个新的物理显卡实例
    ///
    /// 优先选择独立显卡，如果没有则选择第一个可用的显卡
    pub fn new_descrete_physical_device(instance: &ash::Instance) -> Self {
        unsafe {
            instance
                .enumerate_physical_devices()
                .unwrap()
                .iter()
                .map(|pdevice| GfxPhysicalDevice::new(*pdevice, instance))
                // 优先使用独立显卡
                .find_or_first(GfxPhysicalDevice::is_descrete_gpu)
                .unwrap()
        }
    }

    fn new(pdevice: vk::PhysicalDevice, instance: &ash::Instance) -> Self {
        unsafe {
            let basic_props = instance.get_physical_device_properties(pdevice);
            let physical_device_name = CStr::from_ptr(basic_props.device_name.as_ptr());
            log::info!("found gpu: {:?}", physical_device_name);

            // 找到当前 gpu 支持的 extensions
            let device_extensions = instance.enumerate_device_extension_properties(pdevice).unwrap();

            // 找到所有的队列信息并打印出来
            let queue_familiy_props = instance.get_physical_device_queue_family_properties(pdevice);
            log::info!("physical device: queue family props:\n{:#?}", queue_familiy_props);

            // 找到符合条件的 queue family
            let find_queue_family = |name: String, include_flags: vk::QueueFlags| {
                queue_familiy_props
                    .iter()
                    .enumerate()
                    .find(|(_, props)| props.queue_flags.contains(include_flags))
                    .map(|(family_idx, props)| GfxQueueFamily {
                        name,
                        queue_family_index: family_idx as u32,
                        queue_flags: props.queue_flags,
                        queue_count: props.queue_count,
                    })
            };

            // 全能的 Queue：graphics, compute, transfer
            let gfx_queue_family = find_queue_family(
                "gfx".to_string(),
                vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
            )
            .unwrap();

            Self {
                _mem_props: instance.get_physical_device_memory_properties(pdevice),
                _features: instance.get_physical_device_features(pdevice),
                vk_handle: pdevice,
                basic_props,
                gfx_queue_family,
                _device_extensions: device_extensions,
            }
        }
    }

    pub fn destroy(self) {
        // 无需销毁
    }

    #[inline]
    /// 当前 gpu 是否是独立显卡
    pub fn is_descrete_gpu(&self) -> bool {
        self.basic_props.device_type == vk::PhysicalDeviceType::DISCRETE_GPU
    }

    /// 全能 queue family 是否能提供两个独立的 queue
    #[inline]
    pub fn supports_dual_queue(&self) -> bool {
        self.gfx_queue_family.queue_count >= 2
    }
}

impl DebugType for GfxPhysicalDevice {
    fn debug_type_name() -> &'static str {
        "GfxPhysicalDevice"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.vk_handle
    }
}
