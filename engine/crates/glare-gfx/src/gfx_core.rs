use ash::vk;
use std::ffi::CStr;
use std::rc::Rc;

use crate::{
    commands::command_queue::GfxCommandQueue,
    foundation::{
        debug_messenger::GfxDebugMsger, device::GfxDevice, instance::GfxInstance, physical_device::GfxPhysicalDevice,
    },
};

pub struct GfxCore {
    /// vk 基础函数的接口
    ///
    /// 在 drop 之后，会卸载 dll，因此需要确保该字段最后 drop
    pub(crate) vk_entry: ash::Entry,

    pub(crate) instance: GfxInstance,
    pub(crate) physical_device: GfxPhysicalDevice,

    /// Vulkan 设备函数指针集合
    ///
    /// 多个组件需要共享相同的设备函数指针（GfxCommandQueue、GfxCommandBuffer 等），
    /// 函数指针本身很轻量，共享比传递更高效
    pub(crate) gfx_device: Rc<GfxDevice>,

    pub(crate) debug_utils: GfxDebugMsger,

    /// 同一个 queue family 中申请出来的 queue，最多两个
    ///
    /// 两个 queue 用于逐帧交替提交，让 fragment 和 compute 的工作错开
    pub(crate) gfx_queues: Vec<GfxCommandQueue>,
}

// 创建与销毁
impl GfxCore {
    pub fn new(app_name: String, engine_name: String, instance_extra_exts: Vec<&'static CStr>) -> Self {
        let vk_pf = unsafe { ash::Entry::load() }.expect("Failed to load vulkan entry");
        let instance = GfxInstance::new(&vk_pf, app_name, engine_name, instance_extra_exts);
        let physical_device = GfxPhysicalDevice::new_descrete_physical_device(instance.ash_instance());

        // 尽量从全能 queue family 中拿到两个 queue，用于逐帧交替提交
        // barrier 只在所属的 queue 内生效，交替提交可以避免 fragment 和 compute 之间的气泡
        let queue_count = u32::min(2, physical_device.gfx_queue_family.queue_count);
        let queue_priorities = vec![1.0_f32; queue_count as usize];
        let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(physical_device.gfx_queue_family.queue_family_index)
            .queue_priorities(&queue_priorities)];

        let device = Rc::new(GfxDevice::new(instance.ash_instance(), physical_device.vk_handle, &queue_create_infos));

        let gfx_queues = (0..queue_count)
            .map(|queue_idx| GfxCommandQueue {
                vk_queue: unsafe {
                    device.get_device_queue(physical_device.gfx_queue_family.queue_family_index, queue_idx)
                },
                queue_family: physical_device.gfx_queue_family.clone(),
                gfx_device: device.clone(),
            })
            .collect::<Vec<_>>();

        let debug_utils = GfxDebugMsger::new(&vk_pf, instance.ash_instance());

        log::info!("gfx queue family ({} queues):\n{:#?}", gfx_queues.len(), physical_device.gfx_queue_family);

        // 在 device 以及 debug_utils 之前创建的 vk::Handle
        {
            device.set_object_debug_name(instance.vk_instance(), "GfxInstance");
            device.set_object_debug_name(physical_device.vk_handle, "GfxPhysicalDevice");

            device.set_object_debug_name(device.vk_handle(), "GfxDevice");
            for (idx, queue) in gfx_queues.iter().enumerate() {
                device.set_object_debug_name(queue.vk_queue, format!("GfxCommandQueue-gfx-{}", idx));
            }
        }

        Self {
            vk_entry: vk_pf,
            instance,
            physical_device,
            gfx_device: device,
            debug_utils,
            gfx_queues,
        }
    }

    pub fn destroy(self) {
        self.debug_utils.destroy();
        self.gfx_device.destroy();
        self.physical_device.destroy();
        self.instance.destroy();
    }
}
