use std::ffi::CStr;

use ash::vk;

use crate::gfx_core::GfxCore;
use crate::{
    commands::{command_queue::GfxCommandQueue, command_queue::GfxQueueFamily},
    foundation::{
        device::GfxDevice, instance::GfxInstance, mem_allocator::GfxMemAllocator, physical_device::GfxPhysicalDevice,
    },
};

/// Vulkan 图形上下文单例
///
/// 管理所有 Vulkan 核心资源，包括实例、设备、队列、内存分配器等。
/// 采用单例模式简化参数传递和生命周期管理，仅适用于单线程环境。
///
/// # 初始化流程
/// ```ignore
/// Gfx::init("MyApp".to_string(), extra_extensions);
/// let device = Gfx::get().gfx_device();
/// // 使用...
/// Gfx::destroy();
/// ```
pub struct Gfx {
    pub(crate) gfx_core: GfxCore,
    pub(crate) vm_allocator: GfxMemAllocator,
}

// 创建与销毁
impl Gfx {
    const ENGINE_NAME: &'static str = "Glare";

    fn new(app_name: String, instance_extra_exts: Vec<&'static CStr>) -> Self {
        let gfx_core = GfxCore::new(app_name, Self::ENGINE_NAME.to_string(), instance_extra_exts);

        let allocator = GfxMemAllocator::new(
            gfx_core.instance.ash_instance(),
            gfx_core.physical_device.vk_handle,
            &gfx_core.gfx_device,
        );

        Self {
            gfx_core,
            vm_allocator: allocator,
        }
    }
}

// 注意：此静态变量仅用于单线程环境，符合项目要求
static mut G_GFX: Option<Gfx> = None;

// 单例模式
// - Gfx 自身的生命周期管理比较简单，因此适合使用单例模式
// - 让代码变得简单，不再需要考虑复杂的借用规则
// - 其他类的类型签名也会变得更简单
impl Gfx {
    /// 获取单例实例
    ///
    /// # Panics
    /// 如果 Gfx 还未初始化，此方法会 panic
    ///
    /// # Safety
    /// 此方法仅在单线程环境下安全
    #[inline]
    pub fn get() -> &'static Gfx {
        unsafe {
            // 使用 addr_of! 避免直接对 static mut 创建引用，编译器不允许这种行为
            let ptr = std::ptr::addr_of!(G_GFX);
            (*ptr).as_ref().expect("Gfx not initialized. Call Gfx::init() first.")
        }
    }

    /// 初始化 Gfx 单例
    ///
    /// # Parameters
    /// - `app_name`: 应用程序名称
    /// - `instance_extra_exts`: 额外的 Vulkan 实例扩展
    ///
    /// # Panics
    /// 如果 Gfx 已经被初始化，此方法会 panic
    ///
    /// # Safety
    /// 此方法仅在单线程环境下安全
    pub fn init(app_name: String, instance_extra_exts: Vec<&'static CStr>) {
        unsafe {
            // 使用 addr_of_mut! 避免直接对 static mut 创建可变引用
            let ptr = std::ptr::addr_of_mut!(G_GFX);
            assert!((*ptr).is_none(), "Gfx already initialized");
            *ptr = Some(Self::new(app_name, instance_extra_exts));
        }
    }

    /// 销毁 Gfx 单例
    ///
    /// # Safety
    /// 调用此方法后，不应再使用 Gfx::get()
    /// 此方法仅在单线程环境下安全
    pub fn destroy() {
        unsafe {
            // 使用 addr_of_mut! 避免直接对 static mut 创建可变引用
            let ptr = std::ptr::addr_of_mut!(G_GFX);
            let context = (*ptr).take().expect("Gfx not initialized");

            context.vm_allocator.destroy();
            context.gfx_core.destroy();
        }
    }
}

// getter
impl Gfx {
    #[inline]
    pub fn vk_core(&self) -> &GfxCore {
        &self.gfx_core
    }

    #[inline]
    pub fn instance(&self) -> &GfxInstance {
        &self.gfx_core.instance
    }

    #[inline]
    pub fn gfx_device(&self) -> &GfxDevice {
        &self.gfx_core.gfx_device
    }

    #[inline]
    pub fn allocator(&self) -> &GfxMemAllocator {
        &self.vm_allocator
    }

    #[inline]
    pub fn physical_device(&self) -> &GfxPhysicalDevice {
        &self.gfx_core.physical_device
    }

    #[inline]
    pub fn gfx_queue_family(&self) -> GfxQueueFamily {
        self.gfx_core.physical_device.gfx_queue_family.clone()
    }

    /// 实际申请到的 queue 的数量，1 或 2
    #[inline]
    pub fn queue_count(&self) -> usize {
        self.gfx_core.gfx_queues.len()
    }

    #[inline]
    pub fn gfx_queue(&self, queue_idx: usize) -> &GfxCommandQueue {
        &self.gfx_core.gfx_queues[queue_idx]
    }

    /// 当 uniform buffer 的 descriptor 在更新时，其 offset 必须是这个值的整数倍
    ///
    /// 注：这个值一定是 power of 2
    #[inline]
    pub fn min_ubo_offset_align(&self) -> vk::DeviceSize {
        self.gfx_core.physical_device.basic_props.limits.min_uniform_buffer_offset_alignment
    }
}

// tools
impl Gfx {
    /// 检查指定格式是否同时支持 blit src 和 blit dst（optimal tiling）
    pub fn format_supports_blit(&self, format: vk::Format) -> bool {
        let props = unsafe {
            self.instance()
                .ash_instance
                .get_physical_device_format_properties(self.physical_device().vk_handle, format)
        };
        props
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::BLIT_SRC | vk::FormatFeatureFlags::BLIT_DST)
    }

    /// 检查指定格式是否支持 linear filter 采样（optimal tiling）
    pub fn format_supports_linear_filter(&self, format: vk::Format) -> bool {
        let props = unsafe {
            self.instance()
                .ash_instance
                .get_physical_device_format_properties(self.physical_device().vk_handle, format)
        };
        props.optimal_tiling_features.contains(vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR)
    }

    pub fn wait_idle(&self) {
        unsafe {
            self.gfx_device().device_wait_idle().unwrap();
        }
    }
}
