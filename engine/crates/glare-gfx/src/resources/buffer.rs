use ash::vk;
use std::ptr;

use vk_mem::Alloc;

use crate::{foundation::debug_messenger::DebugType, gfx::Gfx};

pub struct GfxBuffer {
    handle: vk::Buffer,
    allocation: vk_mem::Allocation,

    size: vk::DeviceSize,

    /// 在初始化阶段写死
    map_ptr: Option<*mut u8>,

    _debug_name: String,

    _usage: vk::BufferUsageFlags,
}
impl DebugType for GfxBuffer {
    fn debug_type_name() -> &'static str {
        "GfxBuffer"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}
impl Drop for GfxBuffer {
    fn drop(&mut self) {
        let allocator = Gfx::get().allocator();
        unsafe {
            if self.map_ptr.is_some() {
                allocator.unmap_memory(&mut self.allocation);
            }

            allocator.destroy_buffer(self.handle, &mut self.allocation);
        }
    }
}
// init & destroy
impl GfxBuffer {
    /// - align: 当 buffer 处于一个大的 memory block 中时，align 用来指定 buffer 的起始 offset,
    ///   其实地址的内存对齐，默认对齐到 8 字节
    /// - 优先使用 device memory
    pub fn new(
        buffer_size: vk::DeviceSize,
        buffer_usage: vk::BufferUsageFlags,
        align: Option<vk::DeviceSize>,
        mem_map: bool,
        name: impl AsRef<str>,
    ) -> Self {
        let buffer_ci = vk::BufferCreateInfo::default().size(buffer_size).usage(buffer_usage);
        let alloc_ci = vk_mem::AllocationCreateInfo {
            usage: vk_mem::MemoryUsage::AutoPreferDevice,
            flags: if mem_map {
                vk_mem::AllocationCreateFlags::HOST_ACCESS_RANDOM
            } else {
                vk_mem::AllocationCreateFlags::empty()
            },
            ..Default::default()
        };

        let align = align.unwrap_or(8);
        let (buffer, mut alloc) =
            unsafe { Gfx::get().vm_allocator.create_buffer_with_alignment(&buffer_ci, &alloc_ci, align).unwrap() };

        let mut mapped_ptr = None;
        if mem_map {
            unsafe {
                let allocator = Gfx::get().allocator();
                mapped_ptr = Some(allocator.map_memory(&mut alloc).unwrap());
            }
        }

        Gfx::get().gfx_device().set_object_debug_name(buffer, format!("Buffer::{}", name.as_ref()));
        Self {
            handle: buffer,
            allocation: alloc,
            size: buffer_size,
            map_ptr: mapped_ptr,

            _debug_name: name.as_ref().to_string(),

            _usage: buffer_usage,
        }
    }

    /// host mapped 的 uniform buffer，按照 min_ubo_offset_align 对齐
    #[inline]
    pub fn new_uniform(size: vk::DeviceSize, debug_name: impl AsRef<str>) -> Self {
        Self::new(
            size,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            Some(Gfx::get().min_ubo_offset_align()),
            true,
            debug_name,
        )
    }
}
// destroy
impl GfxBuffer {
    #[inline]
    pub fn destroy(self) {
        drop(self)
    }
}
// getter
impl GfxBuffer {
    #[inline]
    pub fn vk_buffer(&self) -> vk::Buffer {
        self.handle
    }

    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}
// tools
impl GfxBuffer {
    #[inline]
    pub fn mapped_ptr(&self) -> *mut u8 {
        self.map_ptr.expect("Buffer is not mapped, please call map() before using mapped_ptr()")
    }

    #[inline]
    pub fn flush(&self, offset: vk::DeviceSize, size: vk::DeviceSize) {
        let allocator = Gfx::get().allocator();
        allocator.flush_allocation(&self.allocation, offset, size).unwrap();
    }

    /// 通过 mem map 的方式将 data 传入到 buffer 中
    pub fn transfer_data_by_mmap<T>(&self, data: &[T])
    where
        T: Sized + Copy,
    {
        unsafe {
            ptr::copy_nonoverlapping(data.as_ptr() as *const u8, self.mapped_ptr(), size_of_val(data));

            let allocator = Gfx::get().allocator();
            allocator.flush_allocation(&self.allocation, 0, size_of_val(data) as vk::DeviceSize).unwrap();
        }
    }

    /// 通过 mem map 的方式写入 buffer 中的某一段，offset 需要调用方保证对齐
    pub fn transfer_region_by_mmap<T>(&self, offset: vk::DeviceSize, data: &[T])
    where
        T: Sized + Copy,
    {
        unsafe {
            ptr::copy_nonoverlapping(
                data.as_ptr() as *const u8,
                self.mapped_ptr().add(offset as usize),
                size_of_val(data),
            );

            let allocator = Gfx::get().allocator();
            allocator.flush_allocation(&self.allocation, offset, size_of_val(data) as vk::DeviceSize).unwrap();
        }
    }
}
