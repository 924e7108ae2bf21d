use crate::foundation::debug_messenger::DebugType;
use crate::gfx::Gfx;
use ash::vk;

pub struct GfxSurface {
    pub(crate) handle: vk::SurfaceKHR,
    pub(crate) pf: ash::khr::surface::Instance,
}

impl GfxSurface {
    pub fn new(
        raw_display_handle: raw_window_handle::RawDisplayHandle,
        raw_window_handle: raw_window_handle::RawWindowHandle,
    ) -> Self {
        let gfx_core = &Gfx::get().gfx_core;
        let surface_pf = ash::khr::surface::Instance::new(&gfx_core.vk_entry, &gfx_core.instance.ash_instance);

        let surface = unsafe {
            ash_window::create_surface(
                &gfx_core.vk_entry,
                &gfx_core.instance.ash_instance,
                raw_display_handle,
                raw_window_handle,
                None,
            )
            .unwrap()
        };

        let surface = GfxSurface {
            handle: surface,
            pf: surface_pf,
        };
        gfx_core.gfx_device.set_debug_name(&surface, "main");

        surface
    }
}

// getters
impl GfxSurface {
    pub fn get_capabilities(&self) -> vk::SurfaceCapabilitiesKHR {
        unsafe {
            self.pf
                .get_physical_device_surface_capabilities(Gfx::get().gfx_core.physical_device.vk_handle, self.handle)
                .unwrap()
        }
    }

    pub fn get_formats(&self) -> Vec<vk::SurfaceFormatKHR> {
        unsafe {
            self.pf
                .get_physical_device_surface_formats(Gfx::get().gfx_core.physical_device.vk_handle, self.handle)
                .unwrap()
        }
    }

    /// 优先选择 UNORM 格式，bloom 的亮度运算在线性空间中进行
    pub fn choose_format(&self) -> vk::SurfaceFormatKHR {
        let formats = self.get_formats();
        formats
            .iter()
            .find(|f| {
                (f.format == vk::Format::B8G8R8A8_UNORM || f.format == vk::Format::R8G8B8A8_UNORM)
                    && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
            })
            .copied()
            .unwrap_or(formats[0])
    }
}

impl Drop for GfxSurface {
    fn drop(&mut self) {
        unsafe { self.pf.destroy_surface(self.handle, None) }
    }
}

impl DebugType for GfxSurface {
    fn debug_type_name() -> &'static str {
        "GfxSurface"
    }
    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}
