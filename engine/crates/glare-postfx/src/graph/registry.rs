use ash::vk;
use glare_gfx::resources::image::{GfxImage, GfxImageCreateInfo};
use glare_gfx::resources::image_view::{GfxImageView, GfxImageViewDesc};
use slotmap::SlotMap;

use crate::graph::handle::FxImageHandle;
use crate::graph::state::FxImageState;

struct FxImageEntry {
    image: GfxImage,
    view: GfxImageView,
    state: FxImageState,
}

/// 帧内所有 image 的集中存放处
///
/// pass 之间只传递 [`FxImageHandle`]，实际的 image/view 以及
/// 最近一次使用的状态都记录在这里
#[derive(Default)]
pub struct FxImageRegistry {
    images: SlotMap<FxImageHandle, FxImageEntry>,
}

// new & init
impl FxImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建一个 device local 的 2D image 并注册
    pub fn register_image(
        &mut self,
        extent: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        name: &str,
    ) -> FxImageHandle {
        let image_info = GfxImageCreateInfo::new_image_2d_info(extent, format, usage);
        let alloc_info = vk_mem::AllocationCreateInfo {
            usage: vk_mem::MemoryUsage::AutoPreferDevice,
            ..Default::default()
        };
        let image = GfxImage::new(&image_info, &alloc_info, name);
        let view =
            GfxImageView::new(image.handle(), GfxImageViewDesc::new_2d(format, vk::ImageAspectFlags::COLOR), name);

        self.images.insert(FxImageEntry {
            image,
            view,
            state: FxImageState::UNDEFINED,
        })
    }

    /// 注册一个外部 image（swapchain image），不接管其内存
    pub fn register_external(
        &mut self,
        image: vk::Image,
        extent: vk::Extent2D,
        format: vk::Format,
        name: &str,
    ) -> FxImageHandle {
        let image = GfxImage::from_external(image, extent, format, vk::ImageUsageFlags::COLOR_ATTACHMENT, name);
        let view =
            GfxImageView::new(image.handle(), GfxImageViewDesc::new_2d(format, vk::ImageAspectFlags::COLOR), name);

        self.images.insert(FxImageEntry { image, view, state: FxImageState::UNDEFINED })
    }
}

// getters
impl FxImageRegistry {
    #[inline]
    pub fn vk_image(&self, handle: FxImageHandle) -> vk::Image {
        self.images[handle].image.handle()
    }

    #[inline]
    pub fn vk_view(&self, handle: FxImageHandle) -> vk::ImageView {
        self.images[handle].view.handle()
    }

    #[inline]
    pub fn extent(&self, handle: FxImageHandle) -> vk::Extent2D {
        self.images[handle].image.extent_2d()
    }

    #[inline]
    pub fn current_state(&self, handle: FxImageHandle) -> FxImageState {
        self.images[handle].state
    }

    /// 记录一次访问；同 layout 的连续只读访问会合并进当前状态
    #[inline]
    pub fn set_state(&mut self, handle: FxImageHandle, state: FxImageState) {
        let entry = &mut self.images[handle];
        entry.state = FxImageState::after_access(entry.state, state);
    }
}

// tools
impl FxImageRegistry {
    /// 开始录制一份 command buffer 前调用
    ///
    /// 所有 image 的状态重置为 UNDEFINED，首次使用是 discard write，
    /// 录制出来的 command buffer 重放任意次都成立
    pub fn begin_recording(&mut self) {
        for entry in self.images.values_mut() {
            entry.state = FxImageState::UNDEFINED;
        }
    }
}

// destroy
impl FxImageRegistry {
    pub fn destroy(mut self) {
        for (_, entry) in self.images.drain() {
            entry.view.destroy();
            entry.image.destroy();
        }
    }
}
