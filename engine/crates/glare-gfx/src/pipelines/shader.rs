use std::collections::HashMap;
use std::ffi::CStr;

use ash::vk;

use crate::{foundation::debug_messenger::DebugType, gfx::Gfx};

/// # Destroy
///
/// 需要手动调用 `destroy` 方法来释放资源。
pub struct ShaderModule {
    handle: vk::ShaderModule,

    #[cfg(debug_assertions)]
    destroyed: bool,
}
impl ShaderModule {
    /// # param
    /// * path - spv shader 文件路径
    pub fn new(path: &std::path::Path) -> Self {
        let gfx_device = Gfx::get().gfx_device();
        let mut file = std::fs::File::open(path).unwrap();
        let shader_code = ash::util::read_spv(&mut file).unwrap();

        let shader_module_info = vk::ShaderModuleCreateInfo::default().code(&shader_code);

        unsafe {
            let shader_module = gfx_device.create_shader_module(&shader_module_info, None).unwrap();
            let shader_module = Self {
                handle: shader_module,

                #[cfg(debug_assertions)]
                destroyed: false,
            };
            gfx_device.set_debug_name(&shader_module, path.to_str().unwrap());
            shader_module
        }
    }

    #[inline]
    pub fn handle(&self) -> vk::ShaderModule {
        self.handle
    }

    #[inline]
    pub fn destroy(mut self) {
        let gfx_device = Gfx::get().gfx_device();
        unsafe {
            gfx_device.destroy_shader_module(self.handle, None);
        }
        #[cfg(debug_assertions)]
        {
            self.destroyed = true;
        }
    }
}
impl Drop for ShaderModule {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        debug_assert!(self.destroyed, "ShaderModule must be destroyed manually before drop.");
    }
}
impl DebugType for ShaderModule {
    fn debug_type_name() -> &'static str {
        "GfxShaderModule"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}

/// 可以存放多个 ShaderModule，使用路径进行索引
pub struct ShaderModuleCache {
    shader_modules: HashMap<String, ShaderModule>,
    #[cfg(debug_assertions)]
    destroyed: bool,
}
impl Default for ShaderModuleCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderModuleCache {
    pub fn new() -> Self {
        Self {
            shader_modules: HashMap::new(),
            #[cfg(debug_assertions)]
            destroyed: false,
        }
    }

    pub fn get_or_load(&mut self, path: &std::path::Path) -> &ShaderModule {
        let path_str = path.to_str().unwrap().to_string();
        self.shader_modules.entry(path_str).or_insert_with(|| ShaderModule::new(path))
    }

    pub fn destroy(mut self) {
        #[cfg(debug_assertions)]
        {
            self.destroyed = true;
        }

        // 使用 std::mem::take 来 move 出 HashMap，留下一个空的 HashMap
        let shader_modules = std::mem::take(&mut self.shader_modules);
        shader_modules.into_values().for_each(|module| module.destroy());
    }
}
impl Drop for ShaderModuleCache {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        debug_assert!(self.destroyed, "ShaderModuleCache must be destroyed manually before drop.");
    }
}

/// specialization constant 的封装
///
/// 同一份 spv 可以通过不同的常量组合编译出多个 pipeline 变体
#[derive(Clone, Default)]
pub struct GfxSpecialization {
    entries: Vec<vk::SpecializationMapEntry>,
    data: Vec<u8>,
}
impl GfxSpecialization {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// builder
    pub fn constant_u32(mut self, constant_id: u32, value: u32) -> Self {
        self.entries.push(vk::SpecializationMapEntry {
            constant_id,
            offset: self.data.len() as u32,
            size: size_of::<u32>(),
        });
        self.data.extend_from_slice(&value.to_ne_bytes());
        self
    }

    /// builder
    pub fn constant_f32(mut self, constant_id: u32, value: f32) -> Self {
        self.entries.push(vk::SpecializationMapEntry {
            constant_id,
            offset: self.data.len() as u32,
            size: size_of::<f32>(),
        });
        self.data.extend_from_slice(&value.to_ne_bytes());
        self
    }

    /// 返回的 info 借用了 self 的数据，self 需要存活到 pipeline 创建完成
    #[inline]
    pub fn info(&self) -> vk::SpecializationInfo<'_> {
        vk::SpecializationInfo::default().map_entries(&self.entries).data(&self.data)
    }
}

#[derive(Clone)]
pub struct ShaderStageInfo {
    pub stage: vk::ShaderStageFlags,
    pub entry_point: &'static CStr,
    pub path: String,
    pub specialization: Option<GfxSpecialization>,
}
impl ShaderStageInfo {
    #[inline]
    pub fn path(&self) -> &std::path::Path {
        std::path::Path::new(self.path.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specialization_entries_are_packed() {
        let spec = GfxSpecialization::new().constant_u32(0, 25).constant_f32(1, 0.5);

        assert_eq!(spec.entries.len(), 2);
        assert_eq!(spec.entries[0].offset, 0);
        assert_eq!(spec.entries[1].offset, 4);
        assert_eq!(spec.data.len(), 8);
        assert_eq!(&spec.data[0..4], &25u32.to_ne_bytes());
        assert_eq!(&spec.data[4..8], &0.5f32.to_ne_bytes());
    }
}
