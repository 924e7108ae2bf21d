//! winit 事件循环与渲染驱动
//!
//! window 创建之后才初始化 swapchain 与后处理管线；
//! resize 或 swapchain 过期时整体重建（后处理的中间图依赖窗口分辨率）。

use std::ffi::CStr;

use ash::vk;
use glare_gfx::gfx::Gfx;
use glare_gfx::swapchain::render_swapchain::GfxRenderSwapchain;
use glare_postfx::config::BloomConfig;
use glare_postfx::pipeline::PostFxPipeline;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, StartCause, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

fn panic_handler(info: &std::panic::PanicHookInfo) {
    log::error!("{}", info);
}

const WINDOW_TITLE_PREFIX: &str = "Glare PostFX";

pub struct WinitApp {
    initial_config: BloomConfig,

    window: Option<Window>,
    swapchain: Option<GfxRenderSwapchain>,
    postfx: Option<PostFxPipeline>,

    frame_index: u64,
}

// 总的 main 函数
impl WinitApp {
    /// 整个程序的入口
    pub fn run(config: BloomConfig) {
        std::panic::set_hook(Box::new(panic_handler));

        let event_loop = winit::event_loop::EventLoop::new().unwrap();

        // window system 需要的 instance extension，在 windows 下也就是 khr::Surface
        let extra_instance_ext = ash_window::enumerate_required_extensions(
            event_loop.display_handle().unwrap().as_raw(),
        )
        .unwrap()
        .iter()
        .map(|ext| unsafe { CStr::from_ptr(*ext) })
        .collect();
        Gfx::init("GlarePostFx".to_string(), extra_instance_ext);

        let mut app = Self {
            initial_config: config,
            window: None,
            swapchain: None,
            postfx: None,
            frame_index: 0,
        };
        event_loop.run_app(&mut app).unwrap();

        log::info!("end run.");

        app.destroy();
    }
}

// new & init
impl WinitApp {
    /// 在 window 创建之后调用，初始化 swapchain 和后处理管线
    fn init_after_window(&mut self, event_loop: &ActiveEventLoop) {
        let window_attr = Window::default_attributes()
            .with_title(WINDOW_TITLE_PREFIX.to_string())
            .with_inner_size(winit::dpi::LogicalSize::new(1200.0, 800.0));
        let window = event_loop.create_window(window_attr).unwrap();

        let swapchain = Self::create_swapchain(&window);
        let postfx = PostFxPipeline::new(&swapchain, self.initial_config);

        self.window = Some(window);
        self.swapchain = Some(swapchain);
        self.postfx = Some(postfx);
        self.refresh_title();
    }

    fn create_swapchain(window: &Window) -> GfxRenderSwapchain {
        let size = window.inner_size();
        GfxRenderSwapchain::new(
            window.display_handle().unwrap().as_raw(),
            window.window_handle().unwrap().as_raw(),
            vk::PresentModeKHR::FIFO,
            vk::Extent2D {
                width: size.width,
                height: size.height,
            },
        )
    }
}

// update
impl WinitApp {
    fn render(&mut self) {
        let (Some(swapchain), Some(postfx)) = (self.swapchain.as_mut(), self.postfx.as_mut()) else {
            return;
        };

        if postfx.render_frame(swapchain, self.frame_index) {
            self.rebuild_swapchain();
        }
        self.frame_index += 1;
    }

    /// swapchain 过期或窗口 resize 后整体重建
    fn rebuild_swapchain(&mut self) {
        let window = self.window.as_ref().unwrap();
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return;
        }
        log::info!("rebuild swapchain: {}x{}", size.width, size.height);

        // 中间图的分辨率跟随窗口，管线随 swapchain 一起重建
        let postfx = self.postfx.take().unwrap();
        let config = postfx.config();
        postfx.destroy();
        self.swapchain.take().unwrap().destroy();

        let swapchain = Self::create_swapchain(window);
        self.postfx = Some(PostFxPipeline::new(&swapchain, config));
        self.swapchain = Some(swapchain);
    }

    fn on_key_pressed(&mut self, key: KeyCode) {
        let Some(postfx) = self.postfx.as_mut() else {
            return;
        };

        match key {
            KeyCode::ArrowRight => postfx.next_mode(),
            KeyCode::ArrowLeft => postfx.prev_mode(),
            KeyCode::ArrowUp => postfx.next_tier(),
            KeyCode::ArrowDown => postfx.prev_tier(),
            KeyCode::KeyB => postfx.toggle_bloom_only(),
            KeyCode::Space => postfx.toggle_animation(),
            _ => return,
        }
        self.refresh_title();
    }

    /// 窗口标题充当状态栏
    fn refresh_title(&self) {
        let (Some(window), Some(postfx)) = (self.window.as_ref(), self.postfx.as_ref()) else {
            return;
        };
        window.set_title(&format!("{} - {}", WINDOW_TITLE_PREFIX, postfx.status_text()));
        log::info!("{}", postfx.status_text());
    }
}

// destroy
impl WinitApp {
    fn destroy(mut self) {
        if let Some(postfx) = self.postfx.take() {
            postfx.destroy();
        }
        if let Some(swapchain) = self.swapchain.take() {
            swapchain.destroy();
        }
        self.window = None;

        Gfx::destroy();
    }
}

// 各种 winit 的事件处理
impl ApplicationHandler for WinitApp {
    fn new_events(&mut self, _event_loop: &ActiveEventLoop, _cause: StartCause) {}

    // 建议在这里创建 window 和渲染资源
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        assert!(self.window.is_none(), "window should be None when resumed.");

        log::info!("winit event: resumed");

        self.init_after_window(event_loop);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                Gfx::get().wait_idle();
                event_loop.exit();
            }
            WindowEvent::Resized(_) => {
                self.rebuild_swapchain();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                self.on_key_pressed(key);
            }
            WindowEvent::RedrawRequested => {
                self.render();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        log::warn!("winit event: suspended");
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        log::info!("loop exiting");
    }
}
