//! bloom 后处理管线的装配与逐帧驱动
//!
//! 持有 image registry、每个 swapchain image 的命令缓冲、参数缓冲与
//! 中间 image、全部算法实例。命令按 swapchain image 录制一次后反复重放，
//! 配置变化只把帧标脏，重录与参数上传发生在该 image 下一次被取得时。
//!
//! 中间 image（offscreen 与 ping-pong 组）逐 swapchain image 独立：
//! 相邻帧会提交到不同 queue，共享中间 image 需要跨 queue 的同步，
//! 各帧各持一组则单条 queue 内的 barrier 就足够。

use std::rc::Rc;

use ash::vk;
use glare_gfx::commands::command_buffer::GfxCommandBuffer;
use glare_gfx::commands::command_pool::GfxCommandPool;
use glare_gfx::commands::fence::GfxFence;
use glare_gfx::commands::semaphore::GfxSemaphore;
use glare_gfx::commands::submit_info::GfxSubmitInfo;
use glare_gfx::descriptors::{GfxDescriptorBinding, GfxDescriptorSetLayout};
use glare_gfx::gfx::Gfx;
use glare_gfx::pipelines::graphics_pipeline::PipelineLayout;
use glare_gfx::resources::buffer::GfxBuffer;
use glare_gfx::sampler::{GfxSampler, GfxSamplerDesc};
use glare_gfx::swapchain::render_swapchain::GfxRenderSwapchain;

use crate::blur::{self, BlurAlgorithms, BlurFrameContext, ComputeKernelParams, KernelParams};
use crate::compose::{self, Composition, MergedUpsample};
use crate::config::{BloomConfig, BLUR_SCALE};
use crate::controller::ReconfigurationController;
use crate::downsample::Downsample;
use crate::executor::FxExecutor;
use crate::frame_state::PerFrameState;
use crate::graph::barrier::BarrierCalculator;
use crate::graph::handle::FxImageHandle;
use crate::graph::pass::FxPassDesc;
use crate::graph::registry::FxImageRegistry;
use crate::graph::state::FxImageState;
use crate::ping_pong::PingPongImages;
use crate::scheduler::QueueScheduler;

/// 全屏三角形的 vertex shader，所有后处理 pass 共用
pub const FULLSCREEN_VERT_SPV: &str = "shaders/fullscreen.vert.spv";

/// 场景渲染替身的清屏颜色，偏亮以便 bloom 可见
const SCENE_CLEAR_COLOR: [f32; 4] = [1.8, 1.4, 0.9, 1.0];

/// 合成时乘到输出上的线性曝光
const SCENE_EXPOSURE: f32 = 0.85;

/// 各 pass 家族共享的 pipeline layout
///
/// descriptor set layout 都带 push descriptor 标记，见 [`GfxDescriptorSetLayout`]
pub struct FxSharedLayouts {
    /// binding 0 采样，binding 1 kernel UBO；fragment Gaussian 使用
    pub fragment_blur: Rc<PipelineLayout>,
    /// 只有 binding 0 采样；downsample / kawase / dual / tent 使用
    pub fragment_simple: Rc<PipelineLayout>,
    /// binding 0 采样，binding 1 storage image，binding 2 kernel UBO
    pub compute_blur: Rc<PipelineLayout>,
    /// binding 0 原图，binding 1 模糊结果
    pub compose: Rc<PipelineLayout>,

    _set_layouts: Vec<GfxDescriptorSetLayout>,
}

// new & init
impl FxSharedLayouts {
    pub fn new() -> Self {
        let frag = vk::ShaderStageFlags::FRAGMENT;
        let comp = vk::ShaderStageFlags::COMPUTE;
        let push_frag = [vk::PushConstantRange {
            stage_flags: frag,
            offset: 0,
            size: 16,
        }];
        let push_comp = [vk::PushConstantRange {
            stage_flags: comp,
            offset: 0,
            size: 16,
        }];

        let simple_set = GfxDescriptorSetLayout::new(&[GfxDescriptorBinding::combined_image_sampler(0, frag)], "fx-sampled");
        let blur_set = GfxDescriptorSetLayout::new(
            &[
                GfxDescriptorBinding::combined_image_sampler(0, frag),
                GfxDescriptorBinding::uniform_buffer(1, frag),
            ],
            "fx-sampled-kernel",
        );
        let compute_set = GfxDescriptorSetLayout::new(
            &[
                GfxDescriptorBinding::combined_image_sampler(0, comp),
                GfxDescriptorBinding::storage_image(1, comp),
                GfxDescriptorBinding::uniform_buffer(2, comp),
            ],
            "fx-compute",
        );
        let compose_set = GfxDescriptorSetLayout::new(
            &[
                GfxDescriptorBinding::combined_image_sampler(0, frag),
                GfxDescriptorBinding::combined_image_sampler(1, frag),
            ],
            "fx-compose",
        );

        Self {
            fragment_simple: Rc::new(PipelineLayout::new(&[simple_set.handle()], &push_frag, "fx-simple")),
            fragment_blur: Rc::new(PipelineLayout::new(&[blur_set.handle()], &push_frag, "fx-blur")),
            compute_blur: Rc::new(PipelineLayout::new(&[compute_set.handle()], &push_comp, "fx-compute")),
            compose: Rc::new(PipelineLayout::new(&[compose_set.handle()], &push_frag, "fx-compose")),
            _set_layouts: vec![simple_set, blur_set, compute_set, compose_set],
        }
    }
}

impl Default for FxSharedLayouts {
    fn default() -> Self {
        Self::new()
    }
}

/// 单个 swapchain image 对应的 GPU 资源
///
/// offscreen 与 ping-pong 组只被本帧的命令读写，帧间不共享
struct FrameResources {
    target: FxImageHandle,
    /// 全分辨率的 HDR 场景图
    offscreen: FxImageHandle,
    ping_pong: PingPongImages,
    cmd_pool: GfxCommandPool,
    cmd: GfxCommandBuffer,
    kernel_ubo: GfxBuffer,
    render_complete: GfxSemaphore,
    in_flight: GfxFence,
}

pub struct PostFxPipeline {
    registry: FxImageRegistry,

    frames: Vec<FrameResources>,
    frame_states: Vec<PerFrameState>,
    /// acquire 时还不知道 image index，semaphore 按帧槽位轮转
    acquire_semaphores: Vec<GfxSemaphore>,

    layouts: FxSharedLayouts,
    algorithms: BlurAlgorithms,
    downsample: Downsample,
    composition: Composition,
    controller: ReconfigurationController,
    scheduler: QueueScheduler,
    bilinear_sampler: GfxSampler,

    /// 场景替身的亮度是否随时间脉动
    animate_scene: bool,
    started_at: std::time::Instant,

    display_extent: vk::Extent2D,
    blur_extent: vk::Extent2D,
    fragment_kernel_region: (vk::DeviceSize, vk::DeviceSize),
    compute_kernel_region: (vk::DeviceSize, vk::DeviceSize),
}

// new & init
impl PostFxPipeline {
    pub fn new(swapchain: &GfxRenderSwapchain, config: BloomConfig) -> Self {
        let gfx = Gfx::get();
        let display_extent = swapchain.extent();
        let blur_extent = vk::Extent2D {
            width: (display_extent.width / BLUR_SCALE).max(1),
            height: (display_extent.height / BLUR_SCALE).max(1),
        };

        let blur_format = Self::choose_blur_format();
        log::info!(
            "postfx: display {}x{}, blur {}x{}, blur format {:?}",
            display_extent.width,
            display_extent.height,
            blur_extent.width,
            blur_extent.height,
            blur_format
        );

        let mut registry = FxImageRegistry::new();
        let layouts = FxSharedLayouts::new();
        let tent_use_blit = gfx.format_supports_blit(blur_format);
        let algorithms = BlurAlgorithms::new(&layouts, blur_format, tent_use_blit);
        let downsample = Downsample::new(&layouts, blur_format);
        let composition = Composition::new(&layouts, swapchain.color_format());

        // kernel UBO 的两段：fragment kernel 在前，compute kernel 按对齐跟在后面
        let align = gfx.min_ubo_offset_align();
        let fragment_size = size_of::<KernelParams>() as vk::DeviceSize;
        let compute_offset = fragment_size.next_multiple_of(align);
        let compute_size = size_of::<ComputeKernelParams>() as vk::DeviceSize;
        let fragment_kernel_region = (0, fragment_size);
        let compute_kernel_region = (compute_offset, compute_size);

        let queue_family = gfx.gfx_queue_family();
        let mut frames = Vec::with_capacity(swapchain.image_count());
        for (i, image) in swapchain.present_images().into_iter().enumerate() {
            let target = registry.register_external(image, display_extent, swapchain.color_format(), &format!("swapchain-{i}"));
            let offscreen = registry.register_image(
                display_extent,
                blur_format,
                vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST,
                &format!("offscreen-scene-{i}"),
            );
            let ping_pong = PingPongImages::allocate(&mut registry, blur_extent, blur_format, &format!("frame{i}"));
            let cmd_pool = GfxCommandPool::new(
                queue_family.clone(),
                vk::CommandPoolCreateFlags::empty(),
                &format!("postfx-frame-{i}"),
            );
            let cmd = GfxCommandBuffer::new(&cmd_pool, &format!("postfx-frame-{i}"));
            frames.push(FrameResources {
                target,
                offscreen,
                ping_pong,
                cmd_pool,
                cmd,
                kernel_ubo: GfxBuffer::new_uniform(compute_offset + compute_size, format!("kernel-ubo-{i}")),
                render_complete: GfxSemaphore::new(&format!("render-complete-{i}")),
                in_flight: GfxFence::new(true, &format!("in-flight-{i}")),
            });
        }

        let frame_states = vec![PerFrameState::default(); frames.len()];
        let acquire_semaphores =
            (0..frames.len()).map(|i| GfxSemaphore::new(&format!("acquire-{i}"))).collect();

        Self {
            registry,
            frames,
            frame_states,
            acquire_semaphores,
            layouts,
            algorithms,
            downsample,
            composition,
            controller: ReconfigurationController::new(config),
            scheduler: QueueScheduler::new(gfx.queue_count()),
            bilinear_sampler: GfxSampler::new(&GfxSamplerDesc::bilinear_clamp(), "fx-bilinear-clamp"),
            animate_scene: true,
            started_at: std::time::Instant::now(),
            display_extent,
            blur_extent,
            fragment_kernel_region,
            compute_kernel_region,
        }
    }

    /// 优先 B10G11R11：HDR 且带宽减半；不支持 linear filter 时退回 RGBA16F
    fn choose_blur_format() -> vk::Format {
        let preferred = vk::Format::B10G11R11_UFLOAT_PACK32;
        if Gfx::get().format_supports_linear_filter(preferred) {
            preferred
        } else {
            vk::Format::R16G16B16A16_SFLOAT
        }
    }
}

// getters
impl PostFxPipeline {
    /// 状态栏文本
    #[inline]
    pub fn status_text(&self) -> String {
        self.controller.description()
    }

    #[inline]
    pub fn config(&self) -> BloomConfig {
        self.controller.config()
    }
}

// 重配置入口，全部是惰性的
impl PostFxPipeline {
    pub fn next_mode(&mut self) {
        self.controller.next_mode(&mut self.frame_states);
    }

    pub fn prev_mode(&mut self) {
        self.controller.prev_mode(&mut self.frame_states);
    }

    pub fn next_tier(&mut self) {
        self.controller.next_tier(&mut self.frame_states);
    }

    pub fn prev_tier(&mut self) {
        self.controller.prev_tier(&mut self.frame_states);
    }

    pub fn toggle_bloom_only(&mut self) {
        self.controller.toggle_bloom_only(&mut self.frame_states);
    }

    pub fn toggle_animation(&mut self) {
        self.animate_scene = !self.animate_scene;
        for state in &mut self.frame_states {
            state.mark_stale();
        }
    }
}

// 逐帧驱动
impl PostFxPipeline {
    /// 取 image、按需重录、提交并 present
    ///
    /// 返回 true 表示 swapchain 需要重建
    pub fn render_frame(&mut self, swapchain: &mut GfxRenderSwapchain, frame_index: u64) -> bool {
        let queue_index = self.scheduler.queue_index(frame_index);
        let acquire_semaphore =
            self.acquire_semaphores[(frame_index as usize) % self.acquire_semaphores.len()].clone();

        if swapchain.acquire_next_image(Some(&acquire_semaphore), None, u64::MAX) {
            return true;
        }
        let image_index = swapchain.current_image_index();

        // 脉动的场景亮度烘焙在清屏命令里，动画时每帧重录
        if self.animate_scene {
            self.frame_states[image_index].mark_stale();
        }

        self.frames[image_index].in_flight.wait();
        self.frames[image_index].in_flight.reset();

        if self.frame_states[image_index].must_update_config() {
            let config = self.controller.config();
            self.algorithms.write_kernel(
                config.mode,
                config.tier_config(),
                &self.frames[image_index].kernel_ubo,
                (self.fragment_kernel_region, self.compute_kernel_region),
            );
            self.frame_states[image_index].on_config_written();
        }

        if self.frame_states[image_index].must_record() {
            self.record_frame(image_index);
            self.frame_states[image_index].on_recorded();
        }

        let frame = &self.frames[image_index];
        let queue = Gfx::get().gfx_queue(queue_index);
        let submit_info = GfxSubmitInfo::new(std::slice::from_ref(&frame.cmd))
            .wait(&acquire_semaphore, vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT)
            .signal(&frame.render_complete, vk::PipelineStageFlags2::ALL_COMMANDS);
        queue.submit(vec![submit_info], Some(frame.in_flight.clone()));

        swapchain.present_image(queue, std::slice::from_ref(&frame.render_complete))
    }

    /// 录制 image_index 对应的整帧命令
    fn record_frame(&mut self, image_index: usize) {
        let config = self.controller.config();
        log::debug!("record frame {image_index}: {}", self.controller.description());

        self.registry.begin_recording();

        let frame = &self.frames[image_index];
        frame.cmd_pool.reset_all_buffers();
        frame.cmd.begin(vk::CommandBufferUsageFlags::empty(), "postfx-frame");

        let ctx = BlurFrameContext {
            ping_pong: &frame.ping_pong,
            sampler: self.bilinear_sampler.handle(),
            kernel_ubo: frame.kernel_ubo.vk_buffer(),
            fragment_kernel_region: self.fragment_kernel_region,
            compute_kernel_region: self.compute_kernel_region,
            blur_extent: self.blur_extent,
            tier: config.tier_config(),
        };

        let intensity = if self.animate_scene {
            let t = self.started_at.elapsed().as_secs_f32();
            0.75 + 0.25 * (t * 1.5).sin()
        } else {
            1.0
        };
        let scene_color = [
            SCENE_CLEAR_COLOR[0] * intensity,
            SCENE_CLEAR_COLOR[1] * intensity,
            SCENE_CLEAR_COLOR[2] * intensity,
            SCENE_CLEAR_COLOR[3],
        ];

        let mut passes: Vec<FxPassDesc> = Vec::new();
        // 场景渲染的替身，真实应用在这里画场景
        passes.push(FxPassDesc::clear_color("scene", frame.offscreen, scene_color));

        if config.mode.has_blur() {
            passes.push(self.downsample.plan(
                frame.offscreen,
                self.display_extent,
                frame.ping_pong.front(),
                self.bilinear_sampler.handle(),
            ));
            passes.extend(self.algorithms.plan(config.mode, &ctx));
        }

        let merged = compose::merged_for(config.mode);
        let bloom = blur::blurred_result(config.mode, &ctx);
        let bloom_extent = if merged == MergedUpsample::None {
            self.blur_extent
        } else {
            PingPongImages::level_extent(self.blur_extent, 0)
        };
        passes.push(self.composition.plan(
            compose::variant_for(!config.mode.has_blur(), config.bloom_only),
            merged,
            frame.offscreen,
            bloom,
            bloom_extent,
            SCENE_EXPOSURE,
            frame.target,
            self.bilinear_sampler.handle(),
        ));

        FxExecutor::execute(&frame.cmd, &mut self.registry, &passes);

        // 合成结束后交给 present engine
        let current = self.registry.current_state(frame.target);
        if let Some(barrier) = BarrierCalculator::compute(current, FxImageState::PRESENT) {
            frame.cmd.image_memory_barrier(
                vk::DependencyFlags::empty(),
                &[barrier.to_gfx_barrier(self.registry.vk_image(frame.target))],
            );
            self.registry.set_state(frame.target, FxImageState::PRESENT);
        }

        frame.cmd.end();
    }
}

// destroy
impl PostFxPipeline {
    /// 必须在 Gfx 销毁前调用
    pub fn destroy(mut self) {
        Gfx::get().wait_idle();

        for mut frame in self.frames.drain(..) {
            frame.cmd_pool.destroy();
            frame.kernel_ubo.destroy();
            frame.render_complete.destroy();
            frame.in_flight.destroy();
        }
        for semaphore in self.acquire_semaphores.drain(..) {
            semaphore.destroy();
        }
        self.registry.destroy();
        // pipeline、sampler、layout 都在 drop 时释放
        let _ = self.layouts;
    }
}
