//! pass 列表的录制器
//!
//! 按列表顺序把 [`FxPassDesc`] 翻译成 Vulkan 命令。
//! barrier 完全由声明的读写状态推导，pass 之间没有手写同步。

use ash::vk;
use glare_gfx::basic::color::LabelColor;
use glare_gfx::commands::command_buffer::GfxCommandBuffer;

use crate::graph::barrier::BarrierCalculator;
use crate::graph::pass::{FxBinding, FxPassDesc, FxPassKind};
use crate::graph::registry::FxImageRegistry;

pub struct FxExecutor;

impl FxExecutor {
    /// 依次录制所有 pass，并更新 registry 中的 image 状态
    pub fn execute(cmd: &GfxCommandBuffer, registry: &mut FxImageRegistry, passes: &[FxPassDesc]) {
        for pass in passes {
            Self::transition_images(cmd, registry, pass);

            cmd.begin_label(&pass.name, LabelColor::COLOR_PASS);
            match &pass.kind {
                FxPassKind::Graphics { pipeline, pipeline_layout, color_target, load_op, clear_value } => {
                    Self::record_graphics(cmd, registry, pass, *pipeline, *pipeline_layout, *color_target, *load_op, *clear_value);
                }
                FxPassKind::Compute { pipeline, pipeline_layout, group_count } => {
                    cmd.cmd_bind_pipeline(vk::PipelineBindPoint::COMPUTE, *pipeline);
                    Self::push_bindings(cmd, registry, pass, vk::PipelineBindPoint::COMPUTE, *pipeline_layout);
                    if !pass.push_constants.is_empty() {
                        cmd.cmd_push_constants(*pipeline_layout, pass.push_stages, 0, &pass.push_constants);
                    }
                    cmd.cmd_dispatch(*group_count);
                }
                FxPassKind::Blit { src, dst, filter } => {
                    Self::record_blit(cmd, registry, *src, *dst, *filter);
                }
                FxPassKind::ClearColor { target, color } => {
                    let range = vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    };
                    cmd.cmd_clear_color_image(
                        registry.vk_image(*target),
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                        &vk::ClearColorValue { float32: *color },
                        std::slice::from_ref(&range),
                    );
                }
            }
            cmd.end_label();
        }
    }

    /// 对比当前状态与声明状态，需要时插入 barrier
    fn transition_images(cmd: &GfxCommandBuffer, registry: &mut FxImageRegistry, pass: &FxPassDesc) {
        let mut barriers = Vec::new();
        for (handle, required) in pass.accesses() {
            let current = registry.current_state(handle);
            if current == required && !required.is_write() {
                continue;
            }
            if let Some(desc) = BarrierCalculator::compute(current, required) {
                barriers.push(desc.to_gfx_barrier(registry.vk_image(handle)));
            }
            registry.set_state(handle, required);
        }
        if !barriers.is_empty() {
            cmd.image_memory_barrier(vk::DependencyFlags::empty(), &barriers);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn record_graphics(
        cmd: &GfxCommandBuffer,
        registry: &FxImageRegistry,
        pass: &FxPassDesc,
        pipeline: vk::Pipeline,
        pipeline_layout: vk::PipelineLayout,
        color_target: crate::graph::handle::FxImageHandle,
        load_op: vk::AttachmentLoadOp,
        clear_value: [f32; 4],
    ) {
        let extent = registry.extent(color_target);

        let color_attachment = vk::RenderingAttachmentInfo::default()
            .image_view(registry.vk_view(color_target))
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(load_op)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(vk::ClearValue {
                color: vk::ClearColorValue { float32: clear_value },
            });
        let render_info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .layer_count(1)
            .color_attachments(std::slice::from_ref(&color_attachment));

        cmd.cmd_begin_rendering(&render_info);
        cmd.cmd_set_viewport(
            0,
            &[vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            }],
        );
        cmd.cmd_set_scissor(
            0,
            &[vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            }],
        );
        cmd.cmd_bind_pipeline(vk::PipelineBindPoint::GRAPHICS, pipeline);
        Self::push_bindings(cmd, registry, pass, vk::PipelineBindPoint::GRAPHICS, pipeline_layout);
        if !pass.push_constants.is_empty() {
            cmd.cmd_push_constants(pipeline_layout, pass.push_stages, 0, &pass.push_constants);
        }
        // 全屏三角形，顶点坐标由 vertex shader 按 gl_VertexIndex 生成
        cmd.cmd_draw(3, 1, 0, 0);
        cmd.end_rendering();
    }

    /// 解析绑定为 push descriptor 写入
    fn push_bindings(
        cmd: &GfxCommandBuffer,
        registry: &FxImageRegistry,
        pass: &FxPassDesc,
        bind_point: vk::PipelineBindPoint,
        pipeline_layout: vk::PipelineLayout,
    ) {
        if pass.bindings.is_empty() {
            return;
        }

        // 先收集所有 info，再组装 write，write 只持有对 info 的共享借用
        let mut image_infos = Vec::with_capacity(pass.bindings.len());
        let mut buffer_infos = Vec::with_capacity(pass.bindings.len());
        for binding in &pass.bindings {
            match binding {
                FxBinding::SampledImage { image, sampler, layout, .. } => {
                    image_infos.push(vk::DescriptorImageInfo {
                        sampler: *sampler,
                        image_view: registry.vk_view(*image),
                        image_layout: *layout,
                    });
                }
                FxBinding::StorageImage { image, .. } => {
                    image_infos.push(vk::DescriptorImageInfo {
                        sampler: vk::Sampler::null(),
                        image_view: registry.vk_view(*image),
                        image_layout: vk::ImageLayout::GENERAL,
                    });
                }
                FxBinding::UniformBuffer { buffer, offset, range, .. } => {
                    buffer_infos.push(vk::DescriptorBufferInfo {
                        buffer: *buffer,
                        offset: *offset,
                        range: *range,
                    });
                }
            }
        }

        let mut writes = Vec::with_capacity(pass.bindings.len());
        let mut image_idx = 0;
        let mut buffer_idx = 0;
        for binding in &pass.bindings {
            match binding {
                FxBinding::SampledImage { binding, .. } => {
                    writes.push(
                        vk::WriteDescriptorSet::default()
                            .dst_binding(*binding)
                            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                            .image_info(std::slice::from_ref(&image_infos[image_idx])),
                    );
                    image_idx += 1;
                }
                FxBinding::StorageImage { binding, .. } => {
                    writes.push(
                        vk::WriteDescriptorSet::default()
                            .dst_binding(*binding)
                            .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
                            .image_info(std::slice::from_ref(&image_infos[image_idx])),
                    );
                    image_idx += 1;
                }
                FxBinding::UniformBuffer { binding, .. } => {
                    writes.push(
                        vk::WriteDescriptorSet::default()
                            .dst_binding(*binding)
                            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                            .buffer_info(std::slice::from_ref(&buffer_infos[buffer_idx])),
                    );
                    buffer_idx += 1;
                }
            }
        }

        cmd.cmd_push_descriptor_set(bind_point, pipeline_layout, 0, &writes);
    }

    fn record_blit(
        cmd: &GfxCommandBuffer,
        registry: &FxImageRegistry,
        src: crate::graph::handle::FxImageHandle,
        dst: crate::graph::handle::FxImageHandle,
        filter: vk::Filter,
    ) {
        let src_extent = registry.extent(src);
        let dst_extent = registry.extent(dst);
        let subresource = vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        };
        let region = vk::ImageBlit2::default()
            .src_subresource(subresource)
            .src_offsets([
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D {
                    x: src_extent.width as i32,
                    y: src_extent.height as i32,
                    z: 1,
                },
            ])
            .dst_subresource(subresource)
            .dst_offsets([
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D {
                    x: dst_extent.width as i32,
                    y: dst_extent.height as i32,
                    z: 1,
                },
            ]);
        let blit_info = vk::BlitImageInfo2::default()
            .src_image(registry.vk_image(src))
            .src_image_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
            .dst_image(registry.vk_image(dst))
            .dst_image_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .filter(filter)
            .regions(std::slice::from_ref(&region));
        cmd.cmd_blit_image(&blit_info);
    }
}
