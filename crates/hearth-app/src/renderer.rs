//! GPU resource chain and per-frame submission.

use anyhow::Context;
use ash::vk;
use hearth_gpu::{
    AcquireOutcome, BufferBinding, CommandBuffer, CommandPool, DescriptorPool, DescriptorSet,
    DescriptorSetLayout, DescriptorSetLayoutBuilder, FrameBuffer, GraphicsPipelineConfig,
    Pipeline, PipelineDesc, PipelineLayout, PresentOutcome, RenderContext, RenderPass,
    RenderPassDesc, ResourceBuffer, ShaderModule, SubmitSync, SwapChain, SwapchainRequest,
};
use hearth_platform::Window;

use crate::config::AppConfig;
use crate::scene::{Uniforms, Vertex, QUAD_INDICES, QUAD_VERTICES};

/// What happened to a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Presented,
    /// The swapchain was stale or the surface had no area; nothing was drawn.
    Dropped,
}

/// Everything needed to draw into the window.
///
/// Fields are declared in reverse construction order so they drop
/// dependents first and the context last.
pub struct Renderer {
    command_buffer: CommandBuffer,
    // Held so the pools and layouts outlive what was allocated from them
    #[allow(dead_code)]
    command_pool: CommandPool,
    pipeline: Pipeline,
    pipeline_layout: PipelineLayout,
    descriptor_set: DescriptorSet,
    #[allow(dead_code)]
    descriptor_pool: DescriptorPool,
    #[allow(dead_code)]
    descriptor_layout: DescriptorSetLayout,
    uniform_buffer: ResourceBuffer,
    index_buffer: ResourceBuffer,
    vertex_buffer: ResourceBuffer,
    framebuffers: Vec<FrameBuffer>,
    framebuffer_generation: u64,
    render_pass: RenderPass,
    swapchain: SwapChain,
    context: RenderContext,
    clear_color: [f32; 4],
}

impl Renderer {
    /// Build the full chain for `window` in dependency order.
    pub fn new(
        window: &Window,
        config: &AppConfig,
        app_name: &str,
        version: (u32, u32, u32),
    ) -> anyhow::Result<Self> {
        let context = RenderContext::builder()
            .app_name(app_name)
            .app_version(version.0, version.1, version.2)
            .validation(config.validation)
            .build(window)
            .context("creating render context")?;
        let device = context.device().clone();

        let (width, height) = window.inner_size();
        let swapchain = SwapChain::new(
            &context,
            SwapchainRequest {
                width: width.max(1),
                height: height.max(1),
                strategy: config.buffering,
                vsync: config.vsync,
                ..Default::default()
            },
        )
        .context("creating swapchain")?;

        let render_pass =
            RenderPass::new(device.clone(), &RenderPassDesc::presentable(swapchain.format()))?;
        let framebuffers = FrameBuffer::for_views(
            &device,
            &render_pass,
            swapchain.image_views(),
            swapchain.extent(),
        )?;

        let vertex_buffer = ResourceBuffer::with_data(
            &context,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            &QUAD_VERTICES,
        )?;
        let index_buffer =
            ResourceBuffer::with_data(&context, vk::BufferUsageFlags::INDEX_BUFFER, &QUAD_INDICES)?;
        let uniform_buffer = ResourceBuffer::with_data(
            &context,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            &[Uniforms::default()],
        )?;

        let layout_builder =
            DescriptorSetLayoutBuilder::new().uniform_buffer(0, vk::ShaderStageFlags::VERTEX);
        let descriptor_layout = layout_builder.build(device.clone())?;
        let descriptor_pool =
            DescriptorPool::new(device.clone(), 1, &layout_builder.pool_sizes())?;
        let descriptor_set = DescriptorSet::new(device.clone(), &descriptor_pool, &descriptor_layout)?;
        descriptor_set.update_buffers(&[BufferBinding::uniform(0, &uniform_buffer)])?;

        let pipeline_layout = PipelineLayout::new(device.clone(), &[&descriptor_layout], &[])?;

        let vert_path = config.vertex_shader_path();
        let frag_path = config.fragment_shader_path();
        let vertex_shader = ShaderModule::load(device.clone(), &vert_path)
            .with_context(|| format!("loading {}", vert_path.display()))?;
        let fragment_shader = ShaderModule::load(device.clone(), &frag_path)
            .with_context(|| format!("loading {}", frag_path.display()))?;

        let pipeline_config = GraphicsPipelineConfig {
            vertex_bindings: Vertex::bindings(),
            vertex_attributes: Vertex::attributes(),
            cull_mode: vk::CullModeFlags::NONE,
            ..Default::default()
        };
        let pipeline = Pipeline::new(
            device.clone(),
            &PipelineDesc {
                vertex_shader: &vertex_shader,
                fragment_shader: &fragment_shader,
                layout: &pipeline_layout,
                render_pass: &render_pass,
                config: &pipeline_config,
            },
        )?;

        let command_pool = CommandPool::new(device.clone(), context.queue_families().graphics)?;
        let command_buffer = CommandBuffer::new(device, &command_pool)?;

        tracing::info!(
            gpu = context.device_name(),
            images = swapchain.images().len(),
            "Renderer ready"
        );

        Ok(Self {
            command_buffer,
            command_pool,
            pipeline,
            pipeline_layout,
            descriptor_set,
            descriptor_pool,
            descriptor_layout,
            uniform_buffer,
            index_buffer,
            vertex_buffer,
            framebuffer_generation: swapchain.generation(),
            framebuffers,
            render_pass,
            swapchain,
            context,
            clear_color: config.clear_color,
        })
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Rebuild the swapchain for a new window size. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.framebuffers.clear();
        self.swapchain.rebuild(width, height)?;
        self.sync_framebuffers()?;
        Ok(())
    }

    /// Record, submit and present one frame.
    #[cfg_attr(feature = "profiling-tracy", tracing::instrument(level = "trace", skip_all))]
    pub fn render_frame(&mut self, uniforms: &Uniforms) -> anyhow::Result<FrameStatus> {
        // Full CPU/GPU sync: the previous frame must be done before reuse.
        self.command_buffer.wait()?;

        let image_index = match self.swapchain.acquire_next_image()? {
            AcquireOutcome::Ready { image_index, .. } => image_index,
            AcquireOutcome::Rebuilt => {
                self.sync_framebuffers()?;
                return Ok(FrameStatus::Dropped);
            }
            AcquireOutcome::Deferred => {
                self.framebuffers.clear();
                return Ok(FrameStatus::Dropped);
            }
        };

        self.uniform_buffer.write(0, std::slice::from_ref(uniforms))?;

        let framebuffer = self
            .framebuffers
            .get(image_index as usize)
            .with_context(|| format!("no framebuffer for swapchain image {image_index}"))?;
        let extent = self.swapchain.extent();

        let cmd = &mut self.command_buffer;
        cmd.begin()?;
        let recorded = (|| -> hearth_gpu::Result<()> {
            cmd.begin_render_pass(&self.render_pass, framebuffer, self.clear_color)?;
            cmd.bind_pipeline(&self.pipeline)?;
            cmd.update_viewport(extent)?;
            cmd.update_scissor(extent)?;
            cmd.bind_vertex_buffer(&self.vertex_buffer)?;
            cmd.bind_index_buffer(&self.index_buffer)?;
            cmd.bind_descriptor_set(&self.pipeline_layout, &self.descriptor_set)?;
            cmd.draw_indexed(QUAD_INDICES.len() as u32, 1)?;
            cmd.end_render_pass()?;
            cmd.end()
        })();
        if let Err(e) = recorded {
            if let Err(abort) = cmd.abort() {
                tracing::warn!("Failed to discard partial recording: {abort}");
            }
            return Err(anyhow::Error::new(e).context("recording frame"));
        }

        cmd.submit(
            self.context.graphics_queue(),
            Some(SubmitSync::color_output(
                self.swapchain.image_available(),
                self.swapchain.render_finished(),
            )),
        )?;

        match self
            .swapchain
            .present(self.context.present_queue(), image_index)?
        {
            PresentOutcome::Presented => Ok(FrameStatus::Presented),
            PresentOutcome::Rebuilt => {
                self.sync_framebuffers()?;
                Ok(FrameStatus::Presented)
            }
        }
    }

    /// Recreate framebuffers if the swapchain has been rebuilt since they were made.
    fn sync_framebuffers(&mut self) -> anyhow::Result<()> {
        if self.framebuffer_generation == self.swapchain.generation() && !self.framebuffers.is_empty()
        {
            return Ok(());
        }

        self.framebuffers.clear();
        self.framebuffers = FrameBuffer::for_views(
            self.context.device(),
            &self.render_pass,
            self.swapchain.image_views(),
            self.swapchain.extent(),
        )?;
        self.framebuffer_generation = self.swapchain.generation();
        tracing::debug!(
            generation = self.framebuffer_generation,
            count = self.framebuffers.len(),
            "Framebuffers recreated"
        );
        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.context.wait_idle() {
            tracing::error!("Failed to wait idle: {e}");
        }
        tracing::info!("Renderer teardown");
    }
}
