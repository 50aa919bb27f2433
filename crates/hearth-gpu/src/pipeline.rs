//! Pipeline creation and management.

use std::sync::Arc;

use ash::vk;

use crate::descriptors::DescriptorSetLayout;
use crate::error::{require_handle, GpuError, Result};
use crate::render_pass::RenderPass;
use crate::shader::ShaderModule;

/// Owned `VkPipelineLayout`.
pub struct PipelineLayout {
    device: Arc<ash::Device>,
    handle: vk::PipelineLayout,
}

impl PipelineLayout {
    /// Create a layout from descriptor set layouts and push constant ranges.
    pub fn new(
        device: Arc<ash::Device>,
        set_layouts: &[&DescriptorSetLayout],
        push_constant_ranges: &[vk::PushConstantRange],
    ) -> Result<Self> {
        let set_layouts = set_layouts
            .iter()
            .map(|l| require_handle(l.handle(), "descriptor set layout"))
            .collect::<Result<Vec<_>>>()?;

        let layout_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&set_layouts)
            .push_constant_ranges(push_constant_ranges);

        // SAFETY: the set layouts belong to this device.
        let handle = unsafe { device.create_pipeline_layout(&layout_info, None) }
            .map_err(|e| GpuError::PipelineCreation(format!("layout: {e}")))?;

        Ok(Self { device, handle })
    }

    /// Raw layout handle.
    pub fn handle(&self) -> vk::PipelineLayout {
        self.handle
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_pipeline_layout(self.handle, None);
        }
    }
}

/// One vertex buffer binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBinding {
    pub binding: u32,
    pub stride: u32,
    pub input_rate: vk::VertexInputRate,
}

/// One vertex attribute read from a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub binding: u32,
    pub format: vk::Format,
    pub offset: u32,
}

/// Fixed-function state of a graphics pipeline.
#[derive(Debug, Clone)]
pub struct GraphicsPipelineConfig {
    pub vertex_bindings: Vec<VertexBinding>,
    pub vertex_attributes: Vec<VertexAttribute>,
    pub topology: vk::PrimitiveTopology,
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub subpass: u32,
}

impl Default for GraphicsPipelineConfig {
    fn default() -> Self {
        Self {
            vertex_bindings: Vec::new(),
            vertex_attributes: Vec::new(),
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::BACK,
            front_face: vk::FrontFace::COUNTER_CLOCKWISE,
            subpass: 0,
        }
    }
}

/// Everything a graphics pipeline is built from.
pub struct PipelineDesc<'a> {
    pub vertex_shader: &'a ShaderModule,
    pub fragment_shader: &'a ShaderModule,
    pub layout: &'a PipelineLayout,
    pub render_pass: &'a RenderPass,
    pub config: &'a GraphicsPipelineConfig,
}

/// Owned graphics `VkPipeline`.
pub struct Pipeline {
    device: Arc<ash::Device>,
    handle: vk::Pipeline,
}

impl Pipeline {
    /// Create a graphics pipeline with dynamic viewport and scissor.
    pub fn new(device: Arc<ash::Device>, desc: &PipelineDesc<'_>) -> Result<Self> {
        let vert_module = require_handle(desc.vertex_shader.handle(), "vertex shader")?;
        let frag_module = require_handle(desc.fragment_shader.handle(), "fragment shader")?;
        let layout = require_handle(desc.layout.handle(), "pipeline layout")?;
        let render_pass = require_handle(desc.render_pass.handle(), "render pass")?;
        let config = desc.config;

        // Shader stages
        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vert_module)
                .name(c"main"),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(frag_module)
                .name(c"main"),
        ];

        // Vertex input
        let bindings: Vec<vk::VertexInputBindingDescription> = config
            .vertex_bindings
            .iter()
            .map(|b| vk::VertexInputBindingDescription {
                binding: b.binding,
                stride: b.stride,
                input_rate: b.input_rate,
            })
            .collect();
        let attributes: Vec<vk::VertexInputAttributeDescription> = config
            .vertex_attributes
            .iter()
            .map(|a| vk::VertexInputAttributeDescription {
                location: a.location,
                binding: a.binding,
                format: a.format,
                offset: a.offset,
            })
            .collect();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        // Input assembly
        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(config.topology)
            .primitive_restart_enable(false);

        // Viewport (dynamic)
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        // Rasterization
        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(config.polygon_mode)
            .cull_mode(config.cull_mode)
            .front_face(config.front_face)
            .depth_bias_enable(false)
            .line_width(1.0);

        // Multisampling
        let multisampling = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1)
            .sample_shading_enable(false);

        // Color blending
        let color_blend_attachment = vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(false)
            .color_write_mask(vk::ColorComponentFlags::RGBA);
        let color_blending = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(std::slice::from_ref(&color_blend_attachment));

        // Dynamic state
        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(config.subpass);

        // SAFETY: every referenced handle was checked and belongs to this device.
        let pipelines = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
        }
        .map_err(|(_pipelines, e)| GpuError::PipelineCreation(e.to_string()))?;

        Ok(Self {
            device,
            handle: pipelines[0],
        })
    }

    /// Raw pipeline handle.
    pub fn handle(&self) -> vk::Pipeline {
        self.handle
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_pipeline(self.handle, None);
        }
    }
}
