//! Render pass construction.

use std::ops::Range;
use std::sync::Arc;

use ash::vk;

use crate::error::{GpuError, Result};

/// One attachment used by the render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    pub format: vk::Format,
    pub samples: vk::SampleCountFlags,
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
    pub initial_layout: vk::ImageLayout,
    pub final_layout: vk::ImageLayout,
}

impl Attachment {
    /// A cleared color attachment that ends up ready for presentation.
    pub fn presentable(format: vk::Format) -> Self {
        Self {
            format,
            samples: vk::SampleCountFlags::TYPE_1,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::STORE,
            initial_layout: vk::ImageLayout::UNDEFINED,
            final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
        }
    }
}

/// Reference from a subpass to an attachment index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentRef {
    pub attachment: u32,
    pub layout: vk::ImageLayout,
}

impl AttachmentRef {
    pub fn color(attachment: u32) -> Self {
        Self {
            attachment,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }
    }

    pub fn input(attachment: u32) -> Self {
        Self {
            attachment,
            layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }
    }

    fn to_vk(self) -> vk::AttachmentReference {
        vk::AttachmentReference {
            attachment: self.attachment,
            layout: self.layout,
        }
    }
}

/// Attachment usage of a single subpass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subpass {
    pub inputs: Vec<AttachmentRef>,
    pub colors: Vec<AttachmentRef>,
    pub depth_stencil: Option<AttachmentRef>,
}

/// Execution/memory dependency between two subpasses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    pub src_subpass: u32,
    pub dst_subpass: u32,
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
}

impl Dependency {
    /// Wait for the presentation engine to release the image before writing color.
    pub fn external_color_write() -> Self {
        Self {
            src_subpass: vk::SUBPASS_EXTERNAL,
            dst_subpass: 0,
            src_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            dst_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            src_access: vk::AccessFlags::empty(),
            dst_access: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        }
    }
}

/// Full description of a render pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderPassDesc {
    pub attachments: Vec<Attachment>,
    pub subpasses: Vec<Subpass>,
    pub dependencies: Vec<Dependency>,
}

impl RenderPassDesc {
    /// Single subpass writing one presentable color attachment.
    pub fn presentable(format: vk::Format) -> Self {
        Self {
            attachments: vec![Attachment::presentable(format)],
            subpasses: vec![Subpass {
                colors: vec![AttachmentRef::color(0)],
                ..Default::default()
            }],
            dependencies: vec![Dependency::external_color_write()],
        }
    }
}

/// Where a subpass's references live inside the flattened arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubpassRanges {
    pub inputs: Range<usize>,
    pub colors: Range<usize>,
    pub depth_stencil: Option<usize>,
}

/// Attachment references of every subpass packed into contiguous arrays.
#[derive(Debug, Default)]
pub struct FlattenedSubpasses {
    pub inputs: Vec<vk::AttachmentReference>,
    pub colors: Vec<vk::AttachmentReference>,
    pub depth_stencils: Vec<vk::AttachmentReference>,
    pub ranges: Vec<SubpassRanges>,
}

impl FlattenedSubpasses {
    /// Pack `subpasses`, recording an explicit `start..end` range for each.
    ///
    /// Every reference must point at one of `attachment_count` attachments
    /// or be `VK_ATTACHMENT_UNUSED`.
    pub fn new(subpasses: &[Subpass], attachment_count: usize) -> Result<Self> {
        let mut flat = Self::default();

        for (index, subpass) in subpasses.iter().enumerate() {
            let refs = subpass
                .inputs
                .iter()
                .chain(&subpass.colors)
                .chain(subpass.depth_stencil.as_ref());
            for r in refs {
                if r.attachment != vk::ATTACHMENT_UNUSED && r.attachment as usize >= attachment_count
                {
                    return Err(GpuError::RenderPassCreation(format!(
                        "subpass {index} references attachment {} of {attachment_count}",
                        r.attachment
                    )));
                }
            }

            let input_start = flat.inputs.len();
            flat.inputs.extend(subpass.inputs.iter().map(|r| r.to_vk()));
            let color_start = flat.colors.len();
            flat.colors.extend(subpass.colors.iter().map(|r| r.to_vk()));
            let depth_stencil = subpass.depth_stencil.map(|r| {
                flat.depth_stencils.push(r.to_vk());
                flat.depth_stencils.len() - 1
            });

            flat.ranges.push(SubpassRanges {
                inputs: input_start..flat.inputs.len(),
                colors: color_start..flat.colors.len(),
                depth_stencil,
            });
        }

        Ok(flat)
    }

    /// Build the API subpass descriptions borrowing from `self`.
    pub fn descriptions(&self) -> Vec<vk::SubpassDescription<'_>> {
        self.ranges
            .iter()
            .map(|range| {
                let mut description = vk::SubpassDescription::default()
                    .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
                    .input_attachments(&self.inputs[range.inputs.clone()])
                    .color_attachments(&self.colors[range.colors.clone()]);
                if let Some(depth) = range.depth_stencil {
                    description = description.depth_stencil_attachment(&self.depth_stencils[depth]);
                }
                description
            })
            .collect()
    }
}

/// Owned `VkRenderPass`.
pub struct RenderPass {
    device: Arc<ash::Device>,
    handle: vk::RenderPass,
}

impl RenderPass {
    /// Create a render pass from `desc`.
    pub fn new(device: Arc<ash::Device>, desc: &RenderPassDesc) -> Result<Self> {
        if desc.subpasses.is_empty() {
            return Err(GpuError::RenderPassCreation("at least one subpass is required".into()));
        }

        let attachments: Vec<vk::AttachmentDescription> = desc
            .attachments
            .iter()
            .map(|a| {
                vk::AttachmentDescription::default()
                    .format(a.format)
                    .samples(a.samples)
                    .load_op(a.load_op)
                    .store_op(a.store_op)
                    .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                    .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                    .initial_layout(a.initial_layout)
                    .final_layout(a.final_layout)
            })
            .collect();

        let flat = FlattenedSubpasses::new(&desc.subpasses, attachments.len())?;
        let subpasses = flat.descriptions();

        let dependencies: Vec<vk::SubpassDependency> = desc
            .dependencies
            .iter()
            .map(|d| {
                vk::SubpassDependency::default()
                    .src_subpass(d.src_subpass)
                    .dst_subpass(d.dst_subpass)
                    .src_stage_mask(d.src_stage)
                    .dst_stage_mask(d.dst_stage)
                    .src_access_mask(d.src_access)
                    .dst_access_mask(d.dst_access)
            })
            .collect();

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        // SAFETY: the device is alive for as long as the Arc is held.
        let handle = unsafe { device.create_render_pass(&create_info, None) }
            .map_err(|e| GpuError::RenderPassCreation(e.to_string()))?;

        Ok(Self { device, handle })
    }

    /// Raw render pass handle.
    pub fn handle(&self) -> vk::RenderPass {
        self.handle
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_render_pass(self.handle, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_subpasses_keep_their_own_ranges() {
        let subpasses = [
            Subpass {
                colors: vec![AttachmentRef::color(0), AttachmentRef::color(1)],
                ..Default::default()
            },
            Subpass {
                inputs: vec![AttachmentRef::input(0), AttachmentRef::input(1)],
                colors: vec![AttachmentRef::color(2)],
                ..Default::default()
            },
            Subpass {
                inputs: vec![AttachmentRef::input(2)],
                colors: vec![AttachmentRef::color(3)],
                depth_stencil: Some(AttachmentRef {
                    attachment: 4,
                    layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
                }),
            },
        ];

        let flat = FlattenedSubpasses::new(&subpasses, 5).unwrap();

        assert_eq!(flat.ranges[0].inputs, 0..0);
        assert_eq!(flat.ranges[0].colors, 0..2);
        assert_eq!(flat.ranges[1].inputs, 0..2);
        assert_eq!(flat.ranges[1].colors, 2..3);
        assert_eq!(flat.ranges[2].inputs, 2..3);
        assert_eq!(flat.ranges[2].colors, 3..4);
        assert_eq!(flat.ranges[2].depth_stencil, Some(0));
        assert_eq!(flat.ranges[0].depth_stencil, None);

        let described = flat.descriptions();
        assert_eq!(described.len(), 3);
        assert_eq!(described[0].color_attachment_count, 2);
        assert_eq!(described[1].input_attachment_count, 2);
        assert_eq!(described[1].color_attachment_count, 1);
        assert!(!described[2].p_depth_stencil_attachment.is_null());

        let second_colors = &flat.colors[flat.ranges[1].colors.clone()];
        assert_eq!(second_colors[0].attachment, 2);
    }

    #[test]
    fn out_of_range_reference_is_rejected() {
        let subpasses = [Subpass {
            colors: vec![AttachmentRef::color(3)],
            ..Default::default()
        }];
        let err = FlattenedSubpasses::new(&subpasses, 1).unwrap_err();
        assert!(matches!(err, GpuError::RenderPassCreation(_)));
    }

    #[test]
    fn unused_reference_is_allowed() {
        let subpasses = [Subpass {
            colors: vec![AttachmentRef::color(vk::ATTACHMENT_UNUSED)],
            ..Default::default()
        }];
        assert!(FlattenedSubpasses::new(&subpasses, 0).is_ok());
    }

    #[test]
    fn presentable_desc_has_one_color_subpass() {
        let desc = RenderPassDesc::presentable(vk::Format::B8G8R8A8_SRGB);
        assert_eq!(desc.attachments.len(), 1);
        assert_eq!(desc.attachments[0].final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
        assert_eq!(desc.subpasses.len(), 1);
        assert_eq!(desc.subpasses[0].colors, vec![AttachmentRef::color(0)]);
        assert_eq!(desc.dependencies[0].src_subpass, vk::SUBPASS_EXTERNAL);
    }
}
