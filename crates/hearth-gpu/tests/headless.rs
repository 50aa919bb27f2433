//! Tests against a real Vulkan device.
//!
//! Each test skips itself when no Vulkan driver or suitable GPU is present.

use hearth_gpu::{
    vk, BufferBinding, BufferDesc, CommandBuffer, CommandPool, DescriptorPool, DescriptorSet,
    DescriptorSetLayoutBuilder, Fence, GpuError, RenderContext, RenderPass, RenderPassDesc,
    ResourceBuffer,
};

fn headless() -> Option<RenderContext> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    match RenderContext::builder()
        .app_name("hearth-gpu-tests")
        .validation(false)
        .build_headless()
    {
        Ok(context) => Some(context),
        Err(e) => {
            eprintln!("skipping: no usable Vulkan device ({e})");
            None
        }
    }
}

#[test]
fn fence_round_trip_does_not_deadlock() {
    let Some(context) = headless() else { return };
    let device = context.device().clone();

    let pool = CommandPool::new(device.clone(), context.queue_families().graphics).unwrap();
    let mut cmd = CommandBuffer::new(device, &pool).unwrap();
    assert!(!cmd.is_recording());

    cmd.begin().unwrap();
    assert!(cmd.is_recording());
    cmd.end().unwrap();
    assert!(!cmd.is_recording());

    cmd.submit(context.graphics_queue(), None).unwrap();
    cmd.wait().unwrap();

    // The fence was signaled by the submission, so this must not block forever.
    cmd.begin().unwrap();
    cmd.end().unwrap();
    assert!(!cmd.is_recording());

    cmd.submit(context.graphics_queue(), None).unwrap();
    cmd.wait().unwrap();
}

#[test]
fn recording_commands_outside_begin_fails() {
    let Some(context) = headless() else { return };
    let device = context.device().clone();

    let pool = CommandPool::new(device.clone(), context.queue_families().graphics).unwrap();
    let mut cmd = CommandBuffer::new(device, &pool).unwrap();

    assert!(matches!(cmd.draw(3, 1), Err(GpuError::InvalidState(_))));
    assert!(matches!(cmd.end(), Err(GpuError::InvalidState(_))));

    cmd.begin().unwrap();
    assert!(matches!(
        cmd.submit(context.graphics_queue(), None),
        Err(GpuError::InvalidState(_))
    ));
    assert!(matches!(
        cmd.submit(vk::Queue::null(), None),
        Err(GpuError::InvalidState(_))
    ));
    cmd.end().unwrap();
    assert!(matches!(
        cmd.submit(vk::Queue::null(), None),
        Err(GpuError::NullHandle("queue"))
    ));
}

#[test]
fn fences_report_their_state() {
    let Some(context) = headless() else { return };

    let signaled = Fence::new(context.device().clone(), true).unwrap();
    assert!(signaled.is_signaled().unwrap());
    signaled.reset().unwrap();
    assert!(!signaled.is_signaled().unwrap());

    let unsignaled = Fence::new(context.device().clone(), false).unwrap();
    assert!(!unsignaled.is_signaled().unwrap());
}

#[test]
fn host_visible_buffer_accepts_writes() {
    let Some(context) = headless() else { return };

    let data = [1.0f32, 2.0, 3.0, 4.0];
    let buffer =
        ResourceBuffer::with_data(&context, vk::BufferUsageFlags::UNIFORM_BUFFER, &data).unwrap();
    assert_eq!(buffer.size(), 16);

    buffer.write(8, &[5.0f32, 6.0]).unwrap();
    assert!(matches!(
        buffer.write(12, &[7.0f32, 8.0]),
        Err(GpuError::Buffer(_))
    ));

    let empty = ResourceBuffer::new(
        &context,
        &BufferDesc::host_visible(0, vk::BufferUsageFlags::VERTEX_BUFFER),
    );
    assert!(empty.is_err());
}

#[test]
fn descriptor_set_points_at_uniform_buffer() {
    let Some(context) = headless() else { return };
    let device = context.device().clone();

    let builder = DescriptorSetLayoutBuilder::new().uniform_buffer(0, vk::ShaderStageFlags::VERTEX);
    let layout = builder.build(device.clone()).unwrap();
    let pool = DescriptorPool::new(device.clone(), 1, &builder.pool_sizes()).unwrap();
    let set = DescriptorSet::new(device, &pool, &layout).unwrap();

    let uniforms = ResourceBuffer::with_data(
        &context,
        vk::BufferUsageFlags::UNIFORM_BUFFER,
        &[0.0f32; 16],
    )
    .unwrap();
    set.update_buffers(&[BufferBinding::uniform(0, &uniforms)])
        .unwrap();

    drop(set);
    drop(pool);
}

#[test]
fn presentable_render_pass_builds() {
    let Some(context) = headless() else { return };

    let desc = RenderPassDesc::presentable(vk::Format::B8G8R8A8_UNORM);
    assert!(RenderPass::new(context.device().clone(), &desc).is_ok());

    let empty = RenderPassDesc::default();
    assert!(matches!(
        RenderPass::new(context.device().clone(), &empty),
        Err(GpuError::RenderPassCreation(_))
    ));
}

#[test]
fn aborted_recording_does_not_block_the_next_frame() {
    let Some(context) = headless() else { return };
    let device = context.device().clone();

    let pool = CommandPool::new(device.clone(), context.queue_families().graphics).unwrap();
    let mut cmd = CommandBuffer::new(device, &pool).unwrap();

    // The fence is reset here and nothing will signal it.
    cmd.begin().unwrap();
    cmd.abort().unwrap();
    assert!(!cmd.is_recording());
    assert!(!cmd.is_in_flight());
    assert!(matches!(cmd.abort(), Err(GpuError::InvalidState(_))));

    cmd.wait().unwrap();
    cmd.begin().unwrap();
    cmd.end().unwrap();
    cmd.submit(context.graphics_queue(), None).unwrap();
    assert!(cmd.is_in_flight());
    cmd.wait().unwrap();
    assert!(!cmd.is_in_flight());
}
