//! `wgpu` implementations of the host interfaces.
//!
//! Texture handles are assigned by [`WgpuDevice`] and resolve through [`WgpuDevice::texture`];
//! a backend sharing the device looks its textures up there.

use std::collections::HashMap;

use crate::foundation::core::{ExecutionToken, NativeHandle};
use crate::foundation::error::{UpscaleError, UpscaleResult};
use crate::render::host::{
    ColorFormat, CommandStream, IntermediateBuffer, RenderDevice, TargetDesc,
};

fn texture_format(format: ColorFormat) -> wgpu::TextureFormat {
    match format {
        ColorFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
    }
}

/// [`RenderDevice`] backed by a `wgpu` device.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    textures: HashMap<NativeHandle, wgpu::Texture>,
    next_handle: usize,
}

impl std::fmt::Debug for WgpuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuDevice")
            .field("live_targets", &self.textures.len())
            .finish_non_exhaustive()
    }
}

impl WgpuDevice {
    /// Request a high-performance adapter and a device on it.
    pub fn new() -> UpscaleResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| match e {
            wgpu::RequestAdapterError::NotFound { .. } => {
                UpscaleError::boundary("no gpu adapter available")
            }
            other => UpscaleError::boundary(format!("wgpu request_adapter failed: {other:?}")),
        })?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("upscale_bridge_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| UpscaleError::boundary(format!("wgpu request_device failed: {e:?}")))?;

        Ok(Self::from_parts(device, queue))
    }

    /// Wrap an existing device and queue (e.g. the host engine's own).
    pub fn from_parts(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            textures: HashMap::new(),
            next_handle: 0,
        }
    }

    /// The underlying device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The submission queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Resolve a handle issued by this device.
    pub fn texture(&self, handle: NativeHandle) -> Option<&wgpu::Texture> {
        self.textures.get(&handle)
    }

    /// Number of targets currently allocated.
    pub fn live_targets(&self) -> usize {
        self.textures.len()
    }

    /// Start a command stream on this device.
    pub fn command_stream(&self) -> WgpuCommandStream {
        WgpuCommandStream::new(&self.device)
    }
}

impl RenderDevice for WgpuDevice {
    fn allocate_color_target(&mut self, desc: &TargetDesc) -> UpscaleResult<IntermediateBuffer> {
        let max = self.device.limits().max_texture_dimension_2d;
        let extent = desc.extent;
        if extent.is_empty() || extent.width > max || extent.height > max {
            return Err(UpscaleError::allocation(format!(
                "render target {extent} outside device limit {max}"
            )));
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: extent.width,
                height: extent.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(desc.format),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.next_handle = self.next_handle.saturating_add(1);
        let handle = NativeHandle::new(self.next_handle)
            .ok_or_else(|| UpscaleError::allocation("texture handle space exhausted"))?;
        self.textures.insert(handle, texture);
        Ok(IntermediateBuffer::new(handle, desc))
    }

    fn release_color_target(&mut self, target: IntermediateBuffer) {
        if let Some(texture) = self.textures.remove(&target.handle()) {
            texture.destroy();
        }
    }
}

enum Recorded {
    Commands(wgpu::CommandBuffer),
    Event(ExecutionToken, i32),
}

/// [`CommandStream`] over a `wgpu::CommandEncoder`.
///
/// A plugin event closes the current encoder, so on [`submit`](Self::submit) everything recorded
/// before the event reaches the queue before the event is dispatched.
pub struct WgpuCommandStream {
    device: wgpu::Device,
    encoder: wgpu::CommandEncoder,
    open_groups: Vec<String>,
    recorded: Vec<Recorded>,
}

impl WgpuCommandStream {
    /// Begin recording on `device`.
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            device: device.clone(),
            encoder: new_encoder(device),
            open_groups: Vec::new(),
            recorded: Vec::new(),
        }
    }

    /// Encoder for the host's own commands at the current position.
    pub fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        &mut self.encoder
    }

    fn split(&mut self) {
        for _ in &self.open_groups {
            self.encoder.pop_debug_group();
        }
        let mut next = new_encoder(&self.device);
        for label in &self.open_groups {
            next.push_debug_group(label);
        }
        let done = std::mem::replace(&mut self.encoder, next);
        self.recorded.push(Recorded::Commands(done.finish()));
    }

    /// Submit in recording order, calling `dispatch` for each plugin event at its position.
    ///
    /// Returns the number of events dispatched. Does not wait for GPU completion.
    pub fn submit(
        mut self,
        queue: &wgpu::Queue,
        mut dispatch: impl FnMut(ExecutionToken, i32),
    ) -> usize {
        for _ in self.open_groups.drain(..) {
            self.encoder.pop_debug_group();
        }
        self.recorded.push(Recorded::Commands(self.encoder.finish()));

        let mut pending = Vec::new();
        let mut events = 0usize;
        for item in self.recorded {
            match item {
                Recorded::Commands(buffer) => pending.push(buffer),
                Recorded::Event(token, event_id) => {
                    if !pending.is_empty() {
                        queue.submit(pending.drain(..));
                    }
                    dispatch(token, event_id);
                    events += 1;
                }
            }
        }
        if !pending.is_empty() {
            queue.submit(pending);
        }
        events
    }
}

fn new_encoder(device: &wgpu::Device) -> wgpu::CommandEncoder {
    device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("upscale_bridge_frame"),
    })
}

impl CommandStream for WgpuCommandStream {
    fn push_debug_group(&mut self, label: &str) {
        self.encoder.push_debug_group(label);
        self.open_groups.push(label.to_owned());
    }

    fn pop_debug_group(&mut self) {
        if self.open_groups.pop().is_some() {
            self.encoder.pop_debug_group();
        }
    }

    fn issue_plugin_event(&mut self, token: ExecutionToken, event_id: i32) {
        self.split();
        self.recorded.push(Recorded::Event(token, event_id));
    }
}
