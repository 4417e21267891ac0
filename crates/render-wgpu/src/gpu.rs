use bytemuck::{Pod, Zeroable};
use dustmap_assets::DistanceGrid;
use dustmap_common::Viewport;
use dustmap_kernel::RaymarchParams;
use dustmap_render::{RenderError, RenderUniforms};

/// Tile texture slots declared by the raymarch program.
pub const MAX_TILES: usize = 16;

/// Per-frame uniform block, laid out to match `Frame` in the shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(crate) struct GpuFrame {
    pub rotation: [[f32; 4]; 4],
    pub origin: [f32; 3],
    pub elapsed_ms: f32,
    pub viewport: [f32; 2],
    pub tile_count: u32,
    pub _pad: u32,
}

impl GpuFrame {
    pub fn from_uniforms(uniforms: &RenderUniforms) -> Self {
        Self {
            rotation: uniforms.rotation,
            origin: uniforms.origin,
            elapsed_ms: uniforms.elapsed_ms,
            viewport: uniforms.viewport,
            tile_count: uniforms.sampler_indices.len() as u32,
            _pad: 0,
        }
    }
}

/// Static raymarch parameters, laid out to match `Params` in the shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(crate) struct GpuParams {
    pub fov_deg: f32,
    pub tau_max: f32,
    pub xi: f32,
    pub n_steps_max: u32,
    pub n_samples: u32,
    pub color: i32,
    pub dm_min: f32,
    pub dm_max: f32,
    pub dm_bins: u32,
    pub _pad: [u32; 3],
}

impl GpuParams {
    pub fn new(params: &RaymarchParams, grid: &DistanceGrid) -> Self {
        Self {
            fov_deg: params.fov as f32,
            tau_max: params.tau_max as f32,
            xi: params.xi as f32,
            n_steps_max: params.n_steps_max,
            n_samples: params.n_samples,
            color: params.color,
            dm_min: grid.dm_min,
            dm_max: grid.dm_max,
            dm_bins: grid.bins,
            _pad: [0; 3],
        }
    }
}

/// Two triangles covering clip space.
#[rustfmt::skip]
pub(crate) const SCREEN_QUAD: [[f32; 2]; 6] = [
    [-1.0, -1.0], [ 1.0, -1.0], [-1.0,  1.0],
    [-1.0,  1.0], [ 1.0, -1.0], [ 1.0,  1.0],
];

/// Surface, device and queue for one window.
pub struct GpuContext {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    max_texture_dimension: u32,
}

impl GpuContext {
    /// Acquire an adapter and device for `target` and configure its surface.
    pub fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        size: Viewport,
    ) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(target)
            .map_err(|e| RenderError::Surface(e.to_string()))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or(RenderError::NoAdapter)?;

        let adapter_limits = adapter.limits();
        let max_texture_dimension = adapter_limits.max_texture_dimension_2d;
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("dustmap_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: max_texture_dimension,
                    ..wgpu::Limits::default()
                },
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| RenderError::Device(e.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The raymarcher writes display values directly; prefer a linear format.
        let format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| RenderError::Surface("surface reports no formats".into()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        tracing::info!(
            backend = adapter.get_info().backend.to_str(),
            max_texture_dimension,
            ?format,
            "GPU initialized"
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            max_texture_dimension,
        })
    }

    /// Largest square texture edge the device accepts.
    pub fn max_texture_dimension(&self) -> u32 {
        self.max_texture_dimension
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> Viewport {
        Viewport::new(self.config.width, self.config.height)
    }

    pub fn resize(&mut self, size: Viewport) {
        self.config.width = size.width.max(1);
        self.config.height = size.height.max(1);
        self.surface.configure(&self.device, &self.config);
    }

    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }
}
