use dustmap_assets::{AtlasError, DistanceGrid, TileImage, TileUploader};
use dustmap_common::Viewport;
use dustmap_kernel::RaymarchParams;
use dustmap_render::{RenderBackend, RenderError, RenderUniforms};
use wgpu::util::DeviceExt;

use crate::gpu::{GpuContext, GpuFrame, GpuParams, MAX_TILES, SCREEN_QUAD};
use crate::shaders;

/// An uploaded tile: one RGBA8 texture, single mip level.
pub struct TileTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// wgpu raymarch renderer for one window.
pub struct WgpuBackend {
    gpu: GpuContext,
    window_size: Viewport,
    pipeline: wgpu::RenderPipeline,
    quad_buffer: wgpu::Buffer,
    frame_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    tile_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    placeholder: wgpu::TextureView,
    tile_bind_group: Option<(usize, wgpu::BindGroup)>,
}

impl WgpuBackend {
    pub fn new(gpu: GpuContext, params: &RaymarchParams, grid: &DistanceGrid) -> Self {
        let device = &gpu.device;

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame_uniforms"),
            size: std::mem::size_of::<GpuFrame>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("raymarch_params"),
            contents: bytemuck::bytes_of(&GpuParams::new(params, grid)),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let uniform_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[uniform_entry(0), uniform_entry(1)],
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &uniform_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frame_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        let mut tile_entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        }];
        tile_entries.extend((1..=MAX_TILES as u32).map(|binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        }));
        let tile_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tile_bind_group_layout"),
            entries: &tile_entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("raymarch_pipeline_layout"),
            bind_group_layouts: &[&uniform_layout, &tile_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("raymarch_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::RAYMARCH_SHADER.into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("raymarch_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 2]>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.format(),
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let quad_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("screen_quad"),
            contents: bytemuck::cast_slice(&SCREEN_QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        // Nearest everywhere: linear filtering blurs the seams between tiles.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("tile_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let placeholder = create_tile_texture(&gpu, "tile_placeholder", 1, &[0; 4]).1;
        let window_size = gpu.size();

        Self {
            gpu,
            window_size,
            pipeline,
            quad_buffer,
            frame_buffer,
            uniform_bind_group,
            tile_layout,
            sampler,
            placeholder,
            tile_bind_group: None,
        }
    }

    /// Record a new window size; the render loop applies it on its next tick.
    pub fn set_window_size(&mut self, size: Viewport) {
        self.window_size = size;
    }

    fn create_tile_bind_group(&self, tiles: &[&TileTexture]) -> wgpu::BindGroup {
        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        }];
        entries.extend((0..MAX_TILES).map(|slot| {
            let view = tiles.get(slot).map_or(&self.placeholder, |tile| &tile.view);
            wgpu::BindGroupEntry {
                binding: slot as u32 + 1,
                resource: wgpu::BindingResource::TextureView(view),
            }
        }));
        self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tile_bind_group"),
            layout: &self.tile_layout,
            entries: &entries,
        })
    }
}

impl RenderBackend for WgpuBackend {
    type Handle = TileTexture;

    fn viewport(&self) -> Viewport {
        self.window_size
    }

    fn configure_viewport(&mut self, viewport: Viewport) -> Result<(), RenderError> {
        self.gpu.resize(viewport);
        Ok(())
    }

    fn draw(
        &mut self,
        uniforms: &RenderUniforms,
        tiles: &[&TileTexture],
    ) -> Result<(), RenderError> {
        if tiles.len() > MAX_TILES {
            return Err(RenderError::TooManyTiles {
                count: tiles.len(),
                max: MAX_TILES,
            });
        }

        self.gpu.queue.write_buffer(
            &self.frame_buffer,
            0,
            bytemuck::bytes_of(&GpuFrame::from_uniforms(uniforms)),
        );

        // Slots only ever fill up, so the tile count identifies the bound set.
        if self.tile_bind_group.as_ref().map(|(n, _)| *n) != Some(tiles.len()) {
            let group = self.create_tile_bind_group(tiles);
            self.tile_bind_group = Some((tiles.len(), group));
        }

        let output = match self.gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.gpu.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("surface timeout, frame skipped");
                return Ok(());
            }
            Err(e) => return Err(RenderError::Surface(e.to_string())),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("raymarch_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("raymarch_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });

            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            if let Some((_, group)) = &self.tile_bind_group {
                pass.set_bind_group(1, group, &[]);
            }
            pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
            pass.draw(0..SCREEN_QUAD.len() as u32, 0..1);
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

impl TileUploader for WgpuBackend {
    type Handle = TileTexture;

    fn upload(&mut self, tile: &TileImage) -> Result<TileTexture, AtlasError> {
        let edge = tile.edge();
        let index = tile.key.index;
        if edge > self.gpu.max_texture_dimension() {
            return Err(AtlasError::Upload {
                index,
                reason: format!(
                    "edge {edge} exceeds device limit {}",
                    self.gpu.max_texture_dimension()
                ),
            });
        }
        let expected = tile.bytes_per_row() as usize * edge as usize;
        if tile.rgba.len() != expected {
            return Err(AtlasError::Upload {
                index,
                reason: format!("{} bytes, expected {expected}", tile.rgba.len()),
            });
        }

        let (texture, view) =
            create_tile_texture(&self.gpu, &tile.key.file_name(), tile.edge(), &tile.rgba);
        tracing::debug!(index, edge, "uploaded tile texture");
        Ok(TileTexture {
            _texture: texture,
            view,
        })
    }
}

/// Create a square RGBA8 texture with one mip level and fill it.
fn create_tile_texture(
    gpu: &GpuContext,
    label: &str,
    edge: u32,
    rgba: &[u8],
) -> (wgpu::Texture, wgpu::TextureView) {
    let size = wgpu::Extent3d {
        width: edge,
        height: edge,
        depth_or_array_layers: 1,
    };
    let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    gpu.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * edge),
            rows_per_image: Some(edge),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}
