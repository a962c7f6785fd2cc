use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::error::{GfxError, Result};

use super::surface::{self, ConfigureStep, SurfaceSpec, SurfaceState};
use super::{check_host, GpuFrame, GpuInit, OutputTarget};

/// Owns the adapter, logical device, queue and the presentation surface.
///
/// This is the surface context every other component borrows from:
/// - `new` checks the host, then acquires adapter and device
/// - `configure` / `resize_to` (re)apply the surface configuration
/// - `begin_frame` / `submit` bracket one frame's command recording
pub struct Gpu<'w> {
    /// Surface bound to the window. The window must outlive `Gpu`.
    surface: wgpu::Surface<'w>,

    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,

    /// Last requested configuration and whether it is applied.
    state: SurfaceState,

    desired_maximum_frame_latency: u32,
}

impl<'w> Gpu<'w> {
    /// Binds a surface to `window` and acquires a device for it.
    ///
    /// Fails with [`GfxError::Unsupported`] before creating anything when the
    /// host check finds no backend, and with [`GfxError::AdapterUnavailable`]
    /// when no adapter matches `init.power_preference`.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let backends = check_host(&init)?;
        let size = window.physical_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| GfxError::Unsupported(format!("cannot create presentation surface: {e}")))?;

        let adapter = request_adapter(&instance, init.power_preference, Some(&surface)).await?;
        let (device, queue) = request_device(&adapter, &init).await?;

        let caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&caps.formats, init.prefer_srgb)
            .ok_or_else(|| GfxError::Unsupported("surface reports no texture formats".to_string()))?;
        let alpha_mode = surface::choose_alpha_mode(&caps.alpha_modes, init.alpha_mode);
        let present_mode = if caps.present_modes.contains(&init.present_mode) {
            init.present_mode
        } else {
            wgpu::PresentMode::Fifo
        };

        let spec = SurfaceSpec {
            format,
            width: size.width,
            height: size.height,
            alpha_mode,
            present_mode,
        };

        let mut gpu = Self {
            surface,
            adapter,
            device,
            queue,
            state: SurfaceState::new(spec),
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };
        gpu.configure(size);

        Ok(gpu)
    }

    /// Returns the active surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.state.spec.format
    }

    /// Returns the current drawable size (physical pixels).
    pub fn size(&self) -> PhysicalSize<u32> {
        self.state.spec.size()
    }

    /// Returns the last requested surface configuration.
    pub fn spec(&self) -> SurfaceSpec {
        self.state.spec
    }

    /// Whether the surface currently holds an applied configuration.
    pub fn is_configured(&self) -> bool {
        self.state.configured
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Applies the surface configuration for `size`.
    ///
    /// Idempotent: reapplying an identical configuration leaves the surface in
    /// the same state. A zero-area size is recorded but not applied; returns
    /// whether the surface ended up configured.
    pub fn configure(&mut self, size: PhysicalSize<u32>) -> bool {
        match self.state.request(size) {
            ConfigureStep::Defer => {
                log::debug!("deferring surface configuration for {}x{}", size.width, size.height);
                false
            }
            ConfigureStep::Apply { changed } => {
                let spec = self.state.spec;
                self.surface
                    .configure(&self.device, &spec.to_config(self.desired_maximum_frame_latency));

                if changed {
                    log::info!(
                        "surface configured: {}x{} {:?} alpha={:?}",
                        spec.width,
                        spec.height,
                        spec.format,
                        spec.alpha_mode
                    );
                } else {
                    log::debug!("surface reconfigured at {}x{}", spec.width, spec.height);
                }
                true
            }
        }
    }

    /// Reapplies the current configuration, e.g. after the surface was lost.
    pub fn reconfigure(&mut self) -> bool {
        self.configure(self.state.spec.size())
    }

    /// Re-reads the target's logical size and scale and configures for the
    /// resulting physical size.
    pub fn resize_to<T>(&mut self, target: &T) -> bool
    where
        T: OutputTarget + ?Sized,
    {
        self.configure(target.physical_size())
    }

    /// Acquires the current surface texture and creates an encoder.
    ///
    /// Fails with [`GfxError::SurfaceLost`] if the surface is unconfigured or
    /// invalid, and with [`GfxError::FrameSkipped`] while it has zero area.
    pub fn begin_frame(&self) -> Result<GpuFrame> {
        if !self.state.spec.is_presentable() {
            return Err(GfxError::FrameSkipped("surface has zero area".to_string()));
        }
        if !self.state.configured {
            return Err(GfxError::SurfaceLost(
                "surface has not been configured".to_string(),
            ));
        }

        let surface_texture = self
            .surface
            .get_current_texture()
            .map_err(surface::map_surface_error)?;

        if surface_texture.suboptimal {
            log::debug!("surface texture is suboptimal; a resize is likely pending");
        }

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("trigon frame encoder"),
            });

        Ok(GpuFrame {
            surface_texture,
            view,
            encoder,
        })
    }

    /// Finalizes the frame's commands, submits them and presents the texture.
    pub fn submit(&self, frame: GpuFrame) {
        let GpuFrame {
            surface_texture,
            view,
            encoder,
        } = frame;

        self.queue.submit(std::iter::once(encoder.finish()));
        drop(view);
        surface_texture.present();
    }
}

/// Requests an adapter, optionally compatible with `surface`.
pub(crate) async fn request_adapter(
    instance: &wgpu::Instance,
    power_preference: wgpu::PowerPreference,
    compatible_surface: Option<&wgpu::Surface<'_>>,
) -> Result<wgpu::Adapter> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| GfxError::AdapterUnavailable {
            power_preference,
            reason: e.to_string(),
        })?;

    let info = adapter.get_info();
    log::info!(
        "using adapter `{}` ({:?}, {:?})",
        info.name,
        info.backend,
        info.device_type
    );

    Ok(adapter)
}

/// Opens the logical device and its queue.
pub(crate) async fn request_device(
    adapter: &wgpu::Adapter,
    init: &GpuInit,
) -> Result<(wgpu::Device, wgpu::Queue)> {
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("trigon device"),
            required_features: init.required_features,
            required_limits: init.required_limits.clone(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await?;

    Ok((device, queue))
}
