use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::core::{App, AppControl, Lifecycle, StageEvent};
use crate::device::{Gpu, GpuInit};
use crate::error::GfxError;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "trigon".to_string(),
            initial_size: LogicalSize::new(800.0, 600.0),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window and drives `app` until the window closes, Escape is
    /// pressed, or a fatal error occurs. Fatal errors are returned.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: 'static + App,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    lifecycle: Lifecycle,
    resize_pending: bool,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState<A>
where
    A: App + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    entry: Option<WindowEntry>,
    fatal: Option<anyhow::Error>,
    exit_requested: bool,
}

impl<A> AppState<A>
where
    A: App + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            config,
            gpu_init,
            app,
            entry: None,
            fatal: None,
            exit_requested: false,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        if self.fatal.is_none() {
            self.fatal = Some(err);
        }
        self.exit_requested = true;
        event_loop.exit();
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();

        let mut entry = WindowEntryTryBuilder {
            lifecycle: Lifecycle::new(),
            resize_pending: false,
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed")?;

        let app = &mut self.app;
        entry.with_mut(|fields| -> Result<()> {
            fields.lifecycle.apply(StageEvent::SurfaceConfigured)?;
            app.init(fields.gpu).context("failed to build render resources")?;
            fields.lifecycle.apply(StageEvent::ResourcesBuilt)?;
            fields.window.request_redraw();
            Ok(())
        })?;

        self.entry = Some(entry);
        Ok(())
    }

    /// Applies any pending resize, then renders one frame.
    fn redraw(&mut self) -> Result<()> {
        let (app, Some(entry)) = (&mut self.app, self.entry.as_mut()) else {
            return Ok(());
        };

        entry.with_mut(|fields| -> Result<()> {
            if *fields.resize_pending {
                *fields.resize_pending = false;
                fields.gpu.resize_to(fields.window);
                fields.lifecycle.apply(StageEvent::Resized)?;
            }

            fields.window.pre_present_notify();

            match app.render(fields.gpu) {
                Ok(()) => {
                    fields.lifecycle.apply(StageEvent::FrameSubmitted)?;
                }
                Err(GfxError::FrameSkipped(reason)) => {
                    log::debug!("frame skipped: {reason}");
                }
                Err(err) => return Err(anyhow!(err).context("frame failed")),
            }
            Ok(())
        })
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: App + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }

        if let Err(e) = self.create_window_entry(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        // Frames are drawn on demand only: initial frame, resize, expose.
        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        if self.app.on_window_event(&event) == AppControl::Exit {
            self.exit_requested = true;
            event_loop.exit();
            return;
        }

        match &event {
            WindowEvent::CloseRequested => {
                self.entry = None;
                self.exit_requested = true;
            }

            WindowEvent::KeyboardInput { event: key, .. }
                if is_exit_key(key.physical_key, key.state) =>
            {
                log::info!("escape pressed; exiting");
                self.entry = None;
                self.exit_requested = true;
            }

            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                // Coalesced: only the next redraw reads the final size.
                if let Some(entry) = self.entry.as_mut() {
                    entry.with_mut(|fields| {
                        *fields.resize_pending = true;
                        fields.window.request_redraw();
                    });
                }
            }

            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, e);
                }
            }

            _ => {}
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }
}

fn is_exit_key(key: PhysicalKey, state: ElementState) -> bool {
    state == ElementState::Pressed && key == PhysicalKey::Code(KeyCode::Escape)
}
