use winit::event::WindowEvent;

use crate::device::Gpu;
use crate::error::Result;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// What the runtime drives once a surface exists.
pub trait App {
    /// Builds pipelines and uploads static resources. Called once, after the
    /// surface is first configured.
    fn init(&mut self, gpu: &Gpu<'_>) -> Result<()>;

    /// Called for window events before the runtime handles them.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Records and submits one frame. Must not rebuild what `init` built.
    fn render(&mut self, gpu: &mut Gpu<'_>) -> Result<()>;
}
