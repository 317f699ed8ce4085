use winit::event::WindowEvent;

use crate::render::{Scene, Vertex};
use crate::time::FrameTime;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by the binary.
pub trait App {
    /// Scene built once the device context is ready.
    fn scene(&mut self) -> Scene;

    /// Called once per frame before rendering.
    ///
    /// Returning vertices rewrites the (dynamic) geometry buffer; the count
    /// must match the scene's.
    fn update(&mut self, time: &FrameTime) -> Option<Vec<Vertex>> {
        let _ = time;
        None
    }

    /// Called for window events before the runtime handles them.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }
}
