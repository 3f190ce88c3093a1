//! Blocking page rendering for sites that need script execution.

mod chrome;

use crate::error::RenderError;

pub use chrome::{ChromeOptions, ChromeRenderer, ChromeRendererFactory};

/// A rendering session. Releasing the session (closing its browser process) is
/// done on drop, so it happens on every exit path of the task that owns it.
pub trait Renderer {
    /// Loads `url` and returns the rendered HTML. Blocks the calling thread.
    fn render(&mut self, url: &str) -> Result<String, RenderError>;
}

/// Produces one fresh [`Renderer`] per detail task. Sessions are never reused.
pub trait RendererFactory: Send + Sync + 'static {
    type Renderer: Renderer;

    fn acquire(&self) -> Result<Self::Renderer, RenderError>;
}
