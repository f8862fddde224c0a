mod error;
mod mindmap;
mod text;
mod types;

pub use error::{ERROR_PREFIX, compute_error_layout};
pub use types::*;

use crate::config::LayoutConfig;
use crate::ir::Mindmap;
use crate::theme::Theme;
use crate::transform::{TransformError, transform};
use mindmap::compute_mindmap_layout;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("layout produced no nodes")]
    NoNodes,
}

/// Turns outline markdown (front matter included) into a positioned diagram.
///
/// The diagram renderer only talks to this trait, so another layout engine can
/// be mounted without touching the session or export code.
pub trait LayoutCapability {
    fn layout(&self, source: &str, theme: &Theme, config: &LayoutConfig) -> Result<Layout, RenderError>;
}

/// Built-in two-sided tree layout for markmap-style outlines.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkmapLayout;

impl LayoutCapability for MarkmapLayout {
    fn layout(&self, source: &str, theme: &Theme, config: &LayoutConfig) -> Result<Layout, RenderError> {
        let mindmap = transform(source)?;
        let layout = compute_layout(&mindmap, theme, config);
        if layout.nodes.is_empty() {
            return Err(RenderError::NoNodes);
        }
        Ok(layout)
    }
}

pub fn compute_layout(mindmap: &Mindmap, theme: &Theme, config: &LayoutConfig) -> Layout {
    compute_mindmap_layout(mindmap, theme, config)
}
