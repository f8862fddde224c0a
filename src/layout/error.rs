use crate::config::LayoutConfig;
use crate::theme::Theme;

use super::text::measure_label;
use super::{Bounds, ErrorLayout, Layout};

pub const ERROR_PREFIX: &str = "Error rendering the mindmap: ";

const ERROR_MAX_WIDTH: f32 = 420.0;

/// Layout holding a single node that reports why the outline could not be drawn.
pub fn compute_error_layout(message: &str, theme: &Theme, config: &LayoutConfig) -> Layout {
    let message = format!("{ERROR_PREFIX}{message}");
    let label = measure_label(&message, theme.font_size, ERROR_MAX_WIDTH, config);
    let width = label.width + config.mindmap.padding_x * 2.0;
    let height = label.height + config.mindmap.padding_y * 2.0;
    let bounds = Bounds::new(-width / 2.0, -height / 2.0, width, height);
    Layout {
        nodes: Vec::new(),
        edges: Vec::new(),
        bounds,
        error: Some(ErrorLayout {
            message,
            label,
            bounds,
        }),
    }
}
