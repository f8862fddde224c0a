//! The single live diagram surface.
//!
//! [`DiagramRenderer`] is the only place a [`DiagramHandle`] is created or dropped.
//! Everyone else reads the current handle through [`DiagramRenderer::handle`].

use crate::config::{Config, LayoutConfig, RenderConfig};
use crate::layout::{Bounds, Layout, LayoutCapability, MarkmapLayout, compute_error_layout};
use crate::render::{render_content, svg_document};
use crate::theme::Theme;
use crate::transform::{FRONT_MATTER_MARKER, ensure_front_matter};
use log::{debug, error};
use std::borrow::Cow;

/// Pan and zoom applied to the content on the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub translate_x: f32,
    pub translate_y: f32,
    pub scale: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            translate_x: 0.0,
            translate_y: 0.0,
            scale: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiagramHandle {
    mount_id: u64,
    layout: Layout,
    content: String,
    view: ViewTransform,
    viewport: (f32, f32),
}

impl DiagramHandle {
    pub fn mount_id(&self) -> u64 {
        self.mount_id
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Drawn content in diagram coordinates, without any view transform.
    pub fn content_svg(&self) -> &str {
        &self.content
    }

    /// Tight bounding box of the drawn content.
    pub fn bbox(&self) -> Bounds {
        self.layout.bounds
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    pub fn is_error(&self) -> bool {
        self.layout.is_error()
    }

    pub fn has_content(&self) -> bool {
        self.layout.has_content()
    }

    /// Full viewport-sized surface with the current view transform applied.
    pub fn surface_svg(&self, background: &str) -> String {
        let (width, height) = self.viewport;
        let group = format!(
            "<g transform=\"translate({:.2} {:.2}) scale({:.4})\">{}</g>",
            self.view.translate_x, self.view.translate_y, self.view.scale, self.content
        );
        svg_document(
            &group,
            width,
            height,
            Bounds::new(0.0, 0.0, width, height),
            Some(background),
        )
    }
}

pub struct DiagramRenderer<L: LayoutCapability = MarkmapLayout> {
    capability: L,
    theme: Theme,
    layout_config: LayoutConfig,
    render_config: RenderConfig,
    handle: Option<DiagramHandle>,
    next_mount_id: u64,
    visible: bool,
}

impl DiagramRenderer<MarkmapLayout> {
    pub fn new(config: &Config) -> Self {
        Self::with_capability(MarkmapLayout, config)
    }
}

impl<L: LayoutCapability> DiagramRenderer<L> {
    pub fn with_capability(capability: L, config: &Config) -> Self {
        Self {
            capability,
            theme: config.theme.clone(),
            layout_config: config.layout.clone(),
            render_config: config.render.clone(),
            handle: None,
            next_mount_id: 1,
            visible: true,
        }
    }

    /// Replaces the current diagram with one drawn from `markdown`.
    ///
    /// Never fails: markdown the layout rejects is drawn as an error node.
    pub fn render(&mut self, markdown: &str) -> &DiagramHandle {
        self.handle = None;

        let source = prepare_source(markdown, self.layout_config.mindmap.max_node_width);
        let layout = match self
            .capability
            .layout(&source, &self.theme, &self.layout_config)
        {
            Ok(layout) => layout,
            Err(err) => {
                error!("failed to render mind map: {err}");
                compute_error_layout(&err.to_string(), &self.theme, &self.layout_config)
            }
        };
        let content = render_content(&layout, &self.theme, &self.layout_config);

        let mount_id = self.next_mount_id;
        self.next_mount_id += 1;
        let viewport = (self.render_config.width, self.render_config.height);
        let mut handle = DiagramHandle {
            mount_id,
            layout,
            content,
            view: ViewTransform::default(),
            viewport,
        };
        handle.view = fit_view(handle.bbox(), viewport, &self.render_config);
        debug!(
            "mounted diagram {mount_id} with {} nodes",
            handle.layout.nodes.len()
        );
        self.visible = true;
        self.handle.insert(handle)
    }

    /// Re-centers and re-scales the diagram to the viewport.
    pub fn refit(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            handle.view = fit_view(handle.layout.bounds, handle.viewport, &self.render_config);
        }
    }

    /// Multiplies the current scale around the viewport center.
    pub fn zoom(&mut self, factor: f32) {
        let config = &self.render_config;
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let view = handle.view;
        let scale = (view.scale * factor).clamp(config.min_zoom, config.max_zoom);
        let (cx, cy) = (handle.viewport.0 / 2.0, handle.viewport.1 / 2.0);
        // Content point under the viewport center stays put.
        let px = (cx - view.translate_x) / view.scale;
        let py = (cy - view.translate_y) / view.scale;
        handle.view = ViewTransform {
            translate_x: cx - px * scale,
            translate_y: cy - py * scale,
            scale,
        };
    }

    pub fn zoom_in(&mut self) {
        self.zoom(self.render_config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.zoom(1.0 / self.render_config.zoom_step);
    }

    pub fn clear(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("detached diagram {}", handle.mount_id);
        }
    }

    pub fn handle(&self) -> Option<&DiagramHandle> {
        self.handle.as_ref()
    }

    /// Hides the surface without destroying the diagram.
    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn is_visible(&self) -> bool {
        self.visible && self.handle.is_some()
    }

    pub fn surface_svg(&self) -> Option<String> {
        self.handle
            .as_ref()
            .map(|handle| handle.surface_svg(&self.render_config.background))
    }
}

fn prepare_source(markdown: &str, max_width: f32) -> Cow<'_, str> {
    let trimmed = markdown.trim_start();
    if trimmed.starts_with(FRONT_MATTER_MARKER) || trimmed.starts_with('#') {
        return ensure_front_matter(trimmed, max_width);
    }
    Cow::Owned(ensure_front_matter(&format!("# {trimmed}"), max_width).into_owned())
}

fn fit_view(bbox: Bounds, viewport: (f32, f32), config: &RenderConfig) -> ViewTransform {
    if bbox.is_empty() {
        return ViewTransform::default();
    }
    let available_w = (viewport.0 - config.fit_padding * 2.0).max(1.0);
    let available_h = (viewport.1 - config.fit_padding * 2.0).max(1.0);
    let scale = (available_w / bbox.width)
        .min(available_h / bbox.height)
        .min(config.max_fit_scale);
    let (cx, cy) = bbox.center();
    ViewTransform {
        translate_x: viewport.0 / 2.0 - cx * scale,
        translate_y: viewport.1 / 2.0 - cy * scale,
        scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::RenderError;

    fn renderer() -> DiagramRenderer {
        DiagramRenderer::new(&Config::default())
    }

    #[test]
    fn render_mounts_fitted_handle() {
        let mut renderer = renderer();
        let handle = renderer.render("# Cats\n\n## Breeds\n\n## Care");
        assert!(handle.has_content());
        assert_eq!(handle.layout().nodes.len(), 3);
        let view = handle.view();
        let bbox = handle.bbox();
        let (cx, cy) = bbox.center();
        assert!((cx * view.scale + view.translate_x - 600.0).abs() < 0.01);
        assert!((cy * view.scale + view.translate_y - 400.0).abs() < 0.01);
        assert!(view.scale <= RenderConfig::default().max_fit_scale);
    }

    #[test]
    fn each_render_replaces_the_previous_handle() {
        let mut renderer = renderer();
        let first = renderer.render("# A").mount_id();
        let second = renderer.render("# B").mount_id();
        assert!(second > first);
        assert_eq!(renderer.handle().unwrap().layout().nodes[0].label.lines, vec!["B"]);
    }

    #[test]
    fn missing_marker_is_prepended() {
        let mut renderer = renderer();
        let handle = renderer.render("Plain title");
        assert_eq!(handle.layout().nodes[0].label.lines, vec!["Plain title"]);
    }

    #[test]
    fn invalid_front_matter_becomes_error_node() {
        let mut renderer = renderer();
        let handle = renderer.render("---\nmarkmap: [broken\n---\n# T");
        assert!(handle.is_error());
        assert!(!handle.has_content());
        assert!(handle.content_svg().contains("Error rendering the mindmap"));
        assert!(renderer.surface_svg().is_some());
    }

    #[test]
    fn zoom_is_clamped_and_keeps_center() {
        let mut renderer = renderer();
        renderer.render("# Cats\n\n## Breeds");
        let before = renderer.handle().unwrap().view();
        let center_content = (
            (600.0 - before.translate_x) / before.scale,
            (400.0 - before.translate_y) / before.scale,
        );
        renderer.zoom(2.0);
        let after = renderer.handle().unwrap().view();
        assert!((after.scale - (before.scale * 2.0).min(8.0)).abs() < 1e-4);
        assert!((center_content.0 * after.scale + after.translate_x - 600.0).abs() < 0.01);

        for _ in 0..50 {
            renderer.zoom_in();
        }
        assert_eq!(renderer.handle().unwrap().view().scale, 8.0);
        for _ in 0..100 {
            renderer.zoom_out();
        }
        assert!((renderer.handle().unwrap().view().scale - 0.1).abs() < 1e-6);

        renderer.refit();
        assert_eq!(renderer.handle().unwrap().view(), before);
    }

    #[test]
    fn fit_and_zoom_without_handle_are_noops() {
        let mut renderer = renderer();
        renderer.refit();
        renderer.zoom(2.0);
        assert!(renderer.handle().is_none());
        assert!(renderer.surface_svg().is_none());
    }

    #[test]
    fn hide_keeps_the_diagram() {
        let mut renderer = renderer();
        renderer.render("# A");
        renderer.hide();
        assert!(!renderer.is_visible());
        assert!(renderer.handle().is_some());
        renderer.show();
        assert!(renderer.is_visible());
        renderer.clear();
        assert!(renderer.handle().is_none());
    }

    struct Failing;

    impl LayoutCapability for Failing {
        fn layout(&self, _: &str, _: &Theme, _: &LayoutConfig) -> Result<Layout, RenderError> {
            Err(RenderError::NoNodes)
        }
    }

    #[test]
    fn custom_capability_failures_are_contained() {
        let mut renderer = DiagramRenderer::with_capability(Failing, &Config::default());
        let handle = renderer.render("# A");
        assert!(handle.is_error());
    }
}
