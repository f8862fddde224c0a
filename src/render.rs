use crate::config::LayoutConfig;
use crate::layout::{Bounds, EdgeLayout, ErrorLayout, Layout, NodeLayout, TextBlock};
use crate::theme::Theme;

/// Draws the positioned diagram as an SVG group in diagram coordinates.
pub fn render_content(layout: &Layout, theme: &Theme, config: &LayoutConfig) -> String {
    let mut svg = String::new();
    if let Some(error) = &layout.error {
        svg.push_str("<g class=\"markmap-error\">");
        svg.push_str(&error_svg(error, theme, config));
        svg.push_str("</g>");
        return svg;
    }

    svg.push_str(&format!(
        "<g class=\"markmap\" font-family=\"{}\">",
        escape_xml(&theme.font_family)
    ));
    for edge in &layout.edges {
        svg.push_str(&edge_svg(edge));
    }
    for node in &layout.nodes {
        svg.push_str(&node_svg(node, config));
    }
    svg.push_str("</g>");
    svg
}

/// Wraps drawn content in a root `<svg>` element showing `view_box` at `width` x `height`.
pub fn svg_document(
    content: &str,
    width: f32,
    height: f32,
    view_box: Bounds,
    background: Option<&str>,
) -> String {
    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"{:.2} {:.2} {:.2} {:.2}\">",
        view_box.x, view_box.y, view_box.width, view_box.height
    );
    if let Some(background) = background {
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"/>",
            view_box.x,
            view_box.y,
            view_box.width,
            view_box.height,
            escape_xml(background)
        ));
    }
    svg.push_str(content);
    svg.push_str("</svg>");
    svg
}

fn edge_svg(edge: &EdgeLayout) -> String {
    format!(
        "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{:.2}\" stroke-linecap=\"round\"/>",
        points_to_path(&edge.points),
        escape_xml(&edge.stroke),
        edge.stroke_width
    )
}

fn node_svg(node: &NodeLayout, config: &LayoutConfig) -> String {
    let radius = config.mindmap.corner_radius;
    let stroke = match &node.style.stroke {
        Some(stroke) => format!(" stroke=\"{}\" stroke-width=\"1.2\"", escape_xml(stroke)),
        None => String::new(),
    };
    let mut svg = format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{radius}\" ry=\"{radius}\" fill=\"{}\"{stroke}/>",
        node.x,
        node.y,
        node.width,
        node.height,
        escape_xml(&node.style.fill),
    );
    let (cx, cy) = node.bounds().center();
    svg.push_str(&text_block_svg(
        cx,
        cy,
        &node.label,
        &node.style.text_color,
        node.style.bold,
        config,
    ));
    svg
}

fn error_svg(error: &ErrorLayout, theme: &Theme, config: &LayoutConfig) -> String {
    let bounds = error.bounds;
    let mut svg = format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"6\" ry=\"6\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.5\"/>",
        bounds.x,
        bounds.y,
        bounds.width,
        bounds.height,
        escape_xml(&theme.background),
        escape_xml(&theme.error_color)
    );
    let (cx, cy) = bounds.center();
    svg.push_str(&text_block_svg(
        cx,
        cy,
        &error.label,
        &theme.error_color,
        false,
        config,
    ));
    svg
}

fn points_to_path(points: &[(f32, f32); 4]) -> String {
    let [start, c1, c2, end] = points;
    format!(
        "M {:.2} {:.2} C {:.2} {:.2}, {:.2} {:.2}, {:.2} {:.2}",
        start.0, start.1, c1.0, c1.1, c2.0, c2.1, end.0, end.1
    )
}

fn text_block_svg(
    x: f32,
    y: f32,
    label: &TextBlock,
    fill: &str,
    bold: bool,
    config: &LayoutConfig,
) -> String {
    let line_height = label.font_size * config.label_line_height;
    let total_height = label.lines.len() as f32 * line_height;
    // Baseline of the first line, roughly centering the block's cap height.
    let start_y = y - total_height / 2.0 + line_height / 2.0 + label.font_size * 0.35;
    let weight = if bold { " font-weight=\"600\"" } else { "" };

    let mut text = format!(
        "<text x=\"{x:.2}\" y=\"{start_y:.2}\" text-anchor=\"middle\" font-size=\"{}\" fill=\"{}\"{weight}>",
        label.font_size,
        escape_xml(fill)
    );
    for (idx, line) in label.lines.iter().enumerate() {
        let dy = if idx == 0 { 0.0 } else { line_height };
        text.push_str(&format!(
            "<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}</tspan>",
            escape_xml(line)
        ));
    }
    text.push_str("</text>");
    text
}

pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
