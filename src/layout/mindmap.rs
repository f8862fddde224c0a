use crate::config::LayoutConfig;
use crate::ir::Mindmap;
use crate::theme::Theme;

use super::text::measure_label;
use super::{Bounds, EdgeLayout, Layout, NodeLayout, NodeStyle};

fn pick_palette_color(values: &[String], idx: usize, fallback: &str) -> String {
    if values.is_empty() {
        return fallback.to_string();
    }
    values[idx % values.len()].clone()
}

fn node_style(level: usize, section: Option<usize>, theme: &Theme, config: &LayoutConfig) -> NodeStyle {
    let mindmap = &config.mindmap;
    match section {
        Some(section) if level > 0 => NodeStyle {
            fill: pick_palette_color(&mindmap.section_fills, section, &theme.background),
            text_color: theme.text_color.clone(),
            stroke: Some(pick_palette_color(
                &mindmap.section_lines,
                section,
                &theme.line_color,
            )),
            bold: level == 1,
        },
        _ => NodeStyle {
            fill: theme.root_fill.clone(),
            text_color: theme.root_text_color.clone(),
            stroke: None,
            bold: true,
        },
    }
}

fn subtree_height(
    idx: usize,
    mindmap: &Mindmap,
    nodes: &[NodeLayout],
    heights: &mut [f32],
    spacing: f32,
) -> f32 {
    let children = &mindmap.nodes[idx].children;
    let mut height = nodes[idx].height;
    if !children.is_empty() {
        let mut total: f32 = children
            .iter()
            .map(|&child| subtree_height(child, mindmap, nodes, heights, spacing))
            .sum();
        total += spacing * (children.len() as f32 - 1.0);
        height = height.max(total);
    }
    heights[idx] = height;
    height
}

struct Placement<'a> {
    mindmap: &'a Mindmap,
    heights: &'a [f32],
    horizontal_gap: f32,
    vertical_gap: f32,
}

impl Placement<'_> {
    /// Stacks `children` vertically, centered on the parent, on the side given by `direction`.
    fn place_children(
        &self,
        children: &[usize],
        direction: f32,
        parent_center: (f32, f32),
        parent_width: f32,
        nodes: &mut [NodeLayout],
    ) {
        if children.is_empty() {
            return;
        }
        let mut total: f32 = children.iter().map(|&child| self.heights[child]).sum();
        total += self.vertical_gap * (children.len() as f32 - 1.0);

        let mut cursor = parent_center.1 - total / 2.0;
        for &child in children {
            let child_height = self.heights[child];
            let child_width = nodes[child].width;
            let center = (
                parent_center.0
                    + direction * (parent_width / 2.0 + child_width / 2.0 + self.horizontal_gap),
                cursor + child_height / 2.0,
            );
            self.place(child, direction, center, nodes);
            cursor += child_height + self.vertical_gap;
        }
    }

    fn place(&self, idx: usize, direction: f32, center: (f32, f32), nodes: &mut [NodeLayout]) {
        let width = nodes[idx].width;
        nodes[idx].x = center.0 - width / 2.0;
        nodes[idx].y = center.1 - nodes[idx].height / 2.0;
        let children = &self.mindmap.nodes[idx].children;
        self.place_children(children, direction, center, width, nodes);
    }
}

/// Horizontal tangent bezier from the facing side of `from` to the facing side of `to`.
fn connector(from: &NodeLayout, to: &NodeLayout) -> [(f32, f32); 4] {
    let (from_cx, from_cy) = from.bounds().center();
    let (to_cx, to_cy) = to.bounds().center();
    let direction = if to_cx >= from_cx { 1.0 } else { -1.0 };
    let start = (from_cx + direction * from.width / 2.0, from_cy);
    let end = (to_cx - direction * to.width / 2.0, to_cy);
    let mid_x = (start.0 + end.0) / 2.0;
    [start, (mid_x, start.1), (mid_x, end.1), end]
}

pub(super) fn compute_mindmap_layout(mindmap: &Mindmap, theme: &Theme, config: &LayoutConfig) -> Layout {
    let options = &mindmap.options;
    let max_width = options
        .max_width
        .filter(|width| *width > 0.0)
        .unwrap_or(config.mindmap.max_node_width);

    let mut nodes: Vec<NodeLayout> = mindmap
        .nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let font_size = if node.level == 0 {
                theme.root_font_size
            } else {
                theme.font_size
            };
            let label = measure_label(&node.label, font_size, max_width, config);
            NodeLayout {
                index,
                x: 0.0,
                y: 0.0,
                width: label.width + config.mindmap.padding_x * 2.0,
                height: label.height + config.mindmap.padding_y * 2.0,
                label,
                level: node.level,
                section: node.section,
                style: node_style(node.level, node.section, theme, config),
            }
        })
        .collect();

    if nodes.is_empty() {
        return Layout {
            nodes,
            edges: Vec::new(),
            bounds: Bounds::new(0.0, 0.0, 0.0, 0.0),
            error: None,
        };
    }

    let mut horizontal_gap = options
        .spacing_horizontal
        .unwrap_or(config.mindmap.rank_spacing * config.mindmap.rank_spacing_multiplier);
    let mut vertical_gap = options
        .spacing_vertical
        .unwrap_or(config.mindmap.node_spacing * config.mindmap.node_spacing_multiplier);
    let density_scale = match nodes.len() {
        n if n >= 30 => 0.7,
        n if n >= 12 => 0.85,
        _ => 1.0,
    };
    horizontal_gap = (horizontal_gap * density_scale).max(theme.font_size * 1.1);
    vertical_gap = (vertical_gap * density_scale).max(theme.font_size * 0.5);

    let mut heights = vec![0.0; nodes.len()];
    subtree_height(0, mindmap, &nodes, &mut heights, vertical_gap);

    // Root sits at the origin; even branches go right, odd branches go left.
    let root_width = nodes[0].width;
    nodes[0].x = -root_width / 2.0;
    nodes[0].y = -nodes[0].height / 2.0;
    let (right, left): (Vec<usize>, Vec<usize>) = mindmap.nodes[0]
        .children
        .iter()
        .copied()
        .partition(|&child| mindmap.nodes[child].section.unwrap_or(0) % 2 == 0);

    let placement = Placement {
        mindmap,
        heights: &heights,
        horizontal_gap,
        vertical_gap,
    };
    placement.place_children(&right, 1.0, (0.0, 0.0), root_width, &mut nodes);
    placement.place_children(&left, -1.0, (0.0, 0.0), root_width, &mut nodes);

    let mut edges = Vec::new();
    for (parent, node) in mindmap.nodes.iter().enumerate() {
        for &child in &node.children {
            let depth = node.level + 1;
            let stroke_width = (config.mindmap.edge_depth_base_width
                + config.mindmap.edge_depth_step * depth as f32)
                .max(config.mindmap.edge_min_width);
            let stroke = pick_palette_color(
                &config.mindmap.section_lines,
                mindmap.nodes[child].section.unwrap_or(0),
                &theme.line_color,
            );
            edges.push(EdgeLayout {
                from: parent,
                to: child,
                points: connector(&nodes[parent], &nodes[child]),
                stroke,
                stroke_width,
            });
        }
    }

    let mut bounds = nodes[0].bounds();
    for node in &nodes[1..] {
        bounds = bounds.union(&node.bounds());
    }
    // Widest connector stroke can poke out past the node boxes on the vertical axis.
    let stroke_pad = edges
        .iter()
        .map(|edge| edge.stroke_width / 2.0)
        .fold(0.0, f32::max);
    let bounds = Bounds::new(
        bounds.x,
        bounds.y - stroke_pad,
        bounds.width,
        bounds.height + stroke_pad * 2.0,
    );

    Layout {
        nodes,
        edges,
        bounds,
        error: None,
    }
}
