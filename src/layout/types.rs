#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
    pub font_size: f32,
}

/// Axis-aligned rectangle in diagram coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Bounds::new(
            x,
            y,
            self.max_x().max(other.max_x()) - x,
            self.max_y().max(other.max_y()) - y,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeStyle {
    pub fill: String,
    pub text_color: String,
    pub stroke: Option<String>,
    pub bold: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeLayout {
    /// Index of the outline node this box draws.
    pub index: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub label: TextBlock,
    pub level: usize,
    pub section: Option<usize>,
    pub style: NodeStyle,
}

impl NodeLayout {
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }
}

/// Parent-to-child connector drawn as one cubic bezier segment.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeLayout {
    pub from: usize,
    pub to: usize,
    pub points: [(f32, f32); 4],
    pub stroke: String,
    pub stroke_width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorLayout {
    pub message: String,
    pub label: TextBlock,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub nodes: Vec<NodeLayout>,
    pub edges: Vec<EdgeLayout>,
    /// Tight box around everything drawn, stroke widths included.
    pub bounds: Bounds,
    pub error: Option<ErrorLayout>,
}

impl Layout {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// True when at least one outline node was drawn.
    pub fn has_content(&self) -> bool {
        self.error.is_none() && !self.nodes.is_empty()
    }
}
