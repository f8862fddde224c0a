use serde::Deserialize;

/// Options a document can set in its `markmap:` front matter.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkmapOptions {
    pub max_width: Option<f32>,
    pub spacing_horizontal: Option<f32>,
    pub spacing_vertical: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MindmapNode {
    pub label: String,
    pub level: usize,
    /// Index of the first-level branch this node belongs to; `None` for the root.
    pub section: Option<usize>,
    pub children: Vec<usize>,
}

/// Outline tree; node 0 is the root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mindmap {
    pub nodes: Vec<MindmapNode>,
    pub options: MarkmapOptions,
}

impl Mindmap {
    pub fn with_root(label: impl Into<String>) -> Self {
        Self {
            nodes: vec![MindmapNode {
                label: label.into(),
                level: 0,
                section: None,
                children: Vec::new(),
            }],
            options: MarkmapOptions::default(),
        }
    }

    pub fn root(&self) -> Option<&MindmapNode> {
        self.nodes.first()
    }

    pub fn add_child(&mut self, parent: usize, label: impl Into<String>) -> usize {
        let (level, section) = {
            let parent_node = &self.nodes[parent];
            let section = if parent_node.level == 0 {
                Some(parent_node.children.len())
            } else {
                parent_node.section
            };
            (parent_node.level + 1, section)
        };
        let idx = self.nodes.len();
        self.nodes.push(MindmapNode {
            label: label.into(),
            level,
            section,
            children: Vec::new(),
        });
        self.nodes[parent].children.push(idx);
        idx
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
