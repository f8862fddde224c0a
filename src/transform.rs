//! Markdown outline -> [`Mindmap`] tree.
//!
//! Headings nest by level, list items nest under the closest heading (and under
//! each other by list depth), stray paragraphs become leaf nodes. A `markmap:`
//! YAML front matter block may precede the outline.

use crate::document::DEFAULT_TOPIC;
use crate::ir::{MarkmapOptions, Mindmap};
use log::debug;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use serde::Deserialize;
use std::borrow::Cow;

pub const FRONT_MATTER_MARKER: &str = "---\nmarkmap:";

const LIST_ITEM_RANK: usize = 10;
const PARAGRAPH_RANK: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("front matter block is never closed")]
    UnterminatedFrontMatter,
    #[error("invalid front matter: {0}")]
    FrontMatter(String),
    #[error("outline contains no nodes")]
    Empty,
}

#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    #[serde(default)]
    markmap: Option<MarkmapOptions>,
}

/// Prepends the default `markmap:` block unless the source already starts with one.
pub fn ensure_front_matter(markdown: &str, max_width: f32) -> Cow<'_, str> {
    if markdown.starts_with(FRONT_MATTER_MARKER) {
        Cow::Borrowed(markdown)
    } else {
        Cow::Owned(format!(
            "---\nmarkmap:\n  maxWidth: {max_width}\n---\n\n{markdown}"
        ))
    }
}

pub fn split_front_matter(source: &str) -> Result<(Option<&str>, &str), TransformError> {
    let Some(rest) = source.strip_prefix("---\n") else {
        return Ok((None, source));
    };
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Ok((Some(&rest[..offset]), &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    Err(TransformError::UnterminatedFrontMatter)
}

fn parse_front_matter(yaml: &str) -> Result<MarkmapOptions, TransformError> {
    if yaml.trim().is_empty() {
        return Ok(MarkmapOptions::default());
    }
    let parsed: FrontMatter =
        serde_yaml::from_str(yaml).map_err(|err| TransformError::FrontMatter(err.to_string()))?;
    Ok(parsed.markmap.unwrap_or_default())
}

pub fn transform(source: &str) -> Result<Mindmap, TransformError> {
    let (front_matter, body) = split_front_matter(source)?;
    let options = match front_matter {
        Some(yaml) => parse_front_matter(yaml)?,
        None => MarkmapOptions::default(),
    };

    let entries = OutlineBuilder::default().build(body);
    if entries.is_empty() {
        return Err(TransformError::Empty);
    }
    let mut mindmap = assemble(entries);
    mindmap.options = options;
    debug!("transformed outline into {} nodes", mindmap.len());
    Ok(mindmap)
}

#[derive(Debug)]
struct Entry {
    label: String,
    parent: Option<usize>,
}

#[derive(Default)]
struct OutlineBuilder {
    entries: Vec<Entry>,
    stack: Vec<(usize, usize)>,
    items: Vec<usize>,
    capture: Option<usize>,
    list_depth: usize,
    in_code_block: bool,
}

impl OutlineBuilder {
    fn build(mut self, body: &str) -> Vec<Entry> {
        for event in Parser::new(body) {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    self.items.clear();
                    self.list_depth = 0;
                    let idx = self.open(level as usize);
                    self.capture = Some(idx);
                }
                Event::End(TagEnd::Heading(_)) => self.capture = None,
                Event::Start(Tag::List(_)) => {
                    self.list_depth += 1;
                    self.capture = None;
                }
                Event::End(TagEnd::List(_)) => {
                    self.list_depth = self.list_depth.saturating_sub(1);
                }
                Event::Start(Tag::Item) => {
                    let idx = self.open(LIST_ITEM_RANK + self.list_depth);
                    self.items.push(idx);
                    self.capture = Some(idx);
                }
                Event::End(TagEnd::Item) => {
                    if self.items.pop().is_some() {
                        self.close_from(LIST_ITEM_RANK + self.list_depth);
                    }
                    self.capture = None;
                }
                Event::Start(Tag::Paragraph) => {
                    self.capture = match self.items.last() {
                        Some(&item) if self.entries[item].label.is_empty() => Some(item),
                        Some(_) => None,
                        None => Some(self.open(PARAGRAPH_RANK)),
                    };
                }
                Event::End(TagEnd::Paragraph) => {
                    if self.items.is_empty() {
                        self.close_from(PARAGRAPH_RANK);
                    }
                    self.capture = None;
                }
                Event::Start(Tag::CodeBlock(_)) => self.in_code_block = true,
                Event::End(TagEnd::CodeBlock) => self.in_code_block = false,
                Event::Text(text) | Event::Code(text) => self.push_text(&text),
                Event::SoftBreak | Event::HardBreak => self.push_text(" "),
                _ => {}
            }
        }
        for entry in &mut self.entries {
            entry.label = entry.label.split_whitespace().collect::<Vec<_>>().join(" ");
        }
        self.entries
    }

    /// Starts a node of `rank`, closing every open node that cannot contain it.
    fn open(&mut self, rank: usize) -> usize {
        self.close_from(rank);
        let idx = self.entries.len();
        self.entries.push(Entry {
            label: String::new(),
            parent: self.stack.last().map(|&(_, parent)| parent),
        });
        self.stack.push((rank, idx));
        idx
    }

    fn close_from(&mut self, rank: usize) {
        while self.stack.last().is_some_and(|&(open, _)| open >= rank) {
            self.stack.pop();
        }
    }

    fn push_text(&mut self, text: &str) {
        if self.in_code_block {
            return;
        }
        if let Some(idx) = self.capture {
            self.entries[idx].label.push_str(text);
        }
    }
}

fn assemble(entries: Vec<Entry>) -> Mindmap {
    let single_root = entries.iter().filter(|entry| entry.parent.is_none()).count() == 1;
    let mut node_of: Vec<usize> = Vec::with_capacity(entries.len());
    let mut entries = entries.into_iter();

    let mut mindmap = if single_root {
        let root = entries.next().map(|entry| entry.label).unwrap_or_default();
        node_of.push(0);
        Mindmap::with_root(root)
    } else {
        Mindmap::with_root(DEFAULT_TOPIC)
    };

    for entry in entries {
        let parent = entry.parent.map(|idx| node_of[idx]).unwrap_or(0);
        node_of.push(mindmap.add_child(parent, entry.label));
    }
    mindmap
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(map: &Mindmap, idx: usize) -> Vec<&str> {
        map.nodes[idx]
            .children
            .iter()
            .map(|&child| map.nodes[child].label.as_str())
            .collect()
    }

    #[test]
    fn headings_and_lists_form_a_tree() {
        let map = transform("# Cats\n\n## Breeds\n- Siamese\n  - Seal point\n- Persian\n\n## Care\nBrush daily.")
            .unwrap();
        assert_eq!(map.nodes[0].label, "Cats");
        assert_eq!(labels(&map, 0), vec!["Breeds", "Care"]);
        let breeds = map.nodes[0].children[0];
        assert_eq!(labels(&map, breeds), vec!["Siamese", "Persian"]);
        let siamese = map.nodes[breeds].children[0];
        assert_eq!(labels(&map, siamese), vec!["Seal point"]);
        let care = map.nodes[0].children[1];
        assert_eq!(labels(&map, care), vec!["Brush daily."]);
        assert_eq!(map.nodes[siamese].section, Some(0));
        assert_eq!(map.nodes[care].section, Some(1));
    }

    #[test]
    fn inline_markup_is_flattened_into_labels() {
        let map = transform("# Rust\n- **Ownership** and `borrowing`\n- [Docs](https://doc.rust-lang.org)").unwrap();
        assert_eq!(labels(&map, 0), vec!["Ownership and borrowing", "Docs"]);
    }

    #[test]
    fn loose_list_items_take_their_first_paragraph() {
        let map = transform("# T\n\n- first\n\n  more detail\n\n- second\n").unwrap();
        assert_eq!(labels(&map, 0), vec!["first", "second"]);
    }

    #[test]
    fn several_top_level_headings_share_a_default_root() {
        let map = transform("# A\n# B").unwrap();
        assert_eq!(map.nodes[0].label, DEFAULT_TOPIC);
        assert_eq!(labels(&map, 0), vec!["A", "B"]);
    }

    #[test]
    fn front_matter_options_are_read() {
        let source = ensure_front_matter("# T\n## A", 320.0);
        let map = transform(&source).unwrap();
        assert_eq!(map.options.max_width, Some(320.0));
        assert_eq!(labels(&map, 0), vec!["A"]);
    }

    #[test]
    fn existing_front_matter_is_kept() {
        let source = "---\nmarkmap:\n  maxWidth: 100\n---\n# T";
        assert!(matches!(ensure_front_matter(source, 500.0), Cow::Borrowed(_)));
    }

    #[test]
    fn malformed_sources_are_rejected() {
        assert!(matches!(
            transform("---\nmarkmap:\n  maxWidth: 1\n# T"),
            Err(TransformError::UnterminatedFrontMatter)
        ));
        assert!(matches!(
            transform("---\nmarkmap: [unclosed\n---\n# T"),
            Err(TransformError::FrontMatter(_))
        ));
        assert!(matches!(transform("---\nmarkmap: {}\n---\n\n"), Err(TransformError::Empty)));
    }
}
