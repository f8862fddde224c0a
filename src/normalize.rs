//! Turns whatever the generation service replied with into a canonical [`Document`].
//!
//! Replies arrive in three shapes: a JSON object with `topic` and a raw outline,
//! a string carrying `topic="..."`/`markdown="..."` fragments, or a bare outline.
//! Every shape goes through the same cleanup so the renderer always receives
//! markdown that starts with a heading marker.

use crate::document::{DEFAULT_TOPIC, Document};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static TOPIC_ATTR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"topic="([^"]+)""#).unwrap());
static MARKDOWN_ATTR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"markdown="([^"]+)""#).unwrap());
static BLANK_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());
static TOP_HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#[ \t]+(.+?)[ \t]*$").unwrap());

const MAX_HEADING_LEVEL: usize = 6;

/// A service reply before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    Empty,
    Structured { topic: Option<String>, raw: String },
    Text(String),
}

impl RawResponse {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(text) => Self::from(text.as_str()),
            Value::Object(map) => {
                let raw = ["raw", "markdown"]
                    .iter()
                    .find_map(|key| map.get(*key).and_then(Value::as_str))
                    .filter(|text| !text.trim().is_empty());
                let Some(raw) = raw else {
                    return RawResponse::Empty;
                };
                let topic = map
                    .get("topic")
                    .and_then(Value::as_str)
                    .filter(|topic| !topic.trim().is_empty())
                    .map(str::to_string);
                RawResponse::Structured {
                    topic,
                    raw: raw.to_string(),
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::Array(_) => RawResponse::Empty,
        }
    }
}

impl From<&str> for RawResponse {
    fn from(text: &str) -> Self {
        if text.trim().is_empty() {
            RawResponse::Empty
        } else {
            RawResponse::Text(text.to_string())
        }
    }
}

impl From<&Document> for RawResponse {
    fn from(doc: &Document) -> Self {
        RawResponse::Structured {
            topic: Some(doc.topic.clone()),
            raw: doc.markdown.clone(),
        }
    }
}

/// Normalizes a reply. Never fails: unusable input becomes the "no content" document.
pub fn normalize(raw: &RawResponse) -> Document {
    let doc = match raw {
        RawResponse::Empty => None,
        RawResponse::Structured { topic, raw } => {
            let tidied = tidy(raw);
            (!tidied.is_empty()).then(|| {
                let topic = topic.clone().unwrap_or_else(|| derive_topic(&tidied));
                Document::new(topic, ensure_leading_heading(&tidied))
            })
        }
        RawResponse::Text(text) => match (
            TOPIC_ATTR_RE.captures(text),
            MARKDOWN_ATTR_RE.captures(text),
        ) {
            (Some(topic), Some(markdown)) => {
                debug!("reply carries topic/markdown attributes");
                let markdown = clean_markdown(&markdown[1].replace("\\n", "\n"));
                (!markdown.is_empty()).then(|| Document::new(&topic[1], markdown))
            }
            _ => {
                let tidied = tidy(text);
                (!tidied.is_empty()).then(|| {
                    Document::new(derive_topic(&tidied), ensure_leading_heading(&tidied))
                })
            }
        },
    };
    doc.unwrap_or_else(|| {
        warn!("received empty response, falling back to placeholder mind map");
        Document::empty_response()
    })
}

/// Applies the cleanup passes and returns markdown that is trimmed and starts with
/// `#`, or an empty string when nothing is left.
pub fn clean_markdown(text: &str) -> String {
    let text = tidy(text);
    if text.is_empty() {
        return text;
    }
    ensure_leading_heading(&text)
}

/// Every cleanup pass except the leading marker, so topics come from the reply's own headings.
fn tidy(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let text = collapse_blank_lines(text.trim());
    let text = strip_code_fences(&text);
    let text = collapse_blank_lines(text.trim());
    repair_headings(text.trim()).trim().to_string()
}

pub fn derive_topic(markdown: &str) -> String {
    TOP_HEADING_RE
        .captures(markdown)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| DEFAULT_TOPIC.to_string())
}

pub fn ensure_leading_heading(markdown: &str) -> String {
    if markdown.trim_start().starts_with('#') {
        markdown.to_string()
    } else {
        format!("# {}", markdown.trim_start())
    }
}

fn collapse_blank_lines(text: &str) -> String {
    BLANK_RUN_RE.replace_all(text, "\n\n").into_owned()
}

fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter(|line| {
            let line = line.trim_start();
            !(line.starts_with("```") || line.starts_with("~~~"))
        })
        .map(|line| line.replace("```", ""))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Puts every heading marker on its own line, one blank line after the previous
/// content, and separates a marker glued to its text (`#Cats` -> `# Cats`).
///
/// A run of `#` counts as a marker when it has at most six characters, is not
/// glued to a preceding character, and either starts a line or is followed by a
/// space. Mid-line runs glued to what follows (`#42`, `#tag`) and closing
/// sequences (`## Title ##`) are left alone.
fn repair_headings(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len() + 16);
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'#' {
            i += 1;
            continue;
        }
        let run_start = i;
        let mut run_end = i;
        while run_end < bytes.len() && bytes[run_end] == b'#' {
            run_end += 1;
        }
        i = run_end;

        let mut ws_start = run_start;
        while ws_start > 0 && bytes[ws_start - 1].is_ascii_whitespace() {
            ws_start -= 1;
        }
        let glued = ws_start == run_start && run_start > 0;
        if glued || run_end - run_start > MAX_HEADING_LEVEL {
            continue;
        }
        let line_start = ws_start == 0 || text[ws_start..run_start].contains('\n');
        let spaced = bytes.get(run_end).is_some_and(|&b| b == b' ' || b == b'\t');
        if !line_start && (!spaced || is_closing_sequence(&text[run_end..])) {
            continue;
        }

        out.push_str(&text[copied..ws_start]);
        if ws_start > 0 {
            out.push_str("\n\n");
        }
        out.push_str(&text[run_start..run_end]);
        copied = run_end;
        if run_end < bytes.len() && !bytes[run_end].is_ascii_whitespace() {
            out.push(' ');
        }
    }
    out.push_str(&text[copied..]);
    out
}

fn is_closing_sequence(rest: &str) -> bool {
    let line = rest.split('\n').next().unwrap_or_default();
    line.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::EMPTY_RESPONSE_MARKDOWN;
    use serde_json::json;

    #[test]
    fn empty_inputs_produce_placeholder() {
        for raw in [
            RawResponse::Empty,
            RawResponse::from("   \n "),
            RawResponse::from_json(&Value::Null),
            RawResponse::from_json(&json!({"topic": "Cats"})),
            RawResponse::from_json(&json!([1, 2])),
            RawResponse::from("```\n```"),
        ] {
            let doc = normalize(&raw);
            assert_eq!(doc.topic, DEFAULT_TOPIC);
            assert_eq!(doc.markdown, EMPTY_RESPONSE_MARKDOWN);
        }
    }

    #[test]
    fn structured_reply_splits_run_together_headings() {
        let raw = RawResponse::from_json(&json!({"topic": "Cats", "raw": "#Cats\n##Breeds"}));
        let doc = normalize(&raw);
        assert_eq!(doc.topic, "Cats");
        assert!(doc.markdown.contains("# Cats\n\n## Breeds"), "{:?}", doc.markdown);
    }

    #[test]
    fn attribute_string_is_extracted_and_unescaped() {
        let raw = RawResponse::from(
            r##"Here you go: topic="Rust" markdown="# Rust\n## Ownership\n- borrowing""##,
        );
        let doc = normalize(&raw);
        assert_eq!(doc.topic, "Rust");
        assert_eq!(doc.markdown, "# Rust\n\n## Ownership\n- borrowing");
    }

    #[test]
    fn plain_text_derives_topic_from_first_heading() {
        let doc = normalize(&RawResponse::from("```markdown\n# Solar System\n## Planets\n```\n"));
        assert_eq!(doc.topic, "Solar System");
        assert_eq!(doc.markdown, "# Solar System\n\n## Planets");
    }

    #[test]
    fn plain_text_without_heading_gets_default_topic_and_marker() {
        let doc = normalize(&RawResponse::from("just some words\n- a\n- b"));
        assert_eq!(doc.topic, DEFAULT_TOPIC);
        assert!(doc.markdown.starts_with("# just some words"));

        let structured = RawResponse::Structured {
            topic: None,
            raw: "intro line\n- a".to_string(),
        };
        assert_eq!(normalize(&structured).topic, DEFAULT_TOPIC);

        let doc = normalize(&RawResponse::from("## Only second level"));
        assert_eq!(doc.topic, DEFAULT_TOPIC);
        assert!(doc.markdown.starts_with('#'));
    }

    #[test]
    fn missing_heading_marker_is_always_prepended() {
        for input in ["alpha", "  - a\n  - b", "text then # heading", "x\n\n\n\ny"] {
            let doc = normalize(&RawResponse::from(input));
            assert!(doc.markdown.starts_with('#'), "{input:?} -> {:?}", doc.markdown);
        }
    }

    #[test]
    fn blank_line_runs_collapse_to_one() {
        let cleaned = clean_markdown("# A\n\n\n   \n- x\n\n\n\n- y");
        assert_eq!(cleaned, "# A\n\n- x\n\n- y");
    }

    #[test]
    fn inline_headings_are_moved_onto_their_own_lines() {
        assert_eq!(
            clean_markdown("# Topic ## First ## Second"),
            "# Topic\n\n## First\n\n## Second"
        );
    }

    #[test]
    fn glued_and_closing_hashes_are_preserved() {
        assert_eq!(clean_markdown("# Languages\n- C# and F#"), "# Languages\n- C# and F#");
        assert_eq!(clean_markdown("# Title ##"), "# Title ##");
        assert_eq!(clean_markdown("# Links\n- https://x.dev/#top"), "# Links\n- https://x.dev/#top");
    }

    #[test]
    fn hashes_inside_list_items_stay_text() {
        assert_eq!(clean_markdown("# Bugs\n- Issue #42 fixed"), "# Bugs\n- Issue #42 fixed");
        assert_eq!(
            clean_markdown("# Posts\n- tagged #rust and #wasm"),
            "# Posts\n- tagged #rust and #wasm"
        );
        let doc = normalize(&RawResponse::from("# Bugs\n- Issue #42 fixed"));
        assert_eq!(doc.topic, "Bugs");
        let mindmap = crate::transform::transform(&doc.markdown).unwrap();
        assert_eq!(mindmap.root().unwrap().label, "Bugs");
    }

    #[test]
    fn canonical_document_is_a_fixed_point() {
        let original = Document::new("T", "# T\n\n## A\n- one\n- two\n\n## B");
        let once = normalize(&RawResponse::from(&original));
        assert_eq!(once.topic, original.topic);
        assert_eq!(once.markdown, original.markdown);
        let twice = normalize(&RawResponse::from(&once));
        assert_eq!(twice.topic, once.topic);
        assert_eq!(twice.markdown, once.markdown);
    }

    #[test]
    fn normalized_output_is_stable_under_renormalization() {
        let messy = "```\n#Cats\n\n\n##Breeds ### Siamese\n```\n\n\n## Care";
        let first = normalize(&RawResponse::from(messy));
        let second = normalize(&RawResponse::from(&first));
        assert_eq!(first.markdown, second.markdown);
        assert_eq!(first.markdown, "# Cats\n\n## Breeds\n\n### Siamese\n\n## Care");
    }
}
