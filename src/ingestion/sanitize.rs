//! HTML boilerplate removal.
//!
//! Embedding quality depends heavily on stripping repeated site-wide noise:
//! navigation menus, headers, and footers would otherwise dominate
//! nearest-neighbor matches across unrelated chunks. The sanitizer drops
//! those subtrees outright, prefers the most specific main-content
//! container available, and emits one logical line per block-level element
//! with blank lines removed.

use std::sync::OnceLock;

use ego_tree::NodeRef;
use regex::Regex;
use scraper::{Html, Node, Selector};

/// Elements removed wholesale; they carry no informational value.
const STRIPPED_ELEMENTS: &[&str] = &["nav", "header", "footer", "aside", "script", "style"];

/// Elements that delimit a logical line of output text.
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ul", "ol", "pre", "blockquote", "table", "tr",
    "div", "section", "article", "main", "br",
];

/// Containers searched for the main content, most specific first.
const CONTENT_ROOTS: &[&str] = &["main", "article", "body"];

/// Reduces raw markup to plain text, one line per block element.
pub fn clean_html(raw: &str) -> String {
    let document = Html::parse_document(raw);
    let root = CONTENT_ROOTS.iter().find_map(|name| {
        let selector = Selector::parse(name).expect("static selector is valid");
        document.select(&selector).next()
    });

    let mut lines = Vec::new();
    let mut buffer = String::new();
    match root {
        Some(element) => collect_text(*element, &mut lines, &mut buffer),
        None => collect_text(document.tree.root(), &mut lines, &mut buffer),
    }
    flush(&mut lines, &mut buffer);

    lines.join("\n")
}

fn collect_text(node: NodeRef<'_, Node>, lines: &mut Vec<String>, buffer: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Element(element) => {
                let name = element.name();
                if STRIPPED_ELEMENTS.contains(&name) {
                    continue;
                }
                let is_block = BLOCK_ELEMENTS.contains(&name);
                if is_block {
                    flush(lines, buffer);
                }
                collect_text(child, lines, buffer);
                if is_block {
                    flush(lines, buffer);
                }
            }
            Node::Text(text) => {
                // Boundary whitespace decides word separation across inline
                // elements, so text nodes are not trimmed here; the line is
                // normalized once at flush time.
                buffer.push_str(&collapse_whitespace(&text));
            }
            _ => {}
        }
    }
}

fn flush(lines: &mut Vec<String>, buffer: &mut String) {
    let collapsed = collapse_whitespace(buffer);
    let line = collapsed.trim();
    if !line.is_empty() {
        lines.push(line.to_string());
    }
    buffer.clear();
}

/// Collapses runs of whitespace to single spaces and drops control
/// characters. Leading and trailing whitespace survive as single spaces.
fn collapse_whitespace(input: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let ws = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static regex is valid"));
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_control() || *c == '\n')
        .collect();
    ws.replace_all(&cleaned, " ").into_owned()
}
