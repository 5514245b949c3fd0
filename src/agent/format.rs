//! Best-effort code fencing for generated answers.
//!
//! Models sometimes emit code without markdown fences. When a reply has no
//! fences but looks like it contains code, a line-oriented heuristic wraps
//! the code-like runs. A line counts as code when it contains one of the
//! trigger keywords anywhere, case-insensitively. It is deliberately not a
//! parser: prose containing these keywords gets mis-fenced, and the
//! contract is readability, not correctness.

/// Substrings that mark a line as code-like.
const CODE_KEYWORDS: &[&str] = &["def ", "class ", "import ", "from ", "function", "if __name__"];

const FENCE: &str = "```";
const FENCE_OPEN: &str = "```python";

/// Wraps unfenced code-like runs in markdown fences; otherwise a no-op.
pub fn ensure_code_fences(text: &str) -> String {
    if text.contains(FENCE) {
        return text.to_string();
    }
    if !contains_code(text) {
        return text.to_string();
    }

    let mut lines = Vec::new();
    let mut fence_open = false;
    for line in text.lines() {
        if fence_open && line.trim().is_empty() {
            lines.push(FENCE.to_string());
            fence_open = false;
            lines.push(line.to_string());
            continue;
        }
        if !fence_open && contains_code(line) {
            lines.push(FENCE_OPEN.to_string());
            fence_open = true;
        }
        lines.push(line.to_string());
    }
    if fence_open {
        lines.push(FENCE.to_string());
    }

    lines.join("\n")
}

fn contains_code(text: &str) -> bool {
    let lower = text.to_lowercase();
    CODE_KEYWORDS.iter().any(|kw| lower.contains(kw))
}
