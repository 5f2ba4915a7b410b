// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text cleanup passes applied before chunking and on retrieved context.

use std::sync::OnceLock;

use regex::Regex;

fn html_tags() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("static pattern"))
}

fn space_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]+").expect("static pattern"))
}

fn newline_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]*\n\s*").expect("static pattern"))
}

fn collapse_all(text: &str, needle: &str, replacement: &str) -> String {
    let mut out = text.to_string();
    while out.contains(needle) {
        out = out.replace(needle, replacement);
    }
    out
}

/// Basic cleanup applied to every ingested text: tabs dropped, blank-line
/// runs and `----` runs collapsed, `\n \n` sequences folded.
pub fn cleanup_text(text: &str) -> String {
    let mut out = text.replace('\t', "");
    out = collapse_all(&out, "\n\n", "\n");
    out = collapse_all(&out, "----", "");
    out = collapse_all(&out, "\n \n", "\n");
    out
}

/// Aggressive cleanup: the basic pass plus HTML tag removal and whitespace
/// normalization. Used for transcribed web content.
pub fn aggressive_cleanup(text: &str) -> String {
    let stripped = html_tags().replace_all(text, " ");
    let collapsed = space_runs().replace_all(&stripped, " ");
    cleanup_text(collapsed.trim())
}

/// Cleanup for retrieved context before it enters a prompt: HTML stripped,
/// repeated whitespace and newlines collapsed, edges trimmed.
pub fn cleanup_context(text: &str) -> String {
    let stripped = html_tags().replace_all(text, "");
    let spaced = space_runs().replace_all(&stripped, " ");
    let lined = newline_runs().replace_all(&spaced, "\n");
    lined.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabs_and_blank_runs_removed() {
        let cleaned = cleanup_text("a\tb\n\n\n\nc");
        assert_eq!(cleaned, "ab\nc");
    }

    #[test]
    fn dash_runs_removed() {
        assert_eq!(cleanup_text("a--------b"), "ab");
        // Runs shorter than four dashes survive.
        assert_eq!(cleanup_text("a--b"), "a--b");
    }

    #[test]
    fn space_newline_sequences_fold() {
        assert_eq!(cleanup_text("a\n \n \nb"), "a\nb");
    }

    #[test]
    fn aggressive_strips_html() {
        let cleaned = aggressive_cleanup("<p>Hello <b>world</b></p>   again");
        assert_eq!(cleaned, "Hello world again");
    }

    #[test]
    fn context_cleanup_collapses_everything() {
        let cleaned = cleanup_context("<div> spaced   out </div>\n\n\nnext   line ");
        assert_eq!(cleaned, "spaced out\nnext line");
    }
}
