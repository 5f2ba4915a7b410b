// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token extraction and query composition for lexical search.

/// Characters with special meaning in full-text filter expressions.
const FT_METACHARACTERS: &[char] = &[
    '@', '(', ')', '[', ']', '{', '}', '*', '+', '?', '|', '^', '$', '-', '=', '~', ':', ';', '!',
    '#', '%', '&', '\'', '"', '\\',
];

/// Extracts searchable tokens from a query: split on whitespace and
/// punctuation, keep only tokens longer than three characters, lowercase.
pub fn extract_tokens(query: &str) -> Vec<String> {
    let mut tokens: Vec<String> = query
        .split(|c: char| c.is_whitespace() || (!c.is_alphanumeric() && c != '-'))
        .filter(|t| t.chars().count() > 3)
        .map(|t| t.to_lowercase())
        .collect();
    tokens.dedup();
    tokens
}

/// Escapes full-text metacharacters in a raw token.
pub fn escape_query(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    for c in token.chars() {
        if FT_METACHARACTERS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Composes the OR expression `(@content:*tok*) | ...` for the text index.
/// Returns `None` when no token survives extraction; the caller then skips
/// the store round trip entirely.
pub fn lexical_expression(query: &str) -> Option<String> {
    let tokens = extract_tokens(query);
    if tokens.is_empty() {
        return None;
    }
    let fragments: Vec<String> = tokens
        .iter()
        .map(|token| format!("(@content:*{}*)", escape_query(token)))
        .collect();
    Some(fragments.join(" | "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_shorter_than_four_chars_are_dropped() {
        assert_eq!(extract_tokens("the cat sat on a mat"), Vec::<String>::new());
        assert_eq!(extract_tokens("what is SemMapas?"), vec!["what", "semmapas"]);
    }

    #[test]
    fn punctuation_splits_tokens() {
        assert_eq!(
            extract_tokens("machine-learning, artificial/intelligence!"),
            vec!["machine-learning", "artificial", "intelligence"]
        );
    }

    #[test]
    fn escape_covers_metacharacters() {
        assert_eq!(escape_query("a-b"), "a\\-b");
        assert_eq!(escape_query("x*y|z"), "x\\*y\\|z");
        assert_eq!(escape_query("plain"), "plain");
    }

    #[test]
    fn expression_composition() {
        let expr = lexical_expression("artificial intelligence").unwrap();
        assert_eq!(
            expr,
            "(@content:*artificial*) | (@content:*intelligence*)"
        );
    }

    #[test]
    fn short_only_query_yields_none() {
        assert_eq!(lexical_expression("a an the of"), None);
        assert_eq!(lexical_expression(""), None);
    }
}
