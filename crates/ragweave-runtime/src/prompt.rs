// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! System prompt composition.
//!
//! Three templates cover the orchestrator's cases: a refusal prompt when
//! there is no context and hallucination is disallowed, a memory-only
//! prompt when the model may answer from conversation history alone, and
//! the contextual prompt enumerating retrieved chunks. Every prompt ends
//! with `**User:** <query>` / `**Assistant:**` and instructs the model to
//! open out-of-scope answers with the `@` refusal sentinel.

use ragweave_core::types::ScoredDocument;
use ragweave_index::cleanup_context;
use ragweave_index::EmbeddingContent;

/// Character that marks a refused (out-of-scope) response.
pub const REFUSAL_SENTINEL: char = '@';
/// Character that introduces the trailing references object.
pub const REFERENCE_SENTINEL: char = '⧉';

const REFERENCES_DIRECTIVE: &str = r#"### Output Formatting Rules:
- First, output the **full natural language answer**, formatted clearly.
- Then, on a **new line after the full answer**, add the **reference line** that begins with **⧉**, followed by a single valid JSON object in this format:
  ⧉ {"references":["chunk_id_1","chunk_id_2"]}

- The **⧉ line must come immediately after the answer**, with no additional explanation or text.
- If no references are applicable, **omit the ⧉ line completely** — do not include an empty or placeholder reference object.

- The ⧉ line is used for post-processing and will not be shown to the user. Format it precisely and cleanly.

"#;

/// Which template [`compose`] selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Refusal,
    MemoryOnly,
    Contextual,
}

/// How the target language enters the prompt.
#[derive(Debug, Clone, Default)]
pub struct LanguageDirective {
    /// Instruction telling the model to detect the language itself; empty
    /// when the language is already known.
    pub detect_instruction: String,
    /// The language (or placeholder) the answer must be written in.
    pub language: String,
}

/// Inputs to prompt composition.
pub struct PromptInputs<'a> {
    pub character: &'a str,
    pub docs: &'a [ScoredDocument],
    pub extra_context: &'a str,
    pub memory_context: &'a str,
    pub memory_summary: &'a str,
    pub language: &'a LanguageDirective,
    pub not_related_answer: &'a str,
    pub query: &'a str,
    pub include_date: bool,
    pub rag_references: bool,
    pub force_long: bool,
    pub context_cleanup: bool,
    pub allow_hallucinate: bool,
    pub max_words: Option<usize>,
}

/// Composes the system prompt for one request.
pub fn compose(inputs: &PromptInputs<'_>) -> (String, PromptKind) {
    let has_context = !inputs.docs.is_empty() || !inputs.extra_context.is_empty();
    if !has_context {
        if !inputs.allow_hallucinate {
            return (refusal_prompt(inputs), PromptKind::Refusal);
        }
        return (memory_only_prompt(inputs), PromptKind::MemoryOnly);
    }
    (contextual_prompt(inputs), PromptKind::Contextual)
}

fn refusal_prompt(inputs: &PromptInputs<'_>) -> String {
    format!(
        "{detect}You are an AI assistant specialized in providing accurate and concise answers.\n\
Your only answer to all questions is the improved version of \"{not_related}\" in {language}.\n\
- Start the response with \"@\".\n\
- Ignore all of the references and do not include them in the response.\n\
**Assistant:** ",
        detect = inputs.language.detect_instruction,
        not_related = inputs.not_related_answer,
        language = inputs.language.language,
    )
}

fn memory_only_prompt(inputs: &PromptInputs<'_>) -> String {
    let memory_section = memory_section(inputs);
    format!(
        "{detect}You are a {character} AI assistant specialized in providing accurate and concise answers based on the following knowledge:\n\
**Contextual Knowledge:**\n\
{memory_section}\n\
**Instructions:**\n\
- Analyze the question carefully and reason step-by-step.\n\
- Then, provide a **clear answer {briefly}in {language}.**\n\
{refusal_rule}\
- Do **not** reference the original text or mention language/translation details.\n\
{length_rule}{date}\n\
**User:** {query}\n\
**Assistant:** ",
        detect = inputs.language.detect_instruction,
        character = inputs.character,
        memory_section = memory_section,
        briefly = briefly(inputs.force_long),
        language = inputs.language.language,
        refusal_rule = refusal_rule(&inputs.language.language),
        length_rule = length_rule(inputs.max_words),
        date = date_line(inputs.include_date),
        query = inputs.query,
    )
}

fn contextual_prompt(inputs: &PromptInputs<'_>) -> String {
    let mut knowledge = String::new();
    for (i, doc) in inputs.docs.iter().enumerate() {
        if i > 0 {
            knowledge.push('\n');
        }
        let mut chunk = format!("Chunk {}:\n", i + 1);
        if inputs.rag_references {
            if let Some(id) = chunk_content_id(doc) {
                chunk.push_str("####Reference: ");
                chunk.push_str(&id);
                chunk.push('\n');
            }
        }
        chunk.push_str(&doc.page_content);
        chunk.push_str("\n\n");
        if inputs.context_cleanup {
            chunk = cleanup_context(&chunk);
            chunk.push('\n');
        }
        knowledge.push_str(&chunk);
    }
    if !inputs.extra_context.is_empty() {
        knowledge.push('\n');
        knowledge.push_str(inputs.extra_context);
    }

    let references_directive = if inputs.rag_references {
        REFERENCES_DIRECTIVE
    } else {
        ""
    };

    format!(
        "{detect}You are a {character} AI assistant specialized in providing accurate and concise answers based on the following knowledge:\n\
**Contextual Knowledge:**\n\
{knowledge}\n\
{memory_section}\n\
**Instructions:**\n\
- Analyze the question carefully and reason step-by-step and think about the question and answer first.\n\
- Then, provide a **clear answer {briefly}in {language}.**\n\
{refusal_rule}\
- Do **not** reference the original text or mention language/translation details.\n\
- Ignore chunk completely if it is not related to the question.\n\
- Do not include chunk number in the response.\n\
{length_rule}{date}\n\
{references_directive}\
**User:** {query}\n\
**Assistant:** ",
        detect = inputs.language.detect_instruction,
        character = inputs.character,
        knowledge = knowledge,
        memory_section = memory_section(inputs),
        briefly = briefly(inputs.force_long),
        language = inputs.language.language,
        refusal_rule = refusal_rule(&inputs.language.language),
        length_rule = length_rule(inputs.max_words),
        date = date_line(inputs.include_date),
        references_directive = references_directive,
        query = inputs.query,
    )
}

fn memory_section(inputs: &PromptInputs<'_>) -> String {
    let mut memory = String::new();
    if !inputs.memory_summary.is_empty() {
        memory.push_str(inputs.memory_summary);
        memory.push('\n');
    }
    memory.push_str(inputs.memory_context);
    if memory.is_empty() {
        return String::new();
    }
    format!("**Previous Interactions:**\n{memory}\n")
}

fn refusal_rule(language: &str) -> String {
    format!(
        "- If the question is unrelated to the provided context or cannot be answered based on the information above, **start the response with \"@\"** and reply politely in {language} with something like:\n\
**\"I can't find any answer regarding your question.\"**. Do not forget to add **@** at the start of the response in case of unanswerable question.\n"
    )
}

fn briefly(force_long: bool) -> &'static str {
    if force_long {
        ""
    } else {
        "briefly "
    }
}

fn length_rule(max_words: Option<usize>) -> String {
    match max_words {
        Some(max_words) => format!("- Limit the answer to at most {max_words} words.\n"),
        None => String::new(),
    }
}

fn date_line(include_date: bool) -> String {
    if !include_date {
        return String::new();
    }
    format!(
        "- It is {}. Adjust your response based on the current date and time.\n",
        chrono::Local::now().format("%A, %Y-%m-%d %H:%M")
    )
}

/// The content id carried in a chunk's `rawkey` metadata snapshot.
fn chunk_content_id(doc: &ScoredDocument) -> Option<String> {
    let rawkey = doc.metadata_str("rawkey")?;
    let content: EmbeddingContent = serde_json::from_str(rawkey).ok()?;
    (!content.id.is_empty()).then_some(content.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directive() -> LanguageDirective {
        LanguageDirective {
            detect_instruction: String::new(),
            language: "English".into(),
        }
    }

    fn doc(content: &str) -> ScoredDocument {
        ScoredDocument {
            page_content: content.to_string(),
            score: 0.9,
            metadata: Default::default(),
        }
    }

    fn inputs<'a>(
        docs: &'a [ScoredDocument],
        language: &'a LanguageDirective,
    ) -> PromptInputs<'a> {
        PromptInputs {
            character: "helpful",
            docs,
            extra_context: "",
            memory_context: "",
            memory_summary: "",
            language,
            not_related_answer: "I can't find any answer regarding your question.",
            query: "Where did it launch?",
            include_date: false,
            rag_references: false,
            force_long: false,
            context_cleanup: false,
            allow_hallucinate: false,
            max_words: None,
        }
    }

    #[test]
    fn no_context_no_hallucination_is_refusal() {
        let language = directive();
        let (prompt, kind) = compose(&inputs(&[], &language));
        assert_eq!(kind, PromptKind::Refusal);
        assert!(prompt.contains("Start the response with \"@\""));
        assert!(prompt.contains("I can't find any answer regarding your question."));
        assert!(prompt.ends_with("**Assistant:** "));
    }

    #[test]
    fn hallucination_without_context_uses_memory_template() {
        let language = directive();
        let mut input = inputs(&[], &language);
        input.allow_hallucinate = true;
        input.memory_context = "User: hi\nAssistant: hello\n";
        let (prompt, kind) = compose(&input);
        assert_eq!(kind, PromptKind::MemoryOnly);
        assert!(prompt.contains("**Previous Interactions:**"));
        assert!(prompt.contains("User: hi"));
        assert!(prompt.ends_with("**Assistant:** "));
    }

    #[test]
    fn chunks_are_enumerated() {
        let docs = vec![doc("first chunk text"), doc("second chunk text")];
        let language = directive();
        let (prompt, kind) = compose(&inputs(&docs, &language));
        assert_eq!(kind, PromptKind::Contextual);
        assert!(prompt.contains("Chunk 1:\nfirst chunk text"));
        assert!(prompt.contains("Chunk 2:\nsecond chunk text"));
        assert!(prompt.contains("**User:** Where did it launch?"));
        assert!(prompt.contains("reason step-by-step"));
        assert!(prompt.contains("briefly "));
    }

    #[test]
    fn references_add_ids_and_directive() {
        let rawkey = serde_json::json!({"Id": "ai-basics"}).to_string();
        let mut first = doc("referenced chunk");
        first
            .metadata
            .insert("rawkey".into(), serde_json::Value::String(rawkey));
        let docs = vec![first];
        let language = directive();
        let mut input = inputs(&docs, &language);
        input.rag_references = true;

        let (prompt, _) = compose(&input);
        assert!(prompt.contains("####Reference: ai-basics"));
        assert!(prompt.contains('⧉'));
        assert!(prompt.contains(r#"{"references":["chunk_id_1","chunk_id_2"]}"#));
    }

    #[test]
    fn extra_context_counts_as_context() {
        let language = directive();
        let mut input = inputs(&[], &language);
        input.extra_context = "Side-channel facts.";
        let (prompt, kind) = compose(&input);
        assert_eq!(kind, PromptKind::Contextual);
        assert!(prompt.contains("Side-channel facts."));
    }

    #[test]
    fn force_long_drops_briefly() {
        let docs = vec![doc("chunk body here")];
        let language = directive();
        let mut input = inputs(&docs, &language);
        input.force_long = true;
        let (prompt, _) = compose(&input);
        assert!(prompt.contains("**clear answer in English.**"));
    }

    #[test]
    fn max_words_adds_length_rule() {
        let docs = vec![doc("chunk body here")];
        let language = directive();
        let mut input = inputs(&docs, &language);
        input.max_words = Some(25);
        let (prompt, _) = compose(&input);
        assert!(prompt.contains("at most 25 words"));
    }

    #[test]
    fn context_cleanup_strips_html_from_chunks() {
        let docs = vec![doc("<p>tagged   content</p>")];
        let language = directive();
        let mut input = inputs(&docs, &language);
        input.context_cleanup = true;
        let (prompt, _) = compose(&input);
        assert!(!prompt.contains("<p>"));
        assert!(prompt.contains("tagged content"));
    }

    #[test]
    fn detect_instruction_prefixes_prompt() {
        let language = LanguageDirective {
            detect_instruction: "detect language of \"Where?\" ".into(),
            language: "detected language without mentioning it.".into(),
        };
        let (prompt, _) = compose(&inputs(&[], &language));
        assert!(prompt.starts_with("detect language of"));
    }
}
