// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory domain types shared by both tiers.

use serde::{Deserialize, Serialize};

/// One (question, answer) exchange in a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryTurn {
    #[serde(rename = "Question", default)]
    pub question: String,
    #[serde(rename = "Answer", default)]
    pub answer: String,
    /// Chunk keys this turn produced in the session's memory index, kept
    /// for cascaded deletion.
    #[serde(rename = "Keys", default)]
    pub keys: Vec<String>,
    #[serde(rename = "Summary", default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl MemoryTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            keys: Vec::new(),
            summary: None,
        }
    }

    /// The turn rendered the way it is embedded and prompted.
    pub fn rendered(&self) -> String {
        format!("User: {}\nAssistant: {}\n", self.question, self.answer)
    }
}

/// The record stored under `rawMemory:<memory prefix>:<session>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryRecord {
    #[serde(rename = "Questions", default)]
    pub questions: Vec<MemoryTurn>,
    #[serde(rename = "Summary", default)]
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_turn_format() {
        let turn = MemoryTurn::new("Where?", "Portugal.");
        assert_eq!(turn.rendered(), "User: Where?\nAssistant: Portugal.\n");
    }

    #[test]
    fn record_serde_field_names() {
        let record = MemoryRecord {
            questions: vec![MemoryTurn::new("q", "a")],
            summary: "short".into(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("Questions").is_some());
        assert!(value.get("Summary").is_some());
        assert!(value["Questions"][0].get("Question").is_some());

        let parsed: MemoryRecord = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.questions.len(), 1);
    }
}
