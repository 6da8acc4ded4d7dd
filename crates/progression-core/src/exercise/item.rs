use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    #[serde(alias = "multiple-choice", alias = "multipleChoice")]
    MultipleChoice,
    #[serde(alias = "fill-blank", alias = "fillBlank")]
    FillBlank,
    #[serde(alias = "true-false", alias = "trueFalse")]
    TrueFalse,
    #[serde(alias = "short-answer", alias = "shortAnswer")]
    ShortAnswer,
    Numeric,
}

impl ItemType {
    pub fn needs_options(&self) -> bool {
        matches!(self, ItemType::MultipleChoice)
    }
}

/// Expected answer. Numbers are compared through their string form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Integer(n) => write!(f, "{n}"),
            Answer::Float(n) => write!(f, "{n}"),
            Answer::Bool(b) => write!(f, "{b}"),
            Answer::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Answer {
    fn from(s: &str) -> Self {
        Answer::Text(s.to_string())
    }
}

impl From<i64> for Answer {
    fn from(n: i64) -> Self {
        Answer::Integer(n)
    }
}

/// Trimmed, lowercased form used for answer comparison.
pub fn normalize_answer(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// One practice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseItem {
    pub id: String,
    #[serde(rename = "type", alias = "item_type")]
    pub item_type: ItemType,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(alias = "correctAnswer")]
    pub correct_answer: Answer,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default = "default_difficulty")]
    pub difficulty: u8,
    #[serde(default)]
    pub category: String,
}

fn default_difficulty() -> u8 {
    1
}

impl ExerciseItem {
    pub fn new(id: impl Into<String>, question: impl Into<String>, answer: impl Into<Answer>) -> Self {
        Self {
            id: id.into(),
            item_type: ItemType::ShortAnswer,
            question: question.into(),
            options: None,
            correct_answer: answer.into(),
            explanation: String::new(),
            hint: None,
            difficulty: default_difficulty(),
            category: String::new(),
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    pub fn is_correct(&self, raw: &str) -> bool {
        normalize_answer(raw) == normalize_answer(&self.correct_answer.to_string())
    }
}

/// A named set of items loaded from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemBank {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default)]
    pub items: Vec<ExerciseItem>,
}
