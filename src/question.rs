use serde::Deserialize;

/// Canonical area labels recognized by the default quota tables
pub const AREAS: [&str; 4] = ["History", "Science", "Geography", "Culture"];

/// Canonical difficulty tiers, easiest first
pub const DIFFICULTIES: [&str; 4] = ["Easy", "Medium", "Hard", "Elite"];

/// Question kind; determines the allowed option count
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, strum_macros::Display)]
pub enum Kind {
    #[serde(rename = "MC")]
    #[strum(serialize = "MC")]
    MultipleChoice,
    #[serde(rename = "TF")]
    #[strum(serialize = "TF")]
    TrueFalse,
}

impl Kind {
    /// Parse the bank's type column ("MC"/"TF", any case)
    pub fn parse(raw: &str) -> Option<Kind> {
        match raw.trim().to_uppercase().as_str() {
            "MC" => Some(Kind::MultipleChoice),
            "TF" => Some(Kind::TrueFalse),
            _ => None,
        }
    }

    /// Number of options this kind presents
    pub fn option_count(&self) -> usize {
        match self {
            Kind::MultipleChoice => 4,
            Kind::TrueFalse => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AnswerOption {
    pub key: String,
    pub text: String,
}

/// One normalized question as drawn into a session.
/// Immutable once sampled except for `elapsed_carry_ms`, which accumulates
/// time already spent on the question across skips.
#[derive(Clone, Debug, Deserialize)]
pub struct QuestionRecord {
    pub id: String,
    pub value: f64,
    pub kind: Kind,
    pub answer_key: String,
    pub prompt: String,
    pub options: Vec<AnswerOption>,
    pub area: String,
    pub difficulty: String,
    #[serde(skip)]
    pub elapsed_carry_ms: u64,
}

impl QuestionRecord {
    /// Validation invariants for ingestion; invalid records are dropped from
    /// the pool, never surfaced mid-session.
    pub fn is_valid(&self) -> bool {
        !self.id.is_empty()
            && !self.prompt.trim().is_empty()
            && self.value >= 0.0
            && self.options.len() == self.kind.option_count()
            && self.options.iter().all(|o| !o.key.is_empty())
            && self.options.iter().any(|o| o.key == self.answer_key)
    }

    pub fn has_option(&self, key: &str) -> bool {
        self.options.iter().any(|o| o.key == key)
    }
}

/// Case-insensitive match against the canonical label sets; unmatched labels
/// pass through trimmed.
pub fn canon_label(raw: &str) -> String {
    let trimmed = raw.trim();
    for canonical in AREAS.iter().chain(DIFFICULTIES.iter()) {
        if trimmed.eq_ignore_ascii_case(canonical) {
            return (*canonical).to_string();
        }
    }
    trimmed.to_string()
}
