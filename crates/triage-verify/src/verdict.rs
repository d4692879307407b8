//! The five-value verdict enum `spec.md` §4.6 requires the check pipeline
//! to always return, plus the structured shapes an LLM call fills in.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    True,
    False,
    Misleading,
    Unverified,
    PartiallyTrue,
}

impl Verdict {
    /// The exact wire strings the original prompt templates ask the LLM
    /// for — note the space, not an underscore, in `"PARTIALLY TRUE"`.
    pub fn as_wire(self) -> &'static str {
        match self {
            Verdict::True => "TRUE",
            Verdict::False => "FALSE",
            Verdict::Misleading => "MISLEADING",
            Verdict::Unverified => "UNVERIFIED",
            Verdict::PartiallyTrue => "PARTIALLY TRUE",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "TRUE" => Some(Verdict::True),
            "FALSE" => Some(Verdict::False),
            "MISLEADING" => Some(Verdict::Misleading),
            "UNVERIFIED" => Some(Verdict::Unverified),
            "PARTIALLY TRUE" => Some(Verdict::PartiallyTrue),
            _ => None,
        }
    }

    pub fn warrants_mini_lesson(self) -> bool {
        matches!(self, Verdict::False | Verdict::Misleading)
    }
}

/// One evidence hit as shown to the LLM and echoed back in `evidence_list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub id: String,
    pub url: String,
    pub title: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Step 5/6's parsed (or defaulted) LLM output, before the mini-lesson.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredVerdict {
    pub verdict: Verdict,
    pub trust_score: u8,
    pub confidence: u8,
    pub reasons: Vec<String>,
    pub evidence_list: Vec<String>,
    pub one_line_tip: String,
}

impl StructuredVerdict {
    /// `spec.md` §4.6 step 6's terminal fallback: unparseable LLM output
    /// becomes `UNVERIFIED` with zeros rather than raising to the caller.
    pub fn fallback() -> Self {
        Self {
            verdict: Verdict::Unverified,
            trust_score: 0,
            confidence: 0,
            reasons: vec!["Unable to process claim".to_string()],
            evidence_list: Vec::new(),
            one_line_tip: "Please verify this information from reliable sources".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiniLesson {
    pub mini_lesson: String,
    pub tips: Vec<String>,
    pub quiz: Quiz,
}

impl MiniLesson {
    /// Step 7's deterministic fallback on parse/availability failure.
    pub fn fallback() -> Self {
        Self {
            mini_lesson: "Unable to generate lesson at this time.".to_string(),
            tips: vec!["Verify information from reliable sources".to_string()],
            quiz: Quiz {
                question: "What should you do when you see suspicious claims?".to_string(),
                options: vec![
                    "A) Share immediately".to_string(),
                    "B) Verify first".to_string(),
                    "C) Ignore".to_string(),
                ],
                answer: "B".to_string(),
            },
        }
    }
}
