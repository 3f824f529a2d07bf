use serde::{Deserialize, Serialize};

pub const DEFAULT_COMPETENCY: &str = "general";

/// Candidate answer submitted for grading.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub competency_type: Option<String>,
}

impl EvaluationRequest {
    pub fn competency(&self) -> &str {
        self.competency_type
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_COMPETENCY)
    }
}

/// Structured feedback produced by the grading model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(default)]
    pub is_correct: bool,
    /// 0 to 100.
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub marcus_comment: String,
}
