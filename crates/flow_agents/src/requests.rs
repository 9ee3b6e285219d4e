//! Request and response bodies for agent services.
//!
//! Field names follow the camelCase JSON accepted by the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use flow_core::Issue;
use flow_llm::ImageInput;

/// The user's idea in any combination of text, dictated text and an image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdeaInput {
    pub text: Option<String>,
    pub voice_text: Option<String>,
    pub image: Option<ImageInput>,
}

impl IdeaInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_voice_text(mut self, voice_text: impl Into<String>) -> Self {
        self.voice_text = Some(voice_text.into());
        self
    }

    pub fn with_image(mut self, image: ImageInput) -> Self {
        self.image = Some(image);
        self
    }

    fn text_part(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn voice_part(&self) -> Option<&str> {
        self.voice_text.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// True when no text, voice text or image was supplied.
    pub fn is_empty(&self) -> bool {
        self.text_part().is_none() && self.voice_part().is_none() && self.image.is_none()
    }

    /// Labeled input block for the model.
    pub fn user_input(&self) -> String {
        let mut input = String::new();
        if let Some(text) = self.text_part() {
            input.push_str(&format!("Text idea: {}\n", text));
        }
        if let Some(voice) = self.voice_part() {
            input.push_str(&format!("Voice description: {}\n", voice));
        }
        if self.image.is_some() {
            input.push_str("Image: attached sketch or screenshot\n");
        }
        input
    }

    /// The prompt recorded on the workflow: text, else voice text, else a
    /// marker for image-only input.
    pub fn user_prompt(&self) -> String {
        self.text_part()
            .or_else(|| self.voice_part())
            .unwrap_or("Image-based workflow")
            .to_string()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct WireframesRequest {
    pub prd: String,
    pub requirements: Value,
    pub user_prompt: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct WireframeSelectionRequest {
    pub user_prompt: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FrontendCodeRequest {
    pub wireframes: Value,
    pub requirements: Value,
    pub user_prompt: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendCodeRequest {
    pub requirements: Value,
    pub user_prompt: String,
    pub frontend_code: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RegenerateRequest {
    pub agent_name: String,
    pub agent_role: String,
    pub previous_output: String,
    pub feedback: String,
    pub user_prompt: String,
    pub requirements: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegeneratedOutput {
    pub regenerated_output: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedbackRequest {
    pub artifact_type: String,
    pub artifact_data: Value,
    pub feedback: String,
    pub workflow_data: Value,
}

/// Critic verdict on an artifact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Approved,
    NeedsImprovement,
}

impl ReviewStatus {
    /// Anything other than an explicit approval needs improvement.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "approved" | "approve" | "pass" | "passed" => Self::Approved,
            _ => Self::NeedsImprovement,
        }
    }
}

impl Default for ReviewStatus {
    fn default() -> Self {
        Self::NeedsImprovement
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CriticReview {
    pub strengths: Vec<String>,
    pub issues: Vec<Issue>,
    pub recommendations: Vec<String>,
    pub status: ReviewStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Improvement {
    pub issue: String,
    pub solution: String,
}

impl Improvement {
    pub fn new(issue: impl Into<String>, solution: impl Into<String>) -> Self {
        Self {
            issue: issue.into(),
            solution: solution.into(),
        }
    }
}

/// Result of a critic pass over user feedback.
///
/// A `needs_improvement` review always carries at least one improvement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub critic_review: CriticReview,
    pub improvements: Vec<Improvement>,
    pub updated_artifact: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ApproveRequest {
    pub artifact_type: String,
    pub artifact_id: String,
    pub workflow_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalReceipt {
    pub success: bool,
    pub message: String,
    pub workflow_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ThinkingRequest {
    pub agent_name: String,
    pub agent_role: String,
    pub user_prompt: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PrdRequest {
    pub prd_content: String,
    pub project_name: Option<String>,
    pub user_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrdDocument {
    pub pdf_content: String,
    pub filename: String,
    pub success: bool,
}
