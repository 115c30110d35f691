use tracing::{debug, warn};

use super::repo_types::NewAssessment;
use crate::llm::{ChatClient, ChatMessage, CompletionOptions, ADVISOR_PROMPT};

/// Stored in place of advice whenever the completion call fails.
pub const FALLBACK_RECOMMENDATION: &str = "Could not generate recommendation at this time.";

const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f32 = 0.7;

/// Recommendation text plus whether the model actually produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Advice {
    pub text: String,
    pub generated: bool,
}

pub fn career_prompt(assessment: &NewAssessment) -> String {
    format!(
        "You are a career advisor. A student has submitted the following:\n\
         - Interests: {}\n\
         - Skills: {}\n\
         - Academic strengths: {}\n\n\
         Suggest 3 suitable career paths for the student. \
         Include a brief explanation for each career, tailored to the given information.",
        assessment.interests, assessment.skills, assessment.academic_strengths
    )
}

/// Asks the model for career advice. Never fails: any error becomes the
/// fallback text.
pub async fn generate_recommendation(llm: &dyn ChatClient, model: &str, assessment: &NewAssessment) -> Advice {
    let messages = [
        ChatMessage::system(ADVISOR_PROMPT),
        ChatMessage::user(career_prompt(assessment)),
    ];
    let options = CompletionOptions {
        model: model.to_string(),
        max_tokens: Some(MAX_TOKENS),
        temperature: Some(TEMPERATURE),
    };
    match llm.complete(&messages, &options).await {
        Ok(text) => {
            debug!(chars = text.len(), "career recommendation generated");
            Advice { text, generated: true }
        }
        Err(e) => {
            warn!(error = %e, "career recommendation failed, storing fallback");
            Advice {
                text: FALLBACK_RECOMMENDATION.to_string(),
                generated: false,
            }
        }
    }
}
