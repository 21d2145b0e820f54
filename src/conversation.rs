//! Cumulative conversation with the analysis provider.
//!
//! The provider API is stateless, so the ordered turn history lives here and is
//! resent with every request. The cumulative report is the text of the latest
//! successful reply; it is replaced, never appended to.

use std::fmt;

use tracing::debug;

use crate::error::ProviderError;
use crate::i18n::Language;
use crate::provider::{AnalysisProvider, ContentPart, Role, Turn, UploadedAsset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisMode {
    #[default]
    Meeting,
    General,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisMode::Meeting => f.write_str("meeting"),
            AnalysisMode::General => f.write_str("general"),
        }
    }
}

/// Builds the per-turn instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptBuilder {
    pub language: Language,
    pub mode: AnalysisMode,
}

impl PromptBuilder {
    pub fn new(language: Language, mode: AnalysisMode) -> Self {
        Self { language, mode }
    }

    fn language_rule(&self) -> String {
        format!(
            "**MOST IMPORTANT RULE: The ENTIRE response, without exception, MUST be written ONLY in this language: \"{}\"**",
            self.language.name()
        )
    }

    /// Prompt for the opening turn: defines the report schema and labeling rule.
    pub fn first_turn(&self) -> String {
        let rule = self.language_rule();
        match self.mode {
            AnalysisMode::Meeting => format!(
                "{rule}\n\n\
                 You are an expert multimodal AI that analyzes meetings. You receive the first \
                 segment of a recording as sampled video frames (in temporal order) and the \
                 matching audio. Produce a comprehensive, professional report in Markdown.\n\n\
                 **NAMING RULE:** Give every person you detect a unique label such as \
                 \"Participant 1 (short description)\", \"Participant 2 (short description)\" and \
                 use exactly the same labels for the rest of the report and in all later updates.\n\n\
                 Fill in the following sections:\n\
                 1. **Executive Summary:** a short paragraph summarizing everything observed.\n\
                 2. **Participants:** every labeled person, with role or description.\n\
                 3. **Transcript:** the spoken content, attributed to participant labels.\n\
                 4. **Sentiment Analysis:** the overall mood and the participants' body language.\n\
                 5. **Key Events:** the most important actions and moments, as a bullet list.\n\
                 6. **Action Items:** decisions taken and to-dos, with owners when known.\n\
                 7. **Observed Environment:** the setting and notable objects."
            ),
            AnalysisMode::General => format!(
                "{rule}\n\n\
                 You are an expert multimodal AI that interprets videos. You receive the first \
                 segment of a video as sampled frames (in temporal order) and the matching audio. \
                 Produce a comprehensive report in Markdown.\n\n\
                 **NAMING RULE:** Give every person you detect a unique label such as \
                 \"Person 1 (short description)\" and keep using exactly the same labels for the \
                 rest of the report and in all later updates.\n\n\
                 Fill in the following sections:\n\
                 1. **Summary:** what the video is about, in a short paragraph.\n\
                 2. **Participants:** every labeled person or character.\n\
                 3. **Transcript:** speech and narration, attributed to labels.\n\
                 4. **Tone and Sentiment:** the mood and how it changes.\n\
                 5. **Key Events:** the most important moments, as a bullet list.\n\
                 6. **Takeaways and Action Items:** conclusions, instructions or calls to action.\n\
                 7. **Setting:** locations and notable objects."
            ),
        }
    }

    /// Prompt for every later turn: update the existing report in place.
    pub fn follow_up(&self) -> String {
        format!(
            "{}\n\n\
             We are continuing the analysis. The frames and audio below are the next segment of \
             the same video. **Update and enrich** the existing report with this new material: \
             add new events, decisions, transcript passages and changes in sentiment in the \
             sections where they belong. Keep using the participant labels you already assigned \
             and only introduce new labels for people who have not appeared before. Return the \
             COMPLETE, updated report as a single coherent document, not just the changes.",
            self.language_rule()
        )
    }

    pub fn for_state(&self, state: &ConversationState) -> String {
        if state.is_empty() {
            self.first_turn()
        } else {
            self.follow_up()
        }
    }
}

/// Accumulated dialogue and the latest full report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    turns: Vec<Turn>,
    report: Option<String>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// No exchange has completed yet.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn completed_turns(&self) -> usize {
        self.turns.len() / 2
    }

    pub fn report(&self) -> Option<&str> {
        self.report.as_deref()
    }

    pub fn into_report(self) -> Option<String> {
        self.report
    }

    /// Append a successful exchange and replace the report with its reply.
    pub fn record(&mut self, user_parts: Vec<ContentPart>, reply: String) {
        self.turns.push(Turn {
            role: Role::User,
            parts: user_parts,
        });
        self.turns.push(Turn {
            role: Role::Model,
            parts: vec![ContentPart::text(reply.clone())],
        });
        self.report = Some(reply);
    }
}

/// Material for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub prompt: String,
    /// Inline frame parts, in temporal order.
    pub frames: Vec<ContentPart>,
    pub audio: UploadedAsset,
}

impl TurnRequest {
    /// Prompt text, then frames, then the audio reference.
    pub fn parts(&self) -> Vec<ContentPart> {
        let mut parts = Vec::with_capacity(self.frames.len() + 2);
        parts.push(ContentPart::text(self.prompt.clone()));
        parts.extend(self.frames.iter().cloned());
        parts.push(ContentPart::file(&self.audio));
        parts
    }
}

/// Exchange one turn on top of `state` and return the provider's full report text.
///
/// `state` is not modified; callers record the exchange once it succeeds.
pub async fn send_turn<P>(
    provider: &P,
    state: &ConversationState,
    request: &TurnRequest,
) -> Result<String, ProviderError>
where
    P: AnalysisProvider + ?Sized,
{
    let mut contents = Vec::with_capacity(state.turns.len() + 1);
    contents.extend(state.turns.iter().cloned());
    contents.push(Turn {
        role: Role::User,
        parts: request.parts(),
    });
    debug!(
        history = state.turns.len(),
        frames = request.frames.len(),
        "Sending turn"
    );
    provider.generate(&contents).await
}
