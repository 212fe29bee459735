use serde::{Deserialize, Serialize};

use super::messages::UserMessage;
use crate::manual::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStage {
    Uploading,
    Analyzing,
    Extracting,
    Generating,
    Completed,
    Error,
}

impl ProcessingStage {
    /// Fixed progress value shown when the stage is entered
    pub fn milestone(&self) -> u8 {
        match self {
            ProcessingStage::Uploading => 0,
            ProcessingStage::Analyzing => 25,
            ProcessingStage::Extracting => 60,
            ProcessingStage::Generating => 80,
            ProcessingStage::Completed => 100,
            ProcessingStage::Error => 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingStage::Completed | ProcessingStage::Error)
    }

    fn message(&self) -> Option<UserMessage> {
        match self {
            ProcessingStage::Uploading => Some(UserMessage::Uploading),
            ProcessingStage::Analyzing => Some(UserMessage::Analyzing),
            ProcessingStage::Extracting => Some(UserMessage::Extracting),
            ProcessingStage::Generating => Some(UserMessage::Generating),
            ProcessingStage::Completed => Some(UserMessage::Completed),
            ProcessingStage::Error => None,
        }
    }
}

/// Progress snapshot published to observers of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStatus {
    pub stage: ProcessingStage,
    pub progress: u8,
    pub message: String,
}

impl ProcessingStatus {
    /// State before anything has been submitted
    pub fn idle() -> Self {
        Self {
            stage: ProcessingStage::Uploading,
            progress: 0,
            message: String::new(),
        }
    }

    /// Milestone status for a non-error stage
    pub fn milestone(stage: ProcessingStage, language: Language) -> Self {
        Self {
            stage,
            progress: stage.milestone(),
            message: stage
                .message()
                .map(|m| m.text(language).to_string())
                .unwrap_or_default(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: ProcessingStage::Error,
            progress: 0,
            message: message.into(),
        }
    }

    /// Whether `next` may follow this status: terminal states never change,
    /// and progress only moves forward unless the run fails.
    pub fn can_advance_to(&self, next: &ProcessingStatus) -> bool {
        if self.stage.is_terminal() {
            return false;
        }
        next.stage == ProcessingStage::Error || next.progress >= self.progress
    }
}

impl Default for ProcessingStatus {
    fn default() -> Self {
        Self::idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_milestones_are_increasing() {
        let stages = [
            ProcessingStage::Uploading,
            ProcessingStage::Analyzing,
            ProcessingStage::Extracting,
            ProcessingStage::Generating,
            ProcessingStage::Completed,
        ];
        let progress: Vec<u8> = stages.iter().map(|s| s.milestone()).collect();
        assert_eq!(progress, vec![0, 25, 60, 80, 100]);
    }

    #[test]
    fn test_localized_milestone_message() {
        let status = ProcessingStatus::milestone(ProcessingStage::Analyzing, Language::Ja);
        assert_eq!(status.progress, 25);
        assert_eq!(status.message, "動画を解析中...");
    }

    #[test]
    fn test_terminal_states_do_not_advance() {
        let done = ProcessingStatus::milestone(ProcessingStage::Completed, Language::En);
        let again = ProcessingStatus::milestone(ProcessingStage::Uploading, Language::En);
        assert!(!done.can_advance_to(&again));
        assert!(!ProcessingStatus::failed("x").can_advance_to(&again));
    }

    #[test]
    fn test_progress_never_decreases_except_on_error() {
        let extracting = ProcessingStatus::milestone(ProcessingStage::Extracting, Language::En);
        let analyzing = ProcessingStatus::milestone(ProcessingStage::Analyzing, Language::En);
        assert!(!extracting.can_advance_to(&analyzing));
        assert!(extracting.can_advance_to(&ProcessingStatus::failed("boom")));
    }

    #[test]
    fn test_status_serializes_lowercase_stage() {
        let json = serde_json::to_value(ProcessingStatus::failed("x")).unwrap();
        assert_eq!(json["stage"], "error");
        assert_eq!(json["progress"], 0);
    }
}
