use crate::error::{ErrorKind, Stage};
use crate::manual::Language;

use super::client::ClientError;

/// Every user-facing string the session produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserMessage {
    FileTooLarge,
    InvalidFormat,
    NoFileSelected,
    ConsentRequired,
    Uploading,
    Analyzing,
    Extracting,
    Generating,
    Completed,
    UploadFailed,
    ServerUnavailable,
    AnalysisFailed,
    ScreenshotFailed,
    Timeout,
    ProcessingFailed,
}

impl UserMessage {
    pub fn text(&self, language: Language) -> &'static str {
        match language {
            Language::Ja => self.ja(),
            Language::En => self.en(),
        }
    }

    fn ja(&self) -> &'static str {
        match self {
            UserMessage::FileTooLarge => "ファイルサイズが上限を超えています",
            UserMessage::InvalidFormat => "サポートされていないファイル形式です",
            UserMessage::NoFileSelected => "動画ファイルを選択してください",
            UserMessage::ConsentRequired => "利用規約への同意が必要です",
            UserMessage::Uploading => "動画をアップロード中...",
            UserMessage::Analyzing => "動画を解析中...",
            UserMessage::Extracting => "スクリーンショットを抽出中...",
            UserMessage::Generating => "マニュアルを生成中...",
            UserMessage::Completed => "完了しました",
            UserMessage::UploadFailed => {
                "動画のアップロードに失敗しました。ファイルサイズやネットワーク接続を確認してください。"
            }
            UserMessage::ServerUnavailable => {
                "サーバーとの通信に失敗しました。しばらく時間をおいて再度お試しください。"
            }
            UserMessage::AnalysisFailed => {
                "動画の解析処理でエラーが発生しました。動画形式が対応しているか確認してください。"
            }
            UserMessage::ScreenshotFailed => {
                "スクリーンショットの生成でエラーが発生しました。処理を続行します。"
            }
            UserMessage::Timeout => "タイムアウトしました",
            UserMessage::ProcessingFailed => "処理に失敗しました",
        }
    }

    fn en(&self) -> &'static str {
        match self {
            UserMessage::FileTooLarge => "The file exceeds the maximum size",
            UserMessage::InvalidFormat => "This file format is not supported",
            UserMessage::NoFileSelected => "Please select a video file",
            UserMessage::ConsentRequired => "You must accept the terms of use",
            UserMessage::Uploading => "Uploading video...",
            UserMessage::Analyzing => "Analyzing video...",
            UserMessage::Extracting => "Extracting screenshots...",
            UserMessage::Generating => "Generating manual...",
            UserMessage::Completed => "Completed",
            UserMessage::UploadFailed => {
                "Failed to upload the video. Check the file size and your network connection."
            }
            UserMessage::ServerUnavailable => {
                "Could not reach the server. Please wait a moment and try again."
            }
            UserMessage::AnalysisFailed => {
                "Video analysis failed. Check that the video format is supported."
            }
            UserMessage::ScreenshotFailed => {
                "Screenshot generation failed. Processing will continue."
            }
            UserMessage::Timeout => "The request timed out",
            UserMessage::ProcessingFailed => "Processing failed",
        }
    }
}

/// Category shown to the user for a failed run; `None` means show the raw error text
pub fn classify(error: &ClientError) -> Option<UserMessage> {
    if error.kind() == ErrorKind::Timeout {
        return Some(UserMessage::Timeout);
    }

    match error.stage() {
        Some(Stage::Upload) => Some(UserMessage::UploadFailed),
        Some(Stage::Analysis) => Some(UserMessage::AnalysisFailed),
        Some(Stage::Screenshots) => Some(UserMessage::ScreenshotFailed),
        Some(Stage::Assembly) | Some(Stage::Cleanup) => None,
        None if error.is_transport() => Some(UserMessage::ServerUnavailable),
        None => None,
    }
}

/// Localized text for a failed run
pub fn describe(error: &ClientError, language: Language) -> String {
    match classify(error) {
        Some(message) => message.text(language).to_string(),
        None => {
            let raw = error.to_string();
            if raw.trim().is_empty() {
                UserMessage::ProcessingFailed.text(language).to_string()
            } else {
                raw
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_errors_map_to_analysis_message() {
        let error = ClientError::Api {
            status: 500,
            message: "Gemini content generation error: HTTP 500".to_string(),
            kind: ErrorKind::Fetch,
            stage: Some(Stage::Analysis),
        };
        assert_eq!(classify(&error), Some(UserMessage::AnalysisFailed));
        assert!(describe(&error, Language::Ja).starts_with("動画の解析処理で"));
    }

    #[test]
    fn test_timeout_wins_over_stage() {
        let error = ClientError::Api {
            status: 500,
            message: "Video processing timeout".to_string(),
            kind: ErrorKind::Timeout,
            stage: Some(Stage::Analysis),
        };
        assert_eq!(describe(&error, Language::En), "The request timed out");
    }

    #[test]
    fn test_transport_failure_is_server_unavailable() {
        let error = ClientError::Transport {
            stage: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(classify(&error), Some(UserMessage::ServerUnavailable));
    }

    #[test]
    fn test_unclassified_errors_show_raw_text() {
        let error = ClientError::Api {
            status: 400,
            message: "Missing required parameters".to_string(),
            kind: ErrorKind::Validation,
            stage: None,
        };
        assert_eq!(describe(&error, Language::En), "Missing required parameters");
    }
}
