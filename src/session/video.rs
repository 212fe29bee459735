use bytes::Bytes;
use std::fmt;
use std::path::Path;

use super::messages::UserMessage;
use crate::config::UploadLimits;
use crate::humanize::format_file_size;
use crate::manual::Language;

/// A video selected for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoAsset {
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
    pub bytes: Bytes,
}

impl VideoAsset {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            size: bytes.len() as u64,
            bytes,
        }
    }

    /// Read a file from disk, guessing its mime type from the extension
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        let mime_type = mime_from_extension(&file_name)
            .unwrap_or("application/octet-stream")
            .to_string();

        Ok(Self::new(file_name, mime_type, Bytes::from(bytes)))
    }

    /// All problems with this file; empty means it may be uploaded
    pub fn validate(&self, limits: &UploadLimits) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.size > limits.max_video_bytes.as_u64() {
            issues.push(ValidationIssue::TooLarge {
                size: self.size,
                limit: limits.max_video_bytes.as_u64(),
            });
        }

        if !limits
            .allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&self.mime_type))
        {
            issues.push(ValidationIssue::UnsupportedType {
                mime_type: self.mime_type.clone(),
            });
        }

        issues
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    TooLarge { size: u64, limit: u64 },
    UnsupportedType { mime_type: String },
}

impl ValidationIssue {
    pub fn message(&self, language: Language) -> String {
        match self {
            ValidationIssue::TooLarge { limit, .. } => format!(
                "{} ({})",
                UserMessage::FileTooLarge.text(language),
                format_file_size(*limit)
            ),
            ValidationIssue::UnsupportedType { .. } => {
                UserMessage::InvalidFormat.text(language).to_string()
            }
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::TooLarge { size, limit } => write!(
                f,
                "file is {} but the limit is {}",
                format_file_size(*size),
                format_file_size(*limit)
            ),
            ValidationIssue::UnsupportedType { mime_type } => {
                write!(f, "unsupported video type '{}'", mime_type)
            }
        }
    }
}

/// Video mime type guessed from the file extension; `None` for non-video files
pub fn mime_from_extension(file_name: &str) -> Option<&'static str> {
    mime_guess::from_path(file_name)
        .iter_raw()
        .find(|mime| mime.starts_with("video/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::ByteSize;

    fn limits(max: u64) -> UploadLimits {
        UploadLimits {
            max_video_bytes: ByteSize(max),
            ..UploadLimits::default()
        }
    }

    #[test]
    fn test_valid_video_has_no_issues() {
        let video = VideoAsset::new("a.mp4", "video/mp4", Bytes::from_static(b"1234"));
        assert!(video.validate(&limits(4)).is_empty());
    }

    #[test]
    fn test_oversized_and_wrong_type_report_both() {
        let video = VideoAsset::new("a.png", "image/png", Bytes::from_static(b"12345"));
        let issues = video.validate(&limits(4));

        assert_eq!(
            issues,
            vec![
                ValidationIssue::TooLarge { size: 5, limit: 4 },
                ValidationIssue::UnsupportedType {
                    mime_type: "image/png".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_default_limit_is_500_megabytes() {
        let issue = ValidationIssue::TooLarge {
            size: 600 * 1024 * 1024,
            limit: UploadLimits::default().max_video_bytes.as_u64(),
        };
        assert_eq!(
            issue.message(Language::Ja),
            "ファイルサイズが上限を超えています (500 MB)"
        );
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_from_extension("clip.MOV"), Some("video/quicktime"));
        assert_eq!(mime_from_extension("clip.avi"), Some("video/x-msvideo"));
        assert_eq!(mime_from_extension("clip"), None);
        assert_eq!(mime_from_extension("notes.txt"), None);
    }

    #[tokio::test]
    async fn test_from_path_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("demo.webm");
        std::fs::write(&path, b"webm-bytes").unwrap();

        let video = VideoAsset::from_path(&path).await.unwrap();
        assert_eq!(video.file_name, "demo.webm");
        assert_eq!(video.mime_type, "video/webm");
        assert_eq!(video.size, 10);
    }
}
