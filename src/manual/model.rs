use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Output language of a manual
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ja,
    En,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Ja => "ja",
            Language::En => "en",
        }
    }

    /// Name of the language written in that language
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Ja => "日本語",
            Language::En => "English",
        }
    }

    pub fn default_title(&self) -> &'static str {
        match self {
            Language::Ja => "操作マニュアル",
            Language::En => "Operation Manual",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ja" => Ok(Language::Ja),
            "en" => Ok(Language::En),
            other => Err(format!("unsupported language '{}', expected ja or en", other)),
        }
    }
}

/// How verbose the generated steps are
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    #[default]
    Simple,
    Detailed,
}

impl DetailLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailLevel::Simple => "simple",
            DetailLevel::Detailed => "detailed",
        }
    }

    /// Localized label, also interpolated into the analysis prompt
    pub fn label(&self, language: Language) -> &'static str {
        match (language, self) {
            (Language::Ja, DetailLevel::Simple) => "簡潔",
            (Language::Ja, DetailLevel::Detailed) => "詳細",
            (Language::En, DetailLevel::Simple) => "concise",
            (Language::En, DetailLevel::Detailed) => "detailed",
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetailLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(DetailLevel::Simple),
            "detailed" => Ok(DetailLevel::Detailed),
            other => Err(format!(
                "unsupported detail level '{}', expected simple or detailed",
                other
            )),
        }
    }
}

/// Options chosen before generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    pub language: Language,
    pub detail_level: DetailLevel,
}

/// Body of `POST /process-video`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingRequest {
    pub video_url: String,
    pub language: Language,
    pub detail_level: DetailLevel,
}

impl ProcessingRequest {
    pub fn new(video_url: impl Into<String>, options: GenerationOptions) -> Self {
        Self {
            video_url: video_url.into(),
            language: options.language,
            detail_level: options.detail_level,
        }
    }
}

/// Output of the video analyzer before screenshots exist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    /// Markdown containing `PLACEHOLDER_IMAGE_<i>` tokens
    pub manual_content: String,
    /// Seconds into the video, one per step image
    pub screenshot_timestamps: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Screenshot {
    pub id: String,
    pub url: String,
    pub timestamp: u32,
    pub description: String,
    pub step_number: u32,
}

impl Screenshot {
    /// Screenshot for the `index`-th requested timestamp
    pub fn for_step(index: usize, timestamp: u32, url: impl Into<String>) -> Self {
        Self {
            id: format!("screenshot_{}", index),
            url: url.into(),
            timestamp,
            description: format!("Step {} screenshot at {}s", index + 1, timestamp),
            step_number: index as u32 + 1,
        }
    }
}

/// A generated manual as held by the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manual {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub language: Language,
    pub detail_level: DetailLevel,
    pub screenshots: Vec<Screenshot>,
    pub created_at: DateTime<Utc>,
}

impl Manual {
    pub fn new(content: String, screenshots: Vec<Screenshot>, options: GenerationOptions) -> Self {
        let title = extract_title(&content)
            .unwrap_or(options.language.default_title())
            .to_string();

        Self {
            id: Uuid::now_v7(),
            title,
            content,
            language: options.language,
            detail_level: options.detail_level,
            screenshots,
            created_at: Utc::now(),
        }
    }
}

/// Text of the first level-one heading
pub fn extract_title(markdown: &str) -> Option<&str> {
    markdown
        .lines()
        .filter_map(|line| line.trim_start().strip_prefix("# "))
        .map(str::trim)
        .find(|title| !title.is_empty())
}
