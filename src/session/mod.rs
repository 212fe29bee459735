//! Client-side generation session
//!
//! A [`Session`] walks one video through `Upload → Processing → Result`
//! (or `Error`), publishing progress on a `tokio::sync::watch` channel so a
//! UI or CLI can render it.

pub mod client;
pub mod messages;
pub mod status;
pub mod video;

pub use client::{ApiClient, ClientError, ManualService, VideoUploader};
pub use messages::{UserMessage, classify, describe};
pub use status::{ProcessingStage, ProcessingStatus};
pub use video::{ValidationIssue, VideoAsset, mime_from_extension};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::UploadLimits;
use crate::error::ErrorKind;
use crate::manual::{
    DocumentRenderer, ExportError, GenerationOptions, Language, Manual, MarkdownExport,
    ProcessingRequest, RenderedDocument,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    Upload,
    Processing,
    Result,
    Error,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No file selected")]
    NoFileSelected,

    #[error("Invalid file: {}", join_issues(.0))]
    InvalidFile(Vec<ValidationIssue>),

    #[error("Consent is required before generating")]
    ConsentRequired,

    #[error("Not allowed in the {actual:?} step")]
    WrongStep { actual: SessionStep },

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::NoFileSelected
            | SessionError::InvalidFile(_)
            | SessionError::ConsentRequired => ErrorKind::Validation,
            SessionError::WrongStep { .. } => ErrorKind::Internal,
            SessionError::Client(e) => e.kind(),
            SessionError::Export(e) => e.kind(),
        }
    }

    /// Localized text suitable for showing to the user
    pub fn message(&self, language: Language) -> String {
        match self {
            SessionError::NoFileSelected => UserMessage::NoFileSelected.text(language).to_string(),
            SessionError::ConsentRequired => {
                UserMessage::ConsentRequired.text(language).to_string()
            }
            SessionError::InvalidFile(issues) => issues
                .iter()
                .map(|issue| issue.message(language))
                .collect::<Vec<_>>()
                .join("\n"),
            SessionError::Client(e) => describe(e, language),
            other => other.to_string(),
        }
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub struct Session {
    limits: UploadLimits,
    require_consent: bool,
    step: SessionStep,
    file: Option<VideoAsset>,
    consent: bool,
    options: GenerationOptions,
    manual: Option<Manual>,
    error_message: Option<String>,
    status: watch::Sender<ProcessingStatus>,
}

impl Session {
    pub fn new(limits: UploadLimits, require_consent: bool) -> Self {
        let (status, _) = watch::channel(ProcessingStatus::idle());
        Self {
            limits,
            require_consent,
            step: SessionStep::Upload,
            file: None,
            consent: false,
            options: GenerationOptions::default(),
            manual: None,
            error_message: None,
            status,
        }
    }

    pub fn step(&self) -> SessionStep {
        self.step
    }

    pub fn file(&self) -> Option<&VideoAsset> {
        self.file.as_ref()
    }

    pub fn options(&self) -> GenerationOptions {
        self.options
    }

    pub fn manual(&self) -> Option<&Manual> {
        self.manual.as_ref()
    }

    /// Localized message for the last failure, while in the `Error` step
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn status(&self) -> ProcessingStatus {
        self.status.borrow().clone()
    }

    /// Receive every progress update from now on
    pub fn subscribe(&self) -> watch::Receiver<ProcessingStatus> {
        self.status.subscribe()
    }

    /// Select a video; an invalid file is rejected and not kept
    pub fn select_file(&mut self, video: VideoAsset) -> Result<(), SessionError> {
        self.require_step(&[SessionStep::Upload])?;

        let issues = video.validate(&self.limits);
        if !issues.is_empty() {
            warn!(file = %video.file_name, issues = %join_issues(&issues), "Rejected video");
            self.file = None;
            return Err(SessionError::InvalidFile(issues));
        }

        debug!(file = %video.file_name, size = video.size, "Video selected");
        self.file = Some(video);
        Ok(())
    }

    pub fn remove_file(&mut self) {
        self.file = None;
    }

    pub fn set_consent(&mut self, consent: bool) {
        self.consent = consent;
    }

    pub fn set_options(&mut self, options: GenerationOptions) {
        self.options = options;
    }

    /// Upload the selected video and generate its manual.
    ///
    /// Guard failures leave the session where it was. Once processing starts,
    /// any failure moves the session to `Error` with a localized message.
    pub async fn generate(
        &mut self,
        uploader: &dyn VideoUploader,
        service: &dyn ManualService,
    ) -> Result<&Manual, SessionError> {
        self.require_step(&[SessionStep::Upload, SessionStep::Error])?;

        let Some(video) = self.file.clone() else {
            return Err(SessionError::NoFileSelected);
        };
        let issues = video.validate(&self.limits);
        if !issues.is_empty() {
            return Err(SessionError::InvalidFile(issues));
        }
        if self.require_consent && !self.consent {
            return Err(SessionError::ConsentRequired);
        }

        self.step = SessionStep::Processing;
        self.error_message = None;
        self.manual = None;
        self.status.send_replace(ProcessingStatus::idle());

        match self.run(&video, uploader, service).await {
            Ok(manual) => {
                info!(manual_id = %manual.id, title = %manual.title, "Manual generated");
                self.step = SessionStep::Result;
                self.publish(ProcessingStage::Completed);
                Ok(self.manual.insert(manual))
            }
            Err(e) => {
                let message = describe(&e, self.options.language);
                warn!(kind = %e.kind(), error = %e, "Manual generation failed");
                self.step = SessionStep::Error;
                self.error_message = Some(message.clone());
                self.status.send_replace(ProcessingStatus::failed(message));
                Err(SessionError::Client(e))
            }
        }
    }

    /// Run `generate` again after a failure
    pub async fn retry(
        &mut self,
        uploader: &dyn VideoUploader,
        service: &dyn ManualService,
    ) -> Result<&Manual, SessionError> {
        self.require_step(&[SessionStep::Error])?;
        self.generate(uploader, service).await
    }

    /// Discard the file, manual and progress; consent and options are kept
    pub fn start_new(&mut self) {
        self.step = SessionStep::Upload;
        self.file = None;
        self.manual = None;
        self.error_message = None;
        self.status.send_replace(ProcessingStatus::idle());
    }

    pub fn download_markdown(&self) -> Result<MarkdownExport, SessionError> {
        Ok(MarkdownExport::from_manual(self.finished_manual()?))
    }

    pub fn render_document(
        &self,
        renderer: &dyn DocumentRenderer,
    ) -> Result<RenderedDocument, SessionError> {
        Ok(renderer.render(self.finished_manual()?)?)
    }

    async fn run(
        &self,
        video: &VideoAsset,
        uploader: &dyn VideoUploader,
        service: &dyn ManualService,
    ) -> Result<Manual, ClientError> {
        self.publish(ProcessingStage::Uploading);
        let uploaded = uploader.upload(video).await?;

        self.publish(ProcessingStage::Analyzing);
        let request = ProcessingRequest::new(uploaded.url, self.options);
        let processed = service.process(&request).await?;

        self.publish(ProcessingStage::Extracting);
        self.publish(ProcessingStage::Generating);

        Ok(Manual::new(
            processed.manual_content,
            processed.screenshots,
            self.options,
        ))
    }

    fn publish(&self, stage: ProcessingStage) {
        let next = ProcessingStatus::milestone(stage, self.options.language);
        let allowed = self.status.borrow().can_advance_to(&next);
        if allowed {
            self.status.send_replace(next);
        } else {
            debug!(?stage, "Ignoring out-of-order progress update");
        }
    }

    fn finished_manual(&self) -> Result<&Manual, SessionError> {
        self.require_step(&[SessionStep::Result])?;
        self.manual.as_ref().ok_or(SessionError::WrongStep { actual: self.step })
    }

    fn require_step(&self, allowed: &[SessionStep]) -> Result<(), SessionError> {
        if allowed.contains(&self.step) {
            Ok(())
        } else {
            Err(SessionError::WrongStep { actual: self.step })
        }
    }
}
