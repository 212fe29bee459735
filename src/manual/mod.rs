//! Manual domain types, placeholder assembly and export

pub mod assembly;
pub mod export;
pub mod model;

pub use assembly::{AssemblyError, PlaceholderPolicy, assemble};
pub use export::{
    DocumentRenderer, ExportError, HtmlDocumentRenderer, MarkdownExport, RenderedDocument,
    embed_images,
};
pub use model::{
    AnalysisResult, DetailLevel, GenerationOptions, Language, Manual, ProcessingRequest,
    Screenshot, extract_title,
};
