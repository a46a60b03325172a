pub mod assembly;
pub mod pdf;
pub mod render;
pub mod service;
pub mod upload;

pub use assembly::{RenderBundle, assemble};
pub use pdf::{CommandPdfConverter, PdfConverter};
pub use render::{AskamaRenderer, TemplateRenderer};
pub use service::{DocumentService, GenerationOutcome};
pub use upload::{CloudUploader, HttpUploader, NoopUploader};
