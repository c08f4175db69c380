//! Document input: file detection and the layered text-extraction pipeline

pub mod docx;
pub mod enhance;
pub mod extract;
pub mod file_detector;
pub mod normalize;
pub mod ocr;
pub mod source;

pub use extract::{ExtractOptions, TextExtractionPipeline};
pub use file_detector::FileKind;
pub use source::SourceFile;
