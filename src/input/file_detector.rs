//! File type detection

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Docx,
    Png,
    Jpeg,
    Text,
    Unknown,
}

impl FileKind {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => FileKind::Pdf,
            "docx" => FileKind::Docx,
            "png" => FileKind::Png,
            "jpg" | "jpeg" => FileKind::Jpeg,
            "txt" => FileKind::Text,
            _ => FileKind::Unknown,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, FileKind::Png | FileKind::Jpeg)
    }
}
