//! Export-format dispatch for native Drive documents.
//!
//! Native documents (Sheets, Docs, Slides, Drawings, ...) have no byte content
//! of their own and must be exported. The mapping is total over the native
//! family: anything not specifically recognised exports as PDF.

use crate::contract::FOLDER_MIME_TYPE;

const NATIVE_PREFIX: &str = "application/vnd.google-apps.";

/// Category of a native online document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeKind {
    Spreadsheet,
    Document,
    Presentation,
    Other,
}

impl NativeKind {
    /// Classify a MIME type. Returns `None` for non-native types and folders.
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        if mime_type == FOLDER_MIME_TYPE {
            return None;
        }
        let kind = match mime_type.strip_prefix(NATIVE_PREFIX)? {
            "spreadsheet" => NativeKind::Spreadsheet,
            "document" => NativeKind::Document,
            "presentation" => NativeKind::Presentation,
            _ => NativeKind::Other,
        };
        Some(kind)
    }

    pub fn export_format(self) -> ExportFormat {
        match self {
            NativeKind::Spreadsheet => ExportFormat {
                mime_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                extension: "xlsx",
            },
            NativeKind::Document => ExportFormat {
                mime_type:
                    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                extension: "docx",
            },
            NativeKind::Presentation => ExportFormat {
                mime_type:
                    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
                extension: "pptx",
            },
            NativeKind::Other => ExportFormat {
                mime_type: "application/pdf",
                extension: "pdf",
            },
        }
    }
}

/// Target MIME type and file extension for an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    pub mime_type: &'static str,
    pub extension: &'static str,
}

impl ExportFormat {
    pub fn for_mime_type(mime_type: &str) -> Option<Self> {
        NativeKind::from_mime_type(mime_type).map(NativeKind::export_format)
    }

    /// `name` with this format's extension appended unless already present.
    pub fn local_file_name(&self, name: &str) -> String {
        let suffix = format!(".{}", self.extension);
        if name.to_ascii_lowercase().ends_with(&suffix) {
            name.to_string()
        } else {
            format!("{name}{suffix}")
        }
    }
}

/// Local file name for a remote file of the given MIME type.
pub fn local_file_name(name: &str, mime_type: &str) -> String {
    match ExportFormat::for_mime_type(mime_type) {
        Some(format) => format.local_file_name(name),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_kinds_map_to_office_formats() {
        let cases = [
            ("application/vnd.google-apps.spreadsheet", "Budget", "Budget.xlsx"),
            ("application/vnd.google-apps.document", "Notes", "Notes.docx"),
            ("application/vnd.google-apps.presentation", "Deck", "Deck.pptx"),
            ("application/vnd.google-apps.drawing", "Sketch", "Sketch.pdf"),
            ("application/vnd.google-apps.form", "Survey", "Survey.pdf"),
        ];
        for (mime, name, expected) in cases {
            assert_eq!(local_file_name(name, mime), expected, "mime = {mime}");
        }
    }

    #[test]
    fn non_native_names_are_unchanged() {
        assert_eq!(local_file_name("photo.jpg", "image/jpeg"), "photo.jpg");
        assert_eq!(local_file_name("report", "application/pdf"), "report");
        assert!(ExportFormat::for_mime_type("text/plain").is_none());
    }

    #[test]
    fn folders_are_not_exportable() {
        assert!(NativeKind::from_mime_type(FOLDER_MIME_TYPE).is_none());
    }

    #[test]
    fn existing_extension_is_not_doubled() {
        let format = NativeKind::Spreadsheet.export_format();
        assert_eq!(format.local_file_name("Q3.xlsx"), "Q3.xlsx");
        assert_eq!(format.local_file_name("Q3.XLSX"), "Q3.XLSX");
        assert_eq!(format.local_file_name("Q3.xls"), "Q3.xls.xlsx");
    }
}
