use serde::{Deserialize, Serialize};

/// Target format for exporting native documents (items the remote store can
/// only convert, never serve as raw bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
pub enum ExportTarget {
    Pdf,
    #[value(name = "open-document")]
    OpenDocument,
}

impl ExportTarget {
    /// File extension for a native document exported in this target format.
    pub fn extension(&self, mime_type: &str) -> &'static str {
        match self {
            ExportTarget::Pdf => "pdf",
            ExportTarget::OpenDocument => match mime_type {
                "application/vnd.google-apps.document" => "odt",
                "application/vnd.google-apps.presentation" => "odp",
                "application/vnd.google-apps.spreadsheet" => "ods",
                "application/vnd.google-apps.drawing" => "odg",
                _ => "pdf",
            },
        }
    }

    /// MIME type requested from the export endpoint.
    pub fn export_mime(&self, mime_type: &str) -> &'static str {
        match self {
            ExportTarget::Pdf => "application/pdf",
            ExportTarget::OpenDocument => match mime_type {
                "application/vnd.google-apps.document" => "application/vnd.oasis.opendocument.text",
                "application/vnd.google-apps.presentation" => {
                    "application/vnd.oasis.opendocument.presentation"
                }
                "application/vnd.google-apps.spreadsheet" => {
                    "application/vnd.oasis.opendocument.spreadsheet"
                }
                "application/vnd.google-apps.drawing" => {
                    "application/vnd.oasis.opendocument.graphics"
                }
                _ => "application/pdf",
            },
        }
    }
}

/// Broad content category derived from an item's MIME type, used to narrow
/// which files a run touches. Folders are never categorized; they are always
/// traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ItemCategory {
    All,
    Doc,
    Xls,
    Ppt,
    /// Any of doc, xls, ppt.
    Office,
    Text,
    Pdf,
    Image,
    Audio,
    Video,
    Other,
}

impl ItemCategory {
    /// Classify a MIME type into one of the concrete categories.
    ///
    /// Checks are ordered so that later, more specific matches win: a PDF
    /// served with a `text/` prefix still classifies as `Pdf`.
    pub fn of_mime(mime_type: &str) -> ItemCategory {
        let mut category = ItemCategory::Other;
        if mime_type.contains("application/msword")
            || mime_type.contains("application/vnd.openxmlformats-officedocument.wordprocessingml")
            || mime_type.contains("application/vnd.ms-word")
            || mime_type.contains("application/vnd.google-apps.document")
        {
            category = ItemCategory::Doc;
        }
        if mime_type.contains("application/vnd.ms-excel")
            || mime_type.contains("application/vnd.openxmlformats-officedocument.spreadsheetml")
            || mime_type.contains("application/vnd.google-apps.spreadsheet")
        {
            category = ItemCategory::Xls;
        }
        if mime_type.contains("application/vnd.ms-powerpoint")
            || mime_type.contains("application/vnd.openxmlformats-officedocument.presentationml")
            || mime_type.contains("application/vnd.google-apps.presentation")
        {
            category = ItemCategory::Ppt;
        }
        if mime_type.contains("text/") {
            category = ItemCategory::Text;
        }
        if mime_type.contains("pdf") {
            category = ItemCategory::Pdf;
        }
        if mime_type.contains("image/")
            || mime_type.contains("photo")
            || mime_type.contains("drawing")
        {
            category = ItemCategory::Image;
        }
        if mime_type.contains("audio/") {
            category = ItemCategory::Audio;
        }
        if mime_type.contains("video/") {
            category = ItemCategory::Video;
        }
        category
    }

    /// Whether an item with the given MIME type passes this filter.
    pub fn matches(&self, mime_type: &str) -> bool {
        match self {
            ItemCategory::All => true,
            ItemCategory::Office => matches!(
                ItemCategory::of_mime(mime_type),
                ItemCategory::Doc | ItemCategory::Xls | ItemCategory::Ppt
            ),
            other => ItemCategory::of_mime(mime_type) == *other,
        }
    }
}
