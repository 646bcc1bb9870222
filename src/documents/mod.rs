//! Business document generators.
//!
//! Each builder maps one data record to a fixed `DocumentLayout` and the
//! shared renderer turns that layout into a PDF (`printpdf`, builtin
//! Helvetica). Builders are pure: the same record always yields the same
//! layout tree.

pub mod delivery_challan;
pub mod format;
pub mod invoice;
pub mod layout;
pub mod model;
pub mod purchase_order;
pub mod quotation;
pub mod render;
pub mod sections;
pub mod totals;

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

pub use delivery_challan::DeliveryChallan;
pub use invoice::TaxInvoice;
pub use layout::DocumentLayout;
pub use purchase_order::PurchaseOrder;
pub use quotation::Quotation;
pub use render::render_pdf;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Invalid {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("Unknown document kind: {0}")]
    UnknownKind(String),

    #[error("Malformed document data: {0}")]
    Malformed(String),

    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocumentError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// A record that can be laid out as a document.
pub trait DocumentBuilder {
    /// File name stem used when no output path is given, e.g. `PO-0042`.
    fn file_stem(&self) -> String;

    /// Validate the record and build its layout.
    fn build_layout(&self) -> Result<DocumentLayout, DocumentError>;
}

/// The four document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PurchaseOrder,
    Quotation,
    DeliveryChallan,
    TaxInvoice,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 4] = [
        Self::PurchaseOrder,
        Self::Quotation,
        Self::DeliveryChallan,
        Self::TaxInvoice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PurchaseOrder => "purchase-order",
            Self::Quotation => "quotation",
            Self::DeliveryChallan => "delivery-challan",
            Self::TaxInvoice => "invoice",
        }
    }

    /// Parse JSON into this kind's record and build the layout.
    pub fn layout_from_json(&self, json: &[u8]) -> Result<(String, DocumentLayout), DocumentError> {
        match self {
            Self::PurchaseOrder => layout_from::<PurchaseOrder>(json),
            Self::Quotation => layout_from::<Quotation>(json),
            Self::DeliveryChallan => layout_from::<DeliveryChallan>(json),
            Self::TaxInvoice => layout_from::<TaxInvoice>(json),
        }
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "purchase-order" | "po" => Ok(Self::PurchaseOrder),
            "quotation" | "quote" => Ok(Self::Quotation),
            "delivery-challan" | "challan" => Ok(Self::DeliveryChallan),
            "invoice" | "tax-invoice" => Ok(Self::TaxInvoice),
            _ => Err(DocumentError::UnknownKind(s.to_string())),
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn layout_from<T>(json: &[u8]) -> Result<(String, DocumentLayout), DocumentError>
where
    T: DocumentBuilder + DeserializeOwned,
{
    let record: T =
        serde_json::from_slice(json).map_err(|e| DocumentError::Malformed(e.to_string()))?;
    Ok((record.file_stem(), record.build_layout()?))
}

/// Build, render, and write a document to `path`.
pub fn generate<T: DocumentBuilder>(record: &T, path: &Path) -> Result<PathBuf, DocumentError> {
    let layout = record.build_layout()?;
    let bytes = render_pdf(&layout)?;
    write_atomically(path, &bytes)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "Document written");
    Ok(path.to_path_buf())
}

/// Sanitize a document number into a safe file name (`PO/24-25/07` → `PO-24-25-07.pdf`).
pub fn output_file_name(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    let trimmed = cleaned.trim_matches('-');
    if trimmed.is_empty() {
        "document.pdf".to_string()
    } else {
        format!("{trimmed}.pdf")
    }
}

/// Write through a temp file in the destination directory, then rename,
/// so readers never observe a half-written PDF.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), DocumentError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| DocumentError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_aliases() {
        assert_eq!("po".parse::<DocumentKind>().unwrap(), DocumentKind::PurchaseOrder);
        assert_eq!("Delivery_Challan".parse::<DocumentKind>().unwrap(), DocumentKind::DeliveryChallan);
        assert_eq!("tax-invoice".parse::<DocumentKind>().unwrap(), DocumentKind::TaxInvoice);
        assert!(matches!("receipt".parse::<DocumentKind>(), Err(DocumentError::UnknownKind(_))));
    }

    #[test]
    fn kind_round_trips_through_as_str() {
        for kind in DocumentKind::ALL {
            assert_eq!(kind.as_str().parse::<DocumentKind>().unwrap(), kind);
        }
    }

    #[test]
    fn output_file_name_sanitizes() {
        assert_eq!(output_file_name("PO/24-25/07"), "PO-24-25-07.pdf");
        assert_eq!(output_file_name("///"), "document.pdf");
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = DocumentKind::Quotation.layout_from_json(b"{\"number\": 5").unwrap_err();
        assert!(matches!(err, DocumentError::Malformed(_)));
    }

    #[test]
    fn write_atomically_creates_dirs_and_replaces() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out").join("doc.pdf");
        write_atomically(&path, b"%PDF-first").unwrap();
        write_atomically(&path, b"%PDF-second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-second");
        // No stray temp files left beside the output.
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }
}
