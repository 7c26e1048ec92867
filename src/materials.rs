//! Session materials uploaded by the therapist (images, worksheets).
//!
//! Materials live in memory for the session only.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Default upload cap (20 MiB)
pub const DEFAULT_MAX_MATERIAL_BYTES: usize = 20 * 1024 * 1024;

/// Default cap on all materials held by one session (200 MiB)
pub const DEFAULT_MAX_SHELF_BYTES: usize = 200 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    Png,
    Jpeg,
    Pdf,
}

impl MaterialKind {
    /// Detect the kind from magic bytes
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(MaterialKind::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(MaterialKind::Jpeg)
        } else if bytes.starts_with(b"%PDF") {
            Some(MaterialKind::Pdf)
        } else {
            None
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            MaterialKind::Png => "image/png",
            MaterialKind::Jpeg => "image/jpeg",
            MaterialKind::Pdf => "application/pdf",
        }
    }
}

#[derive(Debug, Error)]
pub enum MaterialError {
    #[error("Uploaded file is empty")]
    Empty,

    #[error("Unsupported file type (expected PNG, JPG or PDF)")]
    UnsupportedType,

    #[error("File too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Session storage full: {used} of {max} bytes in use")]
    ShelfFull { used: usize, max: usize },
}

#[derive(Debug, Clone)]
pub struct SessionMaterial {
    pub id: Uuid,
    pub file_name: String,
    pub kind: MaterialKind,
    pub bytes: Vec<u8>,
    pub uploaded_at: DateTime<Local>,
}

/// Listing entry without the file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialSummary {
    pub id: Uuid,
    pub file_name: String,
    pub kind: MaterialKind,
    pub content_type: String,
    pub size_bytes: usize,
    pub uploaded_at: DateTime<Local>,
}

impl SessionMaterial {
    pub fn summary(&self) -> MaterialSummary {
        MaterialSummary {
            id: self.id,
            file_name: self.file_name.clone(),
            kind: self.kind,
            content_type: self.kind.content_type().to_string(),
            size_bytes: self.bytes.len(),
            uploaded_at: self.uploaded_at,
        }
    }
}

/// Keep only the final path component of a client-supplied name
fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() {
        "material".to_string()
    } else {
        base.to_string()
    }
}

/// In-memory store of uploaded materials
#[derive(Debug, Clone)]
pub struct MaterialShelf {
    items: Vec<SessionMaterial>,
    /// Per-file cap
    max_bytes: usize,
    /// Cap on the sum of all stored files
    max_total_bytes: usize,
}

impl Default for MaterialShelf {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MATERIAL_BYTES, DEFAULT_MAX_SHELF_BYTES)
    }
}

impl MaterialShelf {
    pub fn new(max_bytes: usize, max_total_bytes: usize) -> Self {
        Self {
            items: Vec::new(),
            max_bytes,
            max_total_bytes,
        }
    }

    pub fn add(
        &mut self,
        file_name: &str,
        bytes: Vec<u8>,
        now: DateTime<Local>,
    ) -> Result<MaterialSummary, MaterialError> {
        if bytes.is_empty() {
            return Err(MaterialError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(MaterialError::TooLarge {
                size: bytes.len(),
                max: self.max_bytes,
            });
        }
        let used = self.total_bytes();
        if used.saturating_add(bytes.len()) > self.max_total_bytes {
            return Err(MaterialError::ShelfFull {
                used,
                max: self.max_total_bytes,
            });
        }
        let kind = MaterialKind::detect(&bytes).ok_or(MaterialError::UnsupportedType)?;

        let material = SessionMaterial {
            id: Uuid::new_v4(),
            file_name: sanitize_file_name(file_name),
            kind,
            bytes,
            uploaded_at: now,
        };
        let summary = material.summary();
        self.items.push(material);
        Ok(summary)
    }

    pub fn total_bytes(&self) -> usize {
        self.items.iter().map(|m| m.bytes.len()).sum()
    }

    pub fn get(&self, id: Uuid) -> Option<&SessionMaterial> {
        self.items.iter().find(|m| m.id == id)
    }

    pub fn list(&self) -> Vec<MaterialSummary> {
        self.items.iter().map(SessionMaterial::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
