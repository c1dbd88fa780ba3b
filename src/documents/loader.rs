// Bulk document loading from department folders
use std::path::{Path, PathBuf};

use crate::access::AccessPolicy;
use crate::errors::{RagError, Result};

/// Extensions read as plain text
pub const SUPPORTED_EXTENSIONS: &[&str] = &["md", "csv", "txt"];

/// Keyword table for guessing a department from a file name
const DEPARTMENT_KEYWORDS: &[(&str, &[&str])] = &[
    ("finance", &["finance", "financial", "quarterly", "revenue", "expense"]),
    ("marketing", &["marketing", "campaign", "sales", "customer"]),
    ("hr", &["hr", "employee", "payroll", "attendance"]),
    ("engineering", &["engineering", "technical", "architecture", "development"]),
];

/// A document ready for registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub content: String,
    pub source: String,
    pub department: String,
}

/// Reads `<data_dir>/<department>/*.{md,csv,txt}`
pub struct DocumentLoader {
    data_dir: PathBuf,
}

impl DocumentLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load every supported file under a known department folder.
    ///
    /// Folders that are not departments of `policy` are skipped. Output is
    /// sorted by source label so repeated loads register in the same order.
    pub fn load_all(&self, policy: &AccessPolicy) -> Result<Vec<SourceDocument>> {
        if !self.data_dir.is_dir() {
            return Err(RagError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Data directory not found: {}", self.data_dir.display()),
            )));
        }

        let mut documents = Vec::new();

        for entry in std::fs::read_dir(&self.data_dir)? {
            let dept_path = entry?.path();
            if !dept_path.is_dir() {
                continue;
            }

            let Some(department) = dept_path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !policy.is_known_department(department) {
                tracing::debug!(department, "skipping folder outside access policy");
                continue;
            }

            for file in std::fs::read_dir(&dept_path)? {
                let file_path = file?.path();
                let Some(name) = file_path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if !file_path.is_file() || !is_supported(name) {
                    continue;
                }

                let content = match std::fs::read_to_string(&file_path) {
                    Ok(content) => content,
                    Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                        tracing::warn!(file = %file_path.display(), "skipping file that is not UTF-8 text");
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };
                if content.trim().is_empty() {
                    tracing::debug!(file = %file_path.display(), "skipping empty file");
                    continue;
                }

                documents.push(SourceDocument {
                    content,
                    source: format!("{}/{}", department, name),
                    department: department.to_string(),
                });
            }
        }

        if documents.is_empty() {
            return Err(RagError::EmptyCorpus(self.data_dir.display().to_string()));
        }

        documents.sort_by(|a, b| a.source.cmp(&b.source));
        tracing::info!(count = documents.len(), dir = %self.data_dir.display(), "documents loaded");
        Ok(documents)
    }
}

/// Whether an upload's extension can be read as text
pub fn is_supported(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Guess a department from keywords in a file name
pub fn infer_department(filename: &str) -> Option<&'static str> {
    let name = filename.to_lowercase();
    DEPARTMENT_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| name.contains(k)))
        .map(|(dept, _)| *dept)
}
