use std::path::Path;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum UploadError {
    #[error("File must have an extension")]
    MissingExtension,
    #[error("File extension '{0}' is not allowed")]
    ExtensionNotAllowed(String),
    #[error("File size exceeds {limit_mb}MB limit")]
    TooLarge { limit_mb: u64 },
    #[error("File is empty")]
    Empty,
}

/// Keeps ASCII alphanumerics plus `.`, `_` and `-`. A stem with nothing
/// left becomes `upload`, and the extension survives either way.
pub(crate) fn sanitized_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let path = Path::new(base);

    let stem = path.file_stem().and_then(|stem| stem.to_str()).map(keep_safe_chars);
    let stem = stem.as_deref().unwrap_or_default().trim_start_matches('.');
    let stem = if stem.is_empty() { "upload" } else { stem };

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(keep_safe_chars)
        .filter(|ext| !ext.is_empty());
    match extension {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    }
}

fn keep_safe_chars(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')).collect()
}

pub(crate) fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Returns the lowercased extension when it is on the allow-list.
pub(crate) fn validate_extension(
    filename: &str,
    allowed_extensions: &[String],
) -> Result<String, UploadError> {
    let extension = file_extension(filename).ok_or(UploadError::MissingExtension)?;
    if allowed_extensions.iter().any(|allowed| allowed == &extension) {
        Ok(extension)
    } else {
        Err(UploadError::ExtensionNotAllowed(extension))
    }
}

pub(crate) fn validate_size(size: u64, max_bytes: u64, limit_mb: u64) -> Result<(), UploadError> {
    if size == 0 {
        return Err(UploadError::Empty);
    }
    if size > max_bytes {
        return Err(UploadError::TooLarge { limit_mb });
    }
    Ok(())
}

/// Builds a unique storage key such as `submissions/12/3f2a..._report.pdf`.
pub(crate) fn object_key(prefix: &str, owner_id: i64, filename: &str) -> String {
    format!("{prefix}/{owner_id}/{}_{}", Uuid::new_v4().simple(), sanitized_filename(filename))
}

pub(crate) fn guess_mime(filename: &str) -> &'static str {
    match file_extension(filename).as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") | Some("py") | Some("java") | Some("c") | Some("cpp") => "text/plain",
        Some("md") => "text/markdown",
        Some("zip") => "application/zip",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("ipynb") => "application/x-ipynb+json",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        ["pdf", "zip", "py"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn sanitized_filename_strips_paths_and_symbols() {
        assert_eq!(sanitized_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitized_filename("C:\\Users\\me\\hw 1 (final).pdf"), "hw1final.pdf");
        assert_eq!(sanitized_filename("..."), "upload");
        assert_eq!(sanitized_filename("отчёт"), "upload");
        assert_eq!(sanitized_filename(".bashrc"), "bashrc");
        assert_eq!(sanitized_filename("lab.tar.gz"), "lab.tar.gz");
    }

    #[test]
    fn non_ascii_stem_keeps_its_extension() {
        let name = sanitized_filename("отчёт.pdf");
        assert_eq!(name, "upload.pdf");
        assert_eq!(guess_mime(&name), "application/pdf");
        assert_eq!(sanitized_filename("домашка 2.py"), "2.py");
    }

    #[test]
    fn validate_extension_is_case_insensitive() {
        assert_eq!(validate_extension("Report.PDF", &allowed()), Ok("pdf".to_string()));
        assert_eq!(
            validate_extension("virus.exe", &allowed()),
            Err(UploadError::ExtensionNotAllowed("exe".to_string()))
        );
        assert_eq!(validate_extension("Makefile", &allowed()), Err(UploadError::MissingExtension));
    }

    #[test]
    fn validate_size_enforces_bounds() {
        assert_eq!(validate_size(0, 10, 1), Err(UploadError::Empty));
        assert_eq!(validate_size(11, 10, 1), Err(UploadError::TooLarge { limit_mb: 1 }));
        assert!(validate_size(10, 10, 1).is_ok());
    }

    #[test]
    fn object_key_is_unique_and_prefixed() {
        let first = object_key("submissions", 4, "hw.py");
        let second = object_key("submissions", 4, "hw.py");
        assert!(first.starts_with("submissions/4/"));
        assert!(first.ends_with("_hw.py"));
        assert_ne!(first, second);
    }

    #[test]
    fn guess_mime_falls_back_to_octet_stream() {
        assert_eq!(guess_mime("a.pdf"), "application/pdf");
        assert_eq!(guess_mime("a.unknown"), "application/octet-stream");
        assert_eq!(guess_mime("noext"), "application/octet-stream");
    }
}
