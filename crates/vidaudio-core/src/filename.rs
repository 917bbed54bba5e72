//! Output filename derivation

use std::path::Path;

/// Base name used when an upload's name sanitizes to nothing.
pub const FALLBACK_UPLOAD_BASE: &str = "extracted_audio";
/// Base name used when a retrieved video has no usable title.
pub const FALLBACK_TITLE_BASE: &str = "downloaded_audio";

/// Keep only alphanumerics, spaces, dashes and underscores, then drop trailing
/// whitespace. Falls back to [`FALLBACK_UPLOAD_BASE`] when nothing survives.
pub fn sanitize_base_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect();
    let kept = kept.trim_end();

    if kept.is_empty() {
        FALLBACK_UPLOAD_BASE.to_string()
    } else {
        kept.to_string()
    }
}

/// Target filename for an uploaded video: sanitized stem plus `extension`.
pub fn upload_output_name(original: &str, extension: &str) -> String {
    let stem = Path::new(original)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}.{}", sanitize_base_name(&stem), extension)
}

/// Name under which the uploaded bytes are persisted: the final path
/// component of the original name, so uploads cannot escape the workspace.
pub fn upload_input_name(original: &str) -> String {
    Path::new(original)
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "upload".to_string())
}

/// Replace characters that are hostile to common filesystems.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Display filename for a retrieved video, derived from its title.
pub fn title_output_name(title: Option<&str>, extension: &str) -> String {
    let base = title.map(sanitize_filename).unwrap_or_default();
    let base = if base.is_empty() {
        FALLBACK_TITLE_BASE.to_string()
    } else {
        base
    };
    format!("{}.{}", base, extension)
}
