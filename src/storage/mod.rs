use chrono::Utc;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Stored name for an uploaded attachment: date, paper id, a random tag and
/// the sanitized original extension.
pub fn generate_media_name(paper_id: i32, original: &str) -> String {
    let extension = Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>())
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    format!(
        "{}_{}_{}{}",
        Utc::now().format("%Y%m%d"),
        paper_id,
        &Uuid::new_v4().simple().to_string()[..8],
        extension
    )
}

pub fn media_type_for(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// Resolves a stored name inside the upload folder, refusing anything that
/// could escape it.
pub fn media_path(upload_folder: &Path, media_ref: &str) -> Option<PathBuf> {
    if media_ref.is_empty() || media_ref.contains("..") || media_ref.contains(['/', '\\']) {
        return None;
    }
    Some(upload_folder.join(media_ref))
}

pub fn ensure_dirs(upload_folder: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(upload_folder)
}
