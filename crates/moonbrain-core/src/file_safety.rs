//! File name safety for uploaded note images.

use crate::defaults::MAX_FILENAME_LEN;

/// Sanitize an uploaded file name for storage in the media directory.
///
/// Keeps only the final path component and replaces characters that are
/// unsafe on common filesystems. Returns `None` when nothing usable is left
/// (empty names, `.` and `..`).
pub fn sanitize_filename(filename: &str) -> Option<String> {
    // Remove path components
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim();
    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        return None;
    }

    // Truncate if too long (preserve extension)
    if sanitized.len() > MAX_FILENAME_LEN {
        let mut cut = MAX_FILENAME_LEN;
        let ext = sanitized
            .rfind('.')
            .map(|dot| &sanitized[dot..])
            .filter(|ext| ext.len() < MAX_FILENAME_LEN)
            .unwrap_or("");
        cut -= ext.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        return Some(format!("{}{}", &sanitized[..cut], ext));
    }

    Some(sanitized.to_string())
}
