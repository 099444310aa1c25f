/// Generic binary type used when nothing better is known
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Guess a content type from a filename's extension.
///
/// Returns `None` when the extension is missing or unknown so callers can choose
/// their own fallback.
pub fn guess_content_type(filename: &str) -> Option<&'static str> {
    let extension = filename.rsplit_once('.').map(|(_, ext)| ext)?;
    if extension.is_empty() || extension.contains(['/', '\\']) {
        return None;
    }
    mime_guess::from_ext(&extension.to_ascii_lowercase()).first_raw()
}
