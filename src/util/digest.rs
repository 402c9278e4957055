/// Extracts the digest token from checksum side-file text.
///
/// Side-files in the wild come in several shapes: the bare hex digest, or
/// `<digest>  <filename>` as written by the coreutils tools. The first
/// whitespace-delimited token wins, lowercased, and must be plausible hex.
pub fn extract_digest(text: &str) -> Option<String> {
    let token = text.split_whitespace().next()?;
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(token.to_ascii_lowercase())
}

/// Case- and whitespace-insensitive comparison of a recorded digest against
/// side-file content.
pub fn digest_matches(recorded: &str, side_file_text: &str) -> bool {
    match extract_digest(side_file_text) {
        Some(found) => found == recorded.to_ascii_lowercase(),
        None => false,
    }
}
