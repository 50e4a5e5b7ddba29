//! Local file names for downloads.
//!
//! Derives a safe file name from the last URL path segment, sanitized for
//! Linux filesystems, and joins it onto a download directory.

use std::path::{Path, PathBuf};

/// Default filename when the URL path yields nothing usable.
pub const DEFAULT_FILENAME: &str = "download.bin";

/// Last non-empty path segment of `url`, percent-decoded. `None` for
/// unparseable URLs or a bare root path.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = percent_decode(segment);
    if decoded.is_empty() || decoded == "." || decoded == ".." {
        return None;
    }
    Some(decoded)
}

/// Replaces `/`, NUL and control characters with `_` and trims leading or
/// trailing dots and spaces.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\0' || c.is_control() { '_' } else { c })
        .collect();
    replaced.trim_matches(|c| c == '.' || c == ' ').to_string()
}

/// File name to save `url` under.
pub fn derive_filename(url: &str) -> String {
    match filename_from_url_path(url).map(|raw| sanitize_filename(&raw)) {
        Some(name) if !name.is_empty() => name,
        _ => DEFAULT_FILENAME.to_string(),
    }
}

/// Full destination path for `url` inside `dir`.
pub fn destination_for(url: &str, dir: &Path) -> PathBuf {
    dir.join(derive_filename(url))
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_from_url_path() {
        assert_eq!(derive_filename("https://example.com/archive.zip"), "archive.zip");
        assert_eq!(
            derive_filename("https://cdn.example.com/path/to/debian-12.iso?token=abc"),
            "debian-12.iso"
        );
        assert_eq!(derive_filename("https://example.com/dir/"), "dir");
    }

    #[test]
    fn derive_fallbacks() {
        assert_eq!(derive_filename("https://example.com/"), DEFAULT_FILENAME);
        assert_eq!(derive_filename("https://example.com"), DEFAULT_FILENAME);
        assert_eq!(derive_filename("not a url"), DEFAULT_FILENAME);
        assert_eq!(derive_filename("https://example.com/..."), DEFAULT_FILENAME);
    }

    #[test]
    fn percent_encoded_names_are_decoded_and_sanitized() {
        assert_eq!(derive_filename("https://example.com/my%20file.txt"), "my file.txt");
        assert_eq!(derive_filename("https://example.com/a%2Fb.txt"), "a_b.txt");
        assert_eq!(derive_filename("https://example.com/100%"), "100%");
    }

    #[test]
    fn destination_joins_dir() {
        assert_eq!(
            destination_for("https://example.com/x.iso", Path::new("/srv/dl")),
            PathBuf::from("/srv/dl/x.iso")
        );
    }
}
