//! Request path construction for WebDAV operations.
//!
//! Joins the configured WebDAV home directory with a relative resource path,
//! normalizing slashes and percent-encoding each path segment. Encoding can
//! be switched off for test data that is already encoded.

/// Builds an absolute request path from the WebDAV home directory and a
/// relative resource path.
///
/// A trailing slash on `relative` is preserved so collection URLs stay
/// collection URLs.
pub fn build_path(dav_path: &str, relative: &str, encode: bool) -> String {
    let segments = dav_path
        .split('/')
        .chain(relative.split('/'))
        .filter(|s| !s.is_empty());

    let mut path = String::with_capacity(dav_path.len() + relative.len() + 2);
    for segment in segments {
        path.push('/');
        if encode {
            path.push_str(&encode_segment(segment));
        } else {
            path.push_str(segment);
        }
    }
    if path.is_empty() {
        path.push('/');
    } else if relative.ends_with('/') || (relative.is_empty() && dav_path.ends_with('/')) {
        path.push('/');
    }
    path
}

/// Percent-encodes a single path segment, keeping RFC 3986 unreserved
/// characters as-is.
pub fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_and_normalizes_slashes() {
        assert_eq!(build_path("webdav/", "/a/b.txt", true), "/webdav/a/b.txt");
        assert_eq!(build_path("/webdav", "a//b.txt", true), "/webdav/a/b.txt");
        assert_eq!(build_path("", "a.txt", true), "/a.txt");
        assert_eq!(build_path("", "", true), "/");
    }

    #[test]
    fn preserves_collection_trailing_slash() {
        assert_eq!(build_path("webdav", "dir/", true), "/webdav/dir/");
        assert_eq!(build_path("webdav/", "", true), "/webdav/");
    }

    #[test]
    fn encodes_segments() {
        assert_eq!(
            build_path("webdav", "my file (1).txt", true),
            "/webdav/my%20file%20%281%29.txt"
        );
        // the separator itself is never encoded
        assert_eq!(build_path("a b", "c d", true), "/a%20b/c%20d");
    }

    #[test]
    fn encoding_can_be_disabled() {
        assert_eq!(
            build_path("webdav", "already%20encoded.txt", false),
            "/webdav/already%20encoded.txt"
        );
    }

    #[test]
    fn keeps_unreserved_characters() {
        assert_eq!(encode_segment("A-z_0.9~"), "A-z_0.9~");
        assert_eq!(encode_segment("ü"), "%C3%BC");
    }
}
