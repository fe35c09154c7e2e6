//! Content-based MIME detection
//!
//! Magic bytes are matched with `infer`; anything it does not know is
//! classified as `text/plain` when it decodes as printable UTF-8 and as
//! `application/octet-stream` otherwise.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use super::byte_source::{read_prefix, ByteSource};

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain";
pub const EMPTY: &str = "application/x-empty";

/// Bytes examined when sniffing
pub const SNIFF_LEN: u64 = 8192;

pub fn sniff(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return EMPTY.to_string();
    }
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type().to_string();
    }
    if looks_like_text(bytes) {
        TEXT_PLAIN.to_string()
    } else {
        OCTET_STREAM.to_string()
    }
}

pub fn sniff_file(path: &Path) -> io::Result<String> {
    let mut buf = Vec::new();
    File::open(path)?.take(SNIFF_LEN).read_to_end(&mut buf)?;
    Ok(sniff(&buf))
}

pub fn sniff_source<S: ByteSource>(source: &mut S) -> io::Result<String> {
    Ok(sniff(&read_prefix(source, SNIFF_LEN)?))
}

fn looks_like_text(bytes: &[u8]) -> bool {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text,
        // A multi-byte sequence cut by the sniff window is still text
        Err(e) if e.error_len().is_none() => {
            match std::str::from_utf8(&bytes[..e.valid_up_to()]) {
                Ok(text) => text,
                Err(_) => return false,
            }
        }
        Err(_) => return false,
    };
    !text
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r' | '\x0c' | '\x1b'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sniff_known_magic() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(sniff(&png), "image/png");
        assert_eq!(sniff(b"PK\x03\x04\x14\x00\x00\x00"), "application/zip");
    }

    #[test]
    fn test_sniff_text_and_binary() {
        assert_eq!(sniff(b"v 0 0 0\nv 1 0 0\n"), TEXT_PLAIN);
        assert_eq!(sniff("solid peça\n".as_bytes()), TEXT_PLAIN);
        assert_eq!(sniff(&[0u8; 84]), OCTET_STREAM);
        assert_eq!(sniff(b""), EMPTY);
    }

    #[test]
    fn test_truncated_utf8_is_text() {
        let mut bytes = b"name: ".to_vec();
        bytes.push(0xC3);
        assert_eq!(sniff(&bytes), TEXT_PLAIN);
    }

    #[test]
    fn test_sniff_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello world\n").unwrap();
        assert_eq!(sniff_file(file.path()).unwrap(), TEXT_PLAIN);
    }
}
