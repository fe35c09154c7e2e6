use once_cell::sync::Lazy;
use rand::RngCore;
use regex::Regex;
use std::path::Path;

use crate::domain::upload::extension_of;

static UNSAFE_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_-]").expect("Invalid filename regex"));

/// Storage name for an upload.
///
/// Random names are 32 hex characters (16 random bytes). With
/// `preserve_original`, the original stem is kept with every character
/// outside `[a-zA-Z0-9_-]` replaced by `_`, outer underscores trimmed, and a
/// `_<unix seconds>` suffix. The lowercased original extension is appended
/// either way.
pub fn secure_filename(original_name: &str, preserve_original: bool, unix_seconds: i64) -> String {
    let extension = extension_of(original_name);

    let basename = if preserve_original {
        let stem = Path::new(original_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let cleaned = UNSAFE_NAME_CHARS.replace_all(&stem, "_");
        let trimmed = cleaned.trim_matches('_');
        let stem = if trimmed.is_empty() { "file" } else { trimmed };
        format!("{}_{}", stem, unix_seconds)
    } else {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    };

    format!("{}.{}", basename, extension)
}

/// `name` with `_` and 8 random hex characters inserted before the extension
pub fn with_unique_suffix(name: &str) -> String {
    let mut bytes = [0u8; 4];
    rand::rng().fill_bytes(&mut bytes);
    let suffix = hex::encode(bytes);
    match name.rsplit_once('.') {
        Some((stem, extension)) => format!("{}_{}.{}", stem, suffix, extension),
        None => format!("{}_{}", name, suffix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_name() {
        let a = secure_filename("Part.STL", false, 0);
        let b = secure_filename("Part.STL", false, 0);
        assert_ne!(a, b);
        assert!(a.ends_with(".stl"));
        let stem = a.trim_end_matches(".stl");
        assert_eq!(stem.len(), 32);
        assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_preserved_name_is_sanitized() {
        assert_eq!(
            secure_filename("my part (v2).obj", true, 1_700_000_000),
            "my_part__v2_1700000000.obj"
        );
        assert_eq!(secure_filename("../../etc/passwd.txt", true, 5), "passwd_5.txt");
        assert_eq!(secure_filename("???.png", true, 7), "file_7.png");
    }

    #[test]
    fn test_unique_suffix_keeps_extension() {
        let name = with_unique_suffix("part_5.stl");
        assert!(name.starts_with("part_5_"));
        assert!(name.ends_with(".stl"));
        assert_eq!(name.len(), "part_5_.stl".len() + 8);
        assert_ne!(name, with_unique_suffix("part_5.stl"));
    }
}
