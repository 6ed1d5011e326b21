//! File name helpers for exported images and archive entries.

use std::collections::HashSet;
use std::path::Path;

/// Returns the file name without its final extension.
///
/// `"photo.final.jpg"` → `"photo.final"`, `"noext"` → `"noext"`.
pub fn file_stem(name: &str) -> &str {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name);
    match base.rfind('.') {
        Some(0) | None => base,
        Some(idx) => &base[..idx],
    }
}

/// Makes a stem safe to use as an archive entry.
///
/// Path separators and characters rejected by common file systems become `_`,
/// trailing dots and spaces are trimmed, and an empty result becomes `image`.
pub fn sanitize_stem(stem: &str) -> String {
    let mut out: String = stem
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    while out.ends_with(' ') || out.ends_with('.') {
        out.pop();
    }
    let trimmed = out.trim_start_matches(['.', ' ']);
    if trimmed.is_empty() {
        "image".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Hands out unique entry names, suffixing `_1`, `_2`, … on collision.
#[derive(Debug, Default)]
pub struct UniqueNames {
    taken: HashSet<String>,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, stem: &str, ext: &str) -> String {
        let stem = sanitize_stem(stem);
        let mut candidate = format!("{stem}.{ext}");
        let mut n = 1;
        while self.taken.contains(&candidate.to_lowercase()) {
            candidate = format!("{stem}_{n}.{ext}");
            n += 1;
        }
        self.taken.insert(candidate.to_lowercase());
        candidate
    }
}
