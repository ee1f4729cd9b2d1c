/// Utility helpers for Cuedesk

/// Create a simple slug from a string suitable for ids and URLs.
/// Lowercases the string, converts groups of non-alphanumeric chars to single hyphens,
/// and trims leading/trailing hyphens.
pub fn slugify<S: AsRef<str>>(s: S) -> String {
    let s = s.as_ref().to_lowercase();
    let mut out = String::with_capacity(s.len());
    let mut prev_dash = false;

    for ch in s.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            prev_dash = false;
        } else if !prev_dash {
            out.push('-');
            prev_dash = true;
        }
    }

    out.trim_matches('-').to_string()
}

/// Keep an uploaded file's original name but make it safe as a single
/// object path segment.
pub fn object_file_name<S: AsRef<str>>(name: S) -> String {
    let name = name.as_ref().trim();
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|ch| if ch.is_control() { '_' } else { ch })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Ada@Example.com"), "ada-example-com");
        assert_eq!(slugify("  --Act  I--  "), "act-i");
    }

    #[test]
    fn object_names_drop_directories_and_control_chars() {
        assert_eq!(object_file_name("Act 1 (Storm).mp3"), "Act 1 (Storm).mp3");
        assert_eq!(object_file_name("C:\\scores\\storm.pdf"), "storm.pdf");
        assert_eq!(object_file_name("../x\n.pdf"), "x_.pdf");
        assert_eq!(object_file_name(".."), "upload");
        assert_eq!(object_file_name(""), "upload");
    }
}
