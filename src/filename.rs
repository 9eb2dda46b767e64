//! Title sanitization for use in file and folder names

/// Characters that are not allowed in file names on common filesystems
const DISALLOWED: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Longest name we produce, in bytes (Linux NAME_MAX minus room for suffixes)
const MAX_TITLE_BYTES: usize = 200;

/// Sanitize a title for file system use.
///
/// - Drops `/ \ : * ? " < > |` and control characters
/// - Collapses whitespace runs into a single `.`
/// - Collapses repeated dots and trims dots at both ends
pub fn fix_filename(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut prev_dot = false;

    for c in title.chars() {
        if DISALLOWED.contains(&c) || (c.is_control() && !c.is_whitespace()) {
            continue;
        }

        let replacement = if c.is_whitespace() || c == '.' { '.' } else { c };
        if replacement == '.' {
            if !prev_dot {
                out.push('.');
            }
            prev_dot = true;
        } else {
            out.push(replacement);
            prev_dot = false;
        }
    }

    let trimmed = out.trim_matches('.');
    if trimmed.len() > MAX_TITLE_BYTES {
        let mut take = MAX_TITLE_BYTES;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].trim_end_matches('.').to_string()
    } else {
        trimmed.to_string()
    }
}
