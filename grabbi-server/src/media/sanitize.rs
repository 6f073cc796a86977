/// Longest sanitized name, in bytes
const MAX_LEN: usize = 100;

/// Reduce a user-supplied name to `[A-Za-z0-9._-]`, at most 100 bytes.
///
/// Idempotent. Empty, `.` and `..` become `file`.
pub fn sanitize_filename(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    // output is ASCII, so any byte index is a char boundary
    out.truncate(MAX_LEN);

    match out.as_str() {
        "" | "." | ".." => "file".to_string(),
        _ => out,
    }
}
