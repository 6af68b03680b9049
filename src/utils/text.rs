/// Trim a remote body and cap it at `max_chars` characters.
///
/// Keeps upstream error pages from flooding logs and error details.
pub fn excerpt(body: &str, max_chars: usize) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= max_chars {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(max_chars).collect();
        format!("{}…", cut)
    }
}
