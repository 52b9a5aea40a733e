//! Small string helpers shared by the loop and the adapters.

/// Cut `s` to at most `max_len` bytes on a char boundary, marking the cut.
pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "é".repeat(10);
        let out = truncate(&s, 5);
        assert_eq!(out, "éé... [truncated]");
        assert_eq!(truncate("short", 10), "short");
    }
}
