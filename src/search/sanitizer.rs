//! Query sanitizer / 查询清洗
//!
//! The sanitized text is interpolated into a `to_tsquery` expression, so the
//! allowed set stays small: ASCII letters and digits, ASCII whitespace
//! (space, tab, LF, FF, CR) and Thai script.

/// Check if character belongs to Thai script / 检测是否为泰文字符
pub fn is_thai(c: char) -> bool {
    matches!(c,
        '\u{0e01}'..='\u{0e3a}' |  // consonants, vowels, tone marks
        '\u{0e40}'..='\u{0e5b}'    // leading vowels, digits, punctuation
    )
}

/// Whether the character survives sanitization / 字符是否允许保留
pub fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c.is_ascii_whitespace() || is_thai(c)
}

/// Remove every character that is not allowed / 删除所有不允许的字符
pub fn sanitize(query: &str) -> String {
    query.chars().filter(|c| is_allowed(*c)).collect()
}

/// Split sanitized text into words / 按空白分词
pub fn tokenize(sanitized: &str) -> Vec<&str> {
    sanitized.split_ascii_whitespace().collect()
}
