//! Small text utility functions / 文本工具函数

/// Truncate a string to at most `max` characters (not bytes), so multi-byte
/// input can never be split mid-character / 按字符截断字符串
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}

/// Escape LIKE special characters: %, _, and \ / 转义 LIKE 特殊字符
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '%' | '_' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}
