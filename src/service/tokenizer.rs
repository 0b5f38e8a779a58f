use indexmap::IndexSet;

/// 把自由文本切分为小写 ASCII 字母数字 token
///
/// 其他字符均视为分隔符。集合保留首次出现顺序，便于日志阅读。
pub fn tokenize(text: &str) -> IndexSet<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_ascii_lowercase())
        .collect()
}
