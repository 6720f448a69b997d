/// Lowercased maximal runs of letters and digits in `text`.
pub fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

/// Tokenizes one chunk's raw bytes.
///
/// Invalid UTF-8, including a multi-byte character cut by a chunk boundary,
/// decodes to U+FFFD and separates words like any other punctuation. Words are
/// never joined across chunks: `"wordword"` read as two 4-byte chunks gives two
/// `"word"` tokens.
pub fn normalize(bytes: &[u8]) -> Vec<String> {
    tokens(&String::from_utf8_lossy(bytes)).collect()
}
