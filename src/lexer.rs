//! Quote-aware splitting of an input line into tokens.
//!
//! The tokenizer is deliberately dumb: tokens are separated by the delimiter
//! character except inside quotes, and that is all. Operator characters
//! (`|`, `;`, `<`, `>`, ...) are not recognized here; the shell assumes they
//! arrive pre-delimited by whitespace, so they simply come out as ordinary
//! tokens. Quote characters are kept verbatim in the token text and stripped
//! later by the parser, once it knows whether the token is a word at all.

/// Splits `line` into tokens on `delimiter`.
///
/// Either `"` or `'` toggles a single inside/outside flag, so the delimiter
/// is ignored between quotes. Consecutive delimiters produce empty tokens;
/// the parser filters those out. An unterminated quote is not an error here,
/// the rest of the line just ends up in the final token.
pub fn tokenize(line: &str, delimiter: char) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut inside_quotes = false;

    for ch in line.chars() {
        if ch == delimiter && !inside_quotes {
            tokens.push(std::mem::take(&mut current));
        } else {
            if ch == '"' || ch == '\'' {
                inside_quotes = !inside_quotes;
            }
            current.push(ch);
        }
    }
    tokens.push(current);

    tokens
}

/// Removes one pair of surrounding matched quotes, if present.
///
/// Only a leading and trailing quote of the same kind are stripped;
/// anything else is returned unchanged.
pub fn strip_quotes(word: &str) -> String {
    let bytes = word.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return word[1..word.len() - 1].to_string();
        }
    }
    word.to_string()
}
