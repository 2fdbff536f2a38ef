//! Locate a method's text inside reconstructed class source.
//!
//! Purely textual: braces inside string literals or comments are counted, the first
//! declaration wins for overloads, and a declaration needs at least one modifier.

use regex::Regex;

/// Declaration modifiers, at least one of which must precede the method name.
const MODIFIERS: &str = "public|private|protected|static|final|native|synchronized|abstract|transient";

/// Declaration pattern for `method_name`, matching through the opening brace.
pub fn method_pattern(method_name: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"(?:{MODIFIERS})+[^{{]+{}\s*\([^{{]*\{{",
        regex::escape(method_name)
    ))
}

/// Extract the declaration of `method_name` from `class_source`, from the start of
/// the match through the matching closing brace.
///
/// Returns `None` when no declaration matches or its braces never balance.
pub fn extract_method_body<'a>(class_source: &'a str, method_name: &str) -> Option<&'a str> {
    if method_name.is_empty() {
        return None;
    }
    let pattern = method_pattern(method_name).ok()?;
    let found = pattern.find(class_source)?;
    let end = balanced_end(class_source.as_bytes(), found.end() - 1)?;
    Some(&class_source[found.start()..end])
}

/// Byte offset one past the brace closing the one at `open`.
fn balanced_end(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, &b) in bytes[open..].iter().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}
