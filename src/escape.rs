//! Escape-extended text decoding and encoding
//!
//! Patterns in extended mode go through a fixed escape table before being
//! treated as literal text: `\n`, `\r`, `\t`, `\0`, `\\`, `\x##` (two hex
//! digits) and `\u####` (four hex digits). Unknown escapes pass through
//! verbatim so a malformed pattern still searches for something predictable.

/// Decode a pattern through the fixed escape table.
///
/// A trailing lone backslash is kept as a literal backslash. Malformed hex
/// escapes (`\xZ9`, truncated `\u12`) are left verbatim.
pub fn decode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '\\' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        match chars.get(i + 1) {
            Some('n') => {
                out.push('\n');
                i += 2;
            }
            Some('r') => {
                out.push('\r');
                i += 2;
            }
            Some('t') => {
                out.push('\t');
                i += 2;
            }
            Some('0') => {
                out.push('\0');
                i += 2;
            }
            Some('\\') => {
                out.push('\\');
                i += 2;
            }
            Some('x') => match hex_value(&chars, i + 2, 2) {
                Some(value) => {
                    out.push(char::from(value as u8));
                    i += 4;
                }
                None => {
                    out.push('\\');
                    i += 1;
                }
            },
            Some('u') => match hex_value(&chars, i + 2, 4) {
                Some(value) => {
                    out.push(char::from_u32(value).unwrap_or('\u{FFFD}'));
                    i += 6;
                }
                None => {
                    out.push('\\');
                    i += 1;
                }
            },
            // Unknown escape or trailing backslash: keep verbatim
            _ => {
                out.push('\\');
                i += 1;
            }
        }
    }
    out
}

/// Encode text back into escape-extended form.
///
/// The inverse of [`decode`] for everything the table can represent:
/// `decode(encode(s)) == s` for any string `s`.
pub fn encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            '\\' => out.push_str("\\\\"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\x{:02X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

/// Parse `count` hex digits starting at `start`, or None if short/invalid.
fn hex_value(chars: &[char], start: usize, count: usize) -> Option<u32> {
    if start + count > chars.len() {
        return None;
    }
    let mut value = 0u32;
    for &ch in &chars[start..start + count] {
        value = value * 16 + ch.to_digit(16)?;
    }
    Some(value)
}
