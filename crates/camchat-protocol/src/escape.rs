//! Percent-escaping of chat text.
//!
//! Outgoing chat and private messages are escaped before they go on the
//! wire; the server sends chat back in the same form.

/// ASCII punctuation that is sent literally. Letters, digits, and space
/// are also literal.
const SAFE_PUNCTUATION: &[u8] = b"@*_+-./";

/// Escapes `text` for transmission.
///
/// Everything outside the safe printable-ASCII set becomes `%XX`, one
/// escape per UTF-8 byte. Space is preserved literally.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for &byte in text.as_bytes() {
        if is_safe(byte) {
            out.push(byte as char);
        } else {
            out.push('%');
            out.push(hex_digit(byte >> 4));
            out.push(hex_digit(byte & 0x0F));
        }
    }
    out
}

/// Reverses [`escape_text`].
///
/// Accepts `%XX` byte escapes and the `%uXXXX` code-unit form some peers
/// send. Malformed escapes are kept as literal text.
pub fn unescape_text(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'%' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        if let Some((ch, used)) = parse_unicode_escape(&bytes[i..]) {
            let mut buf = [0u8; 4];
            out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            i += used;
        } else if let Some(byte) = parse_hex_pair(bytes.get(i + 1..i + 3)) {
            out.push(byte);
            i += 3;
        } else {
            out.push(b'%');
            i += 1;
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn is_safe(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || byte == b' '
        || SAFE_PUNCTUATION.contains(&byte)
}

fn hex_digit(nibble: u8) -> char {
    char::from_digit(u32::from(nibble), 16)
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('0')
}

fn parse_hex_pair(pair: Option<&[u8]>) -> Option<u8> {
    let pair = pair?;
    if !pair.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    u8::from_str_radix(std::str::from_utf8(pair).ok()?, 16).ok()
}

fn parse_code_unit(bytes: &[u8]) -> Option<u16> {
    // `%uXXXX`
    if bytes.len() < 6
        || bytes[0] != b'%'
        || !matches!(bytes[1], b'u' | b'U')
        || !bytes[2..6].iter().all(u8::is_ascii_hexdigit)
    {
        return None;
    }
    let digits = std::str::from_utf8(&bytes[2..6]).ok()?;
    u16::from_str_radix(digits, 16).ok()
}

/// Parses `%uXXXX` (or a `%uD8XX%uDCXX` surrogate pair) at the start of
/// `bytes`. Returns the character and how many bytes it spanned.
fn parse_unicode_escape(bytes: &[u8]) -> Option<(char, usize)> {
    let first = parse_code_unit(bytes)?;
    if let Some(ch) = char::from_u32(u32::from(first)) {
        return Some((ch, 6));
    }
    let second = parse_code_unit(bytes.get(6..)?)?;
    let ch = char::decode_utf16([first, second]).next()?.ok()?;
    Some((ch, 12))
}
