// 🧹 Text Normalization - Free-text identifiers made comparable
// Street names and house identifiers are typed by hand in the console,
// so the same house shows up as "Calle Juárez", "CALLE  JUAREZ" or
// "calle juarez" followed by an invisible zero-width space.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Prefix for keys built from street + house number
pub const ADDRESS_KEY_PREFIX: &str = "ADDR::";

/// Invisible characters that survive copy/paste from spreadsheets and chats
fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}' // soft hyphen
            | '\u{200B}' // zero-width space
            | '\u{200C}' // zero-width non-joiner
            | '\u{200D}' // zero-width joiner
            | '\u{2060}' // word joiner
            | '\u{FEFF}' // BOM / zero-width no-break space
    )
}

/// Strip control and zero-width characters.
///
/// Whitespace controls (tab, newline, carriage return) become a plain space
/// so that words they separated stay separated.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter_map(|c| {
            if c == '\t' || c == '\n' || c == '\r' {
                Some(' ')
            } else if c.is_control() || is_invisible(c) {
                None
            } else {
                Some(c)
            }
        })
        .collect()
}

/// Sanitize, fold diacritics, trim, uppercase and collapse whitespace.
pub fn normalize(text: &str) -> String {
    let folded: String = sanitize(text)
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    folded
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// True when nothing comparable remains after normalization
/// (whitespace, invisible characters, lone combining marks)
pub fn is_blank(text: &str) -> bool {
    normalize(text).is_empty()
}

/// Build the address key `ADDR::<STREET>#<NUMBER>`.
///
/// Returns `None` when both parts normalize to empty: a record without any
/// address must not share the bare `ADDR::#` key with every other such record.
pub fn address_key(street: &str, house_number: &str) -> Option<String> {
    let street = normalize(street);
    let number = normalize(house_number);

    if street.is_empty() && number.is_empty() {
        return None;
    }

    Some(format!("{}{}#{}", ADDRESS_KEY_PREFIX, street, number))
}
