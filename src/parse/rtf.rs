//! Minimal RTF to plain text conversion.
//!
//! Only what is needed to recover checklist text: paragraph breaks, tabs,
//! escaped characters, and unicode escapes. Formatting is discarded and
//! destination groups (font tables, colour tables, metadata, pictures) are
//! skipped entirely.

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum RtfError {
    #[error("unbalanced '}}' at byte {0}")]
    UnexpectedClose(usize),
    #[error("{0} unclosed group(s) at end of input")]
    Unclosed(usize),
}

/// Destinations whose content is never document text
const SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "header",
    "footer",
    "expandedcolortbl",
    "listtable",
    "listoverridetable",
];

pub fn is_rtf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"{\\rtf")
}

#[derive(Debug, Clone, Copy)]
struct Group {
    skip: bool,
    /// Fallback characters that follow each `\uN`
    uc: usize,
}

pub fn rtf_to_text(bytes: &[u8]) -> Result<String, RtfError> {
    let mut out = String::new();
    let mut stack: Vec<Group> = Vec::new();
    let mut group = Group { skip: false, uc: 1 };
    // Fallback characters still to drop after a unicode escape
    let mut fallback = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'{' => {
                fallback = 0;
                stack.push(group);
                i += 1;
            }
            b'}' => {
                fallback = 0;
                group = stack.pop().ok_or(RtfError::UnexpectedClose(i))?;
                i += 1;
            }
            b'\\' => {
                let (control, next) = read_control(bytes, i + 1);
                i = next;
                if fallback > 0 {
                    if !matches!(control, Control::Word { .. }) {
                        fallback -= 1;
                        continue;
                    }
                    fallback = 0;
                }
                match control {
                    Control::Literal(c) => push(&mut out, group, c),
                    Control::Hex(byte) => push(&mut out, group, cp1252(byte)),
                    Control::Ignorable => group.skip = true,
                    Control::Word { name, param } => {
                        apply_word(&mut out, &mut group, &mut fallback, name, param)
                    }
                    Control::None => {}
                }
            }
            b'\r' | b'\n' => i += 1,
            _ => {
                i += 1;
                if fallback > 0 {
                    fallback -= 1;
                    continue;
                }
                push(&mut out, group, cp1252(b));
            }
        }
    }

    if !stack.is_empty() {
        return Err(RtfError::Unclosed(stack.len()));
    }
    Ok(out)
}

fn apply_word(out: &mut String, group: &mut Group, fallback: &mut usize, name: &str, param: Option<i32>) {
    match name {
        "par" | "line" | "sect" | "page" => push(out, *group, '\n'),
        "tab" => push(out, *group, '\t'),
        "emdash" => push(out, *group, '\u{2014}'),
        "endash" => push(out, *group, '\u{2013}'),
        "bullet" => push(out, *group, '\u{2022}'),
        "lquote" => push(out, *group, '\u{2018}'),
        "rquote" => push(out, *group, '\u{2019}'),
        "ldblquote" => push(out, *group, '\u{201c}'),
        "rdblquote" => push(out, *group, '\u{201d}'),
        "uc" => group.uc = param.unwrap_or(1).max(0) as usize,
        "u" => {
            if let Some(code) = param {
                // Code points above 32767 are written as negative numbers
                let code = if code < 0 { code + 65536 } else { code };
                let c = char::from_u32(code as u32).unwrap_or('\u{fffd}');
                push(out, *group, c);
                *fallback = group.uc;
            }
        }
        name if SKIPPED_DESTINATIONS.contains(&name) => group.skip = true,
        _ => {}
    }
}

fn push(out: &mut String, group: Group, c: char) {
    if !group.skip {
        out.push(c);
    }
}

/// Windows-1252 byte to char. Outside 0x80-0x9F it agrees with Latin-1;
/// the five unassigned bytes pass through unchanged.
fn cp1252(byte: u8) -> char {
    const HIGH: [char; 32] = [
        '\u{20ac}', '\u{81}', '\u{201a}', '\u{192}', '\u{201e}', '\u{2026}', '\u{2020}', '\u{2021}',
        '\u{2c6}', '\u{2030}', '\u{160}', '\u{2039}', '\u{152}', '\u{8d}', '\u{17d}', '\u{8f}',
        '\u{90}', '\u{2018}', '\u{2019}', '\u{201c}', '\u{201d}', '\u{2022}', '\u{2013}', '\u{2014}',
        '\u{2dc}', '\u{2122}', '\u{161}', '\u{203a}', '\u{153}', '\u{9d}', '\u{17e}', '\u{178}',
    ];
    match byte {
        0x80..=0x9f => HIGH[usize::from(byte - 0x80)],
        _ => char::from(byte),
    }
}

enum Control<'a> {
    Literal(char),
    Hex(u8),
    Ignorable,
    Word { name: &'a str, param: Option<i32> },
    None,
}

/// Read the control sequence after a backslash at `start`, returning it and the
/// index of the next unread byte.
fn read_control(bytes: &[u8], start: usize) -> (Control<'_>, usize) {
    let Some(&first) = bytes.get(start) else {
        return (Control::None, start);
    };
    match first {
        b'\\' | b'{' | b'}' => (Control::Literal(char::from(first)), start + 1),
        b'~' => (Control::Literal('\u{a0}'), start + 1),
        b'_' => (Control::Literal('-'), start + 1),
        b'-' => (Control::None, start + 1),
        b'*' => (Control::Ignorable, start + 1),
        b'\n' | b'\r' => (Control::Literal('\n'), start + 1),
        b'\'' => {
            let hex = bytes
                .get(start + 1..start + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            match hex {
                Some(byte) => (Control::Hex(byte), start + 3),
                None => (Control::None, start + 1),
            }
        }
        c if c.is_ascii_alphabetic() => {
            let mut end = start;
            while end < bytes.len() && bytes[end].is_ascii_alphabetic() {
                end += 1;
            }
            // Alphabetic ASCII is valid UTF-8
            let name = std::str::from_utf8(&bytes[start..end]).unwrap_or_default();

            let param_start = end;
            if end < bytes.len() && bytes[end] == b'-' {
                end += 1;
            }
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            let param = std::str::from_utf8(&bytes[param_start..end])
                .ok()
                .and_then(|p| p.parse().ok());
            if param.is_none() {
                end = param_start;
            }

            // A single space delimits the control word
            if bytes.get(end) == Some(&b' ') {
                end += 1;
            }
            (Control::Word { name, param }, end)
        }
        _ => (Control::None, start + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn convert(rtf: &str) -> String {
        rtf_to_text(rtf.as_bytes()).unwrap()
    }

    #[test]
    fn detects_prefix() {
        assert!(is_rtf(b"{\\rtf1\\ansi hi}"));
        assert!(!is_rtf(b"# heading"));
    }

    #[test]
    fn converts_typical_document() {
        let rtf = "{\\rtf1\\ansi\\ansicpg1252\\cocoartf2709\n\
                   {\\fonttbl\\f0\\fswiss\\fcharset0 Helvetica;}\n\
                   {\\colortbl;\\red255\\green255\\blue255;}\n\
                   {\\*\\expandedcolortbl;;}\n\
                   \\pard\\tx560\\pardirnatural\\partightenfactor0\n\
                   \\f0\\fs24 \\cf0 # Groceries\\\n\
                   - [ ] Milk\\\n\
                   - [x] Bread}";
        assert_eq!(convert(rtf), "# Groceries\n- [ ] Milk\n- [x] Bread");
    }

    #[test]
    fn par_and_tab() {
        assert_eq!(convert("{\\rtf1 a\\par b\\tab c}"), "a\nb\tc");
    }

    #[test]
    fn escapes() {
        assert_eq!(convert("{\\rtf1 caf\\'e9 \\{x\\} \\\\}"), "café {x} \\");
    }

    #[test]
    fn windows_1252_punctuation() {
        assert_eq!(convert("{\\rtf1\\ansi\\ansicpg1252 \\'93x\\'94}"), "\u{201c}x\u{201d}");
        assert_eq!(convert("{\\rtf1 a\\'96b\\'85}"), "a\u{2013}b\u{2026}");
        // Unassigned bytes and Latin-1 letters are unchanged
        assert_eq!(convert("{\\rtf1 \\'81\\'e9}"), "\u{81}\u{e9}");
    }

    #[test]
    fn unicode_escape_skips_fallback() {
        assert_eq!(convert("{\\rtf1 \\u8212?x}"), "\u{2014}x");
        assert_eq!(convert("{\\rtf1 \\uc2\\u-3913??y}"), "\u{f0b7}y");
        assert_eq!(convert("{\\rtf1 \\u233\\'e9z}"), "éz");
    }

    #[test]
    fn ignorable_destination_is_skipped() {
        assert_eq!(convert("{\\rtf1 {\\*\\generator Foo;}text}"), "text");
        assert_eq!(convert("{\\rtf1 {\\info{\\title T}}body}"), "body");
    }

    #[test]
    fn unbalanced_braces_fail() {
        assert_eq!(rtf_to_text(b"{\\rtf1 a"), Err(RtfError::Unclosed(1)));
        assert_eq!(rtf_to_text(b"{\\rtf1 a}}"), Err(RtfError::UnexpectedClose(9)));
    }
}
