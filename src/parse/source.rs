use tracing::warn;

use crate::model::document::SourceFormat;

use super::rtf::{is_rtf, rtf_to_text};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("not a text file: invalid UTF-8 at byte {offset}")]
    NotUtf8 { offset: usize },
}

/// Turn raw file bytes into the text the parser reads.
///
/// RTF is converted to plain text; when the conversion fails the bytes are
/// read as ordinary text instead.
pub fn decode_source(bytes: &[u8]) -> Result<(String, SourceFormat), ParseError> {
    if is_rtf(bytes) {
        match rtf_to_text(bytes) {
            Ok(text) => return Ok((text, SourceFormat::Rtf)),
            Err(e) => warn!("RTF conversion failed, reading as plain text: {}", e),
        }
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => Ok((text.to_string(), SourceFormat::Markdown)),
        Err(e) => Err(ParseError::NotUtf8 {
            offset: e.valid_up_to(),
        }),
    }
}
