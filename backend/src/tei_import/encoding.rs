// Source files come from several digitization projects: most are UTF-8,
// some older ones are UTF-16 with a byte-order mark and CRLF line endings.

use std::path::Path;

use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

use crate::logger;

/// Read a markup file as UTF-8 text with Unix line endings.
pub fn read_markup_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read file: {:?}", path))?;

    let text = decode_markup_bytes(&bytes);
    if text.had_errors {
        logger::warn(&format!("Encoding errors detected while decoding {:?}", path));
    }
    logger::debug(&format!("File: {:?}, Encoding: {}", path.file_name().unwrap_or_default(), text.encoding.name()));

    Ok(text.content)
}

pub struct DecodedText {
    pub content: String,
    pub encoding: &'static Encoding,
    pub had_errors: bool,
}

pub fn decode_markup_bytes(bytes: &[u8]) -> DecodedText {
    let (encoding, bom_len) = detect_encoding(bytes);
    let (decoded, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);

    DecodedText {
        content: decoded.replace("\r\n", "\n"),
        encoding,
        had_errors,
    }
}

/// Encoding and BOM length. Defaults to UTF-8 without a BOM.
fn detect_encoding(bytes: &[u8]) -> (&'static Encoding, usize) {
    match Encoding::for_bom(bytes) {
        Some((enc, len)) if enc == UTF_16LE || enc == UTF_16BE || enc == UTF_8 => (enc, len),
        _ => (UTF_8, 0),
    }
}
