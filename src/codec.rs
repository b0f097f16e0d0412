//! Byte ↔ text conversions used throughout the engine.
//!
//! Two representations exist side by side:
//! - [`hex`] — the editable hex dump shown in EDIT mode (`"41 0a "`), which
//!   round-trips all byte values 0–255;
//! - [`code_page`] — the fixed single-byte code page (CP437) used for every
//!   raw→text display outside the hex view, chosen because it maps each of
//!   the 256 byte values to a distinct printable-ish character.

/// Two-digit lower-hex dump codec for EDIT mode.
pub mod hex {
    use crate::error::EngineError;

    /// Encode bytes as a space-separated lower-hex dump.
    ///
    /// `[0x41, 0x0A]` encodes as `"41 0a "` (trailing space included, so
    /// incremental echo and full renders concatenate identically).
    pub fn encode(bytes: &[u8]) -> String {
        use std::fmt::Write;
        let mut out = String::with_capacity(bytes.len() * 3);
        for byte in bytes {
            // write! to a String cannot fail
            let _ = write!(out, "{byte:02x} ");
        }
        out
    }

    /// Decode hex text back into bytes.
    ///
    /// Whitespace separates values; within a run of hex digits, each pair
    /// forms one byte, so `"41 0a"`, `"410a"` and `"41\n0a"` all decode to
    /// `[0x41, 0x0A]`.
    ///
    /// # Errors
    /// [`EngineError::InvalidHex`] on a non-hex character or a dangling
    /// half-byte, with the offset of the offending position.
    pub fn decode(text: &str) -> Result<Vec<u8>, EngineError> {
        let mut out = Vec::with_capacity(text.len() / 3 + 1);
        let mut pending: Option<u8> = None;

        for (position, ch) in text.char_indices() {
            if ch.is_whitespace() {
                if pending.is_some() {
                    return Err(EngineError::InvalidHex { position });
                }
                continue;
            }
            let nibble = ch
                .to_digit(16)
                .ok_or(EngineError::InvalidHex { position })? as u8;
            pending = match pending.take() {
                None => Some(nibble),
                Some(high) => {
                    out.push((high << 4) | nibble);
                    None
                }
            };
        }

        if pending.is_some() {
            return Err(EngineError::InvalidHex {
                position: text.len(),
            });
        }
        Ok(out)
    }
}

/// The fixed single-byte code page (CP437) for raw→text display.
///
/// Decode-only: the engine always keeps the raw bytes and re-decodes for
/// display, so an encode direction is never needed.
pub mod code_page {
    /// Upper half of CP437 (byte values 0x80–0xFF), in order.
    const CP437_HIGH: [char; 128] = [
        'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å', //
        'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ', //
        'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»', //
        '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐', //
        '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧', //
        '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀', //
        'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩', //
        '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{a0}',
    ];

    /// Decode one byte. 0x00–0x7F map to themselves (ASCII, controls
    /// included), 0x80–0xFF through the CP437 high table. Every byte maps
    /// to a distinct char, so display round-trips conceptually losslessly.
    pub fn decode_byte(byte: u8) -> char {
        if byte < 0x80 {
            byte as char
        } else {
            CP437_HIGH[(byte - 0x80) as usize]
        }
    }

    /// Decode a byte sequence into display text.
    pub fn decode(bytes: &[u8]) -> String {
        bytes.iter().copied().map(decode_byte).collect()
    }
}
