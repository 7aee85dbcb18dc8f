//! PETSCII is mostly ASCII where it matters for a text console: digits and
//! punctuation line up, unshifted letters sit in the uppercase ASCII range,
//! and shifted letters live at 0xC1-0xDA. The two character sets decide
//! whether the unshifted range renders as capitals (the power-on look) or
//! minuscules.

/// Translate a host keyboard byte to the PETSCII code the firmware expects.
/// `None` drops the byte (escape sequences, control noise).
pub fn from_host(byte: u8) -> Option<u8> {
    match byte {
        b'\r' | b'\n' => Some(0x0D),
        // Host backspace keys become the Commodore DEL.
        0x08 | 0x7F => Some(0x14),
        // Plain letters type as unshifted PETSCII, which displays uppercase.
        b'a'..=b'z' => Some(byte - 0x20),
        // Shifted letters move to the upper half.
        b'A'..=b'Z' => Some(byte + 0x80),
        // Space through underscore line up code-for-code.
        0x20..=0x5F => Some(byte),
        // The remaining ASCII punctuation has no PETSCII home.
        _ => None,
    }
}

/// Translate a printable PETSCII code to a host character, honoring the
/// current character set. `None` means the code has no textual rendering.
pub fn to_host(code: u8, lowercase: bool) -> Option<char> {
    match code {
        0x20..=0x40 => Some(code as char),
        0x41..=0x5A => {
            if lowercase {
                Some((code + 0x20) as char)
            } else {
                Some(code as char)
            }
        }
        0x5B => Some('['),
        0x5C => Some('£'),
        0x5D => Some(']'),
        0x5E => Some('↑'),
        0x5F => Some('←'),
        // Shifted letters: capitals in the lowercase set. In the uppercase
        // set they are really graphics glyphs; capitals are the nearest
        // thing a character terminal has.
        0xC1..=0xDA => Some((code - 0x80) as char),
        // Shifted space.
        0xA0 => Some(' '),
        _ => None,
    }
}

/// PETSCII color control codes, as Commodore color indices.
pub fn color_code(code: u8) -> Option<u8> {
    match code {
        0x05 => Some(1),  // white
        0x1C => Some(2),  // red
        0x1E => Some(5),  // green
        0x1F => Some(6),  // blue
        0x81 => Some(8),  // orange
        0x90 => Some(0),  // black
        0x95 => Some(9),  // brown
        0x96 => Some(10), // light red
        0x97 => Some(11), // dark grey
        0x98 => Some(12), // medium grey
        0x99 => Some(13), // light green
        0x9A => Some(14), // light blue
        0x9B => Some(15), // light grey
        0x9C => Some(4),  // purple
        0x9E => Some(7),  // yellow
        0x9F => Some(3),  // cyan
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn typed_letters_are_unshifted_petscii() {
        assert_eq!(from_host(b'a'), Some(0x41));
        assert_eq!(from_host(b'z'), Some(0x5A));
        assert_eq!(from_host(b'A'), Some(0xC1));
        assert_eq!(from_host(b'3'), Some(b'3'));
        assert_eq!(from_host(0x7F), Some(0x14));
        assert_eq!(from_host(0x1B), None, "escape is not typeable text");
    }

    #[test]
    fn rendering_follows_the_character_set() {
        assert_eq!(to_host(0x41, false), Some('A'));
        assert_eq!(to_host(0x41, true), Some('a'));
        assert_eq!(to_host(0xC1, false), Some('A'));
        assert_eq!(to_host(0xC1, true), Some('A'));
        assert_eq!(to_host(b'?', false), Some('?'));
        assert_eq!(to_host(0x14, false), None, "controls have no glyph");
    }

    #[test]
    fn round_trip_for_letters_digits_and_punctuation() {
        for &byte in b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 !\"#$%&'()*+,-./:;<=>?@[]" {
            let code = from_host(byte.to_ascii_lowercase()).unwrap();
            let rendered = to_host(code, false).unwrap();
            // Unshifted typing renders as capitals in the power-on set.
            assert_eq!(rendered, byte as char);
        }
    }
}
