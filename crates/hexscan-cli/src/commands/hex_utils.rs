//! Hex address parsing and byte formatting helpers.

use anyhow::Result;

/// Parse a hex address string (with or without 0x prefix).
pub fn parse_hex_address(s: &str) -> Result<u64> {
    let s = s.trim_start_matches("0x").trim_start_matches("0X");
    u64::from_str_radix(s, 16).map_err(|e| anyhow::anyhow!("Invalid hex address: {}", e))
}

pub fn format_hex_address(addr: u64) -> String {
    format!("0x{:X}", addr)
}

/// `[0x2B, 0xD6]` -> `"2B D6"`, the same text `write` accepts back.
pub fn format_hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render `bytes` as hexdump lines of 16 bytes, labelled with absolute
/// addresses starting at `base`.
///
/// ```text
/// 0x1000: 48 65 6C 6C 6F 20 57 6F  72 6C 64 00 00 00 00 00  |Hello World.....|
/// ```
pub fn hexdump_lines(base: u64, bytes: &[u8], ascii: bool) -> Vec<String> {
    bytes
        .chunks(16)
        .enumerate()
        .map(|(i, chunk)| {
            let mut line = format!("0x{:X}: ", base.wrapping_add((i * 16) as u64));

            for j in 0..16 {
                if j == 8 {
                    line.push(' ');
                }
                match chunk.get(j) {
                    Some(byte) => line.push_str(&format!("{:02X} ", byte)),
                    None => line.push_str("   "),
                }
            }

            if ascii {
                line.push_str(" |");
                line.extend(chunk.iter().map(|&b| {
                    if (0x20..0x7F).contains(&b) {
                        b as char
                    } else {
                        '.'
                    }
                }));
                line.extend(std::iter::repeat_n(' ', 16 - chunk.len()));
                line.push('|');
            }

            line.trim_end().to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_address_with_prefix() {
        assert_eq!(parse_hex_address("0x1000").unwrap(), 0x1000);
        assert_eq!(parse_hex_address("0X1000").unwrap(), 0x1000);
    }

    #[test]
    fn test_parse_hex_address_without_prefix() {
        assert_eq!(parse_hex_address("7f3a2c000000").unwrap(), 0x7f3a2c000000);
    }

    #[test]
    fn test_parse_hex_address_invalid() {
        assert!(parse_hex_address("GHIJK").is_err());
        assert!(parse_hex_address("0x").is_err());
    }

    #[test]
    fn test_format_hex_address() {
        assert_eq!(format_hex_address(0x55D0C0DE1000), "0x55D0C0DE1000");
        assert_eq!(format_hex_address(0), "0x0");
    }

    #[test]
    fn test_format_hex_bytes() {
        assert_eq!(format_hex_bytes(&[0x2B, 0xD6, 0x05]), "2B D6 05");
        assert_eq!(format_hex_bytes(&[]), "");
    }

    #[test]
    fn test_hexdump_lines() {
        let lines = hexdump_lines(0x1000, b"Hello World\0\0\0\0\0\x90", true);
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "0x1000: 48 65 6C 6C 6F 20 57 6F  72 6C 64 00 00 00 00 00  |Hello World.....|"
        );
        assert!(lines[1].starts_with("0x1010: 90 "));
        assert!(lines[1].ends_with("|.               |"));
    }

    #[test]
    fn test_hexdump_without_ascii() {
        let lines = hexdump_lines(0x20, &[0xCC; 4], false);
        assert_eq!(lines, vec!["0x20: CC CC CC CC".to_string()]);
    }

    #[test]
    fn test_hexdump_at_top_of_address_space() {
        let lines = hexdump_lines(u64::MAX - 7, &[0u8; 32], false);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0xFFFFFFFFFFFFFFF8: "));
        assert!(lines[1].starts_with("0x8: "));
    }
}
