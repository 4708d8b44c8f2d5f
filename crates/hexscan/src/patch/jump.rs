//! x86 conditional jump detection and inversion
//!
//! Only the opcode is inspected; operands are left untouched.
//!
//! ```text
//! 7x rel8          Jcc short   (condition in low nibble of byte 0)
//! 0F 8x rel32      Jcc near    (condition in low nibble of byte 1)
//! ```
//!
//! Conditions come in complementary pairs differing in bit 0
//! (`jz`/`jnz`, `jl`/`jge`, ...), so flipping that bit inverts the jump.

const MNEMONICS: [&str; 16] = [
    "jo", "jno", "jb", "jnb", "jz", "jnz", "jbe", "ja", "js", "jns", "jp", "jnp", "jl", "jge",
    "jle", "jg",
];

/// Index of the byte holding the condition code, if `bytes` starts with a Jcc.
pub fn condition_byte_offset(bytes: &[u8]) -> Option<usize> {
    match bytes {
        [0x70..=0x7F, ..] => Some(0),
        [0x0F, 0x80..=0x8F, ..] => Some(1),
        _ => None,
    }
}

pub fn is_conditional_jump(bytes: &[u8]) -> bool {
    condition_byte_offset(bytes).is_some()
}

/// Copy of `bytes` with the jump condition inverted.
pub fn invert_condition(bytes: &[u8]) -> Option<Vec<u8>> {
    let offset = condition_byte_offset(bytes)?;
    let mut inverted = bytes.to_vec();
    inverted[offset] ^= 0x01;
    Some(inverted)
}

/// Mnemonic of the Jcc at the start of `bytes`.
pub fn mnemonic(bytes: &[u8]) -> Option<&'static str> {
    let offset = condition_byte_offset(bytes)?;
    Some(MNEMONICS[(bytes[offset] & 0x0F) as usize])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_jumps() {
        assert_eq!(invert_condition(&[0x74, 0x05]).unwrap(), vec![0x75, 0x05]);
        assert_eq!(invert_condition(&[0x75, 0x05]).unwrap(), vec![0x74, 0x05]);
        assert_eq!(invert_condition(&[0x7C, 0x10]).unwrap(), vec![0x7D, 0x10]);
    }

    #[test]
    fn test_near_jumps() {
        let je = [0x0F, 0x84, 0x10, 0x00, 0x00, 0x00];
        assert_eq!(
            invert_condition(&je).unwrap(),
            vec![0x0F, 0x85, 0x10, 0x00, 0x00, 0x00]
        );
        assert_eq!(condition_byte_offset(&je), Some(1));
    }

    #[test]
    fn test_non_jumps() {
        assert!(!is_conditional_jump(&[0x90]));
        assert!(!is_conditional_jump(&[0xEB, 0x05])); // jmp rel8
        assert!(!is_conditional_jump(&[0x0F, 0x1F, 0x00])); // nop r/m
        assert!(!is_conditional_jump(&[0x0F]));
        assert!(!is_conditional_jump(&[]));
        assert!(invert_condition(&[0x2B, 0xD6]).is_none());
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(mnemonic(&[0x74, 0x00]), Some("jz"));
        assert_eq!(mnemonic(&[0x0F, 0x8D, 0, 0, 0, 0]), Some("jge"));
        assert_eq!(mnemonic(&[0x7F, 0x00]), Some("jg"));
        assert_eq!(mnemonic(&[0x90]), None);
    }

    #[test]
    fn test_double_inversion_is_identity() {
        for opcode in 0x70..=0x7Fu8 {
            let once = invert_condition(&[opcode, 0x02]).unwrap();
            assert_eq!(invert_condition(&once).unwrap(), vec![opcode, 0x02]);
        }
    }
}
