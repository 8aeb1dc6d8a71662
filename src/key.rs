//! Case-folding key encoding for puzzle identifiers.
//!
//! Puzzle identifiers are case-significant (`00sHx` and `00shx` are different
//! puzzles), but the record store and the sort order of the index want a
//! lowercase key. The encoder lowercases the identifier and appends the decimal
//! value of a bit mask that remembers which characters were uppercase:
//!
//! ```
//! use puzzlenif::key::encode;
//!
//! // 'H' is the fourth of five characters, so bit 5 - 1 - 3 = 1 is set.
//! assert_eq!(encode("00sHx"), "00shx2");
//! assert_eq!(encode("abc"), "abc0");
//! assert_eq!(encode(""), "");
//! ```
//!
//! The leftmost character owns the highest bit. Only the last 64 characters of
//! an identifier carry case bits; identifiers are expected to be far shorter.

/// Number of case bits the mask can hold.
pub const MAX_CASE_BITS: usize = 64;

/// Encode an identifier into its case-folded key.
pub fn encode(id: &str) -> String {
    if id.is_empty() {
        return String::new();
    }

    let length = id.chars().count();
    let mut key = String::with_capacity(id.len() + 4);
    let mut bits: u64 = 0;

    for (i, c) in id.chars().enumerate() {
        key.extend(c.to_lowercase());

        if c.is_uppercase() {
            let bit_position = length - 1 - i;
            if bit_position < MAX_CASE_BITS {
                bits |= 1u64 << bit_position;
            }
        }
    }

    key.push_str(&bits.to_string());
    key
}

/// Split a key into its lowercase text and its case mask.
///
/// `id_len` is the character count of the original identifier, which tells
/// where the lowercase text ends and the decimal mask begins. Returns `None`
/// when the key is too short or the suffix is not a valid mask.
pub fn decode_case_mask(key: &str, id_len: usize) -> Option<(&str, u64)> {
    if id_len == 0 {
        return key.is_empty().then_some(("", 0));
    }

    let split = key.char_indices().nth(id_len).map(|(i, _)| i)?;
    let (text, mask) = key.split_at(split);
    if mask.is_empty() || !mask.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mask = mask.parse::<u64>().ok()?;
    Some((text, mask))
}

/// Rebuild the original identifier from a key produced by [`encode`].
pub fn restore_case(key: &str, id_len: usize) -> Option<String> {
    let (text, mask) = decode_case_mask(key, id_len)?;
    let length = text.chars().count();

    let mut restored = String::with_capacity(key.len());
    for (i, c) in text.chars().enumerate() {
        let bit_position = length - 1 - i;
        if bit_position < MAX_CASE_BITS && mask & (1u64 << bit_position) != 0 {
            restored.extend(c.to_uppercase());
        } else {
            restored.push(c);
        }
    }
    Some(restored)
}

/// Case pattern of an identifier: `true` for every uppercase character.
pub fn case_pattern(id: &str) -> Vec<bool> {
    id.chars().map(char::is_uppercase).collect()
}
