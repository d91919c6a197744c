//! Key validation and length compliance.

use md5::{Digest, Md5};

use crate::cache::{MAX_KEY_LENGTH, RESERVED_CHARACTERS};
use crate::error::{CacheError, Result};

/// Rejects keys containing any reserved character.
pub fn validate_key(key: &str) -> Result<()> {
    if key.contains(|c: char| RESERVED_CHARACTERS.contains(c)) {
        return Err(CacheError::InvalidArgument(format!(
            "The key '{key}' cannot contain any of the reserved characters: '{RESERVED_CHARACTERS}'"
        )));
    }
    Ok(())
}

/// Maps a key longer than [`MAX_KEY_LENGTH`] bytes to a deterministic
/// key of at most that length; shorter keys are returned unchanged.
///
/// The key is cut and suffixed with `_trunc_` and the MD5 of the full
/// key. The cut lands on a char boundary, so multibyte keys may come out
/// a few bytes short of the limit.
pub fn compliant_key(key: &str) -> String {
    if key.len() <= MAX_KEY_LENGTH {
        return key.to_string();
    }

    let suffix = format!("_trunc_{}", hex::encode(Md5::digest(key.as_bytes())));
    let mut cut = MAX_KEY_LENGTH - suffix.len();
    while !key.is_char_boundary(cut) {
        cut -= 1;
    }

    format!("{}{}", &key[..cut], suffix)
}
