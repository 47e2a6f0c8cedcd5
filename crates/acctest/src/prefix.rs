//! Per-case name prefixes.
//!
//! Every entry a case creates embeds its prefix verbatim, so cases can run
//! side by side on one device and leftovers can be found by listing.

use rand::Rng;

/// Fixed part of every generated prefix.
pub const PREFIX_BASE: &str = "test-acc-";

const SUFFIX_LEN: usize = 6;
const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generate `test-acc-` followed by six lowercase alphanumerics.
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    format!("{PREFIX_BASE}{suffix}")
}

/// Whether `prefix` looks like one produced by [`generate`].
pub fn is_generated(prefix: &str) -> bool {
    prefix.strip_prefix(PREFIX_BASE).is_some_and(|suffix| {
        suffix.len() == SUFFIX_LEN && suffix.bytes().all(|b| CHARSET.contains(&b))
    })
}
