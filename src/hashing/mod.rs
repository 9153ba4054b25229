//! Cache-key derivation for (query, document) pairs.
//!
//! Keys are the BLAKE3 hash of the normalized query and document, each length-prefixed so
//! `("ab", "c")` and `("a", "bc")` never collide by concatenation.

use blake3::Hasher;

/// Identity of a (query, document) pair in the score cache.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Derives the key for `query` / `document` after normalization.
    #[inline]
    pub fn new(query: &str, document: &str) -> Self {
        hash_pair(query, document)
    }

    /// Returns the raw 32-byte digest.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let short: String = self.0[..8].iter().map(|b| format!("{b:02x}")).collect();
        f.debug_tuple("CacheKey").field(&short).finish()
    }
}

/// Trims the text and collapses every whitespace run to a single space.
///
/// Case is preserved: cross-encoders are generally case sensitive.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Hashes a normalized (query, document) pair into a [`CacheKey`].
#[inline]
pub fn hash_pair(query: &str, document: &str) -> CacheKey {
    let query = normalize_text(query);
    let document = normalize_text(document);

    let mut hasher = Hasher::new();
    hasher.update(&(query.len() as u64).to_le_bytes());
    hasher.update(query.as_bytes());
    hasher.update(&(document.len() as u64).to_le_bytes());
    hasher.update(document.as_bytes());

    CacheKey(*hasher.finalize().as_bytes())
}
