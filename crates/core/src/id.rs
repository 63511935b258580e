// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic ID generation and small fixed-capacity ID buffers.
//!
//! Job and session identifiers are not random: they are derived from a
//! content hash so that replaying the same inputs always yields the same
//! id (idempotent job creation, reproducible session ids for log
//! correlation). See [`generate`] for the recipe.

use sha2::{Digest, Sha256};

/// Length of every generated id, in ASCII bytes.
pub const ID_LEN: usize = 10;

/// Alphabet used for id encoding: lowercase RFC 4648 base32 (`a-z2-7`),
/// chosen so ids are case-insensitive-safe and filesystem/URL friendly.
const ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// Fixed-capacity inline buffer for a generated id. Always exactly
/// [`ID_LEN`] ASCII bytes, `Copy`, no heap allocation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdBuf([u8; ID_LEN]);

impl IdBuf {
    fn from_bytes(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_str(&self) -> &str {
        // Invariant: only ever built from the ALPHABET, always valid ASCII/UTF-8.
        std::str::from_utf8(&self.0).unwrap_or("")
    }
}

impl std::fmt::Debug for IdBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl std::fmt::Display for IdBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for IdBuf {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for IdBuf {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <&str>::deserialize(deserializer)?;
        if s.len() != ID_LEN || !s.bytes().all(|b| ALPHABET.contains(&b)) {
            return Err(serde::de::Error::custom(format!(
                "not a valid {ID_LEN}-char id: {s:?}"
            )));
        }
        let mut buf = [0u8; ID_LEN];
        buf.copy_from_slice(s.as_bytes());
        Ok(Self(buf))
    }
}

/// Deterministically derive a 10-character id from a sequence of seed
/// parts (concatenated with no separator, so callers must pre-format
/// anything that needs unambiguous boundaries — e.g. an RFC3339 nano
/// timestamp never collides with the source id it follows).
///
/// `id = lower(base32(sha256(parts.concat())))[0..10]`
///
/// Two calls with identical parts return identical ids; any differing
/// byte in any part changes the id (by the avalanche property of SHA-256).
pub fn generate(parts: &[&str]) -> IdBuf {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    let digest = hasher.finalize();
    base32_prefix(&digest)
}

/// Encode the first bytes of `digest` as lowercase base32 and take the
/// first [`ID_LEN`] characters.
fn base32_prefix(digest: &[u8]) -> IdBuf {
    let mut out = [0u8; ID_LEN];
    let mut bit_buf: u32 = 0;
    let mut bits: u32 = 0;
    let mut written = 0;
    for &byte in digest {
        if written >= ID_LEN {
            break;
        }
        bit_buf = (bit_buf << 8) | byte as u32;
        bits += 8;
        while bits >= 5 && written < ID_LEN {
            bits -= 5;
            let idx = (bit_buf >> bits) & 0x1f;
            out[written] = ALPHABET[idx as usize];
            written += 1;
        }
    }
    debug_assert_eq!(written, ID_LEN, "sha256 digest has enough bits for 10 base32 chars");
    IdBuf::from_bytes(out)
}

/// Define a newtype wrapper around [`IdBuf`] generated via [`generate`].
///
/// ```ignore
/// define_id! {
///     /// Doc comment for the ID type.
///     pub struct JobId;
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $crate::id::IdBuf);

        impl $name {
            /// Derive a new id deterministically from the given seed parts.
            pub fn generate(parts: &[&str]) -> Self {
                Self($crate::id::generate(parts))
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0.as_str())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_str()
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0.as_str() == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0.as_str() == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.0.as_str()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                self.0.as_str()
            }
        }
    };
}

/// An opaque identifier handed to us by an external collaborator (the VCS,
/// the AI daemon). Unlike [`define_id!`] ids these are never generated
/// in-process, just parsed and carried around, so they are a thin
/// [`smol_str::SmolStr`] wrapper (small-string-optimized, no fixed cap).
#[macro_export]
macro_rules! define_opaque_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub smol_str::SmolStr);

        impl $name {
            pub fn new(s: impl AsRef<str>) -> Self {
                Self(smol_str::SmolStr::new(s))
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0.as_str())
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_str()
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.0.as_str()
            }
        }
    };
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
