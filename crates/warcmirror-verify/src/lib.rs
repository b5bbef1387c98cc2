//! Checksum primitives for mirrored archive files.
//!
//! Provides incremental hashing so integrity can be verified in the same
//! pass that streams bytes to disk, without buffering whole multi-gigabyte
//! files. The [`Hasher`] trait is deliberately minimal; algorithm choice is
//! a cargo feature, not a policy baked into callers.
//!
//! # Example
//!
//! ```
//! use warcmirror_verify::{Hasher, Md5Hasher};
//!
//! let mut hasher = Md5Hasher::new();
//! hasher.update(b"hello ");
//! hasher.update(b"world");
//! assert_eq!(hasher.finalize_hex(), "5eb63bbbe01eeed093cb22bb8f5acdc3");
//! ```

pub use self::hasher::{DigestHasher, Hasher};

#[cfg(feature = "md5")]
pub use self::hasher::Md5Hasher;

#[cfg(feature = "sha256")]
pub use self::hasher::Sha256Hasher;

mod hasher;
