//! Implementation of Hierarchical Identity Based Encryption ([HIBE]), an extension of Identity
//! Based Encryption ([IBE]).
//!
//! # ⚠️ Warning: Cryptographic Hazmat ☣️
//!
//! This crate has *not* been audited, it is *not* battle tested, and *nobody* claims it to be
//! secure. Use it at **your own risk** and if you know what you are doing!
//!
//! # Introduction
//!
//! In a HIBE, the public key of a recipient is simply its identity: a path in a tree of
//! identities. A root authority holds the master key and can issue the private key of any
//! identity, and the holder of a private key can in turn derive the keys of all identities below
//! it, without involving the root. Anyone who knows the public parameters can encrypt for any
//! identity.
//!
//! # Crate Structure
//!
//! The [`hibe`] submodule contains the scheme itself, as [`hibe::Hibe`] (parameter and key
//! generation), [`hibe::HibeCrypt`] (encryption of group elements) and [`hibe::HibeKem`] (key
//! encapsulation). Those methods work directly on the group elements, as they are defined in the
//! paper.
//!
//! A byte-oriented wrapper is provided in the [`kem`] submodule, mainly in the
//! [`kem::HybridKem`] struct. This allows you to deal with bytes instead of group elements.
//!
//! The bridge between [`hibe`] and [`kem`] is provided by [`Mapper`], which translates from
//! arbitrary identities from the application domain to the low-level, mathematical representation
//! of identities.
//!
//! # Implemented Algorithms
//!
//! This crate implements the HIBE of Boneh, Boyen and Goh, "Hierarchical Identity Based
//! Encryption with Constant Size Ciphertext" ([eprint](https://eprint.iacr.org/2005/015.pdf)),
//! as [`hibe::BonehBoyenGoh`]. Ciphertexts consist of three group elements, regardless of the
//! depth of the recipient.
//!
//! The group arithmetic and the pairing are provided by
//! [`bls_12_381_plus`](https://crates.io/crates/bls12_381_plus).
//!
//! # Limitations
//!
//! Private keys are not bound to their identity. Decrypting with the wrong key, or deriving a key
//! from a key that is not the direct parent, silently gives wrong results instead of errors.
//!
//! [HIBE]: https://cryptowiki.tm.kit.edu/index.php/Hierarchical_Identity-Based_Encryption
//! [IBE]: https://en.wikipedia.org/wiki/Identity-based_encryption
pub mod error;
pub mod hibe;
pub mod kem;

use error::Result;

/// A trait to provide byte-level access to objects.
pub trait ByteAccess {
    /// Provides access to the bytes.
    ///
    /// This operation will allocate a fresh vector, and the byte representation may or may not
    /// have to be computed first.
    fn bytes(&self) -> Vec<u8>;

    /// Provide a short fingerprint of the bytes.
    ///
    /// This can be used to "summarize" long keys when displaying them, to still provide
    /// distinguishing features but to not print out the whole key.
    ///
    /// By default, this method uses the first 16 bytes of the [`ByteAccess::bytes`]
    /// representation, and formats them as a hex string.
    fn fingerprint(&self) -> String {
        let bytes = self.bytes();
        hex::encode(&bytes[..bytes.len().min(16)])
    }
}

/// A trait to mark objects that can map from an application-specific identity to a HIBE-specific
/// identity.
///
/// A mapper can be implemented multiple times for a single struct, thereby providing multiple
/// (equivalent) ways to map.
pub trait Mapper<F, T> {
    fn map_identity(&self, input: F) -> Result<Vec<T>>;
}

/// [`Mapper`] is automatically implemented for functions and closures that match the signature of
/// [`Mapper::map_identity`].
impl<X, Y, F: Fn(X) -> Result<Vec<Y>>> Mapper<X, Y> for F {
    fn map_identity(&self, input: X) -> Result<Vec<Y>> {
        self(input)
    }
}
