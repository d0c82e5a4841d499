//! Low-level implementation of HIBE primitives.
//!
//! The structs and traits in this module implement the HIBE in the way that it is defined in its
//! paper, working directly on group elements. For a byte-level interface, refer to the
//! [`kem`][super::kem] module.
//!
//! All methods that use randomness only use the [`Rng`] bound, not [`CryptoRng`][rand::CryptoRng].
//! This does not mean that you should use them with insecure randomness, but rather that you need
//! to take care when using these low-level primitives! Randomness is drawn through
//! [`RngCore::try_fill_bytes`][rand::RngCore::try_fill_bytes], so a failing source is reported as
//! [`Error::Entropy`][crate::error::Error::Entropy] and no partial key or ciphertext is returned.
//!
//! # Identity Handling
//!
//! This module assumes that identity hierarchies are represented by sequences of "identity
//! elements". The type of the identity elements is defined by the actual HIBE algorithm, but
//! usually ends up being a [`Scalar`][bls12_381_plus::Scalar]. The more elements are provided, the
//! deeper down the hierarchy goes. For example:
//!
//! ```ignore
//! let root = &[];  // Represents the root identity
//! let a = &[1];
//! let b = &[1, 1]; // ... is a child of a
//! let c = &[1, 2]; // ... is also a child of a and a sibling of b
//! let d = &[2];    // ... is a sibling of a
//! ```
//!
//! # Misuse
//!
//! Keys are not bound to the identity they were generated for. Decrypting with the key of another
//! identity, or deriving from a key that is not the parent of the requested identity, does not
//! produce an error but a meaningless result. Only the depth relationship between a parent key and
//! the requested child is checked.
use super::error::Result;

use rand::Rng;

mod bbg;
mod element;
pub use self::bbg::{BonehBoyenGoh, Ciphertext, MasterKey, PrivateKey, PublicParams};

/// Main trait for HIBE schemes.
///
/// This trait defines the basic functionality of HIBEs, namely the generation and derivation of
/// secret keys for identities.
///
/// For encryption functionality, the extension [`HibeCrypt`] needs to be used, and for key
/// encapsulation, [`HibeKem`].
///
/// Note that this trait represents a HIBE *algorithm* not a HIBE *instantiation*.
pub trait Hibe {
    /// Type of the private key.
    ///
    /// This refers to a single identity's private key.
    type PrivateKey;
    /// Type of the master key.
    ///
    /// This is the secret key that can be used to generate the secret key of any identity.
    type MasterKey;
    /// Type of the public key.
    ///
    /// As HIBEs use identities to derive public keys, this is the public key "of the whole
    /// system", sometimes also called *master public key* or *system parameters*. There is no
    /// distinct type to represent the public key of a single identity, as the encryption computes
    /// it from the identity path.
    type PublicKey;
    /// Type of an identity element.
    ///
    /// The whole identity is represented by multiple [`Identity`][Self::Identity] elements, for
    /// example in a `&[Identity]` slice.
    type Identity;

    /// Set the system up.
    ///
    /// This method outputs the master public key and the master secret key.
    fn setup<R: Rng>(&self, rng: R) -> Result<(Self::PublicKey, Self::MasterKey)>;

    /// Generate the key for the given identity directly from the master key.
    ///
    /// Parameters:
    ///
    /// * `rng` - The randomness to use.
    /// * `public_key` - The master public key.
    /// * `master_key` - The master secret key.
    /// * `identity` - The identity elements.
    fn generate_key<R: Rng>(
        &self,
        rng: R,
        public_key: &Self::PublicKey,
        master_key: &Self::MasterKey,
        identity: &[Self::Identity],
    ) -> Result<Self::PrivateKey>;

    /// Derives the key for `identity` from the key of its parent.
    ///
    /// The parent is the identity with the last element of `identity` removed. Passing the key of
    /// any other identity yields a key that does not decrypt correctly.
    ///
    /// Parameters:
    ///
    /// * `rng` - The randomness to use.
    /// * `public_key` - The master public key.
    /// * `parent_key` - The parent's secret key.
    /// * `identity` - The full identity of the child.
    fn derive_key<R: Rng>(
        &self,
        rng: R,
        public_key: &Self::PublicKey,
        parent_key: &Self::PrivateKey,
        identity: &[Self::Identity],
    ) -> Result<Self::PrivateKey>;
}

/// HIBE methods to do encryption.
pub trait HibeCrypt: Hibe {
    /// Type of the messages that this HIBE can encrypt.
    type Message;
    /// Type of the resulting ciphertext.
    type Ciphertext;

    /// Encrypt a message for the given identity.
    ///
    /// Parameters:
    ///
    /// * `rng` - The randomness to use.
    /// * `public_key` - The master public key.
    /// * `identity` - The identity for which to encrypt the message.
    /// * `message` - The actual message.
    fn encrypt<R: Rng>(
        &self,
        rng: R,
        public_key: &Self::PublicKey,
        identity: &[Self::Identity],
        message: &Self::Message,
    ) -> Result<Self::Ciphertext>;

    /// Decrypt a message given the secret key.
    ///
    /// This never fails. A key for the wrong identity produces a wrong message.
    fn decrypt(&self, key: &Self::PrivateKey, ciphertext: &Self::Ciphertext) -> Self::Message;
}

/// HIBE methods to do key encapsulation.
pub trait HibeKem: Hibe {
    /// Type of the resulting key.
    type Key;
    /// Type of the encapsulation of the key.
    type EncapsulatedKey;

    /// Computes a key encapsulation.
    ///
    /// Returns the generated key and its encapsulation.
    ///
    /// Parameters:
    ///
    /// * `rng` - The randomness to use.
    /// * `public_key` - The master public key.
    /// * `identity` - The identity for which to encapsulate the key.
    fn encapsulate<R: Rng>(
        &self,
        rng: R,
        public_key: &Self::PublicKey,
        identity: &[Self::Identity],
    ) -> Result<(Self::Key, Self::EncapsulatedKey)>;

    /// Decapsulate a previously encapsulated key.
    fn decapsulate(&self, key: &Self::PrivateKey, encapsulation: &Self::EncapsulatedKey) -> Self::Key;
}
