//! High-level wrapper around HIBE operations.
//!
//! Applications rarely want to deal with group elements directly. This module provides an
//! opinionated, byte-oriented wrapper over the raw operations of [`BonehBoyenGoh`]:
//!
//! * Generated keys (from [`HibeKem`]) are hashed to `[u8; 16]` (128 Bit) using SHA3 to make it
//!   easy to use them in other cryptographic primitives.
//! * Encryption and decryption work on byte sequences by using hybrid encryption: the KEM
//!   establishes a key and AES-128 in counter mode encrypts the payload. The result is an
//!   [`Envelope`] whose header (the encapsulated key) and body (the payload) can be transported
//!   together or separately.
//! * Identities are mapped through a [`Mapper`], which makes it easier to specify identities at
//!   the call-site. [`HashMapper`] is the default, hashing every element of an iterator.
//! * Keys are wrapped in opaque structs that can be serialized with `serde`, and that only show a
//!   fingerprint in their [`Debug`] output.
//! * The methods in this module are restricted to [`CryptoRng`] random generators to enforce the
//!   use of cryptographically secure algorithms.
//!
//! Keys can either be issued by the holder of the [`MasterKey`] or be delegated by the holder of
//! the parent's [`PrivateKey`]; [`HybridKem::extract`] accepts both through [`Ancestor`].
use super::{
    error::{Error, Result},
    hibe::{BonehBoyenGoh, Hibe, HibeKem},
    ByteAccess, Mapper,
};

use std::{
    fmt::{self, Debug},
    hash::{Hash, Hasher},
};

use aes::cipher::{KeyIvInit, StreamCipher};
use bls12_381_plus::{Gt, Scalar};
use rand::{CryptoRng, Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

type AesCtr = ctr::Ctr64LE<aes::Aes128>;
static IV: [u8; 16] = [0; 16];

/// Implements [`From`] for the wrapped value, [`ByteAccess`] via `bincode` and a [`Debug`] that
/// only shows the fingerprint.
macro_rules! opaque_key {
    ($name:ident, $inner:ty) => {
        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl ByteAccess for $name {
            fn bytes(&self) -> Vec<u8> {
                bincode::serialize(&self.0).unwrap()
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name))
                    .field(&self.fingerprint())
                    .finish()
            }
        }
    };
}

/// The public key of the system.
///
/// This is the "master public key", sometimes also called the "public parameters". It does not
/// belong to a single identity; the encryption functionality takes the identity as an additional
/// parameter.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PublicKey(<BonehBoyenGoh as Hibe>::PublicKey);

opaque_key!(PublicKey, <BonehBoyenGoh as Hibe>::PublicKey);

impl PublicKey {
    /// The maximum depth of identities that this system supports.
    pub fn maximum_depth(&self) -> usize {
        self.0.maximum_depth()
    }

    /// Computes the pairing that encryption needs ahead of time.
    ///
    /// See [`PublicParams::precache`][crate::hibe::PublicParams::precache].
    pub fn precache(&self) {
        self.0.precache();
    }
}

/// The master secret key, which can issue the key of any identity.
///
/// It should never leave the issuing authority. The `serde` implementations and
/// [`ByteAccess::bytes`] exist to persist it inside that trust boundary only; never write the
/// serialized key to untrusted storage.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MasterKey(<BonehBoyenGoh as Hibe>::MasterKey);

opaque_key!(MasterKey, <BonehBoyenGoh as Hibe>::MasterKey);

/// The secret key of a single identity.
///
/// It decrypts ciphertexts for its identity and derives the keys of its children, as long as
/// [`PrivateKey::depth_left`] is not zero.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PrivateKey(<BonehBoyenGoh as Hibe>::PrivateKey);

opaque_key!(PrivateKey, <BonehBoyenGoh as Hibe>::PrivateKey);

impl PrivateKey {
    /// How many more levels below this identity keys can be derived for.
    pub fn depth_left(&self) -> usize {
        self.0.depth_left()
    }
}

/// An encapsulated key.
///
/// Applying the recipient's secret key to it recovers the key chosen by the encapsulator.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct EncapsulatedKey(<BonehBoyenGoh as HibeKem>::EncapsulatedKey);

opaque_key!(EncapsulatedKey, <BonehBoyenGoh as HibeKem>::EncapsulatedKey);

/// A hybrid ciphertext.
///
/// The `header` carries the encapsulated key, the `body` the AES-CTR encrypted payload.
/// [`HybridKem::encrypt`] hands out the serialized envelope as a single byte string; transports
/// that need to ship header and body separately can take it apart with [`Envelope::from_bytes`].
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct Envelope {
    pub header: EncapsulatedKey,
    pub body: Vec<u8>,
}

impl Envelope {
    /// Parses an envelope from the bytes returned by [`HybridKem::encrypt`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Envelope> {
        bincode::deserialize(bytes).map_err(|_| Error::MalformedCiphertext)
    }
}

impl ByteAccess for Envelope {
    fn bytes(&self) -> Vec<u8> {
        bincode::serialize(self).unwrap()
    }
}

/// The key material that a new private key is extracted from.
#[derive(Debug, Clone, Copy)]
pub enum Ancestor<'a> {
    /// Issue the key directly with the master key.
    Master(&'a MasterKey),
    /// Delegate the key from the key of the direct parent.
    Parent(&'a PrivateKey),
}

fn hash_from_curve(element: Gt) -> [u8; 16] {
    let mut result = [0; 16];
    result.copy_from_slice(&Sha3_256::digest(element.to_bytes())[..16]);
    result
}

/// High-level implementation of HIBE operations.
///
/// This struct internally uses the [`BonehBoyenGoh`]-HIBE to provide high-level key-encapsulation
/// and encryption. In addition, this struct keeps a [`Mapper`] around to do the mapping of
/// high-level identities to low-level identities.
///
/// For more information about the differences to [`Hibe`], see the [module-level][self] documentation.
#[derive(Clone, Debug)]
pub struct HybridKem<M> {
    hibe: BonehBoyenGoh,
    mapper: M,
}

impl HybridKem<HashMapper> {
    /// Create a new [`HybridKem`] using the [`HashMapper`] mapper.
    ///
    /// Parameters:
    ///
    /// * `max_depth` - Maximum depth that the hierarchy should support.
    pub fn new(max_depth: usize) -> HybridKem<HashMapper> {
        Self::new_with_mapper(max_depth, HashMapper)
    }
}

impl<M> HybridKem<M> {
    /// Create a new [`HybridKem`] with the given [`Mapper`].
    ///
    /// Parameters:
    ///
    /// * `max_depth` - Maximum depth that the hierarchy should support.
    /// * `mapper` - The mapper to use for identity mapping.
    pub fn new_with_mapper(max_depth: usize, mapper: M) -> HybridKem<M> {
        let hibe = BonehBoyenGoh::new(max_depth);
        Self { hibe, mapper }
    }

    /// Sets up the system parameters.
    ///
    /// This operation will return the master public key and the master secret key.
    ///
    /// Parameters:
    ///
    /// * `rng` - The randomness to use.
    pub fn setup<R: Rng + CryptoRng>(&self, rng: R) -> Result<(PublicKey, MasterKey)> {
        let (public_key, master_key) = self.hibe.setup(rng)?;
        Ok((public_key.into(), master_key.into()))
    }

    /// Sets up the system parameters deterministically from a seed.
    ///
    /// The seed is hashed with SHA3-256 and used to seed ChaCha20, so the same seed always gives
    /// the same system. The seed must therefore be kept as secret as the master key.
    pub fn setup_from_seed(&self, seed: &[u8]) -> Result<(PublicKey, MasterKey)> {
        let rng = ChaCha20Rng::from_seed(Sha3_256::digest(seed).into());
        self.setup(rng)
    }

    /// Generates the secret key for an identity using the master secret key.
    ///
    /// Parameters:
    ///
    /// * `rng` - The randomness to use.
    /// * `public_key` - The public key of the system.
    /// * `master_key` - The master secret key.
    /// * `identity` - The identity for which to generate the key.
    pub fn generate_key<I, R: Rng + CryptoRng>(
        &self,
        rng: R,
        public_key: &PublicKey,
        master_key: &MasterKey,
        identity: I,
    ) -> Result<PrivateKey>
    where
        M: Mapper<I, <BonehBoyenGoh as Hibe>::Identity>,
    {
        let identity = self.mapper.map_identity(identity)?;
        let private_key = self
            .hibe
            .generate_key(rng, &public_key.0, &master_key.0, &identity)?;
        Ok(private_key.into())
    }

    /// Derives the secret key for an identity given the secret key of its parent.
    ///
    /// If the given `parent_key` does not actually belong to the parent of `identity`, the
    /// resulting key will be wrong. Only a parent at the wrong depth is detected.
    ///
    /// Parameters:
    ///
    /// * `rng` - The randomness to use.
    /// * `public_key` - The public key of the system.
    /// * `parent_key` - The key of the parent identity.
    /// * `identity` - The identity for which to generate the key.
    pub fn derive_key<I, R: Rng + CryptoRng>(
        &self,
        rng: R,
        public_key: &PublicKey,
        parent_key: &PrivateKey,
        identity: I,
    ) -> Result<PrivateKey>
    where
        M: Mapper<I, <BonehBoyenGoh as Hibe>::Identity>,
    {
        let identity = self.mapper.map_identity(identity)?;
        let private_key = self
            .hibe
            .derive_key(rng, &public_key.0, &parent_key.0, &identity)?;
        Ok(private_key.into())
    }

    /// Extracts the secret key for an identity from either the master key or the parent's key.
    ///
    /// This dispatches to [`HybridKem::generate_key`] or [`HybridKem::derive_key`].
    pub fn extract<I, R: Rng + CryptoRng>(
        &self,
        rng: R,
        public_key: &PublicKey,
        ancestor: Ancestor<'_>,
        identity: I,
    ) -> Result<PrivateKey>
    where
        M: Mapper<I, <BonehBoyenGoh as Hibe>::Identity>,
    {
        match ancestor {
            Ancestor::Master(master_key) => {
                self.generate_key(rng, public_key, master_key, identity)
            }
            Ancestor::Parent(parent_key) => self.derive_key(rng, public_key, parent_key, identity),
        }
    }

    /// Encapsulate a key for the given identity.
    ///
    /// This returns the key and its encapsulation.
    ///
    /// Parameters:
    ///
    /// * `rng` - The randomness to use.
    /// * `public_key` - The public key of the system.
    /// * `identity` - The identity for which to generate the key.
    pub fn encapsulate<I, R: Rng + CryptoRng>(
        &self,
        rng: R,
        public_key: &PublicKey,
        identity: I,
    ) -> Result<([u8; 16], EncapsulatedKey)>
    where
        M: Mapper<I, <BonehBoyenGoh as Hibe>::Identity>,
    {
        let identity = self.mapper.map_identity(identity)?;
        let (key, encapsulation) = self.hibe.encapsulate(rng, &public_key.0, &identity)?;
        Ok((hash_from_curve(key), encapsulation.into()))
    }

    /// Decapsulate the given key.
    ///
    /// If the correct secret key is given, this will return the same key that the corresponding
    /// [`HybridKem::encapsulate`] call also returned. Otherwise, an unrelated key is returned.
    pub fn decapsulate(&self, key: &PrivateKey, encapsulation: &EncapsulatedKey) -> [u8; 16] {
        hash_from_curve(self.hibe.decapsulate(&key.0, &encapsulation.0))
    }

    /// Encrypt the given byte sequence for the given identity.
    ///
    /// The key is encapsulated by the KEM and the payload is then encrypted with AES (counter
    /// mode). The returned bytes are the serialized [`Envelope`], so they are longer than the
    /// payload.
    ///
    /// Parameters:
    ///
    /// * `rng` - The randomness to use.
    /// * `public_key` - The public key of the system.
    /// * `identity` - The identity for which to encrypt the payload.
    /// * `payload` - Payload to encrypt.
    pub fn encrypt<I, R: Rng + CryptoRng>(
        &self,
        rng: R,
        public_key: &PublicKey,
        identity: I,
        payload: &[u8],
    ) -> Result<Vec<u8>>
    where
        M: Mapper<I, <BonehBoyenGoh as Hibe>::Identity>,
    {
        let (key, header) = self.encapsulate(rng, public_key, identity)?;
        let mut body = Vec::from(payload);
        let mut cipher = AesCtr::new(&key.into(), &IV.into());
        cipher.apply_keystream(&mut body);
        Ok(Envelope { header, body }.bytes())
    }

    /// Decrypt the given ciphertext.
    ///
    /// Returns the payload. There is no integrity protection: decrypting with the key of another
    /// identity returns garbage instead of an error.
    ///
    /// Parameters:
    ///
    /// * `key` - The private key of the receiving identity.
    /// * `ciphertext` - The ciphertext, as previously returned by [`HybridKem::encrypt`].
    pub fn decrypt(&self, key: &PrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let Envelope { header, mut body } = Envelope::from_bytes(ciphertext)?;
        let key = self.decapsulate(key, &header);
        let mut cipher = AesCtr::new(&key.into(), &IV.into());
        cipher.apply_keystream(&mut body);
        Ok(body)
    }
}

#[derive(Default)]
struct Sha3Hasher(Sha3_256);

impl Sha3Hasher {
    fn hash_to_scalar(self) -> Scalar {
        let mut bytes = [0; 48];
        bytes[..32].copy_from_slice(&self.0.finalize());
        Scalar::from_okm(&bytes)
    }

    fn hash<H: Hash>(element: &H) -> Scalar {
        let mut hasher = Sha3Hasher::default();
        element.hash(&mut hasher);
        hasher.hash_to_scalar()
    }
}

impl Hasher for Sha3Hasher {
    fn finish(&self) -> u64 {
        let digest = self.0.clone().finalize();
        let mut prefix = [0; 8];
        prefix.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(prefix)
    }

    fn write(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }
}

/// A [`Mapper`] that works for all types implementing [`std::hash::Hash`].
///
/// This mapper uses the hash implementation to hash objects to [`Scalar`]s, the underlying
/// identity element for [`HybridKem`]. Internally, a SHA3-256 instance is used to provide
/// consistent hashing and collision resistance.
///
/// In order to provide a hierarchy, the mapper does not accept single elements, but rather
/// iterators over elements. The more elements the iterator produces, the deeper down the hierarchy
/// we go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HashMapper;

impl HashMapper {
    /// Create a new [`HashMapper`].
    pub fn new() -> HashMapper {
        HashMapper
    }
}

impl<I, F> Mapper<I, Scalar> for HashMapper
where
    I: IntoIterator<Item = F>,
    F: Hash,
{
    fn map_identity(&self, input: I) -> Result<Vec<Scalar>> {
        Ok(input
            .into_iter()
            .map(|element| Sha3Hasher::hash(&element))
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ALICE: &[&str] = &["org", "research", "alice"];

    #[test]
    fn test_encrypt_decrypt() {
        let mut rng = rand::thread_rng();
        let kem = HybridKem::new(5);
        let (public_key, master_key) = kem.setup(&mut rng).unwrap();

        let identity = &[1, 2, 3] as &[_];
        let secret_key = kem
            .generate_key(&mut rng, &public_key, &master_key, identity)
            .unwrap();
        let message = b"Hello, world!";
        let ciphertext = kem
            .encrypt(&mut rng, &public_key, identity, message)
            .unwrap();
        let decryption = kem.decrypt(&secret_key, &ciphertext).unwrap();
        assert_eq!(message.as_slice(), decryption.as_slice());
    }

    #[test]
    fn test_delegated_decrypt() {
        let mut rng = rand::thread_rng();
        let kem = HybridKem::new(3);
        let (public_key, master_key) = kem.setup(&mut rng).unwrap();

        let org_key = kem
            .extract(&mut rng, &public_key, Ancestor::Master(&master_key), &ALICE[..1])
            .unwrap();
        let research_key = kem
            .extract(&mut rng, &public_key, Ancestor::Parent(&org_key), &ALICE[..2])
            .unwrap();
        let alice_key = kem
            .extract(&mut rng, &public_key, Ancestor::Parent(&research_key), ALICE)
            .unwrap();
        assert_eq!(org_key.depth_left(), 2);
        assert_eq!(alice_key.depth_left(), 0);

        let message = b"quarterly numbers";
        let ciphertext = kem.encrypt(&mut rng, &public_key, ALICE, message).unwrap();
        let decryption = kem.decrypt(&alice_key, &ciphertext).unwrap();
        assert_eq!(message.as_slice(), decryption.as_slice());

        let decryption = kem.decrypt(&research_key, &ciphertext).unwrap();
        assert_ne!(message.as_slice(), decryption.as_slice());
    }

    #[test]
    fn test_encapsulate_decapsulate() {
        let mut rng = rand::thread_rng();
        let kem = HybridKem::new(2);
        let (public_key, master_key) = kem.setup(&mut rng).unwrap();
        let secret_key = kem
            .generate_key(&mut rng, &public_key, &master_key, &ALICE[..2])
            .unwrap();
        let (key, encapsulation) = kem
            .encapsulate(&mut rng, &public_key, &ALICE[..2])
            .unwrap();
        assert_eq!(key, kem.decapsulate(&secret_key, &encapsulation));
    }

    #[test]
    fn test_setup_from_seed() {
        let kem = HybridKem::new(3);
        let (public_a, master_a) = kem.setup_from_seed(b"seed").unwrap();
        let (public_b, master_b) = kem.setup_from_seed(b"seed").unwrap();
        let (public_c, _) = kem.setup_from_seed(b"other seed").unwrap();
        assert_eq!(public_a, public_b);
        assert_eq!(master_a, master_b);
        assert_ne!(public_a, public_c);
        assert_eq!(public_a.maximum_depth(), 3);
    }

    #[test]
    fn test_envelope_split() {
        let mut rng = rand::thread_rng();
        let kem = HybridKem::new(2);
        let (public_key, master_key) = kem.setup(&mut rng).unwrap();
        let secret_key = kem
            .generate_key(&mut rng, &public_key, &master_key, &ALICE[..1])
            .unwrap();
        let message = b"split me";
        let ciphertext = kem
            .encrypt(&mut rng, &public_key, &ALICE[..1], message)
            .unwrap();

        let envelope = Envelope::from_bytes(&ciphertext).unwrap();
        assert_eq!(envelope.body.len(), message.len());
        let rejoined = Envelope {
            header: envelope.header.clone(),
            body: envelope.body.clone(),
        };
        assert_eq!(rejoined.bytes(), ciphertext);
        let decryption = kem.decrypt(&secret_key, &rejoined.bytes()).unwrap();
        assert_eq!(message.as_slice(), decryption.as_slice());
    }

    #[test]
    fn test_malformed_ciphertext() {
        let mut rng = rand::thread_rng();
        let kem = HybridKem::new(2);
        let (public_key, master_key) = kem.setup(&mut rng).unwrap();
        let secret_key = kem
            .generate_key(&mut rng, &public_key, &master_key, &ALICE[..1])
            .unwrap();
        let result = kem.decrypt(&secret_key, &[1, 2, 3]);
        assert!(matches!(result, Err(Error::MalformedCiphertext)));
    }

    #[test]
    fn test_depth_errors() {
        let mut rng = rand::thread_rng();
        let kem = HybridKem::new(2);
        let (public_key, master_key) = kem.setup(&mut rng).unwrap();
        let result = kem.generate_key(&mut rng, &public_key, &master_key, ALICE);
        assert!(matches!(result, Err(Error::DepthExceeded { .. })));
        let result = kem.encrypt(&mut rng, &public_key, ALICE, b"too deep");
        assert!(matches!(result, Err(Error::DepthExceeded { .. })));

        let root_key = kem
            .generate_key(&mut rng, &public_key, &master_key, &[] as &[&str])
            .unwrap();
        let result = kem.derive_key(&mut rng, &public_key, &root_key, &ALICE[..2]);
        assert!(matches!(result, Err(Error::StructuralMismatch { .. })));
    }

    #[test]
    fn test_custom_mapper() {
        let mut rng = rand::thread_rng();
        let mapper =
            |path: &[u64]| -> Result<Vec<Scalar>> { Ok(path.iter().map(|&e| Scalar::from(e)).collect()) };
        let kem = HybridKem::new_with_mapper(2, mapper);
        let (public_key, master_key) = kem.setup(&mut rng).unwrap();
        let secret_key = kem
            .generate_key(&mut rng, &public_key, &master_key, &[3, 7][..])
            .unwrap();
        let ciphertext = kem
            .encrypt(&mut rng, &public_key, &[3, 7][..], b"mapped")
            .unwrap();
        assert_eq!(kem.decrypt(&secret_key, &ciphertext).unwrap(), b"mapped");
    }

    #[test]
    fn test_serialized_keys() {
        let mut rng = rand::thread_rng();
        let kem = HybridKem::new(2);
        let (public_key, master_key) = kem.setup(&mut rng).unwrap();
        let secret_key = kem
            .generate_key(&mut rng, &public_key, &master_key, &ALICE[..2])
            .unwrap();

        let public_key: PublicKey = bincode::deserialize(&public_key.bytes()).unwrap();
        let secret_key: PrivateKey = bincode::deserialize(&secret_key.bytes()).unwrap();
        let ciphertext = kem
            .encrypt(&mut rng, &public_key, &ALICE[..2], b"stored")
            .unwrap();
        assert_eq!(kem.decrypt(&secret_key, &ciphertext).unwrap(), b"stored");
    }

    #[test]
    fn test_master_key_persistence() {
        let mut rng = rand::thread_rng();
        let kem = HybridKem::new(2);
        let (public_key, master_key) = kem.setup(&mut rng).unwrap();
        let restored: MasterKey = bincode::deserialize(&master_key.bytes()).unwrap();
        assert_eq!(master_key, restored);

        let secret_key = kem
            .generate_key(&mut rng, &public_key, &restored, &ALICE[..1])
            .unwrap();
        let ciphertext = kem
            .encrypt(&mut rng, &public_key, &ALICE[..1], b"reissued")
            .unwrap();
        assert_eq!(kem.decrypt(&secret_key, &ciphertext).unwrap(), b"reissued");
    }

    #[test]
    fn test_debug_shows_fingerprint() {
        let kem = HybridKem::new(1);
        let (_, master_key) = kem.setup_from_seed(b"debug").unwrap();
        let output = format!("{master_key:?}");
        assert_eq!(output, format!("MasterKey({:?})", master_key.fingerprint()));
        assert_eq!(master_key.fingerprint().len(), 32);
    }
}
