use std::{fmt, sync::OnceLock};

use super::{element, Hibe, HibeCrypt, HibeKem};
use crate::error::{Error, Result};

use bls12_381_plus::{pairing, G1Affine, G2Affine, Gt, Scalar};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// The public parameters of a [`BonehBoyenGoh`] hierarchy.
///
/// `g` and `g1 = g * alpha` live in G2, while `g2`, `g3` and the level elements `h_1 .. h_l` live
/// in G1. The number of level elements is the maximum depth of the hierarchy.
///
/// The pairing `e(g2, g1)`, which every encryption needs, is computed once and then kept. It is
/// held in a [`OnceLock`], so sharing the parameters between threads is fine even before
/// [`PublicParams::precache`] has been called. The cached value is neither serialized nor part of
/// the equality.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PublicParams {
    g: G2Affine,
    g1: G2Affine,
    g2: G1Affine,
    g3: G1Affine,
    hs: Vec<G1Affine>,
    #[serde(skip)]
    pairing: OnceLock<Gt>,
}

impl PublicParams {
    /// Returns the maximum depth of the hierarchy, as given at setup.
    pub fn maximum_depth(&self) -> usize {
        self.hs.len()
    }

    /// Computes and caches `e(g2, g1)`, returning it.
    ///
    /// Calling this more than once is cheap and always returns the same value. Encryption calls
    /// this on demand, so calling it upfront only moves the cost of the pairing.
    pub fn precache(&self) -> Gt {
        *self.pairing.get_or_init(|| pairing(&self.g2, &self.g1))
    }

    /// Returns whether the pairing `e(g2, g1)` has already been computed.
    pub fn is_precached(&self) -> bool {
        self.pairing.get().is_some()
    }

    fn check_depth(&self, identity: &[Scalar]) -> Result<()> {
        let max_depth = self.maximum_depth();
        if identity.len() > max_depth {
            return Err(Error::DepthExceeded {
                depth: identity.len(),
                max_depth,
            });
        }
        Ok(())
    }
}

impl PartialEq for PublicParams {
    fn eq(&self, other: &Self) -> bool {
        self.g == other.g
            && self.g1 == other.g1
            && self.g2 == other.g2
            && self.g3 == other.g3
            && self.hs == other.hs
    }
}

impl Eq for PublicParams {}

/// The master key `g2 * alpha`.
pub type MasterKey = G1Affine;

/// The private key of an identity at depth `k`.
///
/// Besides the two components needed for decryption, the key carries one delegation element for
/// each level below it, so [`PrivateKey::depth_left`] is `l - k`.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PrivateKey {
    a0: G1Affine,
    a1: G2Affine,
    b: Vec<G1Affine>,
}

impl PrivateKey {
    /// Returns how many more levels this key can derive keys for.
    pub fn depth_left(&self) -> usize {
        self.b.len()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("depth_left", &self.depth_left())
            .finish_non_exhaustive()
    }
}

/// An encrypted [`Gt`] message.
///
/// `a` is the masked message, `b = g * s` and `c` is the identity product times `s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ciphertext {
    pub a: Gt,
    pub b: G2Affine,
    pub c: G1Affine,
}

/// The HIBE of Boneh, Boyen and Goh with constant size ciphertexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BonehBoyenGoh {
    max_depth: usize,
}

impl BonehBoyenGoh {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// The depth used for [`Hibe::setup`].
    ///
    /// All other operations take the depth from the [`PublicParams`] they are given.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl Hibe for BonehBoyenGoh {
    type PrivateKey = PrivateKey;
    type MasterKey = MasterKey;
    type PublicKey = PublicParams;
    type Identity = Scalar;

    fn setup<R: Rng>(&self, mut rng: R) -> Result<(Self::PublicKey, Self::MasterKey)> {
        let g = element::random_g2(&mut rng)?;
        let alpha = element::random_scalar(&mut rng)?;
        let g1 = g * alpha;
        let g2 = element::random_g1(&mut rng)?;
        let g3 = element::random_g1(&mut rng)?;
        let hs: Vec<G1Affine> = (0..self.max_depth())
            .map(|_| element::random_g1(&mut rng).map(Into::into))
            .collect::<Result<_>>()?;
        Ok((
            PublicParams {
                g: g.into(),
                g1: g1.into(),
                g2: g2.into(),
                g3: g3.into(),
                hs,
                pairing: OnceLock::new(),
            },
            (g2 * alpha).into(),
        ))
    }

    fn generate_key<R: Rng>(
        &self,
        rng: R,
        public_key: &Self::PublicKey,
        master_key: &Self::MasterKey,
        identity: &[Self::Identity],
    ) -> Result<Self::PrivateKey> {
        public_key.check_depth(identity)?;

        let r = element::random_scalar(rng)?;
        let product = element::identity_product(&public_key.g3, &public_key.hs, identity) * r;
        Ok(PrivateKey {
            a0: (master_key + product).into(),
            a1: (public_key.g * r).into(),
            b: public_key.hs[identity.len()..]
                .iter()
                .map(|h| (h * r).into())
                .collect(),
        })
    }

    fn derive_key<R: Rng>(
        &self,
        rng: R,
        public_key: &Self::PublicKey,
        parent_key: &Self::PrivateKey,
        identity: &[Self::Identity],
    ) -> Result<Self::PrivateKey> {
        public_key.check_depth(identity)?;
        let Some(child) = identity.last() else {
            return Err(Error::EmptyIdentity);
        };
        let expected = public_key.maximum_depth() - identity.len() + 1;
        if parent_key.depth_left() != expected {
            return Err(Error::StructuralMismatch {
                expected,
                actual: parent_key.depth_left(),
            });
        }

        let t = element::random_scalar(rng)?;
        let product = element::identity_product(&public_key.g3, &public_key.hs, identity) * t;
        Ok(PrivateKey {
            a0: (parent_key.a0 + parent_key.b[0] * child + product).into(),
            a1: (parent_key.a1 + public_key.g * t).into(),
            b: parent_key.b[1..]
                .iter()
                .zip(public_key.hs[identity.len()..].iter())
                .map(|(b, h)| b + h * t)
                .map(Into::into)
                .collect(),
        })
    }
}

impl HibeCrypt for BonehBoyenGoh {
    type Message = Gt;

    type Ciphertext = Ciphertext;

    fn encrypt<R: Rng>(
        &self,
        rng: R,
        public_key: &Self::PublicKey,
        identity: &[Self::Identity],
        message: &Self::Message,
    ) -> Result<Self::Ciphertext> {
        public_key.check_depth(identity)?;

        let s = element::random_scalar(rng)?;
        Ok(Ciphertext {
            a: public_key.precache() * s + message,
            b: (public_key.g * s).into(),
            c: (element::identity_product(&public_key.g3, &public_key.hs, identity) * s).into(),
        })
    }

    fn decrypt(&self, key: &Self::PrivateKey, ciphertext: &Self::Ciphertext) -> Self::Message {
        ciphertext.a + pairing(&ciphertext.c, &key.a1) - pairing(&key.a0, &ciphertext.b)
    }
}

impl HibeKem for BonehBoyenGoh {
    type Key = Gt;

    type EncapsulatedKey = (G2Affine, G1Affine);

    fn encapsulate<R: Rng>(
        &self,
        rng: R,
        public_key: &Self::PublicKey,
        identity: &[Self::Identity],
    ) -> Result<(Self::Key, Self::EncapsulatedKey)> {
        public_key.check_depth(identity)?;

        let s = element::random_scalar(rng)?;
        Ok((
            public_key.precache() * s,
            (
                (public_key.g * s).into(),
                (element::identity_product(&public_key.g3, &public_key.hs, identity) * s).into(),
            ),
        ))
    }

    fn decapsulate(&self, key: &Self::PrivateKey, encapsulation: &Self::EncapsulatedKey) -> Self::Key {
        let (b, c) = encapsulation;
        pairing(&key.a0, b) - pairing(c, &key.a1)
    }
}
