use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The random source failed to produce a scalar")]
    Entropy(#[from] rand::Error),
    #[error("The supplied identity has depth {depth}, but the hierarchy supports at most {max_depth}")]
    DepthExceeded { depth: usize, max_depth: usize },
    #[error("The parent key can delegate {actual} more levels, but the child requires {expected}")]
    StructuralMismatch { expected: usize, actual: usize },
    #[error("The supplied identity had no elements")]
    EmptyIdentity,
    #[error("The supplied ciphertext was malformed")]
    MalformedCiphertext,
}

pub type Result<V, E=Error> = std::result::Result<V, E>;
