use std::fmt;

use anyhow::{anyhow, Result};
use starknet::core::{crypto::Signature, types::Felt};
use starknet::signers::{SigningKey, VerifyingKey};

use crate::typed_data::TypedData;

/// An account able to sign message hashes with its Stark key.
pub trait Signer {
    /// Address of the account contract the signatures are meant for.
    fn address(&self) -> Felt;

    fn public_key(&self) -> Felt;

    fn sign_hash(&self, hash: &Felt) -> Result<Signature>;

    /// Sign the SNIP-12 message hash of `typed_data`, bound to this signer's address.
    fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Signature> {
        let hash = typed_data.message_hash(self.address())?;
        self.sign_hash(&hash)
    }
}

/// Signer holding a Stark private key in process.
pub struct StarkKeySigner {
    address: Felt,
    key: SigningKey,
}

impl StarkKeySigner {
    pub fn new(address: Felt, private_key: Felt) -> Self {
        Self {
            address,
            key: SigningKey::from_secret_scalar(private_key),
        }
    }

    /// A signer over a freshly generated key. Without an address the public key stands in.
    pub fn random(address: Option<Felt>) -> Self {
        let key = SigningKey::from_random();
        let address = address.unwrap_or_else(|| key.verifying_key().scalar());
        Self { address, key }
    }
}

impl fmt::Debug for StarkKeySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StarkKeySigner")
            .field("address", &format_args!("{:#x}", self.address))
            .field("key", &"***REDACTED***")
            .finish()
    }
}

impl Signer for StarkKeySigner {
    fn address(&self) -> Felt {
        self.address
    }

    fn public_key(&self) -> Felt {
        self.key.verifying_key().scalar()
    }

    fn sign_hash(&self, hash: &Felt) -> Result<Signature> {
        self.key
            .sign(hash)
            .map_err(|e| anyhow!("signing {:#x} failed: {e}", hash))
    }
}

/// Check a Stark ECDSA signature over `hash` against a public key, off-chain.
/// Returns `Ok(false)` for a well-formed signature that does not match.
pub fn verify_signature(public_key: Felt, hash: &Felt, signature: &Signature) -> Result<bool> {
    VerifyingKey::from_scalar(public_key)
        .verify(hash, signature)
        .map_err(|e| anyhow!("verification failed: {e}"))
}
