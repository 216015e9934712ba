pub mod signing;
pub mod typed_data;
pub mod uint256;
pub mod unwrap;

pub use signing::{verify_signature, Signer, StarkKeySigner};
pub use typed_data::{TypedData, TypedDataError, TypedField};
pub use uint256::Uint256;
pub use unwrap::{unwrap_typed_data, DomainParams, UnwrapRequest};
