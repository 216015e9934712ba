use std::collections::BTreeMap;

use alloy_primitives::U256;
use anyhow::{anyhow, Result};
use serde_json::json;
use starknet::core::{types::Felt, utils::cairo_short_string_to_felt};

use crate::typed_data::{TypedData, TypedField, DOMAIN_TYPE};
use crate::uint256::Uint256;

pub const UNWRAP_TYPE: &str = "Unwrap";
pub const U256_TYPE: &str = "u256";

/// Domain separation for the unwrap message: dapp name, version and chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainParams {
    pub name: String,
    pub version: String,
    pub chain_id: Felt,
}

impl DomainParams {
    /// `chain_id` is the network's short string, e.g. `SN_SEPOLIA` or `SN_MAIN`.
    pub fn new(name: impl Into<String>, version: impl Into<String>, chain_id: &str) -> Result<Self> {
        let chain_id = cairo_short_string_to_felt(chain_id)
            .map_err(|e| anyhow!("Invalid chain id short string {chain_id:?}: {e}"))?;
        Ok(Self {
            name: name.into(),
            version: version.into(),
            chain_id,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnwrapRequest {
    pub user_address: Felt,
    pub nft_contract_address: Felt,
    pub token_id: U256,
}

/// Build the `Unwrap` typed data for one token.
pub fn unwrap_typed_data(domain: &DomainParams, request: &UnwrapRequest) -> TypedData {
    let mut types = BTreeMap::new();
    types.insert(
        DOMAIN_TYPE.to_string(),
        vec![
            TypedField::new("name", "felt"),
            TypedField::new("version", "felt"),
            TypedField::new("chainId", "felt"),
        ],
    );
    types.insert(
        UNWRAP_TYPE.to_string(),
        vec![
            TypedField::new("user_address", "felt"),
            TypedField::new("nft_contract_address", "felt"),
            TypedField::new("token_id", U256_TYPE),
        ],
    );
    types.insert(
        U256_TYPE.to_string(),
        vec![
            TypedField::new("low", "felt"),
            TypedField::new("high", "felt"),
        ],
    );

    TypedData {
        types,
        primary_type: UNWRAP_TYPE.to_string(),
        domain: json!({
            "name": domain.name,
            "version": domain.version,
            "chainId": domain.chain_id.to_hex_string(),
        }),
        message: json!({
            "user_address": request.user_address.to_hex_string(),
            "nft_contract_address": request.nft_contract_address.to_hex_string(),
            "token_id": Uint256::from(request.token_id).to_json(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> DomainParams {
        DomainParams::new("NFTWrapper", "1", "SN_SEPOLIA").unwrap()
    }

    fn request(token_id: u64) -> UnwrapRequest {
        UnwrapRequest {
            user_address: Felt::from_hex("0x63616c6c65725f61646472657373").unwrap(),
            nft_contract_address: Felt::from_hex(
                "0x6e8522a2b09895f76bae60aee06349eb1acc4590760453ddb8d56e85c89ca76",
            )
            .unwrap(),
            token_id: U256::from(token_id),
        }
    }

    #[test]
    fn chain_id_is_encoded_as_short_string() {
        assert_eq!(
            domain().chain_id,
            Felt::from_hex("0x534e5f5345504f4c4941").unwrap()
        );
    }

    #[test]
    fn chain_id_longer_than_a_felt_errors() {
        let err = DomainParams::new("NFTWrapper", "1", &"X".repeat(32)).unwrap_err();
        assert!(format!("{err}").contains("Invalid chain id"));
    }

    #[test]
    fn message_carries_token_id_halves_and_addresses() {
        let typed = unwrap_typed_data(&domain(), &request(1));
        assert_eq!(typed.primary_type, UNWRAP_TYPE);
        assert_eq!(typed.message["token_id"]["low"], "0x1");
        assert_eq!(typed.message["token_id"]["high"], "0x0");
        assert_eq!(typed.message["user_address"], "0x63616c6c65725f61646472657373");
        assert_eq!(
            typed.message["nft_contract_address"],
            "0x6e8522a2b09895f76bae60aee06349eb1acc4590760453ddb8d56e85c89ca76"
        );
    }

    #[test]
    fn encodes_unwrap_type_with_u256_dependency() {
        let typed = unwrap_typed_data(&domain(), &request(1));
        assert_eq!(
            typed.encode_type(UNWRAP_TYPE).unwrap(),
            "Unwrap(user_address:felt,nft_contract_address:felt,token_id:u256)u256(low:felt,high:felt)"
        );
    }

    #[test]
    fn hash_depends_on_token_id() {
        let account = Felt::from(0x1234u64);
        let first = unwrap_typed_data(&domain(), &request(1));
        let third = unwrap_typed_data(&domain(), &request(3));
        assert_eq!(
            first.message_hash(account).unwrap(),
            unwrap_typed_data(&domain(), &request(1)).message_hash(account).unwrap()
        );
        assert_ne!(
            first.message_hash(account).unwrap(),
            third.message_hash(account).unwrap()
        );
    }

    #[test]
    fn serializes_to_wallet_json_shape() {
        let typed = unwrap_typed_data(&domain(), &request(3));
        let json = serde_json::to_string(&typed).unwrap();
        assert!(json.contains("\"primaryType\":\"Unwrap\""));
        assert_eq!(TypedData::from_json(&json).unwrap(), typed);
    }

    #[test]
    fn matches_the_demo_payload() {
        let demo = TypedData::from_json(include_str!("../../demos/unwrap_token_1.json")).unwrap();
        assert_eq!(unwrap_typed_data(&domain(), &request(1)), demo);
    }
}
