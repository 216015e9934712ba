use alloy_primitives::U256;
use serde_json::{json, Value};
use starknet::core::types::Felt;

/// A 256-bit unsigned integer split into the two 128-bit felts Cairo uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uint256 {
    pub low: Felt,
    pub high: Felt,
}

impl Uint256 {
    pub fn from_u256(value: U256) -> Self {
        let [l0, l1, l2, l3] = *value.as_limbs();
        let low = (u128::from(l1) << 64) | u128::from(l0);
        let high = (u128::from(l3) << 64) | u128::from(l2);
        Self {
            low: Felt::from(low),
            high: Felt::from(high),
        }
    }

    /// `{"low": "0x..", "high": "0x.."}`, the shape of the `u256` typed-data struct.
    pub fn to_json(&self) -> Value {
        json!({
            "low": self.low.to_hex_string(),
            "high": self.high.to_hex_string(),
        })
    }
}

impl From<U256> for Uint256 {
    fn from(value: U256) -> Self {
        Self::from_u256(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_values_live_in_low() {
        let value = Uint256::from(U256::from(3u64));
        assert_eq!(value.low, Felt::from(3u64));
        assert_eq!(value.high, Felt::ZERO);
    }

    #[test]
    fn splits_at_bit_128() {
        let value = Uint256::from((U256::from(5u64) << 128usize) + U256::from(u128::MAX));
        assert_eq!(value.low, Felt::from(u128::MAX));
        assert_eq!(value.high, Felt::from(5u64));
    }

    #[test]
    fn max_fills_both_halves() {
        let value = Uint256::from(U256::MAX);
        assert_eq!(value.low, Felt::from(u128::MAX));
        assert_eq!(value.high, Felt::from(u128::MAX));
    }

    #[test]
    fn json_uses_hex_halves() {
        let value = Uint256::from(U256::from(1u64));
        assert_eq!(value.to_json(), json!({ "low": "0x1", "high": "0x0" }));
    }
}
