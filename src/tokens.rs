//! Well-known token addresses
//!
//! Addresses the ranking pipeline needs to know about ahead of any upstream
//! query: the canonical base asset per chain and the token that pays the
//! protocol-level vault reward.

use alloy::primitives::{address, Address};

/// Chain ID constants
pub mod chains {
    pub const ETHEREUM: u64 = 1;
    pub const ARBITRUM: u64 = 42161;
    pub const OPTIMISM: u64 = 10;
    pub const BASE: u64 = 8453;
}

/// Well-known token addresses per chain
pub mod addresses {
    use super::*;

    // === Ethereum Mainnet ===
    pub const MORPHO_ETH: Address = address!("58d97b57bb95320f9a05dc918aef65434969c2b2");

    // === Base ===
    pub const USDC_BASE: Address = address!("833589fcd6edb6e08f4c7c32d4f71b54bda02913");
    pub const MORPHO_BASE: Address = address!("baa5cc21fd487b8fcc2f632f3f4e8d37262a0842");
}

/// Token that pays the protocol-level reward on Morpho vaults
pub fn protocol_reward_asset(chain_id: u64) -> Option<Address> {
    match chain_id {
        chains::ETHEREUM => Some(addresses::MORPHO_ETH),
        chains::BASE => Some(addresses::MORPHO_BASE),
        _ => None,
    }
}

/// Lowercase `0x`-prefixed hex form used for subgraph IDs and cache keys
pub fn lower_hex(address: &Address) -> String {
    address.to_string().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_reward_asset() {
        assert_eq!(
            protocol_reward_asset(chains::BASE),
            Some(addresses::MORPHO_BASE)
        );
        assert_eq!(protocol_reward_asset(chains::ARBITRUM), None);
    }

    #[test]
    fn test_lower_hex() {
        assert_eq!(
            lower_hex(&addresses::MORPHO_BASE),
            "0xbaa5cc21fd487b8fcc2f632f3f4e8d37262a0842"
        );
    }

    #[test]
    fn test_address_parse_is_case_insensitive() {
        let mixed: Address = "0xBAa5CC21fd487B8Fcc2F632f3F4E8D37262a0842".parse().unwrap();
        let lower: Address = "0xbaa5cc21fd487b8fcc2f632f3f4e8d37262a0842".parse().unwrap();
        assert_eq!(mixed, lower);
        assert_eq!(mixed, addresses::MORPHO_BASE);
    }
}
