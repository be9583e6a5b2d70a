//! GraphQL documents

/// Morpho: assets on a chain matching a symbol
pub const GET_CHAIN_ASSET: &str = r#"
    query GetChainAsset($chainId: Int!, $assetSymbol: String!) {
        assets(where: { chainId_in: [$chainId], symbol_in: [$assetSymbol] }) {
            items {
                address
                decimals
                name
                symbol
                logoURI
                totalSupply
                priceUsd
                oraclePriceUsd
                spotPriceEth
            }
        }
    }
"#;

/// Morpho: assets on a chain matching an address
pub const GET_CHAIN_ASSET_BY_ADDRESS: &str = r#"
    query GetChainAssetByAddress($chainId: Int!, $assetAddress: String!) {
        assets(where: { chainId_in: [$chainId], address_in: [$assetAddress] }) {
            items {
                address
                decimals
                name
                symbol
                logoURI
                totalSupply
                priceUsd
                oraclePriceUsd
                spotPriceEth
            }
        }
    }
"#;

/// Morpho: one page of vaults for an underlying asset
pub const LIST_CHAIN_ASSET_VAULTS: &str = r#"
    query ListChainAssetVaults($skip: Int!, $chainId: Int!, $assetAddress: String!) {
        vaults(
            first: 1000
            skip: $skip
            where: { chainId_in: [$chainId], assetAddress_in: [$assetAddress] }
        ) {
            items {
                name
                address
                symbol
                creationTimestamp
                state {
                    totalAssets
                    totalAssetsUsd
                    fee
                    netApyWithoutRewards
                    netApy
                    rewards {
                        supplyApr
                        asset {
                            address
                            decimals
                            name
                            symbol
                            logoURI
                            totalSupply
                            priceUsd
                            oraclePriceUsd
                            spotPriceEth
                        }
                    }
                }
                warnings {
                    type
                    level
                }
            }
            pageInfo {
                countTotal
                count
                limit
                skip
            }
        }
    }
"#;

/// Uniswap V3 style subgraph: token by lowercased address
pub const GET_TOKEN: &str = r#"
    query GetToken($tokenAddress: String!) {
        tokens(where: { id: $tokenAddress }) {
            id
            name
            symbol
            decimals
            totalSupply
            volume
            volumeUSD
            untrackedVolumeUSD
            feesUSD
            txCount
            poolCount
            totalValueLocked
            totalValueLockedUSD
            derivedETH
        }
    }
"#;
