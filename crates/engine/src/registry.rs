//! Well-known token names and symbols mapped to their Ethereum contracts.

use assure_common::error::AppError;
use assure_common::types::{Chain, ChainAddress};

const KNOWN_TOKENS: &[(&str, &str)] = &[
    ("uniswap", "0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984"),
    ("uni", "0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984"),
    ("chainlink", "0x514910771AF9Ca656af840dff83E8264EcF986CA"),
    ("link", "0x514910771AF9Ca656af840dff83E8264EcF986CA"),
    ("aave", "0x7Fc66500c84A76Ad7e9c93437bFc5Ac33E2DDaE9"),
    ("compound", "0xc00e94Cb662C3520282E6f5717214004A7f26888"),
    ("dai", "0x6B175474E89094C44Da98b954EedeAC495271d0F"),
    ("tether", "0xdAC17F958D2ee523a2206206994597C13D831ec7"),
    ("usdt", "0xdAC17F958D2ee523a2206206994597C13D831ec7"),
    ("usdc", "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
    ("shiba", "0x95aD61b0a150d79219dCF64E1E6Cc01f0B64C4cE"),
    ("maker", "0x9f8F72aA9304c8B593d555F12eF6589cC3A579A2"),
    ("polygon", "0x7D1AfA7B718fb893dB30A3aBc0Cfc608AaCfeBB0"),
    ("matic", "0x7D1AfA7B718fb893dB30A3aBc0Cfc608AaCfeBB0"),
    ("sushiswap", "0x6B3595068778DD592e39A122f4f5a5cF09C90fE2"),
    ("sushi", "0x6B3595068778DD592e39A122f4f5a5cF09C90fE2"),
    ("pancake", "0x0E09FaBB73Bd3Ade0a17ECC321fD13a19e81cE82"),
    ("cake", "0x0E09FaBB73Bd3Ade0a17ECC321fD13a19e81cE82"),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct TokenRegistry;

impl TokenRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a token name or symbol (case-insensitive) to its contract.
    pub fn resolve(&self, token_name: &str) -> Result<ChainAddress, AppError> {
        let normalized = token_name.trim().to_ascii_lowercase();
        let address = KNOWN_TOKENS
            .iter()
            .find(|(name, _)| *name == normalized)
            .map(|(_, address)| *address)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "Could not find contract address for token: {}",
                    token_name.trim()
                ))
            })?;

        tracing::debug!(token = %normalized, address, "Resolved token to contract");
        ChainAddress::parse(Chain::Ethereum, address)
    }

    pub fn known_names(&self) -> impl Iterator<Item = &'static str> {
        KNOWN_TOKENS.iter().map(|(name, _)| *name)
    }
}
