//! Analysis pipeline: prompt building, structured extraction, result merging,
//! and the contract-audit, token-risk and liquidity services built on them.

pub mod audit;
pub mod dataset;
pub mod extractor;
pub mod liquidity;
pub mod merger;
pub mod prompt;
pub mod registry;
pub mod risk;
pub mod services;
