//! Outbound calls: upstream data fetchers, the generative model client and the
//! retry policy wrapping both.

pub mod fetcher;
pub mod generator;
pub mod mock;
pub mod retry;
pub mod sources;
