//! Market data fetchers
//!
//! One module per upstream; `snapshot` joins them into one pass.

pub mod coingecko;
pub mod defillama;
pub mod ethereum;
pub mod stats;
mod snapshot;
mod source;
mod types;

pub use snapshot::{gather, MarketSnapshot, ProjectTvlSources, ReferenceTvlMode, ReferenceTvlSources, TokenSlot};
pub use source::{build_http_client, LiveMarket, MarketEndpoints, MarketSource};
pub use types::{FetchStatus, ReferenceToken, Slot, TokenSnapshot};

#[cfg(test)]
pub(crate) use snapshot::tests::FakeMarket;
