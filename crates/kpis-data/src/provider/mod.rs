//! 외부 데이터 소스 Provider.

pub mod gainers;
pub mod listing;
pub mod quote;

pub use gainers::{GainerRow, GainersClient};
pub use listing::{filter_etfs, sample_listings, EtfListing, ListingClient, ListingRow};
pub use quote::{EtfQuote, QuoteClient};
