//! Price Store Adapters
//!
//! In-process implementations of the `PriceStore` port.

mod embedded;

pub use embedded::EmbeddedPriceStore;
