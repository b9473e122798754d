pub mod market_close;

pub use market_close::MarketClose;
