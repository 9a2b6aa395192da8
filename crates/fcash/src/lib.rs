//! # fcash
//!
//! Off-chain pricing and risk engine for a fixed-rate lending protocol.
//!
//! This crate re-exports the public API of the workspace:
//!
//! - [`math`]: wide integer arithmetic, fixed-point `exp`/`ln`, searches
//! - [`types`]: unit-safe amounts, currencies, time and configuration
//! - [`market`]: markets, cash groups and the loaded [`System`]
//! - [`risk`]: free collateral, borrow requirements and liquidation rates
//!
//! ## Example
//!
//! ```rust
//! use fcash::prelude::*;
//!
//! let t = reference_time(1_700_000_000) + 10 * SECONDS_IN_DAY;
//! let mut source = StaticMarketSource::new();
//! for currency_id in 1..=3 {
//!     for index in 1..=3 {
//!         source.insert_market(currency_id, MarketSnapshot {
//!             maturity: market_maturity(t, index).unwrap(),
//!             total_fcash: 1_000_000 * INTERNAL_TOKEN_PRECISION,
//!             total_asset_cash: 50_000_000 * INTERNAL_TOKEN_PRECISION,
//!             total_liquidity: 50_000_000 * INTERNAL_TOKEN_PRECISION,
//!             last_implied_rate: 50_000_000,
//!             oracle_rate: 50_000_000,
//!             previous_trade_time: t - 3_600,
//!         });
//!     }
//! }
//! let system = System::from_config(&SystemConfig::sample(), &source, t).unwrap();
//!
//! let debt = TypedAmount::from_raw(-100 * INTERNAL_TOKEN_PRECISION, BalanceKind::InternalUnderlying, "DAI");
//! let account = Account::new()
//!     .with_asset(PortfolioAsset::fcash(2, market_maturity(t, 2).unwrap(), debt));
//!
//! let fc = evaluate(&system, &account, t, &[]).unwrap();
//! assert!(fc.free_collateral().is_negative());
//! assert_eq!(fc.collateral_ratio(), Some(0));
//! ```

#![warn(missing_docs)]

pub use fcash_core as types;
pub use fcash_market as market;
pub use fcash_math as math;
pub use fcash_risk as risk;

pub use fcash_core::{BalanceKind, CurrencyRegistry, TypedAmount};
pub use fcash_market::{CashGroup, Market, System};
pub use fcash_risk::{Account, FreeCollateral, LiquidationRates};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use fcash_market::prelude::*;
    pub use fcash_risk::prelude::*;
}
