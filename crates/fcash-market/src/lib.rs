//! # fcash Market
//!
//! Fixed-rate markets and cash groups for the fcash engine.
//!
//! This crate provides:
//!
//! - **Markets**: the logit bonding curve pricing fCash against asset cash,
//!   with fees, reserve shares and rate bounds ([`Market`])
//! - **Inversion**: fCash required for a target cash amount
//! - **Cash Groups**: oracle rates for any maturity, present values with
//!   haircuts and buffers, liquidity token and yield token valuation
//!   ([`CashGroup`])
//! - **State Sources**: the [`MarketStateSource`] trait decoupling valuation
//!   from where market state is read
//!
//! ## Design Philosophy
//!
//! - **Pure Valuation**: every operation takes the valuation time explicitly
//! - **Detached Simulation**: simulated markets and cash groups are new values;
//!   the source state is never mutated
//! - **Curve Anchoring**: the curve is re-anchored on every quote so it passes
//!   through the last implied rate
//!
//! ## Example
//!
//! ```rust
//! use fcash_market::prelude::*;
//!
//! let t = reference_time(1_700_000_000) + 10 * SECONDS_IN_DAY;
//! let mut source = StaticMarketSource::new();
//! for index in 1..=3 {
//!     source.insert_market(2, MarketSnapshot {
//!         maturity: market_maturity(t, index).unwrap(),
//!         total_fcash: 1_000_000 * INTERNAL_TOKEN_PRECISION,
//!         total_asset_cash: 50_000_000 * INTERNAL_TOKEN_PRECISION,
//!         total_liquidity: 50_000_000 * INTERNAL_TOKEN_PRECISION,
//!         last_implied_rate: 50_000_000,
//!         oracle_rate: 50_000_000,
//!         previous_trade_time: t - 3_600,
//!     });
//! }
//!
//! let mut config = SystemConfig::sample();
//! config.cash_groups.retain(|g| g.currency_id == 2);
//! let system = System::from_config(&config, &source, t).unwrap();
//!
//! let dai = system.cash_group(2).unwrap();
//! let maturity = dai.market(3).unwrap().maturity();
//! let notional = TypedAmount::from_raw(100 * INTERNAL_TOKEN_PRECISION, BalanceKind::InternalUnderlying, "DAI");
//! let pv = dai.present_value(maturity, &notional, false, t).unwrap();
//! assert!(pv.value() < notional.value());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::similar_names)]
#![allow(clippy::return_self_not_must_use)]

pub mod cash_group;
pub mod error;
pub mod market;
pub mod source;
pub mod system;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::cash_group::{discount_factor, CashGroup, LiquidityTokenValue};
    pub use crate::error::{MarketError, MarketResult};
    pub use crate::market::{
        LiquidityAdded, Market, MarketParameters, SlippageQuote, TradeQuote,
    };
    pub use crate::source::{
        MarketSnapshot, MarketStateSource, StaticMarketSource, YieldTokenState,
    };
    pub use crate::system::System;

    pub use fcash_core::prelude::*;
    pub use fcash_core::time::{format_maturity, market_maturity, reference_time};
}

// Re-export commonly used types at crate root
pub use cash_group::{CashGroup, LiquidityTokenValue};
pub use error::{MarketError, MarketResult};
pub use market::{Market, MarketParameters, TradeQuote};
pub use source::{MarketSnapshot, MarketStateSource, StaticMarketSource, YieldTokenState};
pub use system::System;
