//! # fcash Core
//!
//! Core types and abstractions for the fcash fixed-rate lending engine.
//!
//! This crate provides the foundational building blocks used by the market
//! and risk crates:
//!
//! - **Amounts**: [`TypedAmount`], a signed integer tagged with a
//!   [`BalanceKind`] and a currency symbol; arithmetic across tags fails
//! - **Currencies**: the [`CurrencyRegistry`] read-only context holding
//!   decimals, asset rates and ETH exchange rates
//! - **Time**: quarter-relative market maturities
//! - **Configuration**: serde configuration with validation
//!
//! ## Design Philosophy
//!
//! - **Unit Safety**: every binary operation checks kind and denomination
//! - **Explicit Context**: conversions take the registry as an argument; there
//!   is no global system state
//! - **Integer Semantics**: all values are integers, every division truncates
//!   toward zero
//!
//! ## Example
//!
//! ```rust
//! use fcash_core::prelude::*;
//!
//! let registry = CurrencyRegistry::from_config(&SystemConfig::sample()).unwrap();
//!
//! let deposit = TypedAmount::parse("100.5", BalanceKind::InternalUnderlying, "DAI", &registry).unwrap();
//! let fee = TypedAmount::parse("0.5", BalanceKind::InternalUnderlying, "DAI", &registry).unwrap();
//! assert_eq!(deposit.sub(&fee).unwrap().value(), 100 * INTERNAL_TOKEN_PRECISION);
//!
//! let cash = TypedAmount::parse("1", BalanceKind::InternalAsset, "cDAI", &registry).unwrap();
//! assert!(deposit.add(&cash).is_err());
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
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::return_self_not_must_use)]

pub mod amount;
pub mod config;
pub mod constants;
pub mod currency;
pub mod error;
pub mod kind;
pub mod time;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::amount::TypedAmount;
    pub use crate::config::{
        CashGroupConfig, CurrencyConfig, SystemConfig, Validate, ValidationError,
    };
    pub use crate::constants::*;
    pub use crate::currency::{AssetRate, Currency, CurrencyId, CurrencyRegistry, EthRate};
    pub use crate::error::{CoreError, CoreResult};
    pub use crate::kind::BalanceKind;
    pub use crate::time::Timestamp;
}

// Re-export commonly used types at crate root
pub use amount::TypedAmount;
pub use currency::{AssetRate, Currency, CurrencyId, CurrencyRegistry, EthRate};
pub use error::{CoreError, CoreResult};
pub use kind::BalanceKind;
pub use time::Timestamp;
