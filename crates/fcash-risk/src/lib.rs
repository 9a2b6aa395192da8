//! # fcash Risk
//!
//! Account solvency and interest rate risk for the fcash engine.
//!
//! This crate provides:
//!
//! - **Portfolios**: [`Account`] balances, fCash and liquidity token positions
//! - **Free Collateral**: ETH-denominated collateral and debt after haircuts
//!   and buffers ([`evaluate`])
//! - **Borrow Requirements**: collateral needed for a minimum and a target
//!   ratio, solved without search
//! - **Interest Rate Risk**: liquidation rates per risky currency by a
//!   directed search over simulated cash groups
//!
//! ## Design Philosophy
//!
//! - **Pure Functions**: every evaluation takes the [`System`] and the time
//!   explicitly; nothing is cached
//! - **Projection by Copy**: simulations value against detached cash groups
//! - **Bounded Search**: liquidation searches have a hard probe cap and report
//!   exhaustion as a normal outcome
//!
//! ## Feature Flags
//!
//! - `parallel`: search risky currencies in parallel with rayon
//!
//! [`System`]: fcash_market::System

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::similar_names)]
#![allow(clippy::return_self_not_must_use)]

pub mod error;
pub mod free_collateral;
pub mod interest_rate_risk;
mod parallel;
pub mod portfolio;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{RiskError, RiskResult};
    pub use crate::free_collateral::{
        calculate_borrow_requirement, evaluate, net_local_available, BorrowRequirement,
        FreeCollateral,
    };
    pub use crate::interest_rate_risk::{
        calculate_interest_rate_risk, liquidation_rates, liquidation_search,
        local_currency_collateral_gap, risky_currencies, simulate_local_currency_value,
        LiquidationRates, SearchDirection,
    };
    pub use crate::portfolio::{Account, AccountBalance, AssetType, PortfolioAsset};
}

// Re-export commonly used types at crate root
pub use error::{RiskError, RiskResult};
pub use free_collateral::{calculate_borrow_requirement, evaluate, BorrowRequirement, FreeCollateral};
pub use interest_rate_risk::{calculate_interest_rate_risk, liquidation_rates, LiquidationRates};
pub use portfolio::{Account, AccountBalance, AssetType, PortfolioAsset};
