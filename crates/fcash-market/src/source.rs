//! Market state sources.
//!
//! The engine never reads chain state itself. A [`MarketStateSource`]
//! supplies snapshots keyed by (currency, maturity); live chain readers and
//! precomputed caches implement the same trait.

use std::collections::HashMap;

use fcash_core::{CurrencyId, Timestamp};
use serde::{Deserialize, Serialize};

/// Raw state of one market as read from an external source.
///
/// Amounts are at internal precision: fCash in underlying, cash in asset,
/// liquidity in liquidity tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Maturity of the market.
    pub maturity: Timestamp,
    /// Total fCash held by the pool.
    pub total_fcash: i128,
    /// Total asset cash held by the pool.
    pub total_asset_cash: i128,
    /// Total liquidity tokens outstanding.
    pub total_liquidity: i128,
    /// Implied rate of the last trade.
    pub last_implied_rate: i128,
    /// Stored oracle rate.
    pub oracle_rate: i128,
    /// Time of the last trade.
    pub previous_trade_time: Timestamp,
}

/// Holdings of a currency's yield token (nToken) account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldTokenState {
    /// Yield tokens outstanding.
    pub total_supply: i128,
    /// Asset cash held by the yield token account.
    pub cash_balance: i128,
    /// Liquidity tokens held, by market index.
    pub liquidity_tokens: Vec<(u8, i128)>,
    /// Residual fCash positions, by maturity.
    pub fcash: Vec<(Timestamp, i128)>,
}

/// Read-only supplier of market state.
pub trait MarketStateSource: Send + Sync {
    /// Snapshot of the market for `currency_id` maturing at `maturity`.
    fn market_snapshot(&self, currency_id: CurrencyId, maturity: Timestamp)
        -> Option<MarketSnapshot>;

    /// Yield token holdings of `currency_id`, if the currency has one.
    fn yield_token_state(&self, currency_id: CurrencyId) -> Option<YieldTokenState>;
}

/// In-memory [`MarketStateSource`] for tests and precomputed caches.
#[derive(Debug, Clone, Default)]
pub struct StaticMarketSource {
    markets: HashMap<(CurrencyId, Timestamp), MarketSnapshot>,
    yield_tokens: HashMap<CurrencyId, YieldTokenState>,
}

impl StaticMarketSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a market snapshot.
    #[must_use]
    pub fn with_market(mut self, currency_id: CurrencyId, snapshot: MarketSnapshot) -> Self {
        self.insert_market(currency_id, snapshot);
        self
    }

    /// Adds or replaces yield token holdings.
    #[must_use]
    pub fn with_yield_token(mut self, currency_id: CurrencyId, state: YieldTokenState) -> Self {
        self.yield_tokens.insert(currency_id, state);
        self
    }

    /// Adds or replaces a market snapshot in place.
    pub fn insert_market(&mut self, currency_id: CurrencyId, snapshot: MarketSnapshot) {
        self.markets
            .insert((currency_id, snapshot.maturity), snapshot);
    }

    /// Number of market snapshots held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.markets.len()
    }

    /// Returns true if no snapshots are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}

impl MarketStateSource for StaticMarketSource {
    fn market_snapshot(
        &self,
        currency_id: CurrencyId,
        maturity: Timestamp,
    ) -> Option<MarketSnapshot> {
        self.markets.get(&(currency_id, maturity)).copied()
    }

    fn yield_token_state(&self, currency_id: CurrencyId) -> Option<YieldTokenState> {
        self.yield_tokens.get(&currency_id).cloned()
    }
}
