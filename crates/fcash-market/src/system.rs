//! The loaded system: currency registry plus every cash group.

use std::collections::BTreeMap;
use std::sync::Arc;

use fcash_core::config::{SystemConfig, Validate};
use fcash_core::{CurrencyId, CurrencyRegistry, Timestamp};

use crate::cash_group::CashGroup;
use crate::error::{MarketError, MarketResult};
use crate::source::{MarketSnapshot, MarketStateSource};

/// Currency registry and cash groups loaded at one valuation time.
///
/// Passed explicitly to every valuation; nothing is held globally. Cloning
/// shares the registry.
#[derive(Debug, Clone)]
pub struct System {
    registry: Arc<CurrencyRegistry>,
    cash_groups: BTreeMap<CurrencyId, CashGroup>,
}

impl System {
    /// Creates a system with no cash groups.
    #[must_use]
    pub fn new(registry: CurrencyRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            cash_groups: BTreeMap::new(),
        }
    }

    /// Loads every configured cash group from `source` at time `t`.
    pub fn from_config<S>(config: &SystemConfig, source: &S, t: Timestamp) -> MarketResult<Self>
    where
        S: MarketStateSource + ?Sized,
    {
        config.validate_or_error()?;
        let registry = CurrencyRegistry::from_config(config)?;
        let mut cash_groups = BTreeMap::new();
        for parameters in &config.cash_groups {
            let currency = registry.get(parameters.currency_id)?;
            let group = CashGroup::load(parameters, currency, source, t)?;
            cash_groups.insert(parameters.currency_id, group);
        }
        for currency in &config.currencies {
            if !cash_groups.contains_key(&currency.id) {
                tracing::warn!(
                    currency_id = currency.id,
                    "currency has no cash group; accounts holding it cannot be valued"
                );
            }
        }

        tracing::info!(
            currencies = registry.len(),
            cash_groups = cash_groups.len(),
            time = t,
            "system loaded"
        );

        Ok(Self {
            registry: Arc::new(registry),
            cash_groups,
        })
    }

    /// Adds or replaces a cash group.
    #[must_use]
    pub fn with_cash_group(mut self, cash_group: CashGroup) -> Self {
        self.cash_groups.insert(cash_group.currency_id(), cash_group);
        self
    }

    /// The currency registry.
    #[must_use]
    pub fn registry(&self) -> &CurrencyRegistry {
        &self.registry
    }

    /// Cash group of `currency_id`.
    pub fn cash_group(&self, currency_id: CurrencyId) -> MarketResult<&CashGroup> {
        self.cash_groups
            .get(&currency_id)
            .ok_or(MarketError::CashGroupNotFound { currency_id })
    }

    /// Every loaded cash group, ordered by currency id.
    pub fn cash_groups(&self) -> impl Iterator<Item = &CashGroup> {
        self.cash_groups.values()
    }

    /// Applies a fresh snapshot to one market.
    ///
    /// Returns true if the market state changed.
    pub fn set_market(
        &mut self,
        currency_id: CurrencyId,
        snapshot: &MarketSnapshot,
    ) -> MarketResult<bool> {
        let changed = self
            .cash_groups
            .get_mut(&currency_id)
            .ok_or(MarketError::CashGroupNotFound { currency_id })?
            .set_market(snapshot)?;
        if changed {
            tracing::debug!(currency_id, maturity = snapshot.maturity, "market updated");
        }
        Ok(changed)
    }
}
