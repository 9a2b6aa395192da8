//! Balance kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a [`TypedAmount`](crate::TypedAmount).
///
/// Internal kinds are held at [`INTERNAL_TOKEN_PRECISION`] for every
/// currency; external kinds keep the token's native decimals.
///
/// [`INTERNAL_TOKEN_PRECISION`]: crate::constants::INTERNAL_TOKEN_PRECISION
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceKind {
    /// Underlying token at internal precision.
    InternalUnderlying,
    /// Underlying token at native precision.
    ExternalUnderlying,
    /// Interest-bearing asset token at internal precision.
    InternalAsset,
    /// Interest-bearing asset token at native precision.
    ExternalAsset,
    /// Claim on a market's pooled cash and fCash.
    LiquidityToken,
    /// Currency-level pooled liquidity token.
    YieldToken,
    /// Governance token.
    GovernanceToken,
}

impl BalanceKind {
    /// All balance kinds.
    pub const ALL: [BalanceKind; 7] = [
        BalanceKind::InternalUnderlying,
        BalanceKind::ExternalUnderlying,
        BalanceKind::InternalAsset,
        BalanceKind::ExternalAsset,
        BalanceKind::LiquidityToken,
        BalanceKind::YieldToken,
        BalanceKind::GovernanceToken,
    ];

    /// Returns true if the kind uses internal precision.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        !self.is_external()
    }

    /// Returns true if the kind uses the token's native precision.
    #[must_use]
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            BalanceKind::ExternalUnderlying | BalanceKind::ExternalAsset
        )
    }

    /// Returns true for asset token kinds.
    #[must_use]
    pub fn is_asset(&self) -> bool {
        matches!(self, BalanceKind::InternalAsset | BalanceKind::ExternalAsset)
    }

    /// Returns true for underlying token kinds.
    #[must_use]
    pub fn is_underlying(&self) -> bool {
        matches!(
            self,
            BalanceKind::InternalUnderlying | BalanceKind::ExternalUnderlying
        )
    }

    /// Internal counterpart of an external kind.
    #[must_use]
    pub fn internal(&self) -> Self {
        match self {
            BalanceKind::ExternalUnderlying => BalanceKind::InternalUnderlying,
            BalanceKind::ExternalAsset => BalanceKind::InternalAsset,
            other => *other,
        }
    }

    /// External counterpart of an internal asset or underlying kind.
    #[must_use]
    pub fn external(&self) -> Option<Self> {
        match self {
            BalanceKind::InternalUnderlying | BalanceKind::ExternalUnderlying => {
                Some(BalanceKind::ExternalUnderlying)
            }
            BalanceKind::InternalAsset | BalanceKind::ExternalAsset => {
                Some(BalanceKind::ExternalAsset)
            }
            _ => None,
        }
    }

    /// Snake case name used in messages and serialized forms.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BalanceKind::InternalUnderlying => "internal_underlying",
            BalanceKind::ExternalUnderlying => "external_underlying",
            BalanceKind::InternalAsset => "internal_asset",
            BalanceKind::ExternalAsset => "external_asset",
            BalanceKind::LiquidityToken => "liquidity_token",
            BalanceKind::YieldToken => "yield_token",
            BalanceKind::GovernanceToken => "governance_token",
        }
    }
}

impl fmt::Display for BalanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
