//! Optional parallel iteration over currencies.
//!
//! Uses rayon when the `parallel` feature is enabled.

use fcash_core::CurrencyId;

/// Maps `f` over currency ids, in parallel when the feature is enabled.
///
/// Results keep the order of `ids`.
pub(crate) fn map_currencies<U, F>(ids: &[CurrencyId], f: F) -> Vec<U>
where
    U: Send,
    F: Fn(CurrencyId) -> U + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        ids.par_iter().map(|id| f(*id)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        ids.iter().map(|id| f(*id)).collect()
    }
}
