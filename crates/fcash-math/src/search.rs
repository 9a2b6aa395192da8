//! Directed exponential-then-bisecting threshold search.
//!
//! The search walks from a domain `boundary` toward an `origin` looking for
//! the point where a monotone-ish excess function changes sign. The excess is
//! `value(point) - target`: positive means the point is safe, zero or negative
//! means the threshold is breached.
//!
//! Starting at the boundary (which must be breached for a crossing to exist)
//! the search steps toward the origin with a step that starts at the largest
//! power of ten fitting the span. Every time a candidate lands on the safe
//! side the step shrinks by a factor of ten. The search stops when the step
//! falls below the requested precision or a probe hits the target exactly.
//!
//! ```text
//!   Start ──► Probing ──► Found
//!     │          │
//!     └──────────┴──────► Exhausted
//! ```

/// Hard cap on the number of probes a single search may spend.
pub const DEFAULT_MAX_PROBES: u32 = 128;

/// Configuration for [`directed_search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectedSearchConfig {
    /// Smallest step the search refines to.
    pub precision: i128,
    /// Maximum number of excess evaluations.
    pub max_probes: u32,
}

impl Default for DirectedSearchConfig {
    fn default() -> Self {
        Self {
            precision: 1,
            max_probes: DEFAULT_MAX_PROBES,
        }
    }
}

impl DirectedSearchConfig {
    /// Creates a new search configuration.
    #[must_use]
    pub fn new(precision: i128, max_probes: u32) -> Self {
        Self {
            precision,
            max_probes,
        }
    }

    /// Sets the precision.
    #[must_use]
    pub fn with_precision(mut self, precision: i128) -> Self {
        self.precision = precision;
        self
    }

    /// Sets the probe budget.
    #[must_use]
    pub fn with_max_probes(mut self, max_probes: u32) -> Self {
        self.max_probes = max_probes;
        self
    }
}

/// State of a directed search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// Nothing evaluated yet.
    Start,
    /// `point` is breached; the next candidate is `point` moved by `step`.
    Probing {
        /// Closest breached point to the origin found so far.
        point: i128,
        /// Current step size.
        step: i128,
    },
    /// A crossing was located.
    Found {
        /// The breached point closest to the safe region.
        point: i128,
    },
    /// No crossing exists between boundary and origin, or the probe budget
    /// ran out.
    Exhausted,
}

/// Outcome of a directed search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A crossing point was located.
    Found {
        /// The crossing point.
        point: i128,
        /// Probes spent.
        probes: u32,
    },
    /// No crossing was located.
    Exhausted {
        /// Probes spent.
        probes: u32,
    },
}

impl SearchOutcome {
    /// Returns the crossing point if one was found.
    #[must_use]
    pub fn point(&self) -> Option<i128> {
        match self {
            SearchOutcome::Found { point, .. } => Some(*point),
            SearchOutcome::Exhausted { .. } => None,
        }
    }

    /// Returns the number of probes the search spent.
    #[must_use]
    pub fn probes(&self) -> u32 {
        match self {
            SearchOutcome::Found { probes, .. } | SearchOutcome::Exhausted { probes } => *probes,
        }
    }

    /// Returns true if a crossing was located.
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found { .. })
    }
}

fn initial_step(span: i128, precision: i128) -> i128 {
    let mut step = precision;
    while step.saturating_mul(10) <= span {
        step *= 10;
    }
    step
}

/// Searches from `boundary` toward `origin` for the excess sign change.
///
/// `excess` is called with candidate points strictly between `boundary` and
/// `origin` (and with `boundary` itself first). It returns `value - target`.
///
/// # Errors
///
/// Propagates the first error returned by `excess`.
///
/// # Example
///
/// ```rust
/// use fcash_math::search::{directed_search, DirectedSearchConfig};
///
/// // Safe below 437, breached at or above it; search downward from 1000.
/// let outcome = directed_search(1000, 0, &DirectedSearchConfig::default(), |x| {
///     Ok::<_, ()>(437 - x)
/// })
/// .unwrap();
/// assert_eq!(outcome.point(), Some(437));
/// ```
pub fn directed_search<F, E>(
    boundary: i128,
    origin: i128,
    config: &DirectedSearchConfig,
    mut excess: F,
) -> Result<SearchOutcome, E>
where
    F: FnMut(i128) -> Result<i128, E>,
{
    let precision = config.precision.max(1);
    let toward_origin: i128 = if origin < boundary { -1 } else { 1 };
    let mut probes: u32 = 0;
    let mut state = SearchState::Start;

    loop {
        state = match state {
            SearchState::Found { point } => {
                return Ok(SearchOutcome::Found { point, probes });
            }
            SearchState::Exhausted => {
                return Ok(SearchOutcome::Exhausted { probes });
            }
            _ if probes >= config.max_probes => SearchState::Exhausted,
            SearchState::Start => {
                let value = excess(boundary)?;
                probes += 1;
                let span = (origin - boundary).abs();
                if value > 0 {
                    SearchState::Exhausted
                } else if value == 0 || span == 0 {
                    SearchState::Found { point: boundary }
                } else {
                    SearchState::Probing {
                        point: boundary,
                        step: initial_step(span, precision),
                    }
                }
            }
            SearchState::Probing { point, step } => {
                if step < precision {
                    SearchState::Found { point }
                } else {
                    let candidate = point + toward_origin * step;
                    let overshoots = if toward_origin < 0 {
                        candidate <= origin
                    } else {
                        candidate >= origin
                    };

                    if overshoots {
                        SearchState::Probing {
                            point,
                            step: step / 10,
                        }
                    } else {
                        let value = excess(candidate)?;
                        probes += 1;
                        if value == 0 {
                            SearchState::Found { point: candidate }
                        } else if value < 0 {
                            SearchState::Probing {
                                point: candidate,
                                step,
                            }
                        } else {
                            SearchState::Probing {
                                point,
                                step: step / 10,
                            }
                        }
                    }
                }
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold(at: i128) -> impl Fn(i128) -> Result<i128, ()> {
        move |x| Ok(at - x)
    }

    #[test]
    fn test_finds_crossing_downward() {
        let config = DirectedSearchConfig::default().with_precision(10);
        let outcome = directed_search(10_000, 0, &config, threshold(4_321)).unwrap();
        let point = outcome.point().unwrap();
        assert!(point >= 4_321 && point < 4_321 + 10);
    }

    #[test]
    fn test_finds_crossing_upward() {
        // Safe above 250, breached at or below it
        let config = DirectedSearchConfig::default().with_precision(1);
        let outcome = directed_search(0, 1_000, &config, |x| Ok::<_, ()>(x - 250)).unwrap();
        assert_eq!(outcome.point(), Some(250));
    }

    #[test]
    fn test_safe_boundary_is_exhausted() {
        let outcome =
            directed_search(100, 0, &DirectedSearchConfig::default(), |_| Ok::<_, ()>(1))
                .unwrap();
        assert_eq!(outcome, SearchOutcome::Exhausted { probes: 1 });
    }

    #[test]
    fn test_crossing_at_boundary_terminates_quickly() {
        // Breached only exactly at the boundary
        let config = DirectedSearchConfig::default().with_precision(1_000_000);
        let outcome = directed_search(500_000_000, 0, &config, |x| {
            Ok::<_, ()>(if x >= 500_000_000 { -1 } else { 1 })
        })
        .unwrap();
        assert_eq!(outcome.point(), Some(500_000_000));
        assert!(outcome.probes() <= config.max_probes);
        assert!(outcome.probes() < 10);
    }

    #[test]
    fn test_probe_budget_exhausts() {
        let config = DirectedSearchConfig::new(1, 3);
        let outcome = directed_search(1_000_000, 0, &config, threshold(1)).unwrap();
        assert!(!outcome.is_found());
        assert_eq!(outcome.probes(), 3);
    }

    #[test]
    fn test_never_probes_origin() {
        let mut probed = Vec::new();
        let _ = directed_search(100, 40, &DirectedSearchConfig::default(), |x| {
            probed.push(x);
            Ok::<_, ()>(-1)
        });
        assert!(probed.iter().all(|x| *x > 40));
    }

    #[test]
    fn test_propagates_errors() {
        let result = directed_search(100, 0, &DirectedSearchConfig::default(), |_| {
            Err::<i128, _>("boom")
        });
        assert_eq!(result, Err("boom"));
    }
}
