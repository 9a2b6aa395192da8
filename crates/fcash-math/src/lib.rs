//! # fcash Math
//!
//! Integer fixed-point utilities for the fcash fixed-rate lending engine.
//!
//! This crate provides:
//!
//! - **Wide arithmetic**: multiply-then-divide carried out in 512-bit
//!   intermediates so that chained products are truncated exactly once
//! - **Fixed-point functions**: `exp` and `ln` over an arbitrary decimal scale,
//!   truncating toward zero at every step
//! - **Interpolation**: integer linear interpolation between two rate points
//! - **Directed search**: exponential-then-bisecting search for a threshold
//!   crossing with a hard probe budget
//!
//! ## Design Philosophy
//!
//! - **Deterministic**: no floating point anywhere in a pricing path
//! - **Explicit truncation**: every division truncates toward zero
//! - **Fallible**: overflow and division by zero are errors, never panics

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
#![allow(clippy::unreadable_literal)]
#![allow(clippy::uninlined_format_args)]

pub mod error;
pub mod fixed_point;
pub mod interpolation;
pub mod search;
pub mod wide;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{MathError, MathResult};
    pub use crate::fixed_point::{exp, ln, WAD};
    pub use crate::interpolation::interpolate;
    pub use crate::search::{
        directed_search, DirectedSearchConfig, SearchOutcome, SearchState,
        DEFAULT_MAX_PROBES,
    };
    pub use crate::wide::{accumulate, mul_div, product_div, sum_products_div};
}

pub use error::{MathError, MathResult};
