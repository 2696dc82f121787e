//! Schedule RC standardization: per-quarter field resolution, regime
//! dispatch, category aggregation, reconciliation and drift tracking.

pub mod aggregate;
pub mod category;
pub mod missing;
pub mod reconcile;
pub mod regime;
pub mod resolve;

pub use aggregate::{compute, StandardizedQuarter, StandardizedRow};
pub use category::{Category, Component};
pub use missing::track;
pub use reconcile::{assetcheck, check, Reconciliation, RECONCILIATION_TOLERANCE};
pub use regime::{
    coverage_start, Combine, Fallback, Part, Regime, RegimeTable, Role, Rule, Window,
    REPORTED_TOTAL,
};
pub use resolve::{prefer, resolve, sum_present, Column, FieldPair};
