#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/commonsize/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Statement computation.
//!
//! - [`resolver`] - Fact selection and unit scaling
//! - [`layout`] - Income statement and balance sheet layouts
//! - [`derive`] - Reconciliation of aggregate lines
//! - [`builder`] - Statement assembly and common-size ratios
//! - [`peers`] - Industry averages over peer statements

pub mod builder;
pub mod derive;
pub mod layout;
pub mod peers;
pub mod resolver;
mod statement;

pub use builder::{build_lines, build_statement, compute_common_size};
pub use commonsize_core::{PeriodKind, StatementKind};
pub use derive::{TOLERANCE, apply_balance_derivations, apply_derivations, apply_income_derivations};
pub use layout::{BALANCE_LAYOUT, DENOMINATOR_INDEX, INCOME_LAYOUT, layout_for};
pub use peers::apply_industry_average;
pub use resolver::{extract_value, resolve_value, select_fact};
pub use statement::CommonSizeStatement;
