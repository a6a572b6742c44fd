//! Project cost estimation.
//!
//! A project is a set of tickets (crew sizes, labor hours, area and quoted
//! line items). The [`estimator`] folds a project into the fixed ten-field
//! feature row the frozen [`gbt`] model was trained on, using the [`lookup`]
//! tables built offline, and predicts the total cost. [`api`] exposes the
//! pipeline over HTTP with per-session projects kept in [`sessions`].

pub mod api;
pub mod config;
pub mod estimator;
pub mod gbt;
pub mod lookup;
pub mod models;
pub mod report;
pub mod sessions;
