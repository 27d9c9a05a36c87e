//! A/B comparison of ad variants within an ad group.
//!
//! [`assignment`] picks the control ad, [`engine`] compares every test ad
//! against it using [`stats`] (Fisher's exact test) and [`scoring`] (weighted
//! composite score) over values read by [`metrics`].

pub mod assignment;
pub mod config;
pub mod engine;
pub mod metrics;
pub mod scoring;
pub mod stats;
