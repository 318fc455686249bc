//! Crate-wide test suite, organized into logical groups.
//!
//! Per-module unit tests live beside the code they test (`#[cfg(test)] mod
//! tests` in each `column`/`segment`/`incremental`/`filter`/`query`
//! submodule). This module holds the cross-module suites from spec §8:
//! property-based invariants and literal end-to-end scenarios.

#[cfg(test)]
mod integration;
#[cfg(test)]
mod property_tests;
