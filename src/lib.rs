// Copyright 2026 Unspool Contributors
// SPDX-License-Identifier: Apache-2.0

//! Unspool library — convergence-driven scraper for lazily-loaded comment
//! threads.
//!
//! The core loop alternates reveal cycles (scroll + expand-control clicks)
//! with multi-selector visibility counts until the count stops growing, then
//! runs a prioritized chain of extraction strategies over the settled page
//! and links replies to their root comments by content hash.

pub mod batch;
pub mod convergence;
pub mod export;
pub mod extract;
pub mod harvest;
pub mod pacing;
pub mod records;
pub mod reveal;
pub mod session;
