//! webharvest - configuration-driven web crawling with a persistent
//! download ledger.
//!
//! Crawl definitions (YAML) declare input categories, variable references,
//! loop variables, and templated URLs. The orchestrator expands the variable
//! space into concrete bindings, resolves each templated URL, throttles per
//! domain, fetches, persists the payload, and records every fetch in a
//! SQLite ledger so already-downloaded pages are skipped.

pub mod cli;
pub mod config;
pub mod crawler;
pub mod fetch;
pub mod ledger;
pub mod schema;
pub mod storage;
