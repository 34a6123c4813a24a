//! Cropwatch - alert feed reconciliation for vertical farm monitoring.
//!
//! # Overview
//!
//! Cropwatch polls an alert generator for one farm, merges each fetched batch
//! into the list of alerts on display, and notifies the grower about new
//! alerts they care about. When the generator is unreachable it falls back to
//! the last batch it managed to fetch.
//!
//! # Merge Guarantees
//!
//! - An alert the grower resolved stays resolved when the feed echoes it as active
//! - Alerts that drop out of the feed stay on display unchanged
//! - Active alerts are always listed before resolved ones
//! - Each alert notifies at most once, on the cycle it first appears
//!
//! # Modules
//!
//! - [`model`]: Alerts, batches, preferences and the display state
//! - [`reconcile`]: Pure merge and resolve operations
//! - [`view`]: Filtered, severity-sorted views and summary counts
//! - [`notify`]: Notification policy and delivery
//! - [`storage`]: Key-value cache store (SQLite or in-memory)
//! - [`data_sources`]: Alert sources, including the HTTP generator client
//! - [`controller`]: Fetch with timeout and cache fallback
//! - [`monitor`]: Single-flight polling timeline owning the display state
//! - [`config`]: Environment configuration
//! - [`api`]: HTTP API handlers

pub mod api;
pub mod config;
pub mod controller;
pub mod data_sources;
pub mod error;
pub mod model;
pub mod monitor;
pub mod notify;
pub mod reconcile;
pub mod storage;
pub mod view;
