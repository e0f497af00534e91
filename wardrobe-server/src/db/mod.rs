//! Database operations for wardrobe-server
//!
//! Schema and pool setup live in `wardrobe_common::db`; this module holds the
//! per-table queries the handlers use.

pub mod clothing;
pub mod users;
