//! Library exports for the MBL loyalty and voucher system
//!
//! The crate carries three cooperating pieces:
//! - the `/api/mbl` HTTP service (`route`, `handler`, `database`, `analytics`)
//! - the remote-backed dashboard controller (`client`, `dashboard`, `session`)
//! - the self-contained in-memory `casino` store

pub mod analytics;
pub mod casino;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod database;
pub mod error;
pub mod format;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod render;
pub mod route;
pub mod session;
