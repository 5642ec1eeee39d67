//! # MemberHub API Server Library
//!
//! HTTP API of the MemberHub association portal: accounts with admin
//! approval, news articles and events gated by role, event registration
//! with capacity limits, contact form and administration.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `bootstrap`: First administrator account
//! - `config`: Configuration from environment variables
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Response security headers
//! - `routes`: API route handlers

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
