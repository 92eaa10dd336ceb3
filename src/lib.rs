//! Sheetbook - income sheets, expenses and debts from the terminal
//!
//! A small personal-finance application built on a client-side core:
//! an event bus, a reactive state tree with persistence, a hash-style router
//! with guards, and a module manager that keeps exactly one feature module
//! active at a time.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `core`: Event bus, state manager, router and module manager
//! - `features`: Auth, income sheet and debt modules
//! - `app`: Wires the core and the features together
//! - `models`: Data models (sheets, expenses, debts, users, money)
//! - `storage`: JSON file storage, data API and credential service
//! - `reports`: Derived aggregates computed from raw state
//! - `display`: Terminal text views
//! - `config`: Configuration and path management
//! - `cli`: Command handlers for the `sheetbook` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use sheetbook::app::App;
//! use sheetbook::config::{paths::SheetbookPaths, settings::Settings};
//!
//! let paths = SheetbookPaths::new()?;
//! let app = App::open(Settings::load_or_create(&paths)?, &paths)?;
//! app.start().await?;
//! app.navigate("/sheets").await?;
//! println!("{}", app.render()?);
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod display;
pub mod error;
pub mod features;
pub mod logging;
pub mod models;
pub mod reports;
pub mod storage;

pub use error::SheetbookError;
