//! Scheduler console -- client view-state engine for an HTTP request scheduler.
//!
//! The crate keeps a console's filters, selection and form visibility in a
//! shared query string, drives the target/schedule/run lists and detail
//! panels from it, and talks to the scheduler backend over its REST contract.

pub mod api;
pub mod config;
pub mod detail;
pub mod filters;
pub mod forms;
pub mod list;
pub mod pages;
pub mod query;
pub mod render;
pub mod resource;
pub mod status;
pub mod table;
