//! examkit-core — Timed exam sessions, scoring, and question bank editing.
//!
//! This crate defines the exam data model, the session state machine and its
//! async driver, the pure scoring engine, and the question bank editor that
//! the examkit CLI builds on.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod driver;
pub mod editor;
pub mod error;
pub mod model;
pub mod parser;
pub mod report;
pub mod scoring;
pub mod session;
