//! Causette is a minimal full-screen terminal chat client that streams
//! single-shot completions from OpenAI-compatible APIs.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the stream decoder, the request orchestrator, the
//!   observable stream state, and configuration.
//! - [`ui`] renders the terminal interface and runs the interactive event
//!   loop that drives user input and display updates.
//! - [`api`] defines the chat payloads exchanged with the completion
//!   endpoint.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::run`].

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
