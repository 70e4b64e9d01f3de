//! # Filter language - Abstract Syntax Tree
//!
//! This module defines the tokens and the compiled form of a filter
//! expression.
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[filter]** - Filter nodes (paths, construction, functions, operators)
//! - **[operators]** - Comparison and arithmetic operators
//!
//! ## Quick Start
//!
//! ```text
//! .[] | select(.birthYear >= 1900) | {fc, birthYear}
//! ```
//!
//! Streams every element of the input array, keeps those born in or after
//! 1900, and projects each kept record onto two keys.
//!
//! ## Core Concepts
//!
//! ### Streams
//!
//! Every filter maps one input value to a stream of zero or more outputs.
//! `.[]` turns one array into many values; `select` drops values; `[...]`
//! collects a stream back into one array.
//!
//! ### Pipes
//!
//! `a | b` runs `b` once for every output of `a`, in order.
//!
//! ### Barriers
//!
//! `sort_by`, `min_by`, `max_by` and array construction need their whole
//! input before producing anything. Everything else streams.
//!
//! ## Examples
//!
//! ### Pluck one field from every record
//!
//! ```text
//! .[] | {fc}[]
//! ```
//!
//! ### Oldest record
//!
//! ```text
//! min_by(.birthYear)
//! ```
//!
//! ### Last element, first three elements
//!
//! ```text
//! .[-1]
//! .[:3]
//! ```
pub mod filter;
pub mod operators;
pub mod tokens;

pub use filter::{Filter, Pattern};
pub use operators::{ArithOp, CompareOp};
pub use tokens::Token;
