//! Core domain types for clipwise.
//!
//! This crate contains pure conversion logic with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

pub mod roman;

pub use roman::{
    LETTER_VALUES, MAX_CANONICAL, RomanError, SYMBOL_VALUES, decode, encode, letter_value,
    try_encode,
};
