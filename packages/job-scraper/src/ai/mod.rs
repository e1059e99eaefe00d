//! Extraction service implementations.

pub mod openai;
