//! Packlingo - Resumable Modpack Translation
//!
//! A hybrid translation engine for modpack content: exact matches come
//! from a cached community dictionary, everything else goes to an
//! OpenAI-compatible LLM in rate-limited batches. Every output file
//! doubles as a checkpoint, so interrupted runs resume without re-paying
//! for work already done.

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod content;
pub mod dictionary;
pub mod error;
pub mod pipeline;
pub mod translate;
