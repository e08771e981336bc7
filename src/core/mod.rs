//! Core Conversation Engine
//!
//! Everything between the HTTP surface and the database: prompt
//! composition, the memory window, the LLM provider abstraction, and
//! the conversation orchestrator that ties them together.

pub mod conversation;
pub mod llm;
pub mod logging;
pub mod memory;
pub mod prompt;
