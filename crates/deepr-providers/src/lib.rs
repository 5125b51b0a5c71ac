//! deepr-providers: text-completion provider implementations for deepr
//!
//! This crate provides implementations of the Provider trait for chat-completion APIs.

pub mod openrouter;

pub use openrouter::OpenRouterProvider;
