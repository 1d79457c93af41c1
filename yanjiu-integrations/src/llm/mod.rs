//! LLM adapters.

pub mod factory;
pub mod siumai_model;

pub use factory::SiumaiModelFactory;
pub use siumai_model::SiumaiChatModel;
