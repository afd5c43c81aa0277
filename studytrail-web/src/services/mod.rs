//! Service clients and pure helpers used by the API handlers

pub mod ai_text;
pub mod llm_client;
