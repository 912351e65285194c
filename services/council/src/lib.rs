pub mod config;
pub mod gemini_adapter;
pub mod prompt_loader;
pub mod render;
pub mod shell;
