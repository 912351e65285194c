mod client;

pub use gemini_text_types as types;
pub use client::{Client, Config, ConfigBuilder, Error, Stats, consts};
