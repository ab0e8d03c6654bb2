pub mod http_json;
pub mod mock;

#[cfg(feature = "llm-rig")]
pub mod rig_ollama;
