//! comfyui 相关定义
pub mod types;
pub mod workflow;

#[cfg(feature = "python")]
mod prompt_server;
#[cfg(feature = "python")]
pub use prompt_server::PromptServer;
