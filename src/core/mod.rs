//! 公共库
//!
//! 相关节点定义: ComfyUI/comfy/comfy_types/node_typing.py

pub mod category;
#[cfg(feature = "python")]
pub mod node;
pub mod utils;
