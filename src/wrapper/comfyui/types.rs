//! 类型定义
//! 相关节点定义: ComfyUI/comfy/comfy_types/node_typing.py

pub const NODE_INT: &str = "INT";
pub const NODE_FLOAT: &str = "FLOAT";
pub const NODE_STRING: &str = "STRING";
pub const NODE_BOOLEAN: &str = "BOOLEAN";
pub const NODE_IMAGE: &str = "IMAGE";
pub const NODE_MASK: &str = "MASK";
pub const NODE_MODEL: &str = "MODEL";

/// 任意类型
///
/// ComfyUI 原生通配类型 `IO.ANY`, 前后端校验都会放行
pub const NODE_ANY: &str = "*";

/// 隐藏输入
pub const HIDDEN_PROMPT: &str = "PROMPT";
pub const HIDDEN_EXTRA_PNGINFO: &str = "EXTRA_PNGINFO";
pub const HIDDEN_UNIQUE_ID: &str = "UNIQUE_ID";
