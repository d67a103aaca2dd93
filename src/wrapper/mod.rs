// python 包装
pub mod comfy;
pub mod comfyui;
#[cfg(feature = "python")]
pub mod torch;
