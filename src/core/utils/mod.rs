//! 工具
pub mod directory;
pub mod geometry;
pub mod resample;
pub mod tensor;
