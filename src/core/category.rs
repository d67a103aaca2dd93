//! 节点分类

/// 逻辑
pub const CATEGORY_LOGIC: &str = "Toolbelt/Logic";
/// 实用工具
pub const CATEGORY_UTILS: &str = "Toolbelt/Utils";
/// 图片
pub const CATEGORY_IMAGE: &str = "Toolbelt/Image";
/// 局部重绘
pub const CATEGORY_INPAINT: &str = "Toolbelt/Inpaint";
