//! 重采样滤波器

use std::str::FromStr;

use image::imageops::FilterType;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// 缩放时使用的重采样方式
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Resample {
    #[default]
    Lanczos,
    Bicubic,
    Bilinear,
}

impl Resample {
    /// 按名称解析, 无法识别时回退到质量最高的 lanczos
    pub fn from_name(name: &str) -> Self {
        Self::from_str(name.trim()).unwrap_or_default()
    }

    /// 节点下拉选项
    pub fn options() -> Vec<String> {
        Self::iter().map(|v| v.to_string()).collect()
    }

    pub fn filter_type(&self) -> FilterType {
        match self {
            Resample::Lanczos => FilterType::Lanczos3,
            Resample::Bicubic => FilterType::CatmullRom,
            Resample::Bilinear => FilterType::Triangle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(Resample::from_name("bicubic"), Resample::Bicubic);
        assert_eq!(Resample::from_name("BILINEAR"), Resample::Bilinear);
        assert_eq!(Resample::from_name("nearest"), Resample::Lanczos);
        assert_eq!(Resample::from_name(""), Resample::Lanczos);
    }

    #[test]
    fn test_options_order() {
        assert_eq!(Resample::options(), vec!["lanczos", "bicubic", "bilinear"]);
    }
}
