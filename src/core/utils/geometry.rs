//! 包围盒与缩放对齐计算

use std::str::FromStr;

use image::GrayImage;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// 轴对齐包围盒, 右下边界不包含
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl BBox {
    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    /// 四周各扩展 pad 像素, 并限制在画布范围内
    pub fn expand(self, pad: u32, width: u32, height: u32) -> Self {
        if pad == 0 {
            return self;
        }
        Self {
            x0: self.x0.saturating_sub(pad),
            y0: self.y0.saturating_sub(pad),
            x1: self.x1.saturating_add(pad).min(width),
            y1: self.y1.saturating_add(pad).min(height),
        }
    }
}

/// 缩放模式
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FitMode {
    /// 完整放入包围盒
    #[default]
    Fit,
    /// 铺满包围盒, 允许溢出
    Fill,
}

/// 水平对齐
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AlignX {
    #[default]
    Center,
    Left,
    Right,
}

/// 垂直对齐
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AlignY {
    #[default]
    Center,
    Top,
    Bottom,
}

/// 解析下拉选项, 无法识别时使用默认值
pub fn parse_option<T>(name: &str) -> T
where
    T: FromStr + Default,
{
    T::from_str(name.trim()).unwrap_or_default()
}

/// 枚举的全部下拉选项
pub fn option_names<T>() -> Vec<String>
where
    T: IntoEnumIterator + ToString,
{
    T::iter().map(|v| v.to_string()).collect()
}

/// 阈值 [0, 1] 映射到 8 位灰度
pub fn threshold_byte(threshold: f32) -> u8 {
    (threshold.clamp(0.0, 1.0) as f64 * 255.0).round_ties_even() as u8
}

/// 获取遮罩中 >= 阈值区域的最小包围盒
pub fn bbox_from_mask(mask: &GrayImage, threshold: f32) -> Option<BBox> {
    let thr = threshold_byte(threshold);

    let mut bbox: Option<BBox> = None;
    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel.0[0] < thr {
            continue;
        }
        bbox = Some(match bbox {
            None => BBox {
                x0: x,
                y0: y,
                x1: x + 1,
                y1: y + 1,
            },
            Some(b) => BBox {
                x0: b.x0.min(x),
                y0: b.y0.min(y),
                x1: b.x1.max(x + 1),
                y1: b.y1.max(y + 1),
            },
        });
    }
    bbox
}

/// 计算缩放后的尺寸, 最小 1 像素
pub fn fit_size(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32, mode: FitMode) -> (u32, u32) {
    let ratio_w = dst_w as f64 / src_w.max(1) as f64;
    let ratio_h = dst_h as f64 / src_h.max(1) as f64;
    let scale = match mode {
        FitMode::Fit => ratio_w.min(ratio_h),
        FitMode::Fill => ratio_w.max(ratio_h),
    };

    let new_w = (src_w as f64 * scale).round_ties_even().max(1.0) as u32;
    let new_h = (src_h as f64 * scale).round_ties_even().max(1.0) as u32;
    (new_w, new_h)
}

/// 内容在包围盒内的对齐偏移, 内容大于包围盒时为负
pub fn alignment_offset(
    align_x: AlignX,
    align_y: AlignY,
    box_w: u32,
    box_h: u32,
    content_w: u32,
    content_h: u32,
) -> (i64, i64) {
    let free_w = box_w as i64 - content_w as i64;
    let free_h = box_h as i64 - content_h as i64;

    let ox = match align_x {
        AlignX::Left => 0,
        AlignX::Right => free_w,
        AlignX::Center => free_w.div_euclid(2),
    };
    let oy = match align_y {
        AlignY::Top => 0,
        AlignY::Bottom => free_h,
        AlignY::Center => free_h.div_euclid(2),
    };
    (ox, oy)
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;

    #[test]
    fn test_threshold_byte() {
        assert_eq!(threshold_byte(0.5), 128);
        assert_eq!(threshold_byte(0.0), 0);
        assert_eq!(threshold_byte(1.0), 255);
        assert_eq!(threshold_byte(3.0), 255);
        assert_eq!(threshold_byte(-1.0), 0);
    }

    #[test]
    fn test_bbox_from_mask() {
        let mut mask = GrayImage::new(10, 8);
        mask.put_pixel(2, 3, Luma([255]));
        mask.put_pixel(6, 5, Luma([200]));
        // 低于阈值
        mask.put_pixel(9, 7, Luma([100]));

        let bbox = bbox_from_mask(&mask, 0.5).unwrap();
        assert_eq!(
            bbox,
            BBox {
                x0: 2,
                y0: 3,
                x1: 7,
                y1: 6
            }
        );
        assert_eq!(bbox.width(), 5);
        assert_eq!(bbox.height(), 3);
    }

    #[test]
    fn test_bbox_from_empty_mask() {
        let mask = GrayImage::new(4, 4);
        assert_eq!(bbox_from_mask(&mask, 0.5), None);
        // 阈值为 0 时, 所有像素都满足条件
        assert_eq!(
            bbox_from_mask(&mask, 0.0),
            Some(BBox {
                x0: 0,
                y0: 0,
                x1: 4,
                y1: 4
            })
        );
    }

    #[test]
    fn test_expand_clamps_to_canvas() {
        let bbox = BBox {
            x0: 2,
            y0: 1,
            x1: 8,
            y1: 9,
        };
        assert_eq!(bbox.expand(0, 10, 10), bbox);
        assert_eq!(
            bbox.expand(3, 10, 10),
            BBox {
                x0: 0,
                y0: 0,
                x1: 10,
                y1: 10
            }
        );
    }

    #[test]
    fn test_fit_size() {
        assert_eq!(fit_size(200, 100, 50, 50, FitMode::Fit), (50, 25));
        assert_eq!(fit_size(200, 100, 50, 50, FitMode::Fill), (100, 50));
        assert_eq!(fit_size(1000, 1, 10, 10, FitMode::Fit), (10, 1));
    }

    #[test]
    fn test_fit_never_exceeds_and_fill_covers() {
        let sizes = [(37, 91), (640, 480), (3, 1000), (1, 1), (999, 17)];
        let boxes = [(13, 29), (100, 100), (512, 7), (1, 1)];
        for &(sw, sh) in &sizes {
            for &(bw, bh) in &boxes {
                let (w, h) = fit_size(sw, sh, bw, bh, FitMode::Fit);
                assert!(
                    w <= bw && h <= bh,
                    "fit {sw}x{sh} into {bw}x{bh} gave {w}x{h}"
                );

                let (w, h) = fit_size(sw, sh, bw, bh, FitMode::Fill);
                assert!(
                    w >= bw && h >= bh,
                    "fill {sw}x{sh} into {bw}x{bh} gave {w}x{h}"
                );
            }
        }
    }

    #[test]
    fn test_alignment_offset() {
        assert_eq!(
            alignment_offset(AlignX::Left, AlignY::Top, 100, 50, 40, 20),
            (0, 0)
        );
        assert_eq!(
            alignment_offset(AlignX::Right, AlignY::Bottom, 100, 50, 40, 20),
            (60, 30)
        );
        assert_eq!(
            alignment_offset(AlignX::Center, AlignY::Center, 100, 50, 41, 21),
            (29, 14)
        );
        // 内容溢出时向下取整
        assert_eq!(
            alignment_offset(AlignX::Center, AlignY::Center, 10, 10, 13, 10),
            (-2, 0)
        );
    }

    #[test]
    fn test_parse_option() {
        assert_eq!(parse_option::<FitMode>("fill"), FitMode::Fill);
        assert_eq!(parse_option::<FitMode>("stretch"), FitMode::Fit);
        assert_eq!(parse_option::<AlignX>("right"), AlignX::Right);
        assert_eq!(parse_option::<AlignY>("middle"), AlignY::Center);
        assert_eq!(option_names::<AlignY>(), vec!["center", "top", "bottom"]);
    }
}
