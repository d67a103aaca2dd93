//! 加载选中的图片
//!
//! 前端图片选择器把 ComfyUI 输入目录下的相对路径写入 `selected_paths`,
//! 可以是 JSON 数组, 也可以是每行一个路径。

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use candle_core::{DType, Device, Tensor};
use image::{imageops, DynamicImage, ImageDecoder, ImageReader, RgbImage};
use lazy_static::lazy_static;
use log::warn;
use serde_json::Value;

use crate::{
    core::utils::{
        directory::{extension_lowercase, resolve_within},
        tensor::images_to_tensor,
    },
    error::Error,
};

lazy_static! {
    /// 支持的图片扩展名
    pub static ref IMAGE_EXTENSIONS: HashSet<&'static str> =
        ["png", "jpg", "jpeg", "webp", "bmp", "tif", "tiff", "ppm"]
            .into_iter()
            .collect();
}

/// 错误信息中最多列出的缺失路径数量
const MISSING_PREVIEW: usize = 10;

/// 空批次的占位尺寸
const EMPTY_BATCH_SIZE: usize = 64;

/// 解析路径列表
pub fn parse_selected_paths(selected_paths: &str) -> Vec<String> {
    let trimmed = selected_paths.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed) {
        return items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
    }

    trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// 打开图片并按 EXIF 方向旋转
pub fn open_image(path: &Path) -> Result<DynamicImage, Error> {
    let mut decoder = ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder.orientation()?;

    let mut image = DynamicImage::from_decoder(decoder)?;
    image.apply_orientation(orientation);
    Ok(image)
}

/// 缩放到指定尺寸, 尺寸一致时不处理
pub fn resize_like(image: RgbImage, width: u32, height: u32) -> RgbImage {
    if image.dimensions() == (width, height) {
        return image;
    }
    imageops::resize(&image, width, height, imageops::FilterType::Lanczos3)
}

/// 加载结果
#[derive(Debug, Default)]
pub struct SelectedImages {
    pub images: Vec<RgbImage>,
    /// 未能加载的相对路径
    pub missing: Vec<String>,
}

impl SelectedImages {
    /// 每张图片单独转换为 [1, H, W, 3]
    pub fn to_tensor_list(&self, device: &Device) -> Result<Vec<Tensor>, Error> {
        self.images
            .iter()
            .map(|image| images_to_tensor(std::slice::from_ref(image), device))
            .collect()
    }

    /// 缩放到第一张图片的尺寸后合并为 [B, H, W, 3]
    ///
    /// 没有图片时返回 [0, 64, 64, 3]
    pub fn into_batch(self, device: &Device) -> Result<Tensor, Error> {
        let Some((width, height)) = self.images.first().map(|image| image.dimensions()) else {
            let empty = Tensor::zeros(
                (0, EMPTY_BATCH_SIZE, EMPTY_BATCH_SIZE, 3),
                DType::F32,
                device,
            )?;
            return Ok(empty);
        };

        let images: Vec<RgbImage> = self
            .images
            .into_iter()
            .map(|image| resize_like(image, width, height))
            .collect();
        images_to_tensor(&images, device)
    }

    /// 缺失路径摘要, 最多列出前 10 个
    pub fn missing_summary(&self) -> String {
        if self.missing.is_empty() {
            return "no paths selected".to_string();
        }

        let mut summary = self
            .missing
            .iter()
            .take(MISSING_PREVIEW)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        if self.missing.len() > MISSING_PREVIEW {
            summary.push_str(&format!(
                " … and {} more",
                self.missing.len() - MISSING_PREVIEW
            ));
        }
        summary
    }
}

/// 输入目录下的图片加载器
#[derive(Debug, Clone)]
pub struct SelectedImageLoader {
    root: PathBuf,
    /// 0 表示不限制
    max_images: usize,
}

impl SelectedImageLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_images: 0,
        }
    }

    pub fn with_max_images(mut self, max_images: usize) -> Self {
        self.max_images = max_images;
        self
    }

    /// 按顺序加载, 失败的路径记录到 missing 中
    pub fn load(&self, selected_paths: &str) -> SelectedImages {
        let mut paths = parse_selected_paths(selected_paths);
        if self.max_images > 0 {
            paths.truncate(self.max_images);
        }

        let mut result = SelectedImages::default();
        for rel in paths {
            match self.load_one(&rel) {
                Ok(image) => result.images.push(image),
                Err(e) => {
                    warn!("skip {rel}, {e}");
                    result.missing.push(rel);
                }
            }
        }
        result
    }

    fn load_one(&self, rel: &str) -> Result<RgbImage, Error> {
        let supported = extension_lowercase(rel)
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(ext.as_str()));
        if !supported {
            return Err(Error::UnsupportedImageFormat(rel.to_string()));
        }

        let path = resolve_within(&self.root, rel)
            .ok_or_else(|| Error::PathOutsideRoot(rel.to_string()))?;
        if !path.is_file() {
            return Err(Error::FileNotFound(path.to_string_lossy().to_string()));
        }

        Ok(open_image(&path)?.to_rgb8())
    }
}
