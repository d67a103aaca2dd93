//! image 与 tensor 相互转换
//!
//! - IMAGE: [B, H, W, C], C 为 1/3/4, 取值 [0, 1]
//! - MASK: [B, H, W] / [B, 1, H, W], 或者把 IMAGE 当作遮罩使用 (取亮度)

use candle_core::{DType, Device, Tensor};
use image::{imageops, DynamicImage, GrayImage, RgbImage, RgbaImage};

use crate::error::Error;

/// 将 [0, 1] 浮点数据转换为 8 位, 超出范围的值被截断
fn to_u8(values: &[f32]) -> Vec<u8> {
    values
        .iter()
        .map(|&x| (x.clamp(0.0, 1.0) * 255.0) as u8)
        .collect()
}

/// 单帧数据 [H, W, C]
fn frame_data(tensor: &Tensor, index: usize) -> Result<Vec<f32>, Error> {
    let data = tensor
        .get(index)?
        .to_device(&Device::Cpu)?
        .to_dtype(DType::F32)?
        .flatten_all()?
        .to_vec1::<f32>()?;
    Ok(data)
}

/// 将张量转换为图像列表
///
/// tensor: BHWC
pub fn tensor_to_images(tensor: &Tensor) -> Result<Vec<DynamicImage>, Error> {
    let (batch, height, width, channels) = match tensor.dims() {
        [b, h, w, c] if matches!(*c, 1 | 3 | 4) => (*b, *h as u32, *w as u32, *c),
        dims => {
            return Err(Error::InvalidTensorShape(format!(
                "IMAGE must be [B,H,W,C] with C in {{1,3,4}}, got {dims:?}"
            )));
        }
    };

    let mut images = Vec::with_capacity(batch);
    for index in 0..batch {
        let buffer = to_u8(&frame_data(tensor, index)?);

        let image = match channels {
            // 单通道复制成 RGB
            1 => {
                let rgb: Vec<u8> = buffer.iter().flat_map(|&v| [v, v, v]).collect();
                let img = RgbImage::from_raw(width, height, rgb).ok_or(Error::ImageBuffer)?;
                DynamicImage::ImageRgb8(img)
            }
            3 => {
                let img = RgbImage::from_raw(width, height, buffer).ok_or(Error::ImageBuffer)?;
                DynamicImage::ImageRgb8(img)
            }
            4 => {
                let img = RgbaImage::from_raw(width, height, buffer).ok_or(Error::ImageBuffer)?;
                DynamicImage::ImageRgba8(img)
            }
            c => return Err(Error::UnsupportedNumberOfChannels(c as u32)),
        };
        images.push(image);
    }

    Ok(images)
}

/// 单帧遮罩数据转换为灰度图
///
/// 最大值不超过 1.0 时按 [0, 1] 处理, 否则认为已经是 [0, 255]
fn mask_frame(data: &[f32], width: u32, height: u32) -> Result<GrayImage, Error> {
    let max = data.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let scale = if max <= 1.0 { 255.0 } else { 1.0 };

    let buffer: Vec<u8> = data
        .iter()
        .map(|&v| (v * scale).clamp(0.0, 255.0) as u8)
        .collect();
    GrayImage::from_raw(width, height, buffer).ok_or(Error::ImageBuffer)
}

/// 按 ITU-R 601-2 计算亮度
pub fn luminance(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let l = (r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16;
        image::Luma([l as u8])
    })
}

/// 将遮罩张量转换为灰度图列表
///
/// force_size: 尺寸不一致时使用最近邻缩放到该尺寸
pub fn tensor_to_masks(
    tensor: &Tensor,
    force_size: Option<(u32, u32)>,
) -> Result<Vec<GrayImage>, Error> {
    let masks = match tensor.dims() {
        // [B, 1, H, W]
        [batch, 1, height, width] => {
            let tensor = tensor.squeeze(1)?;
            (0..*batch)
                .map(|i| mask_frame(&frame_data(&tensor, i)?, *width as u32, *height as u32))
                .collect::<Result<Vec<_>, Error>>()?
        }
        // [B, H, W]
        [batch, height, width] => (0..*batch)
            .map(|i| mask_frame(&frame_data(tensor, i)?, *width as u32, *height as u32))
            .collect::<Result<Vec<_>, Error>>()?,
        // IMAGE 当作遮罩
        [_, _, _, c] if matches!(*c, 1 | 3 | 4) => tensor_to_images(tensor)?
            .iter()
            .map(luminance)
            .collect(),
        dims => {
            return Err(Error::InvalidTensorShape(format!(
                "MASK must be [B,1,H,W] or [B,H,W] (or an IMAGE used as mask), got {dims:?}"
            )));
        }
    };

    let masks = match force_size {
        Some((width, height)) => masks
            .into_iter()
            .map(|mask| conform_mask(mask, width, height))
            .collect(),
        None => masks,
    };

    Ok(masks)
}

/// 遮罩尺寸与画布不一致时, 最近邻缩放到画布尺寸
pub fn conform_mask(mask: GrayImage, width: u32, height: u32) -> GrayImage {
    if mask.dimensions() == (width, height) {
        return mask;
    }
    imageops::resize(&mask, width, height, imageops::FilterType::Nearest)
}

/// 将 RGB 图像列表转换为张量
///
/// output: BHWC
pub fn images_to_tensor(images: &[RgbImage], device: &Device) -> Result<Tensor, Error> {
    if images.is_empty() {
        return Err(Error::InputListEmpty);
    }

    let tensors = images
        .iter()
        .map(|img| {
            let (width, height) = img.dimensions();
            let data: Vec<f32> = img.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
            Tensor::from_vec(data, (height as usize, width as usize, 3), device)
        })
        .collect::<Result<Vec<Tensor>, _>>()?;

    Ok(Tensor::stack(&tensors, 0)?)
}

/// 将灰度遮罩列表转换为张量
///
/// output: BHW
pub fn masks_to_tensor(masks: &[GrayImage], device: &Device) -> Result<Tensor, Error> {
    if masks.is_empty() {
        return Err(Error::InputListEmpty);
    }

    let tensors = masks
        .iter()
        .map(|mask| {
            let (width, height) = mask.dimensions();
            let data: Vec<f32> = mask.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
            Tensor::from_vec(data, (height as usize, width as usize), device)
        })
        .collect::<Result<Vec<Tensor>, _>>()?;

    Ok(Tensor::stack(&tensors, 0)?)
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    #[test]
    fn test_tensor_to_images_rgb() -> anyhow::Result<()> {
        // [1, 1, 2, 3]
        let data = vec![1.0f32, 0.0, 0.5, 2.0, -1.0, 0.25];
        let tensor = Tensor::from_vec(data, (1, 1, 2, 3), &Device::Cpu)?;

        let images = tensor_to_images(&tensor)?;
        assert_eq!(images.len(), 1);

        let rgb = images[0].to_rgb8();
        assert_eq!(rgb.dimensions(), (2, 1));
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 0, 127]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([255, 0, 63]));
        Ok(())
    }

    #[test]
    fn test_tensor_to_images_single_channel() -> anyhow::Result<()> {
        let tensor = Tensor::from_vec(vec![1.0f32, 0.0], (2, 1, 1, 1), &Device::Cpu)?;

        let images = tensor_to_images(&tensor)?;
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].to_rgb8().get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(images[1].to_rgb8().get_pixel(0, 0), &Rgb([0, 0, 0]));
        Ok(())
    }

    #[test]
    fn test_tensor_to_images_invalid_shape() -> anyhow::Result<()> {
        let tensor = Tensor::zeros((1, 4, 4, 2), DType::F32, &Device::Cpu)?;
        assert!(matches!(
            tensor_to_images(&tensor),
            Err(Error::InvalidTensorShape(_))
        ));

        let tensor = Tensor::zeros((4, 4), DType::F32, &Device::Cpu)?;
        assert!(tensor_to_images(&tensor).is_err());
        Ok(())
    }

    #[test]
    fn test_tensor_to_masks_shapes() -> anyhow::Result<()> {
        let bhw = Tensor::from_vec(vec![0.0f32, 1.0, 0.5, 0.0], (1, 2, 2), &Device::Cpu)?;
        let masks = tensor_to_masks(&bhw, None)?;
        assert_eq!(masks[0].as_raw(), &vec![0, 255, 127, 0]);

        let b1hw = bhw.unsqueeze(1)?;
        let masks = tensor_to_masks(&b1hw, None)?;
        assert_eq!(masks[0].as_raw(), &vec![0, 255, 127, 0]);

        // 已经是 0..255 的数据不再缩放
        let bytes = Tensor::from_vec(vec![0.0f32, 255.0, 128.0, 3.0], (1, 2, 2), &Device::Cpu)?;
        let masks = tensor_to_masks(&bytes, None)?;
        assert_eq!(masks[0].as_raw(), &vec![0, 255, 128, 3]);

        let invalid = Tensor::zeros((2, 2), DType::F32, &Device::Cpu)?;
        assert!(tensor_to_masks(&invalid, None).is_err());
        Ok(())
    }

    #[test]
    fn test_tensor_to_masks_from_image() -> anyhow::Result<()> {
        let image = Tensor::ones((1, 2, 2, 3), DType::F32, &Device::Cpu)?;
        let masks = tensor_to_masks(&image, None)?;
        assert!(masks[0].pixels().all(|p| p.0[0] == 255));
        Ok(())
    }

    #[test]
    fn test_tensor_to_masks_force_size() -> anyhow::Result<()> {
        let mask = Tensor::ones((2, 2, 2), DType::F32, &Device::Cpu)?;
        let masks = tensor_to_masks(&mask, Some((8, 4)))?;
        assert_eq!(masks.len(), 2);
        assert!(masks.iter().all(|m| m.dimensions() == (8, 4)));
        Ok(())
    }

    #[test]
    fn test_images_and_masks_to_tensor() -> anyhow::Result<()> {
        let images = vec![RgbImage::new(4, 3), RgbImage::new(4, 3)];
        let tensor = images_to_tensor(&images, &Device::Cpu)?;
        assert_eq!(tensor.dims(), &[2, 3, 4, 3]);

        let masks = vec![GrayImage::new(4, 3)];
        let tensor = masks_to_tensor(&masks, &Device::Cpu)?;
        assert_eq!(tensor.dims(), &[1, 3, 4]);

        assert!(matches!(
            images_to_tensor(&[], &Device::Cpu),
            Err(Error::InputListEmpty)
        ));
        Ok(())
    }
}
