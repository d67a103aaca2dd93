//! 将图片放入遮罩包围盒
//!
//! 按遮罩区域的包围盒缩放源图片并贴到画布上, 同时输出
//! 单独的贴图结果和贴图区域遮罩, 用于后续局部重绘。

use image::{imageops, DynamicImage, GrayImage, Luma, RgbImage};

#[cfg(feature = "python")]
use candle_core::Device;
#[cfg(feature = "python")]
use log::info;
#[cfg(feature = "python")]
use pyo3::{
    pyclass, pymethods,
    types::{PyDict, PyDictMethods, PyType},
    Bound, Py, PyAny, PyResult, Python,
};

use crate::{
    core::utils::{
        geometry::{alignment_offset, bbox_from_mask, fit_size, AlignX, AlignY, FitMode},
        resample::Resample,
        tensor::conform_mask,
    },
    error::Error,
};
#[cfg(feature = "python")]
use crate::{
    core::{
        category::CATEGORY_INPAINT,
        utils::{
            geometry::{option_names, parse_option},
            tensor::{images_to_tensor, masks_to_tensor, tensor_to_images, tensor_to_masks},
        },
    },
    wrapper::{
        comfyui::{
            types::{NODE_BOOLEAN, NODE_FLOAT, NODE_IMAGE, NODE_INT, NODE_MASK},
            PromptServer,
        },
        torch::tensor::TensorWrapper,
    },
};

/// 贴图参数
#[derive(Debug, Clone)]
pub struct FitOptions {
    pub mode: FitMode,
    pub align_x: AlignX,
    pub align_y: AlignY,
    pub offset_x: i64,
    pub offset_y: i64,
    /// [0, 1]
    pub threshold: f32,
    pub pad: u32,
    pub use_source_alpha: bool,
    pub resample: Resample,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            mode: FitMode::Fit,
            align_x: AlignX::Center,
            align_y: AlignY::Center,
            offset_x: 0,
            offset_y: 0,
            threshold: 0.5,
            pad: 0,
            use_source_alpha: false,
            resample: Resample::Lanczos,
        }
    }
}

/// 贴图位置, 包围盒的左上角和尺寸
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// 单帧结果
#[derive(Debug, Clone)]
pub struct FitFrame {
    pub composite: RgbImage,
    /// 黑色背景上的贴图
    pub fitted: RgbImage,
    pub placed_mask: GrayImage,
    /// 遮罩为空时为 None
    pub placement: Option<Placement>,
}

/// 批次结果
#[derive(Debug, Clone)]
pub struct FitBatch {
    pub composites: Vec<RgbImage>,
    pub fitted: Vec<RgbImage>,
    pub placed_masks: Vec<GrayImage>,
    /// 第一帧的位置
    pub placement: Placement,
}

/// 在画布上粘贴, 超出画布的部分被裁剪
fn paste(canvas: &mut RgbImage, fitted: &DynamicImage, x: i64, y: i64, use_alpha: bool) {
    if use_alpha {
        let mut rgba = DynamicImage::ImageRgb8(canvas.clone()).to_rgba8();
        imageops::overlay(&mut rgba, &fitted.to_rgba8(), x, y);
        *canvas = DynamicImage::ImageRgba8(rgba).to_rgb8();
    } else {
        imageops::replace(canvas, &fitted.to_rgb8(), x, y);
    }
}

/// 贴图区域与遮罩取最小值, 贴图区域裁剪到画布范围内
fn placed_mask(mask: &GrayImage, x: i64, y: i64, w: u32, h: u32) -> GrayImage {
    let (x1, y1) = (x + w as i64, y + h as i64);
    GrayImage::from_fn(mask.width(), mask.height(), |px, py| {
        let (px_i, py_i) = (px as i64, py as i64);
        if px_i >= x && px_i < x1 && py_i >= y && py_i < y1 {
            *mask.get_pixel(px, py)
        } else {
            Luma([0])
        }
    })
}

/// 处理单帧
pub fn fit_frame(
    source: &DynamicImage,
    canvas: RgbImage,
    mask: &GrayImage,
    options: &FitOptions,
) -> FitFrame {
    let (canvas_w, canvas_h) = canvas.dimensions();
    let mask = conform_mask(mask.clone(), canvas_w, canvas_h);

    let Some(bbox) = bbox_from_mask(&mask, options.threshold) else {
        return FitFrame {
            composite: canvas,
            fitted: RgbImage::new(canvas_w, canvas_h),
            placed_mask: GrayImage::new(canvas_w, canvas_h),
            placement: None,
        };
    };

    let bbox = bbox.expand(options.pad, canvas_w, canvas_h);
    let box_w = bbox.width().max(1);
    let box_h = bbox.height().max(1);

    let (new_w, new_h) = fit_size(source.width(), source.height(), box_w, box_h, options.mode);
    let (ax, ay) = alignment_offset(options.align_x, options.align_y, box_w, box_h, new_w, new_h);
    let x = bbox.x0 as i64 + ax + options.offset_x;
    let y = bbox.y0 as i64 + ay + options.offset_y;

    let resized = DynamicImage::ImageRgba8(imageops::resize(
        &source.to_rgba8(),
        new_w,
        new_h,
        options.resample.filter_type(),
    ));

    let mut composite = canvas;
    paste(&mut composite, &resized, x, y, options.use_source_alpha);

    let mut fitted = RgbImage::new(canvas_w, canvas_h);
    paste(&mut fitted, &resized, x, y, options.use_source_alpha);

    FitFrame {
        composite,
        fitted,
        placed_mask: placed_mask(&mask, x, y, new_w, new_h),
        placement: Some(Placement {
            x: bbox.x0,
            y: bbox.y0,
            w: box_w,
            h: box_h,
        }),
    }
}

/// 批次大小, 任意输入为空时报错
pub fn batch_size(lengths: &[usize]) -> Result<usize, Error> {
    if lengths.iter().any(|&len| len == 0) {
        return Err(Error::InputListEmpty);
    }
    Ok(lengths.iter().copied().max().unwrap_or_default())
}

/// 长度为 1 的批次重复到指定大小, 其他不一致的长度报错
pub fn broadcast<T: Clone>(items: Vec<T>, batch: usize, name: &str) -> Result<Vec<T>, Error> {
    match items.len() {
        len if len == batch => Ok(items),
        1 => Ok(vec![items[0].clone(); batch]),
        len => Err(Error::BatchMismatch(format!(
            "{name} has {len} frames, expected 1 or {batch}"
        ))),
    }
}

/// 批次处理
pub fn fit_batch(
    sources: Vec<DynamicImage>,
    canvases: Vec<RgbImage>,
    masks: Vec<GrayImage>,
    options: &FitOptions,
) -> Result<FitBatch, Error> {
    let batch = batch_size(&[sources.len(), canvases.len(), masks.len()])?;
    let sources = broadcast(sources, batch, "source")?;
    let canvases = broadcast(canvases, batch, "destination")?;
    let masks = broadcast(masks, batch, "mask")?;

    let mut result = FitBatch {
        composites: Vec::with_capacity(batch),
        fitted: Vec::with_capacity(batch),
        placed_masks: Vec::with_capacity(batch),
        placement: Placement::default(),
    };

    for (index, ((source, canvas), mask)) in sources
        .iter()
        .zip(canvases)
        .zip(masks.iter())
        .enumerate()
    {
        let frame = fit_frame(source, canvas, mask, options);
        if index == 0 {
            result.placement = frame.placement.unwrap_or_default();
        }
        result.composites.push(frame.composite);
        result.fitted.push(frame.fitted);
        result.placed_masks.push(frame.placed_mask);
    }

    Ok(result)
}

/// 将图片放入遮罩包围盒
#[cfg_attr(feature = "python", pyclass(subclass))]
pub struct FitImageIntoBBoxMask {
    #[cfg(feature = "python")]
    device: Device,
}

#[cfg(feature = "python")]
impl PromptServer for FitImageIntoBBoxMask {}

#[cfg(feature = "python")]
#[pymethods]
impl FitImageIntoBBoxMask {
    #[new]
    fn new() -> Self {
        Self {
            device: Device::Cpu,
        }
    }

    #[classattr]
    #[pyo3(name = "RETURN_TYPES")]
    fn return_types() -> (
        &'static str,
        &'static str,
        &'static str,
        &'static str,
        &'static str,
        &'static str,
        &'static str,
    ) {
        (
            NODE_IMAGE, NODE_IMAGE, NODE_MASK, NODE_INT, NODE_INT, NODE_INT, NODE_INT,
        )
    }

    #[classattr]
    #[pyo3(name = "RETURN_NAMES")]
    fn return_names() -> (
        &'static str,
        &'static str,
        &'static str,
        &'static str,
        &'static str,
        &'static str,
        &'static str,
    ) {
        (
            "composite",
            "fitted_source",
            "placed_mask",
            "x",
            "y",
            "w",
            "h",
        )
    }

    #[classattr]
    #[pyo3(name = "CATEGORY")]
    const CATEGORY: &'static str = CATEGORY_INPAINT;

    #[classattr]
    #[pyo3(name = "DESCRIPTION")]
    fn description() -> &'static str {
        "Scales the source image into the bounding box of the mask and pastes it onto the destination (or a black canvas)."
    }

    #[classattr]
    #[pyo3(name = "FUNCTION")]
    const FUNCTION: &'static str = "execute";

    #[classmethod]
    #[pyo3(name = "INPUT_TYPES")]
    fn input_types(_cls: &Bound<'_, PyType>) -> PyResult<Py<PyDict>> {
        Python::with_gil(|py| {
            let dict = PyDict::new(py);
            dict.set_item("required", {
                let required = PyDict::new(py);
                required.set_item("source", (NODE_IMAGE,))?;
                required.set_item("mask", (NODE_MASK,))?;
                required.set_item(
                    "mode",
                    (option_names::<FitMode>(), {
                        let mode = PyDict::new(py);
                        mode.set_item("default", FitMode::Fit.to_string())?;
                        mode
                    }),
                )?;
                required.set_item(
                    "align_x",
                    (option_names::<AlignX>(), {
                        let align_x = PyDict::new(py);
                        align_x.set_item("default", AlignX::Center.to_string())?;
                        align_x
                    }),
                )?;
                required.set_item(
                    "align_y",
                    (option_names::<AlignY>(), {
                        let align_y = PyDict::new(py);
                        align_y.set_item("default", AlignY::Center.to_string())?;
                        align_y
                    }),
                )?;
                for name in ["offset_x", "offset_y"] {
                    required.set_item(
                        name,
                        (NODE_INT, {
                            let offset = PyDict::new(py);
                            offset.set_item("default", 0)?;
                            offset.set_item("min", -4096)?;
                            offset.set_item("max", 4096)?;
                            offset.set_item("step", 1)?;
                            offset
                        }),
                    )?;
                }
                required.set_item(
                    "threshold",
                    (NODE_FLOAT, {
                        let threshold = PyDict::new(py);
                        threshold.set_item("default", 0.5)?;
                        threshold.set_item("min", 0.0)?;
                        threshold.set_item("max", 1.0)?;
                        threshold.set_item("step", 0.01)?;
                        threshold
                    }),
                )?;
                required.set_item(
                    "pad",
                    (NODE_INT, {
                        let pad = PyDict::new(py);
                        pad.set_item("default", 0)?;
                        pad.set_item("min", 0)?;
                        pad.set_item("max", 4096)?;
                        pad.set_item("step", 1)?;
                        pad
                    }),
                )?;
                required.set_item(
                    "use_source_alpha",
                    (NODE_BOOLEAN, {
                        let use_source_alpha = PyDict::new(py);
                        use_source_alpha.set_item("default", false)?;
                        use_source_alpha
                    }),
                )?;
                required.set_item(
                    "antialias",
                    (Resample::options(), {
                        let antialias = PyDict::new(py);
                        antialias.set_item("default", Resample::Lanczos.to_string())?;
                        antialias
                    }),
                )?;
                required
            })?;

            dict.set_item("optional", {
                let optional = PyDict::new(py);
                optional.set_item("destination", (NODE_IMAGE,))?;
                for name in ["canvas_w", "canvas_h"] {
                    optional.set_item(
                        name,
                        (NODE_INT, {
                            let size = PyDict::new(py);
                            size.set_item("default", 1024)?;
                            size.set_item("min", 16)?;
                            size.set_item("max", 8192)?;
                            size.set_item("step", 1)?;
                            size
                        }),
                    )?;
                }
                optional
            })?;

            Ok(dict.into())
        })
    }

    #[allow(clippy::type_complexity, clippy::too_many_arguments)]
    #[pyo3(
        name = "execute",
        signature = (
            source,
            mask,
            mode = String::from("fit"),
            align_x = String::from("center"),
            align_y = String::from("center"),
            offset_x = 0,
            offset_y = 0,
            threshold = 0.5,
            pad = 0,
            use_source_alpha = false,
            antialias = String::from("lanczos"),
            destination = None,
            canvas_w = 1024,
            canvas_h = 1024
        )
    )]
    fn execute<'py>(
        &self,
        py: Python<'py>,
        source: Bound<'py, PyAny>,
        mask: Bound<'py, PyAny>,
        mode: String,
        align_x: String,
        align_y: String,
        offset_x: i64,
        offset_y: i64,
        threshold: f32,
        pad: u32,
        use_source_alpha: bool,
        antialias: String,
        destination: Option<Bound<'py, PyAny>>,
        canvas_w: u32,
        canvas_h: u32,
    ) -> PyResult<(
        Bound<'py, PyAny>,
        Bound<'py, PyAny>,
        Bound<'py, PyAny>,
        u32,
        u32,
        u32,
        u32,
    )> {
        let options = FitOptions {
            mode: parse_option(&mode),
            align_x: parse_option(&align_x),
            align_y: parse_option(&align_y),
            offset_x,
            offset_y,
            threshold,
            pad,
            use_source_alpha,
            resample: Resample::from_name(&antialias),
        };

        let result = self
            .fit(&source, &mask, destination.as_ref(), canvas_w, canvas_h, &options)
            .map_err(|e| self.raise_error(py, "FitImageIntoBBoxMask", e))?;
        let placement = result.placement;
        info!("fit image into bbox {placement:?}");

        let composites = images_to_tensor(&result.composites, &self.device)
            .map_err(|e| self.raise_error(py, "FitImageIntoBBoxMask", e))?;
        let fitted = images_to_tensor(&result.fitted, &self.device)
            .map_err(|e| self.raise_error(py, "FitImageIntoBBoxMask", e))?;
        let placed_masks = masks_to_tensor(&result.placed_masks, &self.device)
            .map_err(|e| self.raise_error(py, "FitImageIntoBBoxMask", e))?;

        Ok((
            TensorWrapper::from(composites).to_py_tensor(py)?,
            TensorWrapper::from(fitted).to_py_tensor(py)?,
            TensorWrapper::from(placed_masks).to_py_tensor(py)?,
            placement.x,
            placement.y,
            placement.w,
            placement.h,
        ))
    }
}

#[cfg(feature = "python")]
impl FitImageIntoBBoxMask {
    fn fit(
        &self,
        source: &Bound<'_, PyAny>,
        mask: &Bound<'_, PyAny>,
        destination: Option<&Bound<'_, PyAny>>,
        canvas_w: u32,
        canvas_h: u32,
        options: &FitOptions,
    ) -> Result<FitBatch, Error> {
        let source = TensorWrapper::new(source, &self.device)?.into_tensor();
        let sources = tensor_to_images(&source)?;

        let canvases = match destination {
            Some(destination) => {
                let destination = TensorWrapper::new(destination, &self.device)?.into_tensor();
                tensor_to_images(&destination)?
                    .iter()
                    .map(DynamicImage::to_rgb8)
                    .collect()
            }
            None => vec![RgbImage::new(canvas_w, canvas_h)],
        };

        let mask = TensorWrapper::new(mask, &self.device)?.into_tensor();
        let masks = tensor_to_masks(&mask, canvases.first().map(RgbImage::dimensions))?;

        fit_batch(sources, canvases, masks, options)
    }
}
