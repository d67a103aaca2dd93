//! 加载选中的图片 (批次)

use candle_core::{Device, Tensor};
#[cfg(feature = "python")]
use log::info;
#[cfg(feature = "python")]
use pyo3::{
    pyclass, pymethods,
    types::{PyDict, PyDictMethods, PyType},
    Bound, Py, PyAny, PyResult, Python,
};

use crate::{
    error::Error,
    image::load_selected_images::{SelectedImageLoader, SelectedImages},
};
#[cfg(feature = "python")]
use crate::{
    core::category::CATEGORY_IMAGE,
    wrapper::{
        comfy::folder_paths::FolderPaths,
        comfyui::{
            types::{NODE_BOOLEAN, NODE_IMAGE, NODE_INT, NODE_STRING},
            PromptServer,
        },
        torch::tensor::TensorWrapper,
    },
};

/// 加载选中的图片, 全部缩放到第一张图片的尺寸后合并为一个批次
#[cfg_attr(feature = "python", pyclass(subclass))]
pub struct LoadSelectedImagesBatch {
    device: Device,
}

#[cfg(feature = "python")]
impl PromptServer for LoadSelectedImagesBatch {}

#[cfg(feature = "python")]
#[pymethods]
impl LoadSelectedImagesBatch {
    #[new]
    fn new() -> Self {
        Self::default()
    }

    #[classattr]
    #[pyo3(name = "RETURN_TYPES")]
    fn return_types() -> (&'static str,) {
        (NODE_IMAGE,)
    }

    #[classattr]
    #[pyo3(name = "RETURN_NAMES")]
    fn return_names() -> (&'static str,) {
        ("images",)
    }

    #[classattr]
    #[pyo3(name = "CATEGORY")]
    const CATEGORY: &'static str = CATEGORY_IMAGE;

    #[classattr]
    #[pyo3(name = "DESCRIPTION")]
    fn description() -> &'static str {
        "Loads the images listed in selected_paths (relative to the ComfyUI input directory) as one batch, resized to the first image."
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
                required.set_item(
                    "selected_paths",
                    (NODE_STRING, {
                        let selected_paths = PyDict::new(py);
                        selected_paths.set_item("multiline", true)?;
                        selected_paths.set_item("default", "")?;
                        selected_paths.set_item(
                            "placeholder",
                            "Filled by the 'Pick images' button (JSON array).",
                        )?;
                        selected_paths
                    }),
                )?;
                required
            })?;

            dict.set_item("optional", {
                let optional = PyDict::new(py);
                optional.set_item(
                    "max_images",
                    (NODE_INT, {
                        let max_images = PyDict::new(py);
                        max_images.set_item("default", 0)?;
                        max_images.set_item("min", 0)?;
                        max_images.set_item("step", 1)?;
                        max_images.set_item("tooltip", "Maximum number of images, 0 for unlimited")?;
                        max_images
                    }),
                )?;
                optional.set_item(
                    "fail_if_empty",
                    (NODE_BOOLEAN, {
                        let fail_if_empty = PyDict::new(py);
                        fail_if_empty.set_item("default", false)?;
                        fail_if_empty.set_item("tooltip", "Raise an error when no image could be loaded")?;
                        fail_if_empty
                    }),
                )?;
                optional
            })?;

            Ok(dict.into())
        })
    }

    #[pyo3(
        name = "execute",
        signature = (selected_paths = String::new(), max_images = 0, fail_if_empty = false)
    )]
    fn execute<'py>(
        &self,
        py: Python<'py>,
        selected_paths: String,
        max_images: usize,
        fail_if_empty: bool,
    ) -> PyResult<(Bound<'py, PyAny>,)> {
        let folder_paths = FolderPaths::from_comfy(py);
        let loader =
            SelectedImageLoader::new(folder_paths.input_directory()).with_max_images(max_images);

        let batch = self
            .load_batch(&loader, &selected_paths, fail_if_empty)
            .map_err(|e| self.raise_error(py, "LoadSelectedImagesBatch", e))?;
        info!("loaded image batch {:?}", batch.dims());

        let images = TensorWrapper::from(batch).to_py_tensor(py)?;
        Ok((images,))
    }
}

impl Default for LoadSelectedImagesBatch {
    fn default() -> Self {
        Self {
            device: Device::Cpu,
        }
    }
}

impl LoadSelectedImagesBatch {
    /// 加载并合并为 [B, H, W, 3]
    pub fn load_batch(
        &self,
        loader: &SelectedImageLoader,
        selected_paths: &str,
        fail_if_empty: bool,
    ) -> Result<Tensor, Error> {
        let result: SelectedImages = loader.load(selected_paths);
        if fail_if_empty && result.images.is_empty() {
            return Err(Error::NoImagesLoaded(result.missing_summary()));
        }
        result.into_batch(&self.device)
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;

    #[test]
    fn test_empty_batch() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let loader = SelectedImageLoader::new(root.path());
        let node = LoadSelectedImagesBatch::default();

        let batch = node.load_batch(&loader, "missing.png", false)?;
        assert_eq!(batch.dims(), &[0, 64, 64, 3]);

        let err = node.load_batch(&loader, "missing.png", true);
        assert!(matches!(err, Err(Error::NoImagesLoaded(msg)) if msg.contains("missing.png")));
        Ok(())
    }

    #[test]
    fn test_batch() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        RgbImage::from_pixel(100, 50, Rgb([255, 255, 255])).save(root.path().join("a.png"))?;
        RgbImage::from_pixel(200, 100, Rgb([0, 0, 0])).save(root.path().join("b.jpg"))?;

        let loader = SelectedImageLoader::new(root.path());
        let node = LoadSelectedImagesBatch::default();
        let batch = node.load_batch(&loader, r#"["a.png", "b.jpg"]"#, true)?;
        assert_eq!(batch.dims(), &[2, 50, 100, 3]);
        Ok(())
    }
}
