//! 加载选中的图片 (列表)

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

#[cfg(feature = "python")]
use crate::{
    core::category::CATEGORY_IMAGE,
    error::Error,
    image::load_selected_images::SelectedImageLoader,
    wrapper::{
        comfy::folder_paths::FolderPaths,
        comfyui::{
            types::{NODE_IMAGE, NODE_INT, NODE_STRING},
            PromptServer,
        },
        torch::tensor::TensorWrapper,
    },
};

/// 加载选中的图片, 输出图片列表, 每张图片保持原始尺寸
#[cfg_attr(feature = "python", pyclass(subclass))]
pub struct LoadSelectedImagesList {
    #[cfg(feature = "python")]
    device: Device,
}

#[cfg(feature = "python")]
impl PromptServer for LoadSelectedImagesList {}

#[cfg(feature = "python")]
#[pymethods]
impl LoadSelectedImagesList {
    #[new]
    fn new() -> Self {
        Self {
            device: Device::Cpu,
        }
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
    #[pyo3(name = "OUTPUT_IS_LIST")]
    fn output_is_list() -> (bool,) {
        (true,)
    }

    #[classattr]
    #[pyo3(name = "CATEGORY")]
    const CATEGORY: &'static str = CATEGORY_IMAGE;

    #[classattr]
    #[pyo3(name = "DESCRIPTION")]
    fn description() -> &'static str {
        "Loads the images listed in selected_paths (relative to the ComfyUI input directory) as an image list."
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
                optional
            })?;

            Ok(dict.into())
        })
    }

    #[pyo3(name = "execute", signature = (selected_paths = String::new(), max_images = 0))]
    fn execute<'py>(
        &self,
        py: Python<'py>,
        selected_paths: String,
        max_images: usize,
    ) -> PyResult<(Vec<Bound<'py, PyAny>>,)> {
        self.load(py, &selected_paths, max_images)
            .map_err(|e| self.raise_error(py, "LoadSelectedImagesList", e))
    }
}

#[cfg(feature = "python")]
impl LoadSelectedImagesList {
    fn load<'py>(
        &self,
        py: Python<'py>,
        selected_paths: &str,
        max_images: usize,
    ) -> Result<(Vec<Bound<'py, PyAny>>,), Error> {
        let folder_paths = FolderPaths::from_comfy(py);
        let loader =
            SelectedImageLoader::new(folder_paths.input_directory()).with_max_images(max_images);

        let result = loader.load(selected_paths);
        info!(
            "loaded {} images, {} skipped",
            result.images.len(),
            result.missing.len()
        );

        let images = result
            .to_tensor_list(&self.device)?
            .into_iter()
            .map(|tensor| TensorWrapper::from(tensor).to_py_tensor(py))
            .collect::<PyResult<Vec<_>>>()?;

        Ok((images,))
    }
}
