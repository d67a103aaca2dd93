//! 图片

#[cfg(feature = "python")]
use pyo3::{
    types::{PyModule, PyModuleMethods},
    Bound, PyResult, Python,
};

#[cfg(feature = "python")]
use crate::core::node::NodeRegister;

pub mod load_selected_images;

mod load_selected_images_list;
pub use load_selected_images_list::LoadSelectedImagesList;

mod load_selected_images_batch;
pub use load_selected_images_batch::LoadSelectedImagesBatch;

pub mod fit_image_into_bbox_mask;
pub use fit_image_into_bbox_mask::FitImageIntoBBoxMask;

/// 图片模块
#[cfg(feature = "python")]
pub fn submodule(py: Python<'_>) -> PyResult<Bound<'_, PyModule>> {
    let submodule = PyModule::new(py, "image")?;
    submodule.add_class::<LoadSelectedImagesList>()?;
    submodule.add_class::<LoadSelectedImagesBatch>()?;
    submodule.add_class::<FitImageIntoBBoxMask>()?;
    Ok(submodule)
}

/// Image node register
#[cfg(feature = "python")]
pub fn node_register(py: Python<'_>) -> PyResult<Vec<NodeRegister<'_>>> {
    let nodes: Vec<NodeRegister> = vec![
        NodeRegister(
            "LoadSelectedImagesList",
            py.get_type::<LoadSelectedImagesList>(),
            "Load Selected Images (List)",
        ),
        NodeRegister(
            "LoadSelectedImagesBatch",
            py.get_type::<LoadSelectedImagesBatch>(),
            "Load Selected Images (Batch)",
        ),
        NodeRegister(
            "FitImageIntoBBoxMask",
            py.get_type::<FitImageIntoBBoxMask>(),
            "Fit Image into BBox Mask",
        ),
    ];
    Ok(nodes)
}
