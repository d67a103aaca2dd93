//! 工具

#[cfg(feature = "python")]
use pyo3::{
    types::{PyModule, PyModuleMethods},
    Bound, PyResult, Python,
};

#[cfg(feature = "python")]
use crate::core::node::NodeRegister;

mod bypass_on_bool;
pub use bypass_on_bool::BypassOnBool;

mod mute_on_bool;
pub use mute_on_bool::MuteOnBool;

pub mod append_loras_to_string;
pub use append_loras_to_string::{AppendLorasToString, AppendOptions};

/// 工具模块
#[cfg(feature = "python")]
pub fn submodule(py: Python<'_>) -> PyResult<Bound<'_, PyModule>> {
    let submodule = PyModule::new(py, "utils")?;
    submodule.add_class::<BypassOnBool>()?;
    submodule.add_class::<MuteOnBool>()?;
    submodule.add_class::<AppendLorasToString>()?;
    Ok(submodule)
}

/// Utils node register
#[cfg(feature = "python")]
pub fn node_register(py: Python<'_>) -> PyResult<Vec<NodeRegister<'_>>> {
    let nodes: Vec<NodeRegister> = vec![
        NodeRegister(
            "BypassOnBool",
            py.get_type::<BypassOnBool>(),
            "Forward/Bypass on Boolean (Any)",
        ),
        NodeRegister(
            "MuteOnBool",
            py.get_type::<MuteOnBool>(),
            "Forward/Mute on Boolean (Any)",
        ),
        NodeRegister(
            append_loras_to_string::NODE_TYPE,
            py.get_type::<AppendLorasToString>(),
            "Power Lora Loader to Prompt (Image Saver)",
        ),
    ];
    Ok(nodes)
}
