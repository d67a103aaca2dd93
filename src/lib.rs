pub mod core;
pub mod error;
pub mod wrapper;

pub mod image;
pub mod logic;
pub mod utils;

#[cfg(feature = "python")]
use pyo3::{
    pymodule,
    types::{PyDict, PyDictMethods, PyModule, PyModuleMethods},
    Bound, PyResult, Python,
};

#[cfg(feature = "python")]
use crate::core::node::NodeRegister;

/// A Python module implemented in Rust.
#[cfg(feature = "python")]
#[pymodule]
#[pyo3(name = "comfyui_toolbelt")] // 需要与包名保持一致
fn py_init(py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    // 初始化日志
    // 每个扩展模块都有自己的全局变量, 因此可以自行设置记录器
    let _ = tracing_subscriber::fmt()
        .with_ansi(true)
        .with_max_level(tracing::Level::DEBUG)
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .try_init();

    // 添加子模块
    m.add_submodule(&logic::submodule(py)?)?;
    m.add_submodule(&utils::submodule(py)?)?;
    m.add_submodule(&image::submodule(py)?)?;

    // 注册 ComfyUI NODE_CLASS_MAPPINGS/NODE_DISPLAY_NAME_MAPPINGS
    let node_mapping = PyDict::new(py);
    let name_mapping = PyDict::new(py);

    for node in node_register(py)? {
        node_mapping.set_item(node.0, node.1)?;
        name_mapping.set_item(node.0, node.2)?;
    }

    m.add("NODE_CLASS_MAPPINGS", node_mapping)?;
    m.add("NODE_DISPLAY_NAME_MAPPINGS", name_mapping)?;
    Ok(())
}

/// 节点注册
#[cfg(feature = "python")]
fn node_register(py: Python<'_>) -> PyResult<Vec<NodeRegister<'_>>> {
    let mut nodes: Vec<NodeRegister> = Vec::new();
    nodes.extend(logic::node_register(py)?);
    nodes.extend(utils::node_register(py)?);
    nodes.extend(image::node_register(py)?);
    Ok(nodes)
}
