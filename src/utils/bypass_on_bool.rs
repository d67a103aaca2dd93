//! 布尔旁路转发
//!
//! 节点本身原样转发输入, bypass 开关由前端脚本读取, 用于旁路下游直接相连的节点

#[cfg(feature = "python")]
use pyo3::{
    pyclass, pymethods,
    types::{PyDict, PyDictMethods, PyType},
    Bound, Py, PyAny, PyResult, Python,
};

#[cfg(feature = "python")]
use crate::{
    core::category::CATEGORY_UTILS,
    wrapper::comfyui::types::{NODE_ANY, NODE_BOOLEAN},
};

pub const DESCRIPTION: &str = "Forwards the input unchanged. When bypass is True, the directly connected downstream nodes are set to bypass mode.";
pub const TOOLTIP: &str = "Bypass the directly connected downstream nodes when True";

/// 布尔旁路转发
#[cfg_attr(feature = "python", pyclass(subclass))]
pub struct BypassOnBool {}

#[cfg(feature = "python")]
#[pymethods]
impl BypassOnBool {
    #[new]
    fn new() -> Self {
        Self {}
    }

    #[classattr]
    #[pyo3(name = "RETURN_TYPES")]
    fn return_types() -> (&'static str,) {
        (NODE_ANY,)
    }

    #[classattr]
    #[pyo3(name = "RETURN_NAMES")]
    fn return_names() -> (&'static str,) {
        ("any",)
    }

    #[classattr]
    #[pyo3(name = "CATEGORY")]
    const CATEGORY: &'static str = CATEGORY_UTILS;

    #[classattr]
    #[pyo3(name = "DESCRIPTION")]
    fn description() -> &'static str {
        DESCRIPTION
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
                    "any",
                    (NODE_ANY, {
                        let any = PyDict::new(py);
                        any.set_item("tooltip", "any input")?;
                        any
                    }),
                )?;
                required.set_item(
                    "bypass",
                    (NODE_BOOLEAN, {
                        let params = PyDict::new(py);
                        params.set_item("default", false)?;
                        params.set_item("tooltip", TOOLTIP)?;
                        params
                    }),
                )?;
                required
            })?;
            Ok(dict.into())
        })
    }

    #[allow(unused)]
    #[pyo3(name = "execute")]
    fn execute<'py>(&self, any: Bound<'py, PyAny>, bypass: bool) -> (Bound<'py, PyAny>,) {
        (any,)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describes_downstream_nodes() {
        assert!(DESCRIPTION.contains("downstream"));
        assert!(TOOLTIP.contains("downstream"));
        assert!(!DESCRIPTION.contains("upstream"));
    }
}
