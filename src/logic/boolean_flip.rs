//! 布尔取反

#[cfg(feature = "python")]
use pyo3::{
    pyclass, pymethods,
    types::{PyDict, PyDictMethods, PyType},
    Bound, Py, PyResult, Python,
};

use crate::logic::BoolInput;
#[cfg(feature = "python")]
use crate::{core::category::CATEGORY_LOGIC, wrapper::comfyui::types::NODE_BOOLEAN};

/// 布尔取反
#[cfg_attr(feature = "python", pyclass(subclass))]
pub struct BooleanFlip {}

#[cfg(feature = "python")]
#[pymethods]
impl BooleanFlip {
    #[new]
    fn new() -> Self {
        Self {}
    }

    #[classattr]
    #[pyo3(name = "RETURN_TYPES")]
    fn return_types() -> (&'static str,) {
        (NODE_BOOLEAN,)
    }

    #[classattr]
    #[pyo3(name = "RETURN_NAMES")]
    fn return_names() -> (&'static str,) {
        ("boolean",)
    }

    #[classattr]
    #[pyo3(name = "CATEGORY")]
    const CATEGORY: &'static str = CATEGORY_LOGIC;

    #[classattr]
    #[pyo3(name = "DESCRIPTION")]
    fn description() -> &'static str {
        "Flips a boolean value: True becomes False, False becomes True."
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
                    "boolean",
                    (NODE_BOOLEAN, {
                        let params = PyDict::new(py);
                        params.set_item("default", false)?;
                        params
                    }),
                )?;
                required
            })?;
            Ok(dict.into())
        })
    }

    #[pyo3(name = "execute")]
    fn execute(&self, boolean: BoolInput) -> (bool,) {
        (self.compute(&boolean),)
    }
}

impl BooleanFlip {
    /// 列表先按 all 归约再取反
    pub fn compute(&self, value: &BoolInput) -> bool {
        !value.all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip() {
        let node = BooleanFlip {};
        assert!(node.compute(&false.into()));
        assert!(!node.compute(&true.into()));
        assert!(node.compute(&vec![true, false].into()));
        assert!(!node.compute(&vec![true, true].into()));
    }
}
