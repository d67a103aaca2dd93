//! 布尔或运算

#[cfg(feature = "python")]
use pyo3::{
    pyclass, pymethods,
    types::{PyDict, PyDictMethods, PyType},
    Bound, Py, PyResult, Python,
};

use crate::logic::BoolInput;
#[cfg(feature = "python")]
use crate::{core::category::CATEGORY_LOGIC, wrapper::comfyui::types::NODE_BOOLEAN};

/// 布尔或运算
///
/// 任意输入为真时输出真, 列表输入按 any 归约
#[cfg_attr(feature = "python", pyclass(subclass))]
pub struct BooleanOrOperator {}

#[cfg(feature = "python")]
#[pymethods]
impl BooleanOrOperator {
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
        "Outputs True if either input is True."
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
                for name in ["boolean_a", "boolean_b"] {
                    required.set_item(
                        name,
                        (NODE_BOOLEAN, {
                            let params = PyDict::new(py);
                            params.set_item("default", false)?;
                            params
                        }),
                    )?;
                }
                required
            })?;
            Ok(dict.into())
        })
    }

    #[pyo3(name = "execute")]
    fn execute(&self, boolean_a: BoolInput, boolean_b: BoolInput) -> (bool,) {
        (self.compute(&boolean_a, &boolean_b),)
    }
}

impl BooleanOrOperator {
    pub fn compute(&self, a: &BoolInput, b: &BoolInput) -> bool {
        a.any() || b.any()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truth_table() {
        let node = BooleanOrOperator {};
        let cases = [
            (false, false, false),
            (false, true, true),
            (true, false, true),
            (true, true, true),
        ];
        for (a, b, expected) in cases {
            assert_eq!(node.compute(&a.into(), &b.into()), expected, "{a} OR {b}");
        }
    }

    #[test]
    fn test_sequence_uses_any() {
        let node = BooleanOrOperator {};
        assert!(node.compute(&vec![false, true].into(), &false.into()));
        assert!(!node.compute(&vec![false, false].into(), &false.into()));
        assert!(!node.compute(&BoolInput::Seq(vec![]), &false.into()));
    }
}
