//! 逻辑

#[cfg(feature = "python")]
use pyo3::{
    types::{PyModule, PyModuleMethods},
    Bound, PyResult, Python,
};

#[cfg(feature = "python")]
use crate::core::node::NodeRegister;

mod bool_input;
pub use bool_input::{is_truthy, BoolInput};

mod boolean_and_operator;
pub use boolean_and_operator::BooleanAndOperator;

mod boolean_or_operator;
pub use boolean_or_operator::BooleanOrOperator;

mod boolean_flip;
pub use boolean_flip::BooleanFlip;

/// 逻辑模块
#[cfg(feature = "python")]
pub fn submodule(py: Python<'_>) -> PyResult<Bound<'_, PyModule>> {
    let submodule = PyModule::new(py, "logic")?;
    submodule.add_class::<BooleanAndOperator>()?;
    submodule.add_class::<BooleanOrOperator>()?;
    submodule.add_class::<BooleanFlip>()?;
    Ok(submodule)
}

/// Logic node register
#[cfg(feature = "python")]
pub fn node_register(py: Python<'_>) -> PyResult<Vec<NodeRegister<'_>>> {
    let nodes: Vec<NodeRegister> = vec![
        NodeRegister(
            "BooleanAndOperator",
            py.get_type::<BooleanAndOperator>(),
            "Boolean AND Operator",
        ),
        NodeRegister(
            "BooleanOrOperator",
            py.get_type::<BooleanOrOperator>(),
            "Boolean OR Operator",
        ),
        NodeRegister(
            "BooleanFlip",
            py.get_type::<BooleanFlip>(),
            "Boolean Flip",
        ),
    ];
    Ok(nodes)
}
