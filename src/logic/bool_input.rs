//! 布尔输入转换
//!
//! 上游可能传入单个布尔值, 也可能是列表/元组 (例如 OUTPUT_IS_LIST 的节点),
//! 或者 numpy.bool_ 之类的对象。列表在参与运算前先归约为单个布尔值。

#[cfg(feature = "python")]
use pyo3::{
    types::{PyAnyMethods, PyList, PyListMethods, PyTuple, PyTupleMethods},
    Bound, FromPyObject, PyAny, PyResult,
};
use serde_json::Value;

/// 布尔类输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoolInput {
    Scalar(bool),
    Seq(Vec<BoolInput>),
}

impl BoolInput {
    /// 序列按 all 归约
    pub fn all(&self) -> bool {
        match self {
            BoolInput::Scalar(v) => *v,
            BoolInput::Seq(items) => items.iter().all(BoolInput::all),
        }
    }

    /// 序列按 any 归约
    pub fn any(&self) -> bool {
        match self {
            BoolInput::Scalar(v) => *v,
            BoolInput::Seq(items) => items.iter().any(BoolInput::any),
        }
    }
}

impl Default for BoolInput {
    fn default() -> Self {
        BoolInput::Scalar(false)
    }
}

impl From<bool> for BoolInput {
    fn from(value: bool) -> Self {
        BoolInput::Scalar(value)
    }
}

impl<T: Into<BoolInput>> From<Vec<T>> for BoolInput {
    fn from(values: Vec<T>) -> Self {
        BoolInput::Seq(values.into_iter().map(Into::into).collect())
    }
}

impl From<&Value> for BoolInput {
    fn from(value: &Value) -> Self {
        match value {
            Value::Array(items) => BoolInput::Seq(items.iter().map(BoolInput::from).collect()),
            other => BoolInput::Scalar(is_truthy(other)),
        }
    }
}

/// JSON 值的真值, 与 python 的 bool() 一致
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(v) => *v,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// python 对象转换, 无法判断真值的对象视为 false
#[cfg(feature = "python")]
impl<'py> FromPyObject<'py> for BoolInput {
    fn extract_bound(ob: &Bound<'py, PyAny>) -> PyResult<Self> {
        if let Ok(list) = ob.downcast::<PyList>() {
            let items = list
                .iter()
                .map(|item| BoolInput::extract_bound(&item))
                .collect::<PyResult<Vec<_>>>()?;
            return Ok(BoolInput::Seq(items));
        }
        if let Ok(tuple) = ob.downcast::<PyTuple>() {
            let items = tuple
                .iter()
                .map(|item| BoolInput::extract_bound(&item))
                .collect::<PyResult<Vec<_>>>()?;
            return Ok(BoolInput::Seq(items));
        }

        Ok(BoolInput::Scalar(ob.is_truthy().unwrap_or(false)))
    }
}
