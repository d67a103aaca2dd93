//! torch.Tensor 与 candle Tensor 相互转换
//! 依赖:
//! - python: torch

use candle_core::{Device, Tensor};
use numpy::{PyArray, PyArrayDyn, PyArrayMethods, PyUntypedArrayMethods};
use pyo3::{
    exceptions::PyRuntimeError, types::PyAnyMethods, Bound, IntoPyObject, PyAny, PyErr, PyResult,
    Python,
};

use crate::error::Error;

/// float32 张量包装
pub struct TensorWrapper {
    tensor: Tensor,
}

impl TensorWrapper {
    pub fn new(py_any: &Bound<'_, PyAny>, device: &Device) -> Result<Self, Error> {
        let tensor = Self::torch_to_candle(py_any, device)?;
        Ok(Self { tensor })
    }

    pub fn from_tensor(tensor: Tensor) -> Self {
        Self { tensor }
    }

    pub fn into_tensor(self) -> Tensor {
        self.tensor
    }

    /// 从 Python torch.Tensor 转为 Rust candle_core::Tensor
    ///
    /// 输入张量可能在 GPU 上, 也可能不是连续内存或 float32
    fn torch_to_candle(torch_tensor: &Bound<'_, PyAny>, device: &Device) -> Result<Tensor, Error> {
        let np = torch_tensor
            .call_method0("detach")?
            .call_method0("cpu")?
            .call_method0("float")?
            .call_method0("contiguous")?
            .call_method0("numpy")?;

        let arr = np
            .downcast::<PyArrayDyn<f32>>()
            .map_err(|e| Error::PyDowncastError(e.to_string()))?;

        let shape = arr.shape().to_vec();
        let data = arr.to_vec()?;

        let tensor = Tensor::from_vec(data, shape, device)?;
        Ok(tensor)
    }

    /// 转换为python对象
    ///
    /// ```python,ignore
    /// import torch
    /// tensor = torch.from_numpy(data)
    /// ```
    pub fn to_py_tensor<'py>(self, py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
        let data = self.into_pyobject(py)?;

        let torch = py.import("torch")?;
        torch.getattr("from_numpy")?.call1((data,))
    }
}

impl From<Tensor> for TensorWrapper {
    fn from(value: Tensor) -> Self {
        TensorWrapper::from_tensor(value)
    }
}

impl<'py> IntoPyObject<'py> for TensorWrapper {
    type Target = PyArrayDyn<f32>;
    type Output = Bound<'py, Self::Target>;
    type Error = PyErr;

    fn into_pyobject(self, py: Python<'py>) -> Result<Self::Output, Self::Error> {
        let tensor = self.into_tensor();
        let shape = tensor.dims().to_vec();

        let data = tensor
            .flatten_all()
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(|e| PyErr::new::<PyRuntimeError, _>(e.to_string()))?;

        PyArray::from_vec(py, data).reshape(shape)
    }
}
