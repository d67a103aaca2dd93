//! Prompt Server

use pyo3::{
    exceptions::PyRuntimeError,
    types::{PyAnyMethods, PyDict, PyDictMethods, PyModule},
    PyErr, PyResult, PyTypeInfo, Python,
};

use crate::error::Error;

/// 前端事件名称
const EVENT_NAME: &str = "toolbelt";

/// comfyui PromptServer wrapper
pub trait PromptServer: PyTypeInfo {
    /// 发送日志信息到ComfyUI
    ///
    /// 当前案例, 当节点执行出现异常时通知前端
    fn send_error(&self, py: Python, error_type: String, message: String) -> PyResult<()> {
        let server = PyModule::import(py, "server")?
            .getattr("PromptServer")?
            .getattr("instance")?;

        let error_data = PyDict::new(py);
        error_data.set_item("type", &error_type)?;
        error_data.set_item("node", self.get_class_name(py)?)?;
        error_data.set_item("message", message)?;

        server
            .getattr("send_sync")?
            .call1((EVENT_NAME, error_data))?;

        Ok(())
    }

    /// Class 名称
    fn get_class_name(&self, py: Python) -> PyResult<String> {
        Self::type_object(py)
            .getattr("__name__")?
            .extract::<String>()
    }

    /// 记录错误, 通知前端, 并转换为 python 异常
    fn raise_error(&self, py: Python, error_type: &str, error: Error) -> PyErr {
        log::error!("{error_type} error, {error}");
        if let Err(e) = self.send_error(py, error_type.to_string(), error.to_string()) {
            log::error!("send error failed, {e}");
        }
        PyErr::new::<PyRuntimeError, _>(error.to_string())
    }
}
