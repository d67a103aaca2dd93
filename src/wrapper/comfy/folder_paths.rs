//! 文件夹路径
//!
//! 输入目录的查找顺序:
//! 1. ComfyUI `folder_paths.get_input_directory()`
//! 2. 环境变量 `COMFYUI_INPUT_DIR`
//! 3. `<当前目录>/input`

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

#[cfg(feature = "python")]
use log::warn;
#[cfg(feature = "python")]
use pyo3::{
    types::{PyAnyMethods, PyModule},
    PyResult, Python,
};

/// 输入目录环境变量
pub const INPUT_DIR_ENV: &str = "COMFYUI_INPUT_DIR";

/// 环境变量为空时回退到 `<current_dir>/input`
fn resolve_input_directory(env_dir: Option<OsString>, current_dir: &Path) -> PathBuf {
    match env_dir {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => current_dir.join("input"),
    }
}

/// 文件夹路径配置结构体
#[derive(Debug, Clone)]
pub struct FolderPaths {
    /// 输入目录
    input_directory: PathBuf,
}

impl Default for FolderPaths {
    fn default() -> Self {
        let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            input_directory: resolve_input_directory(std::env::var_os(INPUT_DIR_ENV), &current_dir),
        }
    }
}

impl FolderPaths {
    /// 从 ComfyUI 的 folder_paths 模块读取, 失败时使用默认配置
    #[cfg(feature = "python")]
    pub fn from_comfy(py: Python<'_>) -> Self {
        match Self::import_comfy(py) {
            Ok(v) => v,
            Err(e) => {
                warn!("folder_paths is not available, fallback to default, {e}");
                Self::default()
            }
        }
    }

    #[cfg(feature = "python")]
    fn import_comfy(py: Python<'_>) -> PyResult<Self> {
        let folder_paths = PyModule::import(py, "folder_paths")?;
        let input_directory = folder_paths
            .call_method0("get_input_directory")?
            .extract::<PathBuf>()?;

        Ok(Self { input_directory })
    }

    pub fn input_directory(&self) -> &Path {
        &self.input_directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_input_directory() {
        let cwd = Path::new("/opt/ComfyUI");
        assert_eq!(
            resolve_input_directory(Some(OsString::from("/data/in")), cwd),
            PathBuf::from("/data/in")
        );
        assert_eq!(
            resolve_input_directory(Some(OsString::new()), cwd),
            PathBuf::from("/opt/ComfyUI/input")
        );
        assert_eq!(
            resolve_input_directory(None, cwd),
            PathBuf::from("/opt/ComfyUI/input")
        );
    }
}
