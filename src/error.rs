//! 错误处理

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // 标准库错误处理
    #[error("io error, {0}")]
    Io(std::io::Error),

    #[error("the input list is empty")]
    InputListEmpty,
    #[error("batch size mismatch, {0}")]
    BatchMismatch(String),

    #[error("tensor error, {0}")]
    TensorErr(#[from] candle_core::Error),
    #[error("invalid tensor shape, {0}")]
    InvalidTensorShape(String),
    #[error("unsupported number of channels, {0}")]
    UnsupportedNumberOfChannels(u32),

    #[error("creating image buffer error")]
    ImageBuffer,
    #[error("image error, {0}")]
    ImageError(#[from] image::ImageError),
    #[error("no images could be loaded, missing: {0}")]
    NoImagesLoaded(String),
    #[error("unsupported image format, {0}")]
    UnsupportedImageFormat(String),
    #[error("path escapes the input directory, {0}")]
    PathOutsideRoot(String),
    #[error("file not found, {0}")]
    FileNotFound(String),

    #[cfg(feature = "python")]
    #[error("py error, {0}")]
    PyErr(#[from] pyo3::PyErr),
    #[cfg(feature = "python")]
    #[error("py downcast error, {0}")]
    PyDowncastError(String),
    #[cfg(feature = "python")]
    #[error("numpy error, {0}")]
    NotContiguousError(#[from] numpy::NotContiguousError),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
