use thiserror::Error;

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// 整条流水线的错误类型，任何一种都会直接终止本次运行
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 网络 / HTTP / 文件读取失败
    #[error("failed to fetch {location}: {message}")]
    Fetch { location: String, message: String },

    /// CSV 格式不对，或者数值列里有非数值
    #[error("malformed csv: {0}")]
    Parse(String),

    #[error("country not present in table: {0}")]
    Lookup(String),

    /// 归一化时最大值为 0
    #[error("cannot normalize {series}: maximum is {max}")]
    ArithmeticUndefined { series: String, max: f64 },

    #[error("dataframe operation failed: {0}")]
    Frame(#[from] polars::prelude::PolarsError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    pub(crate) fn fetch(location: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Fetch {
            location: location.into(),
            message: err.to_string(),
        }
    }
}
