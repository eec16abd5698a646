//! 实时原语错误类型

use thiserror::Error;

/// 实时原语错误
#[derive(Error, Debug)]
pub enum RtError {
    /// 发布线程创建失败
    #[error("Failed to spawn publisher thread '{name}': {source}")]
    Spawn {
        /// 线程名称
        name: String,
        #[source]
        source: std::io::Error,
    },
}
