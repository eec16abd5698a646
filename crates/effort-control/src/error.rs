//! 错误类型
//!
//! 只有初始化阶段会失败：配置缺失、关节找不到、关节元数据无法解析。
//! 控制器进入 Running 之后，`update()` 不返回错误。

use thiserror::Error;

/// 控制器错误类型
#[derive(Debug, Error)]
pub enum ControllerError {
    /// 缺少必需的配置项
    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    /// 配置值无效
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// 硬件接口中找不到关节
    #[error("Joint '{joint}' not found in hardware interface")]
    JointNotFound {
        /// 关节名称
        joint: String,
    },

    /// 无法获取关节类型或限位
    #[error("Could not resolve metadata for joint '{joint}': {reason}")]
    MissingJointMetadata {
        /// 关节名称
        joint: String,
        /// 失败原因
        reason: String,
    },

    /// 关节限位无效（非有限值或 lower > upper）
    #[error("Invalid limits for joint '{joint}': lower {lower:.3}, upper {upper:.3}")]
    InvalidLimits {
        /// 关节名称
        joint: String,
        /// 下限
        lower: f64,
        /// 上限
        upper: f64,
    },

    /// TOML 解析错误
    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// 文件读写错误
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 实时原语错误（如发布线程创建失败）
    #[error("Realtime error: {0}")]
    Realtime(#[from] effort_rt::RtError),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, ControllerError>;
