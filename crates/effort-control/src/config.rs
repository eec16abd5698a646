//! 配置
//!
//! 控制器配置（关节名 + PID 增益）和关节元数据描述都使用 TOML。
//!
//! # 格式
//!
//! ```toml
//! joint = "elbow"
//! publish_every = 10        # 可选，默认 10
//!
//! [pid]
//! p = 100.0                 # 必需
//! i = 0.5                   # 可选，默认 0
//! d = 10.0                  # 可选，默认 0
//! i_clamp = 2.0             # 对称钳位 [-2, 2]
//! # i_clamp_min = -1.0      # 显式上下限覆盖 i_clamp
//! # i_clamp_max = 3.0
//! antiwindup = false
//!
//! [[joints]]
//! name = "elbow"
//! type = "revolute"
//! lower = -3.1
//! upper = 3.1
//! ```
//!
//! 控制器配置与关节描述可以放在同一个文件里，各自忽略不认识的字段。

use crate::error::{ControllerError, Result};
use crate::hardware::JointModel;
use crate::joint::{JointLimits, JointTopology};
use crate::control::Gains;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 默认的诊断输出间隔（周期数）
pub const DEFAULT_PUBLISH_EVERY: u64 = 10;

/// PID 增益配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PidConfig {
    /// 比例增益（必需）
    pub p: Option<f64>,
    /// 积分增益
    #[serde(default)]
    pub i: f64,
    /// 微分增益
    #[serde(default)]
    pub d: f64,
    /// 对称积分钳位
    pub i_clamp: Option<f64>,
    /// 积分钳位上限
    pub i_clamp_max: Option<f64>,
    /// 积分钳位下限
    pub i_clamp_min: Option<f64>,
    /// 是否同时钳位积分累积值
    #[serde(default)]
    pub antiwindup: bool,
}

impl PidConfig {
    /// 转换为 [`Gains`]
    ///
    /// 缺少 `p` 时返回 `MissingConfig("pid.p")`。未指定钳位时上下限都为 0。
    pub fn to_gains(&self) -> Result<Gains> {
        let p = self
            .p
            .ok_or_else(|| ControllerError::MissingConfig("pid.p".to_string()))?;

        let symmetric = self.i_clamp.map(f64::abs).unwrap_or(0.0);
        let i_max = self.i_clamp_max.unwrap_or(symmetric);
        let i_min = self.i_clamp_min.unwrap_or(-symmetric);

        Ok(Gains::new(p, self.i, self.d, i_max, i_min).with_antiwindup(self.antiwindup))
    }
}

/// 控制器配置（原始格式，字段都可能缺失）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawControllerConfig {
    joint: Option<String>,
    pid: Option<PidConfig>,
    publish_every: Option<u64>,
}

/// 控制器配置
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// 被控关节名称
    pub joint: String,
    /// PID 增益
    pub gains: Gains,
    /// 每隔多少个周期尝试输出一次诊断数据
    pub publish_every: u64,
}

impl ControllerConfig {
    /// 从增益直接构造（使用默认诊断间隔）
    pub fn new(joint: impl Into<String>, gains: Gains) -> Self {
        ControllerConfig {
            joint: joint.into(),
            gains,
            publish_every: DEFAULT_PUBLISH_EVERY,
        }
    }

    /// 设置诊断输出间隔
    pub fn with_publish_every(mut self, publish_every: u64) -> Self {
        self.publish_every = publish_every;
        self
    }

    /// 从 TOML 字符串解析
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawControllerConfig = toml::from_str(content)?;

        let joint = raw
            .joint
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ControllerError::MissingConfig("joint".to_string()))?;
        let pid = raw
            .pid
            .ok_or_else(|| ControllerError::MissingConfig("pid".to_string()))?;

        let config = ControllerConfig {
            joint,
            gains: pid.to_gains()?,
            publish_every: raw.publish_every.unwrap_or(DEFAULT_PUBLISH_EVERY),
        };
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.joint.is_empty() {
            return Err(ControllerError::MissingConfig("joint".to_string()));
        }
        if self.publish_every == 0 {
            return Err(ControllerError::ConfigError(
                "publish_every must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// 关节类型（配置文件中的写法）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JointType {
    /// 有限位旋转关节
    Revolute,
    /// 无限位旋转关节
    Continuous,
    /// 直线关节
    Prismatic,
}

/// 单个关节的描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointDescription {
    /// 关节名称
    pub name: String,
    /// 关节类型
    #[serde(rename = "type")]
    pub kind: JointType,
    /// 下限
    pub lower: Option<f64>,
    /// 上限
    pub upper: Option<f64>,
}

/// 关节元数据描述（TOML 关节表）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotDescription {
    /// 所有关节
    #[serde(default)]
    pub joints: Vec<JointDescription>,
}

impl RobotDescription {
    /// 从 TOML 字符串解析
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// 从文件加载
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 按名称查找关节描述
    pub fn joint(&self, name: &str) -> Option<&JointDescription> {
        self.joints.iter().find(|joint| joint.name == name)
    }
}

impl JointModel for RobotDescription {
    fn joint_topology(&self, name: &str) -> Result<JointTopology> {
        let joint = self.joint(name).ok_or_else(|| ControllerError::MissingJointMetadata {
            joint: name.to_string(),
            reason: "joint not present in robot description".to_string(),
        })?;

        match joint.kind {
            JointType::Continuous => Ok(JointTopology::Continuous),
            JointType::Prismatic => Ok(JointTopology::Prismatic),
            JointType::Revolute => {
                let (Some(lower), Some(upper)) = (joint.lower, joint.upper) else {
                    return Err(ControllerError::MissingJointMetadata {
                        joint: name.to_string(),
                        reason: "revolute joint requires lower and upper limits".to_string(),
                    });
                };
                let limits = JointLimits::new(lower, upper);
                if !limits.is_valid() {
                    return Err(ControllerError::InvalidLimits {
                        joint: name.to_string(),
                        lower,
                        upper,
                    });
                }
                Ok(JointTopology::Revolute(limits))
            },
        }
    }
}
