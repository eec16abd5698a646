//! 关节拓扑与限位
//!
//! 关节类型在初始化时从外部元数据确定一次，之后不再改变。
//! 位置误差的计算方式由关节类型决定：
//!
//! | 类型 | 误差 |
//! |------|------|
//! | `Revolute` | 限位约束下的角距离（不穿过限位外区域） |
//! | `Continuous` | 最短角距离，范围 `(-π, π]` |
//! | `Prismatic` | `setpoint - position` |

use crate::angles::{shortest_angular_distance, shortest_angular_distance_with_limits};
use std::fmt;

/// 关节位置限位
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointLimits {
    /// 下限（rad 或 m）
    pub lower: f64,
    /// 上限（rad 或 m）
    pub upper: f64,
}

impl JointLimits {
    /// 创建限位（不做校验，见 [`is_valid`](Self::is_valid)）
    #[inline]
    pub const fn new(lower: f64, upper: f64) -> Self {
        JointLimits { lower, upper }
    }

    /// 两端都是有限值且 `lower <= upper`
    pub fn is_valid(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite() && self.lower <= self.upper
    }

    /// 位置是否在限位内（含边界）
    #[inline]
    pub fn contains(&self, position: f64) -> bool {
        position >= self.lower && position <= self.upper
    }
}

/// 关节拓扑
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JointTopology {
    /// 有限位的旋转关节
    Revolute(JointLimits),
    /// 无限位的旋转关节
    Continuous,
    /// 直线关节
    Prismatic,
}

impl JointTopology {
    /// 从当前位置到设定值的位置误差
    #[inline]
    pub fn position_error(&self, setpoint: f64, position: f64) -> f64 {
        match self {
            JointTopology::Revolute(limits) => {
                shortest_angular_distance_with_limits(position, setpoint, limits.lower, limits.upper)
                    .value()
            },
            JointTopology::Continuous => shortest_angular_distance(position, setpoint),
            JointTopology::Prismatic => setpoint - position,
        }
    }

    /// 类型名称
    pub const fn name(&self) -> &'static str {
        match self {
            JointTopology::Revolute(_) => "revolute",
            JointTopology::Continuous => "continuous",
            JointTopology::Prismatic => "prismatic",
        }
    }

    /// 限位（只有 `Revolute` 有）
    pub fn limits(&self) -> Option<JointLimits> {
        match self {
            JointTopology::Revolute(limits) => Some(*limits),
            _ => None,
        }
    }
}

impl fmt::Display for JointTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JointTopology::Revolute(limits) => {
                write!(f, "revolute [{:.4}, {:.4}]", limits.lower, limits.upper)
            },
            _ => write!(f, "{}", self.name()),
        }
    }
}
