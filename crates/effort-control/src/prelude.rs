//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use effort_control::prelude::*;
//! ```

// 控制层
pub use crate::control::{
    Controller, ControllerHandle, ControllerState, Gains, JointPositionController, Lifecycle,
    LoopConfig, LoopStats, Pid, run_controller,
};

// 配置
pub use crate::config::{ControllerConfig, RobotDescription};

// 硬件边界
pub use crate::hardware::{EffortJointInterface, JointHandle, JointModel, RobotHw};
pub use crate::joint::{JointLimits, JointTopology};
pub use crate::sim::{SimJointParams, SimulatedHardware};

// 错误类型
pub use crate::error::ControllerError;
