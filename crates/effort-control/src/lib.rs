//! # Effort Control - 单关节力矩位置控制器
//!
//! 读取一个关节的位置和速度，用 PID 计算力矩（旋转关节）或力（直线关节），
//! 使关节跟踪一个可以在运行中从非实时线程更新的目标位置。
//!
//! # 架构
//!
//! - **数学层** (`angles`, `joint`): 角度归一化、限位约束下的角距离、按关节类型计算误差
//! - **控制层** (`control`): PID 引擎、控制器生命周期、位置控制器、宿主循环
//! - **边界** (`hardware`, `config`): 硬件句柄与关节元数据的 trait，TOML 配置
//! - **仿真** (`sim`): 无硬件运行用的刚体关节
//!
//! 设定值和增益通过 `effort-rt` 的无锁缓冲进入实时线程，
//! 诊断快照通过 `effort-rt` 的实时发布器离开实时线程。
//!
//! # 快速开始
//!
//! ```rust
//! use effort_control::prelude::*;
//! use std::time::Duration;
//!
//! let hw = SimulatedHardware::new().with_joint("slider", SimJointParams::default());
//! let model = RobotDescription::from_toml_str(
//!     r#"
//!     [[joints]]
//!     name = "slider"
//!     type = "prismatic"
//!     "#,
//! )?;
//! let config = ControllerConfig::new("slider", Gains::new(1.0, 0.0, 0.0, 0.0, 0.0));
//!
//! let mut controller = JointPositionController::init(&hw, &model, &config)?;
//! let mut handle = controller.take_handle().unwrap();
//!
//! controller.starting(Duration::ZERO);
//! handle.set_command(1.0);
//! controller.update(Duration::from_millis(1), Duration::from_millis(1));
//!
//! assert_eq!(hw.effort("slider"), Some(1.0));
//! # Ok::<(), ControllerError>(())
//! ```

pub mod angles;
pub mod config;
pub mod control;
pub mod error;
pub mod hardware;
pub mod joint;
pub mod sim;

pub mod prelude;

pub use config::{ControllerConfig, JointDescription, JointType, PidConfig, RobotDescription};
pub use control::{
    Controller, ControllerHandle, ControllerState, Gains, JointPositionController, Lifecycle,
    LoopConfig, LoopStats, Pid, run_controller,
};
pub use error::{ControllerError, Result};
pub use hardware::{EffortJointInterface, JointHandle, JointModel, RobotHw};
pub use joint::{JointLimits, JointTopology};
