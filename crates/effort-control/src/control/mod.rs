//! 控制层
//!
//! - [`pid`]: PID 引擎
//! - [`controller`]: 控制器生命周期 trait
//! - [`joint_position`]: 单关节位置控制器
//! - [`loop_runner`]: 固定频率的宿主循环
//! - [`state`]: 诊断快照

pub mod controller;
pub mod joint_position;
pub mod loop_runner;
pub mod pid;
pub mod state;

pub use controller::Controller;
pub use joint_position::{ControllerHandle, JointPositionController, Lifecycle};
pub use loop_runner::{LoopConfig, LoopStats, run_controller};
pub use pid::{Gains, Pid};
pub use state::ControllerState;
