//! 硬件抽象接口
//!
//! 控制器只通过这里的 trait 与外部协作者交互：
//!
//! - [`JointHandle`]: 读取关节位置/速度、写入力矩（或力）
//! - [`EffortJointInterface`]: 按名称解析关节句柄（初始化时调用一次）
//! - [`JointModel`]: 按名称解析关节类型与限位（初始化时调用一次）
//! - [`RobotHw`]: 宿主循环每个周期的 read / write 钩子
//!
//! 句柄由硬件层拥有，控制器持有的是一个轻量的访问能力（通常内部是 `Arc`），
//! 初始化之后不再更换。

use crate::error::Result;
use crate::joint::JointTopology;
use std::time::Duration;

/// 关节句柄
///
/// 所有方法都在实时线程中调用，实现不能阻塞或分配内存。
pub trait JointHandle: Send {
    /// 关节名称
    fn name(&self) -> &str;

    /// 当前位置（rad 或 m）
    fn position(&self) -> f64;

    /// 当前速度（rad/s 或 m/s）
    fn velocity(&self) -> f64;

    /// 写入力矩/力命令
    fn set_command(&mut self, effort: f64);
}

/// 力矩控制关节接口
pub trait EffortJointInterface {
    /// 关节句柄类型
    type Handle: JointHandle;

    /// 按名称获取关节句柄，不存在时返回 `None`
    fn handle(&self, name: &str) -> Option<Self::Handle>;
}

/// 关节元数据来源（运动学模型描述）
pub trait JointModel {
    /// 解析关节类型；旋转关节必须带限位
    ///
    /// 解析失败时返回 [`ControllerError::MissingJointMetadata`](crate::ControllerError::MissingJointMetadata)
    /// 或 [`ControllerError::InvalidLimits`](crate::ControllerError::InvalidLimits)。
    fn joint_topology(&self, name: &str) -> Result<JointTopology>;
}

/// 宿主循环的硬件钩子
///
/// 每个周期的顺序：`read()` → 控制器 `update()` → `write()`。
pub trait RobotHw {
    /// 从硬件读取最新状态
    fn read(&mut self, now: Duration, period: Duration);

    /// 把命令写入硬件
    fn write(&mut self, now: Duration, period: Duration);
}
