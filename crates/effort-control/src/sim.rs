//! 关节仿真
//!
//! 无需硬件即可运行控制器：每个仿真关节是一个刚体（转动惯量 + 粘滞阻尼），
//! 可选硬限位，可选角度回绕（用于无限位旋转关节）。
//!
//! 关节状态存放在原子变量里，句柄读写不加锁，可以直接在实时循环中使用。
//!
//! # 示例
//!
//! ```rust
//! use effort_control::hardware::{EffortJointInterface, JointHandle};
//! use effort_control::sim::{SimJointParams, SimulatedHardware};
//! use std::time::Duration;
//!
//! let hw = SimulatedHardware::new().with_joint("slider", SimJointParams::default());
//! let mut joint = hw.handle("slider").unwrap();
//!
//! joint.set_command(2.0);
//! hw.step(Duration::from_millis(100));
//! assert!(joint.velocity() > 0.0);
//! ```

use crate::angles::normalize_angle;
use crate::hardware::{EffortJointInterface, JointHandle, RobotHw};
use crate::joint::JointLimits;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// 最小转动惯量，防止除零
const MIN_INERTIA: f64 = 1e-9;

/// 仿真关节参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimJointParams {
    /// 转动惯量（kg·m²）或质量（kg）
    pub inertia: f64,
    /// 粘滞阻尼系数
    pub damping: f64,
    /// 初始位置
    pub initial_position: f64,
    /// 硬限位：到达后位置被截断，朝外的速度清零
    pub hard_stops: Option<JointLimits>,
    /// 位置是否回绕到 `(-π, π]`
    pub wrap: bool,
}

impl Default for SimJointParams {
    fn default() -> Self {
        SimJointParams {
            inertia: 1.0,
            damping: 0.0,
            initial_position: 0.0,
            hard_stops: None,
            wrap: false,
        }
    }
}

impl SimJointParams {
    /// 设置转动惯量
    pub fn with_inertia(mut self, inertia: f64) -> Self {
        self.inertia = inertia;
        self
    }

    /// 设置阻尼
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    /// 设置初始位置
    pub fn with_initial_position(mut self, position: f64) -> Self {
        self.initial_position = position;
        self
    }

    /// 设置硬限位
    pub fn with_hard_stops(mut self, limits: JointLimits) -> Self {
        self.hard_stops = Some(limits);
        self
    }

    /// 开启角度回绕
    pub fn wrapping(mut self) -> Self {
        self.wrap = true;
        self
    }
}

#[derive(Debug)]
struct JointCell {
    position: AtomicU64,
    velocity: AtomicU64,
    effort: AtomicU64,
}

impl JointCell {
    fn new(position: f64) -> Self {
        JointCell {
            position: AtomicU64::new(position.to_bits()),
            velocity: AtomicU64::new(0.0_f64.to_bits()),
            effort: AtomicU64::new(0.0_f64.to_bits()),
        }
    }

    #[inline]
    fn load(value: &AtomicU64) -> f64 {
        f64::from_bits(value.load(Ordering::Acquire))
    }

    #[inline]
    fn store(value: &AtomicU64, v: f64) {
        value.store(v.to_bits(), Ordering::Release);
    }
}

/// 仿真关节句柄
#[derive(Debug, Clone)]
pub struct SimJointHandle {
    name: Arc<str>,
    cell: Arc<JointCell>,
}

impl SimJointHandle {
    /// 最近一次写入的力矩/力
    pub fn effort(&self) -> f64 {
        JointCell::load(&self.cell.effort)
    }
}

impl JointHandle for SimJointHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn position(&self) -> f64 {
        JointCell::load(&self.cell.position)
    }

    fn velocity(&self) -> f64 {
        JointCell::load(&self.cell.velocity)
    }

    fn set_command(&mut self, effort: f64) {
        JointCell::store(&self.cell.effort, effort);
    }
}

#[derive(Debug)]
struct SimulatedJoint {
    name: Arc<str>,
    params: SimJointParams,
    cell: Arc<JointCell>,
}

impl SimulatedJoint {
    /// 半隐式欧拉积分一步
    fn step(&self, dt: f64) {
        let effort = JointCell::load(&self.cell.effort);
        let mut velocity = JointCell::load(&self.cell.velocity);
        let mut position = JointCell::load(&self.cell.position);

        let inertia = self.params.inertia.max(MIN_INERTIA);
        let acceleration = (effort - self.params.damping * velocity) / inertia;
        velocity += acceleration * dt;
        position += velocity * dt;

        if let Some(stops) = self.params.hard_stops
            && !stops.contains(position)
        {
            if position < stops.lower {
                position = stops.lower;
                velocity = velocity.max(0.0);
            } else {
                position = stops.upper;
                velocity = velocity.min(0.0);
            }
        }
        if self.params.wrap {
            position = normalize_angle(position);
        }

        JointCell::store(&self.cell.velocity, velocity);
        JointCell::store(&self.cell.position, position);
    }
}

/// 仿真硬件（一组关节）
#[derive(Debug, Default)]
pub struct SimulatedHardware {
    joints: Vec<SimulatedJoint>,
}

impl SimulatedHardware {
    /// 创建空的仿真硬件
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加关节（链式）
    pub fn with_joint(mut self, name: &str, params: SimJointParams) -> Self {
        self.add_joint(name, params);
        self
    }

    /// 添加关节；同名关节会被替换
    pub fn add_joint(&mut self, name: &str, params: SimJointParams) {
        self.joints.retain(|joint| &*joint.name != name);
        self.joints.push(SimulatedJoint {
            name: Arc::from(name),
            params,
            cell: Arc::new(JointCell::new(params.initial_position)),
        });
    }

    fn find(&self, name: &str) -> Option<&SimulatedJoint> {
        self.joints.iter().find(|joint| &*joint.name == name)
    }

    /// 关节位置
    pub fn position(&self, name: &str) -> Option<f64> {
        self.find(name).map(|joint| JointCell::load(&joint.cell.position))
    }

    /// 关节速度
    pub fn velocity(&self, name: &str) -> Option<f64> {
        self.find(name).map(|joint| JointCell::load(&joint.cell.velocity))
    }

    /// 关节当前的力矩/力命令
    pub fn effort(&self, name: &str) -> Option<f64> {
        self.find(name).map(|joint| JointCell::load(&joint.cell.effort))
    }

    /// 直接设置关节状态（测试用），关节不存在时返回 `false`
    pub fn set_state(&self, name: &str, position: f64, velocity: f64) -> bool {
        match self.find(name) {
            Some(joint) => {
                JointCell::store(&joint.cell.position, position);
                JointCell::store(&joint.cell.velocity, velocity);
                true
            },
            None => false,
        }
    }

    /// 所有关节前进 `dt`
    pub fn step(&self, dt: Duration) {
        let dt = dt.as_secs_f64();
        for joint in &self.joints {
            joint.step(dt);
        }
    }
}

impl EffortJointInterface for SimulatedHardware {
    type Handle = SimJointHandle;

    fn handle(&self, name: &str) -> Option<SimJointHandle> {
        self.find(name).map(|joint| SimJointHandle {
            name: Arc::clone(&joint.name),
            cell: Arc::clone(&joint.cell),
        })
    }
}

impl RobotHw for SimulatedHardware {
    fn read(&mut self, _now: Duration, _period: Duration) {
        // 状态已经在共享的原子变量里
    }

    fn write(&mut self, _now: Duration, period: Duration) {
        self.step(period);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_unknown_joint() {
        let hw = SimulatedHardware::new().with_joint("a", SimJointParams::default());
        assert!(hw.handle("b").is_none());
        assert!(hw.position("b").is_none());
        assert!(!hw.set_state("b", 0.0, 0.0));
    }

    #[test]
    fn test_constant_effort_accelerates() {
        let hw = SimulatedHardware::new()
            .with_joint("a", SimJointParams::default().with_inertia(2.0));
        let mut handle = hw.handle("a").unwrap();
        handle.set_command(4.0);

        // a = 2.0，一步 0.5s：v = 1.0，x = 0.5
        hw.step(Duration::from_millis(500));
        assert!((handle.velocity() - 1.0).abs() < 1e-12);
        assert!((handle.position() - 0.5).abs() < 1e-12);
        assert_eq!(handle.effort(), 4.0);
    }

    #[test]
    fn test_damping_slows_joint() {
        let hw = SimulatedHardware::new()
            .with_joint("a", SimJointParams::default().with_damping(5.0));
        hw.set_state("a", 0.0, 1.0);
        for _ in 0..100 {
            hw.step(Duration::from_millis(10));
        }
        assert!(hw.velocity("a").unwrap().abs() < 0.01);
    }

    #[test]
    fn test_hard_stops() {
        let hw = SimulatedHardware::new().with_joint(
            "a",
            SimJointParams::default().with_hard_stops(JointLimits::new(-0.1, 0.1)),
        );
        let mut handle = hw.handle("a").unwrap();
        handle.set_command(100.0);
        for _ in 0..10 {
            hw.step(Duration::from_millis(10));
        }
        assert_eq!(handle.position(), 0.1);
        assert_eq!(handle.velocity(), 0.0);
    }

    #[test]
    fn test_wrapping_joint() {
        let hw = SimulatedHardware::new()
            .with_joint("wheel", SimJointParams::default().wrapping());
        hw.set_state("wheel", PI - 0.05, 1.0);
        hw.step(Duration::from_millis(100));
        let position = hw.position("wheel").unwrap();
        assert!(position < 0.0 && position > -PI);
    }

    #[test]
    fn test_add_joint_replaces_existing() {
        let mut hw = SimulatedHardware::new()
            .with_joint("a", SimJointParams::default().with_initial_position(1.0));
        hw.add_joint("a", SimJointParams::default().with_initial_position(2.0));
        assert_eq!(hw.position("a"), Some(2.0));
    }
}
