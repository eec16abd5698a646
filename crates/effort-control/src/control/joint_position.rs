//! 关节位置控制器
//!
//! 读取一个关节的位置和速度，用 PID 计算力矩（或力）使关节跟踪设定值。
//!
//! # 线程模型
//!
//! - 实时线程拥有 [`JointPositionController`]，通过 [`Controller`] trait 被宿主循环驱动
//! - 非实时线程持有 [`ControllerHandle`]，写入设定值和增益（无锁，最新值生效）
//! - 诊断快照每 `publish_every` 个周期尝试交给后台发布线程，忙则跳过
//!
//! # 误差计算
//!
//! | 关节类型 | 位置误差 |
//! |---------|---------|
//! | 直线 | `setpoint - position` |
//! | 有限位旋转 | 限位内可达的最短角距离 |
//! | 无限位旋转 | 最短角距离，范围 `(-π, π]` |
//!
//! 速度误差固定为 `-velocity`（目标速度为零）。

use crate::config::ControllerConfig;
use crate::control::controller::Controller;
use crate::control::pid::{Gains, Pid};
use crate::control::state::ControllerState;
use crate::error::{ControllerError, Result};
use crate::hardware::{EffortJointInterface, JointHandle, JointModel};
use crate::joint::JointTopology;
use effort_rt::{BufferReader, BufferWriter, RealtimePublisher, StateSink, realtime_buffer};
use std::time::Duration;
use tracing::{debug, error, info};

/// 控制器生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// 已初始化，尚未启动
    Ready,
    /// 实时循环中
    Running,
    /// 已停止
    Stopped,
}

/// 非实时侧的控制器句柄
///
/// 只能有一个写者：句柄不可克隆，跨线程时整体移动。
pub struct ControllerHandle {
    joint: String,
    command: BufferWriter<f64>,
    gains_tx: BufferWriter<Gains>,
    gains: Gains,
}

impl ControllerHandle {
    /// 设置目标位置（rad 或 m），下一个周期生效
    #[inline]
    pub fn set_command(&mut self, position: f64) {
        self.command.write(position);
    }

    /// 设置增益，下一个周期生效
    pub fn set_gains(&mut self, gains: Gains) {
        self.gains = gains;
        self.gains_tx.write(gains);
    }

    /// 按五元组设置增益（保留当前的 antiwindup 设置）
    pub fn configure(&mut self, p: f64, i: f64, d: f64, i_max: f64, i_min: f64) {
        let gains = Gains::new(p, i, d, i_max, i_min).with_antiwindup(self.gains.antiwindup);
        self.set_gains(gains);
    }

    /// 最近一次通过本句柄写入的增益
    pub fn gains(&self) -> Gains {
        self.gains
    }

    /// 被控关节名称
    pub fn joint_name(&self) -> &str {
        &self.joint
    }
}

/// 单关节位置控制器
pub struct JointPositionController<H: JointHandle> {
    joint: H,
    topology: JointTopology,
    pid: Pid,
    command: BufferReader<f64>,
    gains_rx: BufferReader<Gains>,
    handle: Option<ControllerHandle>,
    publisher: Option<RealtimePublisher<ControllerState>>,
    publish_every: u64,
    loop_count: u64,
    lifecycle: Lifecycle,
    last_error: f64,
    last_effort: f64,
}

impl<H: JointHandle> JointPositionController<H> {
    /// 初始化控制器
    ///
    /// 解析关节句柄和关节类型，应用配置中的增益。任一步失败都会返回错误，
    /// 不会构造出半初始化的控制器。
    ///
    /// # 错误
    ///
    /// - [`ControllerError::MissingConfig`] / [`ControllerError::ConfigError`]: 配置不完整
    /// - [`ControllerError::JointNotFound`]: 硬件层没有这个关节
    /// - [`ControllerError::MissingJointMetadata`] / [`ControllerError::InvalidLimits`]: 关节元数据不可用
    pub fn init<I, M>(hw: &I, model: &M, config: &ControllerConfig) -> Result<Self>
    where
        I: EffortJointInterface<Handle = H> + ?Sized,
        M: JointModel + ?Sized,
    {
        Self::resolve(hw, model, config).inspect_err(|e| {
            error!("Failed to initialize controller for joint '{}': {}", config.joint, e);
        })
    }

    fn resolve<I, M>(hw: &I, model: &M, config: &ControllerConfig) -> Result<Self>
    where
        I: EffortJointInterface<Handle = H> + ?Sized,
        M: JointModel + ?Sized,
    {
        config.validate()?;

        let joint = hw.handle(&config.joint).ok_or_else(|| ControllerError::JointNotFound {
            joint: config.joint.clone(),
        })?;

        let topology = model.joint_topology(&config.joint)?;
        if let JointTopology::Revolute(limits) = topology
            && !limits.is_valid()
        {
            return Err(ControllerError::InvalidLimits {
                joint: config.joint.clone(),
                lower: limits.lower,
                upper: limits.upper,
            });
        }

        // 设定值缓冲的初始值会在 starting() 中被当前位置覆盖
        let (command_tx, command) = realtime_buffer(0.0_f64);
        let (gains_tx, gains_rx) = realtime_buffer(config.gains);

        info!(
            "Controller initialized for {} joint '{}' (p={}, i={}, d={})",
            topology, config.joint, config.gains.p, config.gains.i, config.gains.d
        );

        Ok(JointPositionController {
            joint,
            topology,
            pid: Pid::new(config.gains),
            command,
            gains_rx,
            handle: Some(ControllerHandle {
                joint: config.joint.clone(),
                command: command_tx,
                gains_tx,
                gains: config.gains,
            }),
            publisher: None,
            publish_every: config.publish_every,
            loop_count: 0,
            lifecycle: Lifecycle::Ready,
            last_error: 0.0,
            last_effort: 0.0,
        })
    }

    /// 挂接诊断输出，启动后台发布线程
    pub fn with_state_sink<S>(mut self, sink: S) -> Result<Self>
    where
        S: StateSink<ControllerState>,
    {
        let publisher = RealtimePublisher::new(self.joint.name(), ControllerState::default(), sink)?;
        self.publisher = Some(publisher);
        Ok(self)
    }

    /// 取出非实时侧句柄（只能取一次）
    pub fn take_handle(&mut self) -> Option<ControllerHandle> {
        self.handle.take()
    }

    /// 直接替换增益（由拥有控制器的线程调用）
    pub fn set_gains(&mut self, gains: Gains) {
        self.pid.set_gains(gains);
    }

    /// 当前生效的增益
    pub fn gains(&self) -> Gains {
        self.pid.gains()
    }

    /// 被控关节名称
    pub fn joint_name(&self) -> &str {
        self.joint.name()
    }

    /// 关节类型
    pub fn topology(&self) -> JointTopology {
        self.topology
    }

    /// 生命周期状态
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// 自 `starting` 以来的周期数
    pub fn loop_count(&self) -> u64 {
        self.loop_count
    }

    /// 最近一个周期的位置误差
    pub fn last_error(&self) -> f64 {
        self.last_error
    }

    /// 最近一个周期输出的力矩/力
    pub fn last_effort(&self) -> f64 {
        self.last_effort
    }

    /// PID 引擎（只读）
    pub fn pid(&self) -> &Pid {
        &self.pid
    }
}

impl<H: JointHandle> Controller for JointPositionController<H> {
    fn starting(&mut self, _now: Duration) {
        let position = self.joint.position();
        // 保持当前位置，丢弃启动前写入的设定值
        self.command.init_rt(position);
        self.pid.reset();
        self.loop_count = 0;
        self.last_error = 0.0;
        self.last_effort = 0.0;
        self.lifecycle = Lifecycle::Running;
        info!(
            "Controller for joint '{}' started, holding position {:.4}",
            self.joint.name(),
            position
        );
    }

    fn update(&mut self, now: Duration, period: Duration) {
        if self.lifecycle != Lifecycle::Running {
            return;
        }

        if self.gains_rx.has_fresh() {
            let gains = self.gains_rx.read_latest();
            self.pid.set_gains(gains);
        }

        let setpoint = self.command.read_latest();
        let position = self.joint.position();
        let velocity = self.joint.velocity();

        let error = self.topology.position_error(setpoint, position);
        let effort = self.pid.compute_command(error, -velocity, period);
        self.joint.set_command(effort);

        self.last_error = error;
        self.last_effort = effort;

        if self.loop_count % self.publish_every == 0
            && let Some(publisher) = &self.publisher
            && let Some(mut state) = publisher.try_lock()
        {
            *state = ControllerState {
                stamp: now,
                setpoint,
                position,
                velocity,
                error,
                time_step: period.as_secs_f64(),
                effort,
                gains: self.pid.gains(),
            };
            state.unlock_and_publish();
        }

        self.loop_count = self.loop_count.wrapping_add(1);
    }

    fn stopping(&mut self, _now: Duration) {
        self.lifecycle = Lifecycle::Stopped;
        debug!(
            "Controller for joint '{}' stopped after {} cycles",
            self.joint.name(),
            self.loop_count
        );
    }
}
