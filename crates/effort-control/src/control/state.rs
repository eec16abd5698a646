//! 控制器诊断快照

use crate::control::pid::Gains;
use std::time::Duration;

/// 单个周期的诊断快照
///
/// 由实时线程在发布缓冲中原地填充，后台线程拷贝后交给 sink，不做持久化。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerState {
    /// 宿主时钟时间戳
    pub stamp: Duration,
    /// 本周期使用的设定值
    pub setpoint: f64,
    /// 测量位置
    pub position: f64,
    /// 测量速度
    pub velocity: f64,
    /// 位置误差
    pub error: f64,
    /// 周期时长（秒）
    pub time_step: f64,
    /// 输出的力矩/力
    pub effort: f64,
    /// 本周期使用的增益
    pub gains: Gains,
}
