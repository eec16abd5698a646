//! Loop Runner - 宿主控制循环
//!
//! 在当前线程中以固定频率驱动 `RobotHw` 和 `Controller`：
//!
//! ```text
//! starting()
//! loop {
//!     等待下一个周期
//!     hw.read() → controller.update() → hw.write()
//! }
//! stopping()
//! ```
//!
//! # 定时
//!
//! - 使用 `spin_sleep` 等待到绝对截止时间，抖动低于 `thread::sleep`
//! - 周期超时后不补偿，下一个截止时间从当前时刻重新计算
//! - 实际周期超过 `dt_clamp_multiplier` 倍标称周期时记为一次时间跳变，
//!   交给控制器的 `period` 被钳位
//!
//! # 示例
//!
//! ```rust,ignore
//! use effort_control::control::{run_controller, LoopConfig};
//! use std::sync::atomic::AtomicBool;
//!
//! let stop = AtomicBool::new(false);
//! let config = LoopConfig {
//!     frequency_hz: 1000.0,
//!     ..Default::default()
//! };
//! let stats = run_controller(&mut hw, &mut controller, &config, &stop)?;
//! ```

use super::controller::Controller;
use crate::error::{ControllerError, Result};
use crate::hardware::RobotHw;
use spin_sleep::SpinSleeper;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// 超过这个频率时给出警告
const HIGH_FREQUENCY_HZ: f64 = 10_000.0;

/// 控制循环配置
#[derive(Debug, Clone, PartialEq)]
pub struct LoopConfig {
    /// 控制频率（Hz）
    pub frequency_hz: f64,

    /// dt 钳位倍数
    ///
    /// 实际周期超过 `dt_clamp_multiplier / frequency_hz` 时，交给控制器的周期被钳位。
    pub dt_clamp_multiplier: f64,

    /// 最大迭代次数（`None` 表示一直运行到 stop 标志置位）
    pub max_iterations: Option<u64>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        LoopConfig {
            frequency_hz: 100.0,
            dt_clamp_multiplier: 2.0,
            max_iterations: None,
        }
    }
}

impl LoopConfig {
    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if !(self.frequency_hz > 0.0 && self.frequency_hz.is_finite()) {
            return Err(ControllerError::ConfigError(format!(
                "Invalid frequency_hz: {} (must be > 0)",
                self.frequency_hz
            )));
        }
        if !(self.dt_clamp_multiplier > 0.0 && self.dt_clamp_multiplier.is_finite()) {
            return Err(ControllerError::ConfigError(format!(
                "Invalid dt_clamp_multiplier: {} (must be > 0)",
                self.dt_clamp_multiplier
            )));
        }
        self.nominal_period()?;
        self.max_period()?;
        if self.frequency_hz > HIGH_FREQUENCY_HZ {
            warn!(
                "Very high control frequency: {} Hz. This may cause performance issues.",
                self.frequency_hz
            );
        }
        Ok(())
    }

    /// 标称周期
    ///
    /// 周期无法用 `Duration` 表示时（频率过低）返回 [`ControllerError::ConfigError`]。
    pub fn nominal_period(&self) -> Result<Duration> {
        period_from_secs(1.0 / self.frequency_hz, "frequency_hz", self.frequency_hz)
    }

    /// 钳位后的最大周期 `dt_clamp_multiplier / frequency_hz`
    pub fn max_period(&self) -> Result<Duration> {
        period_from_secs(
            self.dt_clamp_multiplier / self.frequency_hz,
            "dt_clamp_multiplier",
            self.dt_clamp_multiplier,
        )
    }
}

fn period_from_secs(secs: f64, field: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|e| {
        ControllerError::ConfigError(format!(
            "Invalid {}: {} (period of {} s is not representable: {})",
            field, value, secs, e
        ))
    })
}

/// 循环运行统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// 执行的周期数
    pub iterations: u64,
    /// 发生时间跳变（周期被钳位）的次数
    pub time_jumps: u64,
    /// 观测到的最大实际周期（钳位前）
    pub max_period: Duration,
}

/// 运行控制循环（阻塞）
///
/// 在以下情况下返回：
/// - `stop` 被置位
/// - 达到 `max_iterations`
///
/// 返回前总是调用一次 `controller.stopping()`。
///
/// # 错误
///
/// 配置非法时返回 [`ControllerError::ConfigError`]，此时不会调用 `starting()`。
pub fn run_controller<R, C>(
    hw: &mut R,
    controller: &mut C,
    config: &LoopConfig,
    stop: &AtomicBool,
) -> Result<LoopStats>
where
    R: RobotHw + ?Sized,
    C: Controller + ?Sized,
{
    config.validate()?;

    #[cfg(feature = "realtime")]
    {
        use thread_priority::*;
        use tracing::info;

        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => {
                info!("Control thread priority set to MAX (realtime)");
            },
            Err(e) => {
                warn!(
                    "Failed to set control thread priority: {}. \
                    On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                    e
                );
            },
        }
    }

    let nominal_period = config.nominal_period()?;
    let max_dt = config.max_period()?;
    let sleeper = SpinSleeper::default();
    let mut stats = LoopStats::default();

    let clock = Instant::now();
    controller.starting(Duration::ZERO);

    let mut last = Duration::ZERO;
    let mut deadline = nominal_period;

    loop {
        if stop.load(Ordering::Acquire) {
            break;
        }
        if let Some(max_iter) = config.max_iterations
            && stats.iterations >= max_iter
        {
            break;
        }

        let before = clock.elapsed();
        if deadline > before {
            sleeper.sleep(deadline - before);
        }

        let now = clock.elapsed();
        deadline += nominal_period;
        if deadline <= now {
            // 超时：放弃追赶
            deadline = now + nominal_period;
        }

        let real_dt = now - last;
        last = now;
        stats.max_period = stats.max_period.max(real_dt);

        let mut period = real_dt;
        if real_dt > max_dt {
            stats.time_jumps += 1;
            warn!(
                "Time jump detected: {:?} (max {:?}), clamping period",
                real_dt, max_dt
            );
            period = max_dt;
        }

        hw.read(now, period);
        controller.update(now, period);
        hw.write(now, period);

        stats.iterations += 1;
    }

    controller.stopping(clock.elapsed());
    debug!(
        "Control loop finished: {} iterations, {} time jumps, max period {:?}",
        stats.iterations, stats.time_jumps, stats.max_period
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[derive(Default)]
    struct RecordingController {
        started: usize,
        stopped: usize,
        periods: Vec<Duration>,
    }

    impl Controller for RecordingController {
        fn starting(&mut self, _now: Duration) {
            self.started += 1;
        }

        fn update(&mut self, _now: Duration, period: Duration) {
            self.periods.push(period);
        }

        fn stopping(&mut self, _now: Duration) {
            self.stopped += 1;
        }
    }

    #[derive(Default)]
    struct CountingHw {
        reads: usize,
        writes: usize,
    }

    impl RobotHw for CountingHw {
        fn read(&mut self, _now: Duration, _period: Duration) {
            self.reads += 1;
        }

        fn write(&mut self, _now: Duration, _period: Duration) {
            self.writes += 1;
        }
    }

    #[test]
    fn test_loop_config_default() {
        let config = LoopConfig::default();
        assert_eq!(config.frequency_hz, 100.0);
        assert_eq!(config.dt_clamp_multiplier, 2.0);
        assert_eq!(config.max_iterations, None);
        assert_eq!(config.nominal_period().unwrap(), Duration::from_millis(10));
        assert_eq!(config.max_period().unwrap(), Duration::from_millis(20));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut hw = CountingHw::default();
        let mut controller = RecordingController::default();
        let stop = AtomicBool::new(false);

        for config in [
            LoopConfig {
                frequency_hz: 0.0,
                ..Default::default()
            },
            LoopConfig {
                frequency_hz: f64::NAN,
                ..Default::default()
            },
            LoopConfig {
                dt_clamp_multiplier: -1.0,
                ..Default::default()
            },
            // 周期超出 Duration 的表示范围
            LoopConfig {
                frequency_hz: 1e-30,
                ..Default::default()
            },
            LoopConfig {
                frequency_hz: 1e-15,
                dt_clamp_multiplier: 1e10,
                ..Default::default()
            },
        ] {
            let result = run_controller(&mut hw, &mut controller, &config, &stop);
            assert!(matches!(result, Err(ControllerError::ConfigError(_))));
        }
        assert_eq!(controller.started, 0);
        assert_eq!(controller.stopped, 0);
    }

    #[test]
    fn test_tiny_frequency_rejected_by_validate() {
        let config = LoopConfig {
            frequency_hz: 1e-30,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ControllerError::ConfigError(_))));
        assert!(matches!(config.nominal_period(), Err(ControllerError::ConfigError(_))));
    }

    #[test]
    fn test_max_iterations() {
        let mut hw = CountingHw::default();
        let mut controller = RecordingController::default();
        let stop = AtomicBool::new(false);
        let config = LoopConfig {
            frequency_hz: 1000.0,
            dt_clamp_multiplier: 1000.0,
            max_iterations: Some(20),
        };

        let stats = run_controller(&mut hw, &mut controller, &config, &stop).unwrap();

        assert_eq!(stats.iterations, 20);
        assert_eq!(controller.started, 1);
        assert_eq!(controller.stopped, 1);
        assert_eq!(controller.periods.len(), 20);
        assert_eq!(hw.reads, 20);
        assert_eq!(hw.writes, 20);
        assert!(controller.periods.iter().all(|p| *p > Duration::ZERO));
    }

    #[test]
    fn test_period_clamped() {
        let mut hw = CountingHw::default();
        let mut controller = RecordingController::default();
        let stop = AtomicBool::new(false);
        let config = LoopConfig {
            frequency_hz: 1000.0,
            dt_clamp_multiplier: 2.0,
            max_iterations: Some(50),
        };
        let max_dt = Duration::from_millis(2);

        run_controller(&mut hw, &mut controller, &config, &stop).unwrap();
        assert!(controller.periods.iter().all(|p| *p <= max_dt));
    }

    #[test]
    fn test_stop_flag() {
        let stop = Arc::new(AtomicBool::new(false));
        let stopper = {
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                stop.store(true, Ordering::Release);
            })
        };

        let mut hw = CountingHw::default();
        let mut controller = RecordingController::default();
        let config = LoopConfig {
            frequency_hz: 500.0,
            ..Default::default()
        };

        let stats = run_controller(&mut hw, &mut controller, &config, &stop).unwrap();
        stopper.join().unwrap();

        assert!(stats.iterations > 0);
        assert_eq!(controller.stopped, 1);
    }

    #[test]
    fn test_stop_before_start_still_brackets_lifecycle() {
        let stop = AtomicBool::new(true);
        let mut hw = CountingHw::default();
        let mut controller = RecordingController::default();

        let stats = run_controller(&mut hw, &mut controller, &LoopConfig::default(), &stop).unwrap();

        assert_eq!(stats.iterations, 0);
        assert_eq!(controller.started, 1);
        assert_eq!(controller.stopped, 1);
    }
}
