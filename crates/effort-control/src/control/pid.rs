//! PID 引擎 - 比例-积分-微分控制器
//!
//! 单关节 PID，支持非均匀时间步长，并允许调用方直接传入误差导数（速度误差）。
//!
//! # 算法
//!
//! ```text
//! integral += error * dt
//! output    = p * error
//!           + clamp(i * integral, i_min, i_max)
//!           + d * error_dot
//! ```
//!
//! # 特性
//!
//! - **时间加权积分**: 积分按 `dt` 累积，与调用次数无关
//! - **外部导数**: 有速度测量时直接使用 `error_dot`，避免对误差差分放大噪声
//! - **积分饱和保护**: I 项钳位到 `[i_min, i_max]`；开启 `antiwindup` 后积分本身也被钳位
//! - **退化输入**: `dt == 0` 时跳过积分和差分；误差为 NaN/Inf 时输出 0 且不改变内部状态
//!
//! # 示例
//!
//! ```rust
//! use effort_control::control::{Gains, Pid};
//! use std::time::Duration;
//!
//! let mut pid = Pid::new(Gains::new(10.0, 0.5, 0.1, 1.0, -1.0));
//!
//! // 位置误差 0.2，速度误差 -0.05，周期 1ms
//! let effort = pid.compute_command(0.2, -0.05, Duration::from_millis(1));
//! assert!(effort > 0.0);
//! ```

use std::time::Duration;

/// PID 增益
///
/// 修改增益没有原子性要求（最后一次写入生效），见 [`Pid::set_gains`]。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Gains {
    /// 比例增益
    pub p: f64,
    /// 积分增益
    pub i: f64,
    /// 微分增益
    pub d: f64,
    /// I 项上限
    pub i_max: f64,
    /// I 项下限
    pub i_min: f64,
    /// 是否同时钳位积分累积值
    pub antiwindup: bool,
}

impl Gains {
    /// 创建增益（`antiwindup` 默认关闭）
    pub const fn new(p: f64, i: f64, d: f64, i_max: f64, i_min: f64) -> Self {
        Gains {
            p,
            i,
            d,
            i_max,
            i_min,
            antiwindup: false,
        }
    }

    /// 设置 antiwindup
    pub const fn with_antiwindup(mut self, antiwindup: bool) -> Self {
        self.antiwindup = antiwindup;
        self
    }

    /// 以元组形式返回 `(p, i, d, i_max, i_min)`
    pub const fn as_tuple(&self) -> (f64, f64, f64, f64, f64) {
        (self.p, self.i, self.d, self.i_max, self.i_min)
    }
}

/// PID 引擎
#[derive(Debug, Clone)]
pub struct Pid {
    gains: Gains,

    /// 最近一次的位置误差
    p_error: f64,

    /// 积分累积值
    i_error: f64,

    /// 最近一次的误差导数
    d_error: f64,

    /// 最近一次的输出
    command: f64,
}

impl Pid {
    /// 创建 PID 引擎，内部状态为零
    pub fn new(gains: Gains) -> Self {
        Pid {
            gains,
            p_error: 0.0,
            i_error: 0.0,
            d_error: 0.0,
            command: 0.0,
        }
    }

    /// 替换增益（保留当前的 antiwindup 设置）
    ///
    /// 不校验数值，非法增益会产生退化但确定的行为。
    pub fn configure(&mut self, p: f64, i: f64, d: f64, i_max: f64, i_min: f64) {
        let antiwindup = self.gains.antiwindup;
        self.gains = Gains::new(p, i, d, i_max, i_min).with_antiwindup(antiwindup);
    }

    /// 替换全部增益
    #[inline]
    pub fn set_gains(&mut self, gains: Gains) {
        self.gains = gains;
    }

    /// 当前增益
    #[inline]
    pub fn gains(&self) -> Gains {
        self.gains
    }

    /// 清零积分和微分历史
    pub fn reset(&mut self) {
        self.p_error = 0.0;
        self.i_error = 0.0;
        self.d_error = 0.0;
        self.command = 0.0;
    }

    /// 计算一步输出
    ///
    /// # 参数
    ///
    /// - `error`: 位置误差
    /// - `error_dot`: 误差导数（通常是速度误差）
    /// - `dt`: 自上次调用以来经过的时间
    ///
    /// # 退化输入
    ///
    /// - `dt == 0`: 不积分，输出 P 项 + 已有 I 项 + D 项
    /// - `error` 或 `error_dot` 非有限值: 输出 0，内部状态不变
    pub fn compute_command(&mut self, error: f64, error_dot: f64, dt: Duration) -> f64 {
        if !error.is_finite() || !error_dot.is_finite() {
            return 0.0;
        }

        let dt_sec = dt.as_secs_f64();
        let gains = self.gains;

        self.p_error = error;
        self.d_error = error_dot;

        // 1. 比例项（P）
        let p_term = gains.p * error;

        // 2. 积分项（I），按时间加权
        if dt_sec > 0.0 {
            self.i_error += dt_sec * error;

            if gains.antiwindup && gains.i != 0.0 {
                let a = gains.i_min / gains.i;
                let b = gains.i_max / gains.i;
                self.i_error = self.i_error.max(a.min(b)).min(a.max(b));
            }
        }
        // max/min 而不是 clamp：i_min > i_max 时不 panic
        let i_term = (gains.i * self.i_error).max(gains.i_min).min(gains.i_max);

        // 3. 微分项（D）
        let d_term = gains.d * error_dot;

        self.command = p_term + i_term + d_term;
        self.command
    }

    /// 计算一步输出，误差导数由相邻两次误差差分得到
    ///
    /// 用于没有速度测量的场景。`dt == 0` 时导数取 0。
    pub fn compute_command_from_error(&mut self, error: f64, dt: Duration) -> f64 {
        if !error.is_finite() {
            return 0.0;
        }

        let dt_sec = dt.as_secs_f64();
        let error_dot = if dt_sec > 0.0 {
            (error - self.p_error) / dt_sec
        } else {
            0.0
        };
        self.compute_command(error, error_dot, dt)
    }

    /// 内部误差状态 `(p_error, i_error, d_error)`，用于调试和监控
    pub fn current_state(&self) -> (f64, f64, f64) {
        (self.p_error, self.i_error, self.d_error)
    }

    /// 最近一次的输出
    #[inline]
    pub fn last_command(&self) -> f64 {
        self.command
    }
}

impl Default for Pid {
    fn default() -> Self {
        Pid::new(Gains::default())
    }
}
