//! 角度运算
//!
//! 归一化与最短角距离，包括考虑关节限位的版本。
//!
//! # 约定
//!
//! - [`normalize_angle_positive`] 返回 `[0, 2π)`
//! - [`normalize_angle`] 返回 `(-π, π]`
//! - `shortest_angular_distance(from, to)` 满足 `from + d ≡ to (mod 2π)`
//!
//! # 示例
//!
//! ```rust
//! use effort_control::angles::{shortest_angular_distance, shortest_angular_distance_with_limits};
//!
//! // 无限位：穿过 ±π 走近路
//! let d = shortest_angular_distance(3.0, -3.0);
//! assert!((d - (2.0 * std::f64::consts::PI - 6.0)).abs() < 1e-12);
//!
//! // 限位 [-3.1, 3.1]：±π 附近是禁区，必须绕远路
//! let limited = shortest_angular_distance_with_limits(3.0, -3.0, -3.1, 3.1);
//! assert!(limited.is_reachable());
//! assert!((limited.value() + 6.0).abs() < 1e-12);
//! ```

use std::f64::consts::{PI, TAU};

/// 归一化到 `[0, 2π)`
#[inline]
pub fn normalize_angle_positive(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // 极小的负数经 rem_euclid 会舍入为 2π
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// 归一化到 `(-π, π]`
#[inline]
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = normalize_angle_positive(angle);
    if wrapped > PI { wrapped - TAU } else { wrapped }
}

/// 从 `from` 到 `to` 的最短有符号角距离，范围 `(-π, π]`
#[inline]
pub fn shortest_angular_distance(from: f64, to: f64) -> f64 {
    normalize_angle(to - from)
}

/// 带限位的角距离结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LimitedDistance {
    /// 目标（模 2π）在限位内可达，距离不经过限位外的区域
    Reachable(f64),
    /// 目标在限位内不可达，距离指向离目标最近的限位
    Clamped(f64),
}

impl LimitedDistance {
    /// 有符号距离
    #[inline]
    pub fn value(self) -> f64 {
        match self {
            LimitedDistance::Reachable(d) | LimitedDistance::Clamped(d) => d,
        }
    }

    /// 目标是否可达
    #[inline]
    pub fn is_reachable(self) -> bool {
        matches!(self, LimitedDistance::Reachable(_))
    }
}

/// 在 `[lower, upper]` 限位约束下，从 `from` 到 `to` 的角距离
///
/// 有限位的旋转关节不能穿过限位之外的区域，所以它在 `[lower, upper]` 内只能线性运动。
/// 目标的所有等价位置 `to + 2πk` 中，落在限位内且离 `from` 最近的那个就是运动终点。
///
/// - 存在这样的位置：返回 `Reachable(终点 - from)`。两个终点等距时取正方向。
/// - 不存在（目标落在禁区）：返回 `Clamped(限位 - from)`，限位取离目标角距离更近的一个，
///   等距时取下限。
///
/// `from` 应位于限位内；即使略微越界，返回的终点仍然在限位内。
pub fn shortest_angular_distance_with_limits(
    from: f64,
    to: f64,
    lower: f64,
    upper: f64,
) -> LimitedDistance {
    let k_min = ((lower - to) / TAU).ceil();
    let k_max = ((upper - to) / TAU).floor();

    if k_min <= k_max {
        let k_near = ((from - to) / TAU).round().clamp(k_min, k_max);
        let mut best = to + k_near * TAU - from;

        for k in [k_near - 1.0, k_near + 1.0] {
            if k < k_min || k > k_max {
                continue;
            }
            let delta = to + k * TAU - from;
            if delta.abs() < best.abs() || (delta.abs() == best.abs() && delta > best) {
                best = delta;
            }
        }
        return LimitedDistance::Reachable(best);
    }

    let to_lower = shortest_angular_distance(to, lower).abs();
    let to_upper = shortest_angular_distance(to, upper).abs();
    let limit = if to_upper < to_lower { upper } else { lower };
    LimitedDistance::Clamped(limit - from)
}
