//! Controller trait - 实时控制器生命周期接口
//!
//! 宿主循环只通过这个 trait 驱动控制器：
//!
//! - **starting**: 进入实时循环前调用一次（在实时线程中）
//! - **update**: 每个周期调用一次，必须在有界时间内完成，不阻塞、不分配、不返回错误
//! - **stopping**: 宿主停止调用 `update` 时调用一次
//!
//! 初始化（解析关节、读取配置）不属于这个 trait：初始化失败的控制器根本不会被构造出来。
//!
//! # 时间参数
//!
//! - `now`: 宿主时钟的当前时间（自宿主启动以来）
//! - `period`: 自上一次 `update` 以来经过的时间，可能不均匀

use std::time::Duration;

/// 实时控制器
pub trait Controller {
    /// 进入实时循环前调用一次
    fn starting(&mut self, now: Duration);

    /// 执行一个控制周期
    fn update(&mut self, now: Duration, period: Duration);

    /// 退出实时循环时调用一次
    ///
    /// 默认实现不做任何事情。
    fn stopping(&mut self, _now: Duration) {}
}
