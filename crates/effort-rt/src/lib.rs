//! # Effort RT - 实时线程与非实时线程之间的数据交换原语
//!
//! 控制循环运行在硬实时线程中：不能阻塞、不能分配内存、不能获取可能被其他线程持有的锁。
//! 本 crate 提供两个原语，把"跨线程共享可变状态"限制在最小的接口后面：
//!
//! - [`buffer`]: 单写单读的最新值缓冲（三槽交换），用于把设定值从非实时线程交给实时线程
//! - [`publisher`]: 尽力而为的实时发布器（try-lock，忙则丢弃），用于周期性诊断输出
//!
//! # 示例
//!
//! ```rust
//! use effort_rt::realtime_buffer;
//!
//! let (mut writer, mut reader) = realtime_buffer(0.0_f64);
//! writer.write(1.5);
//! assert_eq!(reader.read_latest(), 1.5);
//! ```

pub mod buffer;
pub mod error;
pub mod publisher;

pub use buffer::{BufferReader, BufferWriter, realtime_buffer};
pub use error::RtError;
pub use publisher::{PublishGuard, RealtimePublisher, StateSink};
