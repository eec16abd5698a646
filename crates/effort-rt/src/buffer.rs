//! 实时最新值缓冲（Realtime Buffer）
//!
//! 单写单读、无锁、无分配的"最新值"交换。写端在非实时线程中任意频率写入，
//! 读端在实时线程中每个周期读取一次，总能拿到最近一次**完整**写入的值。
//!
//! # 架构
//!
//! ```text
//!   BufferWriter                Shared                 BufferReader
//! ┌─────────────┐    ┌──────────────────────────┐   ┌─────────────┐
//! │ write_idx ──┼──► │ slots[0] slots[1] slots[2]│ ◄─┼── read_idx  │
//! └─────────────┘    │ middle: AtomicU8          │   └─────────────┘
//!                    │   bit 0-1: 中间槽索引      │
//!                    │   bit 2:   FRESH          │
//!                    └──────────────────────────┘
//! ```
//!
//! 三个预分配槽在任意时刻分别归属于：写端、读端、中间（待交接）。
//! 写端写完自己的槽后，用一次原子 `swap` 把它换成中间槽并置位 FRESH；
//! 读端发现 FRESH 后，用一次原子 `swap` 把自己的槽换成中间槽。
//! 两端永远不会同时访问同一个槽，因此不会读到撕裂的值。
//!
//! # 约束
//!
//! - 写端和读端各只有一个：由 [`BufferWriter`] / [`BufferReader`] 的所有权保证（二者都不是 `Clone`）
//! - `write()` 和 `read_latest()` 都是 wait-free 的（一次原子操作 + 一次拷贝）
//! - 构造之后不再分配内存

use std::cell::UnsafeCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

const INDEX_MASK: u8 = 0b011;
const FRESH_BIT: u8 = 0b100;

struct Shared<T> {
    slots: [UnsafeCell<T>; 3],
    /// 中间槽索引 + FRESH 标志
    middle: AtomicU8,
}

// SAFETY: 每个槽同一时刻只归属于一端。槽的所有权只通过 `middle` 上的 AcqRel swap 移交，
// 移交前的写入对接收方可见。
unsafe impl<T: Send> Sync for Shared<T> {}

/// 创建一对写端/读端，所有槽初始化为 `initial`
///
/// 这是唯一会分配内存的操作，应在进入实时循环之前调用。
pub fn realtime_buffer<T: Copy + Send>(initial: T) -> (BufferWriter<T>, BufferReader<T>) {
    let shared = Arc::new(Shared {
        slots: [
            UnsafeCell::new(initial),
            UnsafeCell::new(initial),
            UnsafeCell::new(initial),
        ],
        middle: AtomicU8::new(1),
    });

    let writer = BufferWriter {
        shared: Arc::clone(&shared),
        write_idx: 0,
    };
    let reader = BufferReader {
        shared,
        read_idx: 2,
    };
    (writer, reader)
}

/// 写端（非实时线程）
pub struct BufferWriter<T> {
    shared: Arc<Shared<T>>,
    write_idx: u8,
}

impl<T: Copy + Send> BufferWriter<T> {
    /// 写入新值
    ///
    /// 不阻塞、不分配，耗时与读端状态无关。未被读取的旧值会被覆盖。
    #[inline]
    pub fn write(&mut self, value: T) {
        // SAFETY: write_idx 槽只归属于写端
        unsafe {
            *self.shared.slots[self.write_idx as usize].get() = value;
        }
        let previous = self.shared.middle.swap(self.write_idx | FRESH_BIT, Ordering::AcqRel);
        self.write_idx = previous & INDEX_MASK;
    }
}

/// 读端（实时线程）
pub struct BufferReader<T> {
    shared: Arc<Shared<T>>,
    read_idx: u8,
}

impl<T: Copy + Send> BufferReader<T> {
    /// 读取最近一次完成的写入
    ///
    /// 如果还没有任何写入落地，返回初始值（或最近一次 [`init_rt`](Self::init_rt) 的值）。
    #[inline]
    pub fn read_latest(&mut self) -> T {
        if self.has_fresh() {
            // 只有读端会清除 FRESH，所以 swap 时 FRESH 一定仍然置位
            let previous = self.shared.middle.swap(self.read_idx, Ordering::AcqRel);
            self.read_idx = previous & INDEX_MASK;
        }
        // SAFETY: read_idx 槽只归属于读端
        unsafe { *self.shared.slots[self.read_idx as usize].get() }
    }

    /// 是否有尚未读取的新值
    #[inline]
    pub fn has_fresh(&self) -> bool {
        self.shared.middle.load(Ordering::Acquire) & FRESH_BIT != 0
    }

    /// 从读端重置当前值
    ///
    /// 覆盖读端的槽并丢弃尚未读取的写入。之后的 `read_latest()` 返回 `value`，
    /// 直到写端再次写入。
    pub fn init_rt(&mut self, value: T) {
        // SAFETY: read_idx 槽只归属于读端
        unsafe {
            *self.shared.slots[self.read_idx as usize].get() = value;
        }
        self.shared.middle.fetch_and(INDEX_MASK, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_value() {
        let (_writer, mut reader) = realtime_buffer(3.25_f64);
        assert_eq!(reader.read_latest(), 3.25);
        assert!(!reader.has_fresh());
    }

    #[test]
    fn test_latest_write_wins() {
        let (mut writer, mut reader) = realtime_buffer(0.0_f64);
        writer.write(1.0);
        writer.write(2.0);
        writer.write(3.0);
        assert!(reader.has_fresh());
        assert_eq!(reader.read_latest(), 3.0);
        assert!(!reader.has_fresh());
        // 没有新写入时重复读取同一个值
        assert_eq!(reader.read_latest(), 3.0);
    }

    #[test]
    fn test_interleaved_read_write() {
        let (mut writer, mut reader) = realtime_buffer(0_u32);
        for i in 1..100 {
            writer.write(i);
            assert_eq!(reader.read_latest(), i);
        }
    }

    #[test]
    fn test_init_rt_discards_pending_write() {
        let (mut writer, mut reader) = realtime_buffer(0.0_f64);
        writer.write(5.0);
        reader.init_rt(1.0);
        assert_eq!(reader.read_latest(), 1.0);

        // 之后的写入正常生效
        writer.write(7.0);
        assert_eq!(reader.read_latest(), 7.0);
    }

    #[test]
    fn test_init_rt_after_read() {
        let (mut writer, mut reader) = realtime_buffer(0.0_f64);
        writer.write(5.0);
        assert_eq!(reader.read_latest(), 5.0);
        reader.init_rt(-2.0);
        assert_eq!(reader.read_latest(), -2.0);
    }

    #[test]
    fn test_composite_value() {
        #[derive(Debug, Clone, Copy, PartialEq)]
        struct Pair {
            a: f64,
            b: f64,
        }

        let (mut writer, mut reader) = realtime_buffer(Pair { a: 0.0, b: 0.0 });
        writer.write(Pair { a: 1.0, b: -1.0 });
        assert_eq!(reader.read_latest(), Pair { a: 1.0, b: -1.0 });
    }

    #[test]
    fn test_endpoints_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<BufferWriter<f64>>();
        assert_send::<BufferReader<f64>>();
    }
}
