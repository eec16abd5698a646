//! 实时发布器（Realtime Publisher）
//!
//! 让实时线程以"尽力而为"的方式输出诊断数据，而不阻塞控制周期。
//!
//! # 设计
//!
//! - 发布器持有一个单槽消息缓冲（`parking_lot::Mutex<M>`）和一个"轮次"标志
//! - 实时线程调用 [`RealtimePublisher::try_lock`]：只有轮到实时端、且锁空闲时才成功，
//!   否则立即返回 `None`，本周期的数据直接丢弃（不排队、不重试）
//! - 填充消息后调用 [`PublishGuard::unlock_and_publish`]，把轮次交给后台线程
//! - 后台非实时线程拷贝消息、交还轮次，然后调用 [`StateSink::publish`]
//!
//! 实时端只做 `try_lock` 和 `try_send`，都不会阻塞，也不会分配内存。
//!
//! # 示例
//!
//! ```rust
//! use effort_rt::RealtimePublisher;
//!
//! # fn main() -> Result<(), effort_rt::RtError> {
//! let (tx, rx) = crossbeam_channel::unbounded();
//! let publisher = RealtimePublisher::new("demo", 0.0_f64, move |msg: &f64| {
//!     let _ = tx.send(*msg);
//! })?;
//!
//! if let Some(mut guard) = publisher.try_lock() {
//!     *guard = 42.0;
//!     guard.unlock_and_publish();
//! }
//! assert_eq!(rx.recv().unwrap(), 42.0);
//! # Ok(())
//! # }
//! ```

use crate::error::RtError;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, MutexGuard};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, trace};

const TURN_REALTIME: u8 = 0;
const TURN_NON_REALTIME: u8 = 1;

/// 诊断数据的最终去向（在非实时线程中调用）
pub trait StateSink<M>: Send + 'static {
    /// 发送一条消息，可以阻塞或分配
    fn publish(&mut self, msg: &M);
}

impl<M, F> StateSink<M> for F
where
    F: FnMut(&M) + Send + 'static,
{
    fn publish(&mut self, msg: &M) {
        self(msg)
    }
}

struct Inner<M> {
    msg: Mutex<M>,
    turn: AtomicU8,
    running: AtomicBool,
}

/// 实时发布器
///
/// `Drop` 时停止并回收后台线程（已交付但未发送的消息会先发送完）。
pub struct RealtimePublisher<M: Clone + Send + 'static> {
    inner: Arc<Inner<M>>,
    notify: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl<M: Clone + Send + 'static> RealtimePublisher<M> {
    /// 创建发布器并启动后台发布线程
    ///
    /// # 参数
    ///
    /// - `name`: 用于线程命名（`rt-pub-{name}`）
    /// - `initial`: 消息缓冲的初始内容（预分配）
    /// - `sink`: 消息的最终去向
    pub fn new<S>(name: &str, initial: M, sink: S) -> Result<Self, RtError>
    where
        S: StateSink<M>,
    {
        let inner = Arc::new(Inner {
            msg: Mutex::new(initial),
            turn: AtomicU8::new(TURN_REALTIME),
            running: AtomicBool::new(true),
        });
        // 容量 1：多余的通知没有意义，后台线程每次醒来只处理一条消息
        let (notify, wake) = crossbeam_channel::bounded(1);

        let thread_name = format!("rt-pub-{}", name);
        let thread_inner = Arc::clone(&inner);
        let thread = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || publishing_loop(thread_inner, wake, sink))
            .map_err(|source| RtError::Spawn {
                name: thread_name,
                source,
            })?;

        Ok(RealtimePublisher {
            inner,
            notify,
            thread: Some(thread),
        })
    }

    /// 尝试获取消息缓冲（实时安全）
    ///
    /// 后台线程还在处理上一条消息时返回 `None`。
    #[inline]
    pub fn try_lock(&self) -> Option<PublishGuard<'_, M>> {
        if self.inner.turn.load(Ordering::Acquire) != TURN_REALTIME {
            return None;
        }
        let guard = self.inner.msg.try_lock()?;
        Some(PublishGuard {
            guard,
            turn: &self.inner.turn,
            notify: &self.notify,
        })
    }

    /// 后台线程是否正在处理上一条消息
    pub fn is_busy(&self) -> bool {
        self.inner.turn.load(Ordering::Acquire) != TURN_REALTIME
    }
}

impl<M: Clone + Send + 'static> Drop for RealtimePublisher<M> {
    fn drop(&mut self) {
        self.inner.running.store(false, Ordering::Release);
        // 阻塞发送：保证后台线程在看到 running == false 之后还会再醒来一次
        let _ = self.notify.send(());
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::warn!("Realtime publisher thread panicked");
        }
    }
}

/// 已锁定的消息缓冲
///
/// 直接 drop 会释放锁但不发布。
pub struct PublishGuard<'a, M> {
    guard: MutexGuard<'a, M>,
    turn: &'a AtomicU8,
    notify: &'a Sender<()>,
}

impl<M> PublishGuard<'_, M> {
    /// 释放锁并把消息交给后台线程
    #[inline]
    pub fn unlock_and_publish(self) {
        let PublishGuard {
            guard,
            turn,
            notify,
        } = self;
        turn.store(TURN_NON_REALTIME, Ordering::Release);
        drop(guard);
        let _ = notify.try_send(());
    }
}

impl<M> Deref for PublishGuard<'_, M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.guard
    }
}

impl<M> DerefMut for PublishGuard<'_, M> {
    fn deref_mut(&mut self) -> &mut M {
        &mut self.guard
    }
}

fn publishing_loop<M, S>(inner: Arc<Inner<M>>, wake: Receiver<()>, mut sink: S)
where
    M: Clone + Send + 'static,
    S: StateSink<M>,
{
    debug!("Realtime publisher thread started");

    while wake.recv().is_ok() {
        deliver_pending(&inner, &mut sink);

        if !inner.running.load(Ordering::Acquire) {
            break;
        }
    }

    // 停止前可能还有一条在 sink 忙碌时被接受的消息
    deliver_pending(&inner, &mut sink);

    debug!("Realtime publisher thread stopped");
}

/// 如果实时端交付了消息，取出并发送
fn deliver_pending<M, S>(inner: &Inner<M>, sink: &mut S)
where
    M: Clone + Send + 'static,
    S: StateSink<M>,
{
    if inner.turn.load(Ordering::Acquire) != TURN_NON_REALTIME {
        return;
    }
    let outgoing = {
        let msg = inner.msg.lock();
        let outgoing = msg.clone();
        inner.turn.store(TURN_REALTIME, Ordering::Release);
        outgoing
    };
    trace!("Publishing state message");
    sink.publish(&outgoing);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_publish_roundtrip() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let publisher = RealtimePublisher::new("test", 0_u32, move |msg: &u32| {
            let _ = tx.send(*msg);
        })
        .unwrap();

        let mut guard = publisher.try_lock().expect("publisher should be free");
        *guard = 7;
        guard.unlock_and_publish();

        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), 7);
    }

    #[test]
    fn test_try_lock_fails_while_locked() {
        let publisher = RealtimePublisher::new("test", 0_u32, |_: &u32| {}).unwrap();
        let guard = publisher.try_lock();
        assert!(guard.is_some());
        assert!(publisher.try_lock().is_none());
        drop(guard);
        assert!(publisher.try_lock().is_some());
    }

    #[test]
    fn test_drop_guard_without_publish() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let publisher = RealtimePublisher::new("test", 0_u32, move |msg: &u32| {
            let _ = tx.send(*msg);
        })
        .unwrap();

        {
            let mut guard = publisher.try_lock().unwrap();
            *guard = 3;
        }
        assert!(!publisher.is_busy());
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_drop_delivers_message_accepted_while_sink_busy() {
        let (entered_tx, entered_rx) = crossbeam_channel::unbounded();
        let (out_tx, out_rx) = crossbeam_channel::unbounded();
        let publisher = RealtimePublisher::new("test", 0_u32, move |msg: &u32| {
            let _ = entered_tx.send(*msg);
            std::thread::sleep(Duration::from_millis(50));
            let _ = out_tx.send(*msg);
        })
        .unwrap();

        let mut guard = publisher.try_lock().unwrap();
        *guard = 1;
        guard.unlock_and_publish();
        assert_eq!(entered_rx.recv_timeout(Duration::from_secs(1)).unwrap(), 1);

        // sink 还在处理第一条，第二条被接受
        let mut guard = publisher.try_lock().expect("slot should be free while sink runs");
        *guard = 2;
        guard.unlock_and_publish();
        drop(publisher);

        let delivered: Vec<u32> = out_rx.try_iter().collect();
        assert_eq!(delivered, vec![1, 2]);
    }

    #[test]
    fn test_busy_while_sink_blocked() {
        let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(0);
        let (out_tx, out_rx) = crossbeam_channel::unbounded();
        let publisher = RealtimePublisher::new("test", 0_u32, move |msg: &u32| {
            // 第一条消息在 sink 中等待放行
            let _ = gate_rx.recv();
            let _ = out_tx.send(*msg);
        })
        .unwrap();

        let mut guard = publisher.try_lock().unwrap();
        *guard = 1;
        guard.unlock_and_publish();

        // 后台线程交还轮次后才进入 sink，这里等它交还
        let deadline = std::time::Instant::now() + Duration::from_secs(1);
        while publisher.is_busy() && std::time::Instant::now() < deadline {
            std::thread::yield_now();
        }
        assert!(!publisher.is_busy());

        // sink 仍被阻塞时，新消息可以写入槽，但不会被重复通知打乱
        let mut guard = publisher.try_lock().unwrap();
        *guard = 2;
        guard.unlock_and_publish();
        assert!(publisher.try_lock().is_none());

        gate_tx.send(()).unwrap();
        gate_tx.send(()).unwrap();
        assert_eq!(out_rx.recv_timeout(Duration::from_secs(1)).unwrap(), 1);
        assert_eq!(out_rx.recv_timeout(Duration::from_secs(1)).unwrap(), 2);
    }
}
