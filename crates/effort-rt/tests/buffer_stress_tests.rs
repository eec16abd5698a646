//! 实时缓冲并发压力测试
//!
//! 验证写端与读端并发运行时：读端永远不会观察到撕裂的值，且观察到的序列不会倒退。

use effort_rt::realtime_buffer;
use rand::Rng;
use std::thread;

/// 多字段的值，撕裂读取会导致字段不一致
#[derive(Debug, Clone, Copy)]
struct Stamped {
    seq: u64,
    words: [u64; 7],
}

impl Stamped {
    fn new(seq: u64) -> Self {
        Stamped {
            seq,
            words: [seq.wrapping_mul(0x9E37_79B9_7F4A_7C15); 7],
        }
    }

    fn is_consistent(&self) -> bool {
        let expected = self.seq.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        self.words.iter().all(|w| *w == expected)
    }
}

#[test]
fn test_no_torn_reads_under_contention() {
    const ITERATIONS: u64 = 200_000;

    let (mut writer, mut reader) = realtime_buffer(Stamped::new(0));

    let writer_handle = thread::spawn(move || {
        let mut rng = rand::thread_rng();
        for seq in 1..=ITERATIONS {
            writer.write(Stamped::new(seq));
            if rng.gen_ratio(1, 64) {
                thread::yield_now();
            }
        }
    });

    let reader_handle = thread::spawn(move || {
        let mut last_seq = 0;
        let mut observed = 0u64;
        while last_seq < ITERATIONS {
            let value = reader.read_latest();
            assert!(value.is_consistent(), "torn read: {:?}", value);
            assert!(
                value.seq >= last_seq,
                "sequence went backwards: {} -> {}",
                last_seq,
                value.seq
            );
            if value.seq != last_seq {
                observed += 1;
            }
            last_seq = value.seq;
        }
        observed
    });

    writer_handle.join().unwrap();
    let observed = reader_handle.join().unwrap();

    // 最后一次写入必须可见
    assert!(observed >= 1);
}

#[test]
fn test_setpoint_values_are_always_written_values() {
    const ITERATIONS: usize = 100_000;

    let (mut writer, mut reader) = realtime_buffer(0.0_f64);

    let writer_handle = thread::spawn(move || {
        for i in 1..=ITERATIONS {
            // 只写入 0.5 的整数倍
            writer.write(i as f64 * 0.5);
        }
    });

    let final_value = ITERATIONS as f64 * 0.5;
    let mut last = 0.0;
    while last < final_value {
        let value = reader.read_latest();
        assert_eq!((value * 2.0).fract(), 0.0, "unexpected value {}", value);
        assert!(value >= last);
        last = value;
    }

    writer_handle.join().unwrap();
    assert_eq!(reader.read_latest(), final_value);
}

#[test]
fn test_reader_sees_init_value_until_first_write() {
    let (mut writer, mut reader) = realtime_buffer(Stamped::new(0));
    reader.init_rt(Stamped::new(42));

    for _ in 0..10 {
        assert_eq!(reader.read_latest().seq, 42);
    }

    let handle = thread::spawn(move || writer.write(Stamped::new(43)));
    handle.join().unwrap();
    assert_eq!(reader.read_latest().seq, 43);
}
