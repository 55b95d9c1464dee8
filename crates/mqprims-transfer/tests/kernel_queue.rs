#![cfg(target_os = "linux")]

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use mqprims_queue::{unlink, QueueConfig};
use mqprims_transfer::{Context, MessageQueue, TransferError};

/// Queue that is unlinked when the test ends, even on panic.
struct TestQueue {
    name: String,
    mq: Option<Arc<MessageQueue>>,
}

impl TestQueue {
    fn open(tag: &str, depth: usize, size: usize) -> Self {
        let name = format!(
            "/mqprims-it-{tag}-{}-{}",
            std::process::id(),
            SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        );
        let mq = MessageQueue::open(&name, &QueueConfig::new(depth, size))
            .expect("queue should open");
        Self {
            name,
            mq: Some(Arc::new(mq)),
        }
    }

    fn mq(&self) -> &Arc<MessageQueue> {
        self.mq.as_ref().expect("queue is open")
    }
}

impl Drop for TestQueue {
    fn drop(&mut self) {
        if let Some(mq) = self.mq.take() {
            if let Ok(mq) = Arc::try_unwrap(mq) {
                let _ = mq.close();
            }
        }
        let _ = unlink(&self.name);
    }
}

#[test]
fn depth_two_queue_full_scenario() {
    let q = TestQueue::open("full", 2, 10);
    let mq = q.mq();
    let now = Context::background();

    mq.send(&now, b"test", 0).unwrap();
    assert_eq!(&*mq.receive(&now).unwrap(), b"test");

    mq.send(&now, b"one", 0).unwrap();
    mq.send(&now, b"two", 0).unwrap();
    let start = Instant::now();
    let err = mq.send(&now, b"three", 0).unwrap_err();
    assert!(matches!(err, TransferError::QueueFull), "got {err:?}");
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[test]
fn empty_queue_without_deadline_fails_immediately() {
    let q = TestQueue::open("empty", 2, 10);
    let err = q.mq().receive(&Context::background()).unwrap_err();
    assert!(matches!(err, TransferError::QueueEmpty), "got {err:?}");
}

#[test]
fn oversized_message_rejected() {
    let q = TestQueue::open("oversized", 2, 10);
    let err = q
        .mq()
        .send(&Context::background(), b"eleven byte", 0)
        .unwrap_err();
    assert!(matches!(
        err,
        TransferError::MessageTooLarge { size: 11, max: 10 }
    ));
}

#[test]
fn roundtrip_preserves_bytes_for_all_sizes() {
    let q = TestQueue::open("sizes", 4, 64);
    let mq = q.mq();
    let ctx = Context::with_timeout(Duration::from_secs(5));

    for len in [0usize, 1, 2, 31, 63, 64] {
        let payload: Vec<u8> = (0..len).map(|i| (i * 7 + len) as u8).collect();
        mq.send(&ctx, &payload, 1).unwrap();
        let received = mq.receive(&Context::background()).unwrap();
        assert_eq!(&*received, payload.as_slice(), "len {len}");
        assert!(received.len() <= mq.max_message_size());
    }
}

#[test]
fn higher_priority_delivered_first() {
    let q = TestQueue::open("priority", 8, 16);
    let mq = q.mq();
    let now = Context::background();

    mq.send(&now, b"low-a", 1).unwrap();
    mq.send(&now, b"high", 9).unwrap();
    mq.send(&now, b"low-b", 1).unwrap();
    mq.send(&now, b"mid", 5).unwrap();

    let order: Vec<(Vec<u8>, u32)> = (0..4)
        .map(|_| {
            let m = mq.receive(&now).unwrap();
            (m.to_vec(), m.priority())
        })
        .collect();
    assert_eq!(
        order,
        vec![
            (b"high".to_vec(), 9),
            (b"mid".to_vec(), 5),
            (b"low-a".to_vec(), 1),
            (b"low-b".to_vec(), 1),
        ]
    );
}

#[test]
fn elapsed_deadline_returns_without_blocking() {
    let q = TestQueue::open("elapsed", 1, 16);
    let mq = q.mq();
    let past = Context::with_deadline(SystemTime::now() - Duration::from_secs(1));

    let start = Instant::now();
    assert!(mq.receive(&past).unwrap_err().is_timeout());

    mq.send(&Context::background(), b"fill", 0).unwrap();
    assert!(mq.send(&past, b"more", 0).unwrap_err().is_timeout());
    assert!(start.elapsed() < Duration::from_millis(100));

    // A message that is available is still delivered.
    assert_eq!(&*mq.receive(&past).unwrap(), b"fill");
}

#[test]
fn timed_receive_waits_for_sender() {
    let q = TestQueue::open("wait", 2, 16);
    let sender = Arc::clone(q.mq());

    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        sender.send(&Context::background(), b"late", 3).unwrap();
    });

    let msg = q
        .mq()
        .receive(&Context::with_timeout(Duration::from_secs(5)))
        .unwrap();
    assert_eq!(&*msg, b"late");
    assert_eq!(msg.priority(), 3);
    handle.join().unwrap();
}

#[test]
fn unbounded_timeout_blocks_until_sender() {
    let q = TestQueue::open("unbounded", 2, 16);
    let sender = Arc::clone(q.mq());

    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        sender.send(&Context::background(), b"eventually", 1).unwrap();
    });

    let start = Instant::now();
    let msg = q.mq().receive(&Context::with_timeout(Duration::MAX)).unwrap();
    assert_eq!(&*msg, b"eventually");
    assert!(start.elapsed() >= Duration::from_millis(50));
    handle.join().unwrap();
}

#[test]
fn timed_receive_times_out_on_empty_queue() {
    let q = TestQueue::open("timeout", 2, 16);
    let start = Instant::now();
    let err = q
        .mq()
        .receive(&Context::with_timeout(Duration::from_millis(100)))
        .unwrap_err();
    assert!(err.is_timeout());
    assert!(start.elapsed() >= Duration::from_millis(90));
}

#[test]
fn cancellation_during_blocking_attempt_waits_for_kernel() {
    let q = TestQueue::open("cancel-latency", 2, 16);
    let ctx = Context::with_timeout(Duration::from_millis(200));
    let canceller = ctx.clone();

    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        canceller.cancel();
    });

    let start = Instant::now();
    let err = q.mq().receive(&ctx).unwrap_err();
    handle.join().unwrap();

    // The blocking call is not interruptible by the token; it ends on the
    // kernel timeout, bounded by one attempt.
    assert!(err.is_timeout(), "got {err:?}");
    assert!(start.elapsed() < Duration::from_secs(2));

    // The next call observes the cancellation before touching the kernel.
    assert!(q.mq().receive(&ctx).unwrap_err().is_cancelled());
}

#[test]
fn concurrent_senders_and_receivers_lose_nothing() {
    const SENDERS: usize = 4;
    const PER_SENDER: usize = 1000;
    const RECEIVERS: usize = 4;

    let q = TestQueue::open("concurrent", 10, 32);
    let total = SENDERS * PER_SENDER;

    let senders: Vec<_> = (0..SENDERS)
        .map(|s| {
            let mq = Arc::clone(q.mq());
            thread::spawn(move || {
                for k in 0..PER_SENDER {
                    let tag = format!("{s}:{k}");
                    mq.send(
                        &Context::with_timeout(Duration::from_secs(30)),
                        tag.as_bytes(),
                        0,
                    )
                    .unwrap();
                }
            })
        })
        .collect();

    let receivers: Vec<_> = (0..RECEIVERS)
        .map(|_| {
            let mq = Arc::clone(q.mq());
            thread::spawn(move || {
                (0..total / RECEIVERS)
                    .map(|_| {
                        let msg = mq
                            .receive(&Context::with_timeout(Duration::from_secs(30)))
                            .unwrap();
                        String::from_utf8(msg.to_vec()).unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for sender in senders {
        sender.join().unwrap();
    }
    let mut seen = HashSet::new();
    for receiver in receivers {
        for tag in receiver.join().unwrap() {
            assert!(seen.insert(tag.clone()), "duplicate delivery of {tag}");
        }
    }
    assert_eq!(seen.len(), total);
    for s in 0..SENDERS {
        for k in 0..PER_SENDER {
            assert!(seen.contains(&format!("{s}:{k}")), "lost {s}:{k}");
        }
    }
    assert!(q.mq().pool().idle() <= RECEIVERS);
}
