use std::thread;

use keiko::{RingError, SampleRing};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Write(usize),
    Read(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..24).prop_map(Op::Write),
        (0usize..24).prop_map(Op::Read),
    ]
}

proptest! {
    /// Fill levels always add up to capacity - 1, and failed transfers change nothing.
    #[test]
    fn capacity_invariant_holds(capacity in 1usize..40, ops in prop::collection::vec(op(), 1..200)) {
        let (mut tx, mut rx) = SampleRing::new(capacity).unwrap();
        let mut next = 0.0f32;
        let mut expected = std::collections::VecDeque::new();

        for op in ops {
            let before = rx.available_to_read();
            match op {
                Op::Write(n) => {
                    let data: Vec<f32> = (0..n).map(|i| next + i as f32).collect();
                    match tx.write(&data) {
                        Ok(()) => {
                            next += n as f32;
                            expected.extend(data);
                        }
                        Err(RingError::Full { requested, available }) => {
                            prop_assert_eq!(requested, n);
                            prop_assert!(available < n);
                            prop_assert_eq!(rx.available_to_read(), before);
                        }
                        Err(other) => prop_assert!(false, "unexpected {:?}", other),
                    }
                }
                Op::Read(n) => {
                    let mut out = vec![f32::NAN; n];
                    match rx.read(&mut out) {
                        Ok(()) => {
                            let want: Vec<f32> = expected.drain(..n).collect();
                            prop_assert_eq!(out, want);
                        }
                        Err(RingError::Empty { available, .. }) => {
                            prop_assert!(available < n);
                            prop_assert_eq!(rx.available_to_read(), before);
                            prop_assert!(out.iter().all(|s| s.is_nan()));
                        }
                        Err(other) => prop_assert!(false, "unexpected {:?}", other),
                    }
                }
            }

            prop_assert_eq!(rx.available_to_read(), expected.len());
            prop_assert_eq!(rx.available_to_read() + tx.available_to_write(), capacity - 1);
        }
    }
}

#[test]
/// Many wraps of a small ring across two threads reproduce the written sequence
fn threaded_round_trip() {
    const TOTAL: usize = 200_000;
    const CHUNK: usize = 7;

    let (mut tx, mut rx) = SampleRing::new(33).unwrap();

    let producer = thread::spawn(move || {
        let mut next = 0usize;
        let mut chunk = [0.0f32; CHUNK];
        while next < TOTAL {
            for (i, s) in chunk.iter_mut().enumerate() {
                *s = ((next + i) % 1_000_000) as f32;
            }
            if tx.write(&chunk).is_ok() {
                next += CHUNK;
            } else {
                thread::yield_now();
            }
        }
    });

    let mut expected = 0usize;
    let mut out = [0.0f32; 5];
    while expected < TOTAL {
        if rx.read(&mut out).is_ok() {
            for s in out {
                assert_eq!(s, (expected % 1_000_000) as f32);
                expected += 1;
            }
        } else {
            thread::yield_now();
        }
    }

    producer.join().unwrap();
}
