extern crate stylus;

mod common;

use stylus::prelude::*;

use crate::common::inline_settings;

#[test]
fn deferred_fence_is_reached_at_the_next_advance() {
    let executor = Executor::headless(inline_settings()).unwrap();

    let point = executor.insert_fence().unwrap();
    assert_eq!(executor.fence_value(point.index), FENCE_UNSET);

    executor.advance().unwrap();
    executor.wait_fence(point);
    assert_eq!(executor.fence_value(point.index), point.value);
}

#[test]
fn bypass_fence_is_reached_at_insertion() {
    let settings = Settings {
        bypass: true,
        ..inline_settings()
    };
    let executor = Executor::headless(settings).unwrap();

    let point = executor.insert_fence().unwrap();
    assert_eq!(executor.fence_value(point.index), point.value);
    executor.wait_fence(point);
}

#[test]
fn fence_values_increase_monotonically() {
    let executor = Executor::headless(inline_settings()).unwrap();

    let a = executor.insert_fence().unwrap();
    let b = executor.insert_fence().unwrap();
    assert!(b.value > a.value);

    executor.advance().unwrap();
    executor.wait_fence(a);
    executor.wait_fence(b);
}

#[test]
fn ring_slots_recycle_across_frames() {
    let settings = Settings {
        fence_ring_size: 2,
        ..inline_settings()
    };
    let executor = Executor::headless(settings).unwrap();

    // One fence per frame on a two-slot ring; every slot gets reused well
    // past the ring capacity without tripping the collision check.
    for _ in 0..5 {
        let point = executor.insert_fence().unwrap();
        executor.advance().unwrap();
        executor.wait_fence(point);
    }
}

#[test]
fn wait_fence_blocks_on_the_execution_thread() {
    let _ = env_logger::try_init();

    let settings = Settings {
        execution_thread: true,
        parallel_translate: false,
        num_workers: 0,
        ..Default::default()
    };
    let executor = Executor::headless(settings).unwrap();

    let point = executor.insert_fence().unwrap();
    executor.advance().unwrap();

    // The signal replays on the execution thread; waiting here synchronizes
    // with it without an explicit flush.
    executor.wait_fence(point);
    assert_eq!(executor.fence_value(point.index), point.value);
}
