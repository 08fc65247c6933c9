// Placement calculator tests
//
// 放置计算测试

use crate::config::MonitorConfig;
use crate::task::{CallbackWrapper, TimeoutTask};
use crate::wheel::Wheel;
use std::sync::Arc;
use std::time::{Duration, Instant};

// 测试几何: W=4, Δ=100ms, L=2 (Test geometry: W=4, Δ=100ms, L=2)
fn small_wheel() -> Wheel {
    let config = MonitorConfig::builder()
        .wheel_size(4)
        .slot_interval(Duration::from_millis(100))
        .num_wheels(2)
        .build()
        .unwrap();
    Wheel::new(&config)
}

fn make_task(task_id: &str, expire_time: Instant) -> Arc<TimeoutTask> {
    Arc::new(TimeoutTask::new(
        task_id.to_string(),
        "node".to_string(),
        expire_time,
        CallbackWrapper::new(|_: &str| {}),
    ))
}

#[test]
fn test_placement_is_relative_to_current_pointer() {
    let wheel = small_wheel();
    let base = Instant::now();

    // 推进 2 个 tick 后放置 250ms 的任务 (Advance 2 ticks, then place a
    // 250ms task)
    for tick in 1..=2u64 {
        wheel.advance(base + Duration::from_millis(100 * tick));
    }
    assert_eq!(wheel.current_slot(0), 2);

    let now = base + Duration::from_millis(200);
    // 3 槽偏移相对当前指针: (2+3) % 4 = 1
    let (level, slot) = wheel.position_for(now + Duration::from_millis(250), now);
    assert_eq!((level, slot), (0, 1));
}

#[test]
fn test_exact_interval_multiple_is_not_rounded() {
    let wheel = small_wheel();
    let now = Instant::now();

    // 300ms 恰好是 3 个槽，不向上取整
    // (300ms is exactly 3 slots, no rounding)
    let (level, slot) = wheel.position_for(now + Duration::from_millis(300), now);
    assert_eq!((level, slot), (0, 3));
}

#[test]
fn test_partial_slot_rounds_up() {
    let wheel = small_wheel();
    let now = Instant::now();

    // 101ms → ceil(101/100) = 2 槽 (101ms rounds up to 2 slots)
    let (level, slot) = wheel.position_for(now + Duration::from_millis(101), now);
    assert_eq!((level, slot), (0, 2));
}

#[test]
fn test_higher_wheel_offset_is_relative_to_its_own_pointer() {
    let wheel = small_wheel();
    let base = Instant::now();

    // 推进 4 个 tick 使第 1 层指针走到 1
    // (Advance 4 ticks so the upper wheel's pointer reaches 1)
    for tick in 1..=4u64 {
        wheel.advance(base + Duration::from_millis(100 * tick));
    }
    assert_eq!(wheel.current_slot(1), 1);

    let now = base + Duration::from_millis(400);
    // 1200ms → 12 槽 → 第 1 层偏移 3: (1+3) % 4 = 0
    let (level, slot) = wheel.position_for(now + Duration::from_millis(1200), now);
    assert_eq!((level, slot), (1, 0));
}

#[test]
fn test_insert_after_pointer_wrap_uses_wrapped_slot() {
    let wheel = small_wheel();
    let base = Instant::now();

    // 指针在最后一个槽时，过期任务放置必须回绕到槽 0
    // (With the pointer on the last slot, an expired task must wrap to
    // slot 0)
    for tick in 1..=3u64 {
        wheel.advance(base + Duration::from_millis(100 * tick));
    }
    assert_eq!(wheel.current_slot(0), 3);

    let now = base + Duration::from_millis(300);
    let task = make_task("late", now - Duration::from_millis(10));
    wheel.insert_at(&task, now).unwrap();
    assert!(wheel.slot_contains(0, 0, "late"));
}

#[test]
fn test_default_geometry_full_range_boundary() {
    // 默认几何: W=60, Δ=1000ms, L=3，最大范围 216000 秒
    let config = MonitorConfig::default();
    let wheel = Wheel::new(&config);
    let now = Instant::now();

    let max = config.max_timeout_range();
    // 216000 槽 = 60^3，偏移 216000/3600 = 60 回绕到当前槽
    let (level, slot) = wheel.position_for(now + max, now);
    assert_eq!((level, slot), (2, 0));
}
