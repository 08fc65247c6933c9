// Cascade tests for the hierarchical wheels
//
// 分层时间轮级联测试

use crate::config::MonitorConfig;
use crate::task::{CallbackWrapper, TimeoutTask};
use crate::wheel::Wheel;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn make_wheel(wheel_size: usize, slot_interval_ms: u64, num_wheels: usize) -> Wheel {
    let config = MonitorConfig::builder()
        .wheel_size(wheel_size)
        .slot_interval(Duration::from_millis(slot_interval_ms))
        .num_wheels(num_wheels)
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

/// 以合成时间推进 `ticks` 次，返回每个 tick 被取空的任务 ID
/// (Advance `ticks` times on synthetic time, returning the IDs drained at
/// each tick)
fn drive(wheel: &Wheel, base: Instant, interval_ms: u64, ticks: u64) -> Vec<(u64, Vec<String>)> {
    let mut drained = Vec::new();
    for tick in 1..=ticks {
        let now = base + Duration::from_millis(interval_ms * tick);
        wheel.advance(now);
        let due: Vec<String> = wheel
            .take_current_slot()
            .iter()
            .map(|task| task.task_id().to_string())
            .collect();
        if !due.is_empty() {
            drained.push((tick, due));
        }
    }
    drained
}

#[test]
fn test_cascade_restores_slot_precision() {
    // W=4, Δ=100ms, L=2: 1500ms → 15 槽 → 第 1 层下取整偏移 3
    // (1500ms → 15 slots → upper wheel with floored offset 3)
    let wheel = make_wheel(4, 100, 2);
    let base = Instant::now();

    let task = make_task("c", base + Duration::from_millis(1500));
    wheel.insert_at(&task, base).unwrap();
    assert!(wheel.slot_contains(1, 3, "c"));

    // 第 1 层在 tick 12 进入槽 3，级联以剩余 300ms 重算 → 第 0 层槽 3，
    // 在 tick 15（恰好 1500ms）被取空
    // (The upper wheel enters slot 3 at tick 12; the cascade re-places with
    // 300ms remaining, and the task drains at tick 15, exactly 1500ms)
    let drained = drive(&wheel, base, 100, 16);
    assert_eq!(drained, vec![(15, vec!["c".to_string()])]);
}

#[test]
fn test_cascade_through_three_wheels() {
    // W=2, Δ=100ms, L=3: 最大范围 800ms
    // 700ms → 7 槽 → 第 2 层偏移 7/4 = 1
    let wheel = make_wheel(2, 100, 3);
    let base = Instant::now();

    let task = make_task("deep", base + Duration::from_millis(700));
    wheel.insert_at(&task, base).unwrap();
    assert!(wheel.slot_contains(2, 1, "deep"));

    // tick 4: 第 2 层进入槽 1，剩余 300ms → 第 1 层
    // tick 6: 第 1 层级联，剩余 100ms → 第 0 层
    // tick 7: 第 0 层取空，恰好 700ms
    let drained = drive(&wheel, base, 100, 8);
    assert_eq!(drained, vec![(7, vec!["deep".to_string()])]);
}

#[test]
fn test_exact_deadline_multiple_reenters_via_immediate_path() {
    // 1200ms 恰好是第 1 层槽宽的整数倍：级联发生在截止时刻本身，
    // 剩余时间为 0，任务经立即路径进入下一个底层槽，在 2Δ 内触发
    // (1200ms is an exact multiple of the upper slot width: the cascade
    // lands on the deadline itself with zero remaining, so the task takes
    // the immediate path into the next bottom slot, within the 2Δ bound)
    let wheel = make_wheel(4, 100, 2);
    let base = Instant::now();

    let task = make_task("edge", base + Duration::from_millis(1200));
    wheel.insert_at(&task, base).unwrap();
    assert!(wheel.slot_contains(1, 3, "edge"));

    let drained = drive(&wheel, base, 100, 14);
    assert_eq!(drained, vec![(13, vec!["edge".to_string()])]);
}

#[test]
fn test_cascade_moves_every_resident_task() {
    let wheel = make_wheel(4, 100, 2);
    let base = Instant::now();

    // 同一高层槽中的多个任务全部级联 (Every task in one upper slot cascades)
    let first = make_task("m1", base + Duration::from_millis(900));
    let second = make_task("m2", base + Duration::from_millis(1000));
    wheel.insert_at(&first, base).unwrap();
    wheel.insert_at(&second, base).unwrap();
    assert_eq!(wheel.slot_len(1, 2), 2);

    let drained = drive(&wheel, base, 100, 11);
    assert_eq!(
        drained,
        vec![
            (9, vec!["m1".to_string()]),
            (10, vec!["m2".to_string()]),
        ]
    );
}

#[test]
fn test_cancelled_task_never_resurfaces_after_cascade() {
    let wheel = make_wheel(4, 100, 2);
    let base = Instant::now();

    let task = make_task("gone", base + Duration::from_millis(1100));
    wheel.insert_at(&task, base).unwrap();
    task.cancel();

    let drained = drive(&wheel, base, 100, 16);
    assert!(drained.is_empty());
}
