// Cancellation tests for the monitor facade
//
// 监控器取消测试

use crate::config::MonitorConfig;
use crate::monitor::TimeoutMonitor;
use crate::task::CallbackWrapper;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// W=4, Δ=100ms, L=2 (spec scenario geometry)
fn scenario_monitor() -> TimeoutMonitor {
    TimeoutMonitor::new(
        MonitorConfig::builder()
            .wheel_size(4)
            .slot_interval(Duration::from_millis(100))
            .num_wheels(2)
            .build()
            .unwrap(),
    )
    .unwrap()
}

fn counting_callback(counter: &Arc<AtomicU32>) -> CallbackWrapper {
    let counter = Arc::clone(counter);
    CallbackWrapper::new(move |_: &str| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn test_remove_before_deadline_prevents_callback() {
    let monitor = scenario_monitor();
    monitor.start();

    let counter = Arc::new(AtomicU32::new(0));
    monitor
        .add("b", "n", Duration::from_millis(500), counting_callback(&counter))
        .unwrap();

    // 在截止时间远未到达时移除 (Remove well before the deadline)
    thread::sleep(Duration::from_millis(100));
    assert!(monitor.remove("b"));
    assert_eq!(monitor.count(), 0);

    // 回调永不触发 (The callback never fires)
    thread::sleep(Duration::from_millis(700));
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    monitor.stop();
}

#[test]
fn test_remove_unknown_task_returns_false() {
    let monitor = scenario_monitor();
    monitor.start();

    assert!(!monitor.remove("never-added"));

    monitor.stop();
}

#[test]
fn test_remove_is_effective_only_once() {
    let monitor = scenario_monitor();
    monitor.start();

    let counter = Arc::new(AtomicU32::new(0));
    monitor
        .add("once", "n", Duration::from_millis(500), counting_callback(&counter))
        .unwrap();

    assert!(monitor.remove("once"));
    assert!(!monitor.remove("once"));

    monitor.stop();
}

#[test]
fn test_remove_does_not_affect_slot_neighbours() {
    let monitor = scenario_monitor();
    monitor.start();

    let counter = Arc::new(AtomicU32::new(0));

    // 三个任务落入同一个槽 (Three tasks land in the same slot)
    for task_id in ["n1", "n2", "n3"] {
        monitor
            .add(task_id, "node", Duration::from_millis(300), counting_callback(&counter))
            .unwrap();
    }

    assert!(monitor.remove("n2"));

    thread::sleep(Duration::from_millis(700));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(monitor.count(), 0);

    monitor.stop();
}

#[test]
fn test_remove_from_higher_wheel_before_cascade() {
    let monitor = scenario_monitor();
    monitor.start();

    let counter = Arc::new(AtomicU32::new(0));

    // 1200ms 的任务位于第 1 层；在它级联下沉之前移除
    // (A 1200ms task sits on the upper wheel; remove it before it cascades)
    monitor
        .add("hi", "n", Duration::from_millis(1200), counting_callback(&counter))
        .unwrap();

    thread::sleep(Duration::from_millis(200));
    assert!(monitor.remove("hi"));

    thread::sleep(Duration::from_millis(1400));
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    monitor.stop();
}
