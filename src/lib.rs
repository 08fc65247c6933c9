//! # 任务超时监控器 (Task Timeout Monitor)
//!
//! 基于分层时间轮（Hierarchical Timing Wheel）算法的进程内任务超时监控器，
//! 为每个在途任务强制执行独立的截止时间。
//! (In-process task timeout monitor based on the hierarchical timing wheel
//! algorithm, enforcing an individual deadline per in-flight task)
//!
//! ## 特性 (Features)
//!
//! - **高性能 (High Performance)**: 时间轮放置与取消操作的时间复杂度为 O(1)
//!   (Timing wheel placement and cancellation are O(1))
//! - **大规模支持 (Large-Scale Support)**: 能够高效管理 10000+ 并发监控任务
//!   (Efficiently manages 10000+ concurrently monitored tasks)
//! - **恰好一次触发 (Exactly-Once Firing)**: 每次成功的 `add` 至多对应一次回调
//!   (At most one callback invocation per successful `add`)
//! - **线程安全 (Thread-Safe)**: 使用 parking_lot 提供高性能的锁机制
//!   (Uses parking_lot for high-performance locking)
//!
//! ## 快速开始 (Quick Start)
//!
//! ```
//! use kestrel_monitor::{TimeoutMonitor, CallbackWrapper};
//! use std::time::Duration;
//!
//! // 创建并启动监控器 (Create and start the monitor)
//! let monitor = TimeoutMonitor::with_defaults();
//! monitor.start();
//!
//! // 注册任务超时监控 (Register a task for timeout monitoring)
//! let callback = CallbackWrapper::new(|task_id: &str| {
//!     println!("task {} timed out", task_id);
//! });
//! monitor
//!     .add("job-42", "node-7", Duration::from_secs(30), callback)
//!     .unwrap();
//!
//! // 任务按时完成后撤销监控 (Withdraw monitoring when the task completes)
//! monitor.remove("job-42");
//!
//! monitor.stop();
//! ```
//!
//! ## 中文架构说明
//!
//! ### 分层时间轮
//!
//! `L` 层时间轮，每层 `W` 个槽，槽间隔 `Δ`（默认 3 层、60 槽、1 秒）：
//!
//! - **第 0 层（底层）**: 每个槽覆盖 `Δ`，由 tick 线程逐槽取空
//! - **第 k 层（高层）**: 每个槽覆盖 `Δ × W^k`；低层回绕时高层推进一格，
//!   新进入槽中的任务级联下沉，用更小的剩余时间重新放置
//! - **最大范围**: `Δ × W^L`，超出的超时在 `add` 时被拒绝
//!
//! ### 线程模型
//!
//! - 单个 tick 线程按 `Δ` 的节奏推进槽指针并级联，指针推进天然串行
//! - 4 个回调工作线程通过互斥锁 + 条件变量保护的队列接收超时任务，
//!   慢回调不会阻塞 tick
//! - 取消是惰性的：`remove` 仅设置原子标记，任务在槽被取空或级联时跳过
//!
//! ## English Architecture Description
//!
//! ### Hierarchical Timing Wheel
//!
//! `L` wheels of `W` slots each with slot interval `Δ` (default: 3 wheels,
//! 60 slots, 1 second):
//!
//! - **Wheel 0 (bottom)**: each slot covers `Δ` and is drained slot by slot
//!   by the tick worker
//! - **Wheel k (upper)**: each slot covers `Δ × W^k`; when a lower wheel
//!   wraps, the upper wheel advances one slot and the tasks in its
//!   newly-entered slot cascade down, re-placed with their now-smaller
//!   remaining time
//! - **Maximum range**: `Δ × W^L`; longer timeouts are rejected by `add`
//!
//! ### Threading Model
//!
//! - A single tick worker advances the slot pointers on a `Δ` cadence and
//!   runs the cascade, keeping pointer movement trivially sequential
//! - 4 callback workers receive fired tasks through a mutex + condvar
//!   guarded queue, so a slow callback never stalls the ticks
//! - Cancellation is lazy: `remove` only sets an atomic flag, and the task
//!   is skipped when its slot is drained or cascaded

mod config;
mod error;
mod monitor;
mod pool;
mod registry;
mod task;
mod wheel;

// 重新导出公共 API (Re-export public API)
pub use config::{MonitorConfig, MonitorConfigBuilder};
pub use error::MonitorError;
pub use monitor::TimeoutMonitor;
pub use task::{CallbackWrapper, TimeoutCallback};
