use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::pool::{self, CallbackQueue, CALLBACK_WORKERS};
use crate::registry::TaskRegistry;
use crate::task::{CallbackWrapper, TimeoutTask};
use crate::wheel::Wheel;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Shared state between the facade and its worker threads
///
/// facade 与工作线程之间共享的状态
struct Inner {
    config: MonitorConfig,
    wheel: Wheel,
    registry: TaskRegistry,
    queue: CallbackQueue,
    running: AtomicBool,

    /// Gate the tick worker sleeps behind between ticks; `stop` signals it
    ///
    /// tick 线程在两次推进之间休眠所依赖的门闩；`stop` 通过它发出信号
    tick_gate: Mutex<()>,
    tick_signal: Condvar,
}

/// Task Timeout Monitor
///
/// Tracks a large, dynamic population of in-flight tasks on a hierarchical
/// timing wheel and fires a user callback exactly once per task whose
/// deadline passes. One tick worker advances the wheels on a fixed cadence;
/// a fixed pool of callback workers invokes the user callbacks so a slow
/// callback never stalls the ticks.
///
/// 任务超时监控器。基于分层时间轮跟踪大量动态任务，
/// 每个超过截止时间的任务恰好触发一次用户回调。
/// 单个 tick 线程按固定节奏推进时间轮；
/// 固定大小的回调线程池执行用户回调，慢回调不会阻塞 tick。
///
/// # Examples (示例)
///
/// ```
/// use kestrel_monitor::{TimeoutMonitor, CallbackWrapper, MonitorConfig};
/// use std::time::Duration;
///
/// let monitor = TimeoutMonitor::with_defaults();
/// monitor.start();
///
/// let callback = CallbackWrapper::new(|task_id: &str| {
///     println!("task {} timed out", task_id);
/// });
/// monitor
///     .add("job-42", "node-7", Duration::from_secs(30), callback)
///     .unwrap();
///
/// // 任务按时完成后撤销监控 (Withdraw monitoring once the task completes)
/// assert!(monitor.remove("job-42"));
///
/// monitor.stop();
/// ```
pub struct TimeoutMonitor {
    inner: Arc<Inner>,

    /// Tick worker handle, present while running
    ///
    /// tick 线程句柄，运行期间存在
    tick_worker: Mutex<Option<JoinHandle<()>>>,

    /// Callback pool handles, present while running
    ///
    /// 回调线程池句柄，运行期间存在
    callback_workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TimeoutMonitor {
    /// Create a new timeout monitor
    ///
    /// No thread is spawned until [`start`](Self::start) is called.
    ///
    /// # Errors
    /// Fails with [`MonitorError::InvalidConfiguration`] when the wheel
    /// geometry is invalid (zero slots, zero wheels, zero interval, or an
    /// overflowing range); the config struct has public fields, so it is
    /// re-validated here even when it came from the builder.
    ///
    /// 创建新的超时监控器。调用 `start` 之前不会创建任何线程。
    /// 几何参数无效时立即失败。
    pub fn new(config: MonitorConfig) -> Result<Self, MonitorError> {
        config.validate()?;

        let wheel = Wheel::new(&config);

        info!(
            num_wheels = config.num_wheels,
            wheel_size = config.wheel_size,
            slot_interval_ms = config.slot_interval.as_millis() as u64,
            "超时监控器初始化 (timeout monitor initialized)"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                wheel,
                registry: TaskRegistry::new(),
                queue: CallbackQueue::new(),
                running: AtomicBool::new(false),
                tick_gate: Mutex::new(()),
                tick_signal: Condvar::new(),
            }),
            tick_worker: Mutex::new(None),
            callback_workers: Mutex::new(Vec::new()),
        })
    }

    /// Create a monitor with the default geometry (60 slots, 1s interval,
    /// 3 wheels, a maximum range of 60 hours)
    ///
    /// 使用默认几何参数创建监控器（60 槽/层, 1 秒/槽, 3 层，
    /// 最大范围 60 小时）
    pub fn with_defaults() -> Self {
        Self::new(MonitorConfig::default()).expect("default configuration is valid")
    }

    /// Start the monitor
    ///
    /// Transitions the running flag with a compare-and-set; the losing call
    /// of a race is a no-op, and calling `start` on an already-running
    /// monitor returns immediately. Resets every slot pointer, then spawns
    /// the tick worker and the callback pool.
    ///
    /// 启动监控器。以 CAS 翻转运行标记，竞争失败方为空操作，
    /// 重复调用立即返回。重置所有槽指针后创建 tick 线程与回调线程池。
    pub fn start(&self) {
        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return; // 已经在运行 (already running)
        }

        self.inner.wheel.reset();

        let inner = Arc::clone(&self.inner);
        *self.tick_worker.lock() = Some(thread::spawn(move || inner.tick_loop()));

        let mut workers = self.callback_workers.lock();
        for _ in 0..CALLBACK_WORKERS {
            let inner = Arc::clone(&self.inner);
            workers.push(thread::spawn(move || {
                pool::run_worker(&inner.queue, &inner.running)
            }));
        }

        info!("任务超时监控器已启动 (timeout monitor started)");
    }

    /// Stop the monitor
    ///
    /// Clears the running flag, wakes the tick worker and every callback
    /// worker, joins them all, then drains the callback queue without
    /// dispatch and clears the registry and every slot. Idempotent; also
    /// invoked by `Drop`. After `stop` returns, no callback fires and no
    /// thread owned by the monitor is running.
    ///
    /// 停止监控器。清除运行标记，唤醒并 join 所有工作线程，
    /// 随后清空回调队列（不派发）、注册表与全部槽位。幂等；
    /// 析构时也会调用。`stop` 返回后不再有回调触发，
    /// 监控器不再拥有任何运行中的线程。
    pub fn stop(&self) {
        if self
            .inner
            .running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        // 持锁通知 tick 线程，避免丢失唤醒
        // (Notify the tick worker under its gate to avoid a lost wakeup)
        {
            let _gate = self.inner.tick_gate.lock();
            self.inner.tick_signal.notify_all();
        }
        self.inner.queue.wake_all();

        if let Some(handle) = self.tick_worker.lock().take() {
            let _ = handle.join();
        }
        for handle in self.callback_workers.lock().drain(..) {
            let _ = handle.join();
        }

        self.inner.queue.clear();
        self.inner.registry.clear();
        self.inner.wheel.clear();

        info!("任务超时监控器已停止 (timeout monitor stopped)");
    }

    /// Add a task to monitor
    ///
    /// Computes `expire_time = now + timeout`, registers the task and places
    /// it on the wheel. The callback fires exactly once, on some callback
    /// worker thread, once the deadline passes, unless the task is removed
    /// first.
    ///
    /// # Errors
    /// - [`MonitorError::NotRunning`]: the monitor has not been started
    /// - [`MonitorError::InvalidTimeout`]: `timeout` is zero
    /// - [`MonitorError::TimeoutOutOfRange`]: `timeout` exceeds `Δ × W^L`
    ///   (the boundary itself is accepted)
    /// - [`MonitorError::DuplicateTask`]: the identifier is already
    ///   monitored
    /// - [`MonitorError::PlacementFailed`]: internal invariant breakage;
    ///   the registry entry is rolled back
    ///
    /// 添加任务超时监控。按未运行、零超时、超范围、重复 ID 的顺序拒绝；
    /// 放置失败时回滚注册表。
    pub fn add(
        &self,
        task_id: impl Into<String>,
        node_id: impl Into<String>,
        timeout: Duration,
        callback: CallbackWrapper,
    ) -> Result<(), MonitorError> {
        if !self.running() {
            return Err(MonitorError::NotRunning);
        }

        if timeout.is_zero() {
            return Err(MonitorError::InvalidTimeout);
        }

        let max = self.inner.config.max_timeout_range();
        if timeout > max {
            return Err(MonitorError::TimeoutOutOfRange { timeout, max });
        }

        let now = Instant::now();
        let task = Arc::new(TimeoutTask::new(
            task_id.into(),
            node_id.into(),
            now + timeout,
            callback,
        ));

        // 锁序：注册表在前，槽锁在后 (Lock order: registry before slot)
        self.inner.registry.insert(Arc::clone(&task))?;

        if let Err(err) = self.inner.wheel.insert_at(&task, now) {
            // 放置失败时回滚注册表项 (Roll back the registry entry)
            self.inner.registry.remove(task.task_id());
            return Err(err);
        }

        debug!(
            task_id = %task.task_id(),
            node_id = %task.node_id(),
            timeout_ms = timeout.as_millis() as u64,
            "开始监控任务超时 (task timeout monitoring added)"
        );

        Ok(())
    }

    /// Remove a task from monitoring
    ///
    /// Erases the registry entry and sets the task's cancellation flag. The
    /// task is not physically extracted from its slot; it is skipped when the
    /// slot is next drained or cascaded. Returns `false` for an unknown
    /// identifier.
    ///
    /// A `true` return guarantees at-most-once firing from this point on; it
    /// does not imply the callback has not already run.
    ///
    /// 移除任务超时监控。删除注册表项并设置取消标记；
    /// 任务不会立即从槽中摘除，而是在槽被取空或级联时跳过。
    /// 未知 ID 返回 `false`。
    pub fn remove(&self, task_id: &str) -> bool {
        let Some(task) = self.inner.registry.remove(task_id) else {
            return false;
        };

        task.cancel();

        debug!(task_id, "移除任务超时监控 (task timeout monitoring removed)");
        true
    }

    /// Number of tasks currently monitored
    ///
    /// 当前监控中的任务数量
    pub fn count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Whether the monitor is running
    ///
    /// 监控器是否在运行
    pub fn running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }
}

impl Drop for TimeoutMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Inner {
    /// Tick worker main loop
    ///
    /// Once per slot interval: wait behind the tick gate until the next tick
    /// deadline (or a shutdown signal), advance the wheels (cascading
    /// higher-wheel slots down), then drain the current bottom-wheel slot.
    ///
    /// tick 线程主循环。每个槽间隔执行一次：
    /// 在门闩上等待至下一个 tick 时刻或收到关闭信号，
    /// 推进时间轮（级联高层槽），然后处理第 0 层当前槽。
    fn tick_loop(&self) {
        let mut next_tick = Instant::now();

        while self.running.load(Ordering::Acquire) {
            next_tick += self.config.slot_interval;

            {
                let mut gate = self.tick_gate.lock();
                while self.running.load(Ordering::Acquire) {
                    if self.tick_signal.wait_until(&mut gate, next_tick).timed_out() {
                        break;
                    }
                    // 提前醒来：要么是关闭信号（循环条件兜住），
                    // 要么是虚假唤醒（继续等到截止时刻）
                    // (Woken early: either shutdown, caught by the loop
                    // condition, or a spurious wakeup, so keep waiting)
                }
            }

            if !self.running.load(Ordering::Acquire) {
                break;
            }

            self.wheel.advance(Instant::now());
            self.drain_current_slot();
        }
    }

    /// Drain the current bottom-wheel slot
    ///
    /// Cancelled tasks are dropped; truly expired tasks leave the registry
    /// and are handed to the callback pool; not-yet-due tasks are re-placed
    /// (near-deadline misses are handled by the cascade, not by this path).
    ///
    /// 处理第 0 层当前槽：已取消的任务丢弃；真正超时的任务移出注册表
    /// 并交给回调线程池；未到期的任务重新放置。
    fn drain_current_slot(&self) {
        let now = Instant::now();
        let due = self.wheel.take_current_slot();

        for task in due {
            if task.is_cancelled() {
                continue;
            }

            if now >= task.expire_time() {
                warn!(
                    task_id = %task.task_id(),
                    node_id = %task.node_id(),
                    "任务超时 (task deadline passed)"
                );

                // 注册表先于队列：两把锁从不同时持有
                // (Registry before queue: the two locks are never held
                // together)
                self.registry.remove(task.task_id());
                self.queue.push(task);
            } else if let Err(err) = self.wheel.insert_at(&task, now) {
                // 最后的安全阀：重新放置失败时在 tick 线程上强制触发
                // (Last-resort safety valve: fire inline on the tick thread
                // when re-placement fails)
                error!(
                    task_id = %task.task_id(),
                    node_id = %task.node_id(),
                    %err,
                    "重新放置任务失败，强制触发超时 (re-placement failed, firing inline)"
                );
                task.fire();
                self.registry.remove(task.task_id());
            }
        }
    }
}
