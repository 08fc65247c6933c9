use crate::task::TimeoutTask;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 回调线程池大小 (Callback pool size)
pub(crate) const CALLBACK_WORKERS: usize = 4;

/// 回调队列 (Callback queue)
///
/// tick 线程将超时任务推入，`CALLBACK_WORKERS` 个工作线程取出并执行回调。
/// 无界 FIFO，由互斥锁与条件变量保护；队列锁从不与注册表锁同时持有。
/// (The tick worker pushes fired tasks, `CALLBACK_WORKERS` worker threads pop
/// and invoke callbacks. Unbounded FIFO guarded by a mutex and a condvar; the
/// queue lock is never held together with the registry lock)
pub(crate) struct CallbackQueue {
    queue: Mutex<VecDeque<Arc<TimeoutTask>>>,
    available: Condvar,
}

impl CallbackQueue {
    pub(crate) fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }

    /// 推入一个超时任务并唤醒一个工作线程
    /// (Push one fired task and wake a single worker)
    pub(crate) fn push(&self, task: Arc<TimeoutTask>) {
        self.queue.lock().push_back(task);
        self.available.notify_one();
    }

    /// 唤醒所有工作线程，用于关闭 (Wake every worker, used on shutdown)
    ///
    /// 持锁通知：工作线程要么还未进入等待（随后会看到运行标记已清除），
    /// 要么已在等待中（必然收到通知），不存在丢失唤醒的窗口。
    /// (Notify under the lock: a worker is either not yet waiting and will
    /// observe the cleared running flag, or already waiting and is guaranteed
    /// the notification; no lost-wakeup window)
    pub(crate) fn wake_all(&self) {
        let _guard = self.queue.lock();
        self.available.notify_all();
    }

    /// 清空队列且不派发，`stop` 时调用
    /// (Drain the queue without dispatch, invoked by `stop`)
    pub(crate) fn clear(&self) {
        self.queue.lock().clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.queue.lock().len()
    }
}

/// 回调工作线程主循环 (Callback worker main loop)
///
/// 阻塞直到有任务到达或收到关闭信号；关闭优先于残留任务，
/// 因此 `stop` 之后队列中的任务不会被派发。
/// (Blocks until a task arrives or shutdown is signalled; shutdown wins over
/// leftover tasks, so tasks still queued when `stop` runs are never
/// dispatched)
pub(crate) fn run_worker(queue: &CallbackQueue, running: &AtomicBool) {
    loop {
        let task = {
            let mut guard = queue.queue.lock();
            loop {
                if !running.load(Ordering::Acquire) {
                    return;
                }
                if let Some(task) = guard.pop_front() {
                    break task;
                }
                queue.available.wait(&mut guard);
            }
        };

        // 出队后再次确认取消标记：`remove` 可能发生在入队与派发之间
        // (Re-check the cancellation flag after popping: `remove` may land
        // between enqueue and dispatch)
        if task.is_cancelled() {
            continue;
        }

        task.fire();
    }
}
