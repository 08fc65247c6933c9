use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::error;

/// Timeout Callback Trait
///
/// Types implementing this trait can be used as timeout callbacks. The
/// callback receives the identifier of the task whose deadline passed and may
/// be invoked on any callback worker thread.
///
/// 实现此特性的类型可以作为超时回调函数。回调接收超时任务的 ID，
/// 可能在任意回调工作线程上被调用。
///
/// # Examples (示例)
///
/// ```
/// use kestrel_monitor::TimeoutCallback;
///
/// struct MyCallback;
///
/// impl TimeoutCallback for MyCallback {
///     fn on_timeout(&self, task_id: &str) {
///         println!("task {} timed out", task_id);
///     }
/// }
/// ```
pub trait TimeoutCallback: Send + Sync + 'static {
    /// Invoked once when the task's deadline has passed
    ///
    /// 任务超时后调用一次
    fn on_timeout(&self, task_id: &str);
}

/// Implement TimeoutCallback for closures
///
/// Supports `Fn(&str)` closures, callable concurrently from multiple worker
/// threads.
///
/// 为闭包实现 TimeoutCallback 特性，支持 `Fn(&str)` 闭包，
/// 可被多个工作线程并发调用。
impl<F> TimeoutCallback for F
where
    F: Fn(&str) + Send + Sync + 'static,
{
    fn on_timeout(&self, task_id: &str) {
        self(task_id)
    }
}

/// Callback wrapper for standardized callback creation and management
///
/// Callback 包装器，用于标准化回调创建和管理
///
/// # Examples (示例)
///
/// ```
/// use kestrel_monitor::CallbackWrapper;
///
/// let callback = CallbackWrapper::new(|task_id: &str| {
///     println!("task {} timed out", task_id);
/// });
/// ```
#[derive(Clone)]
pub struct CallbackWrapper {
    callback: Arc<dyn TimeoutCallback>,
}

impl CallbackWrapper {
    /// Create a new callback wrapper
    ///
    /// # Parameters
    /// - `callback`: Callback object implementing TimeoutCallback trait
    ///
    /// 创建一个新的回调包装器
    ///
    /// # 参数
    /// - `callback`: 实现 TimeoutCallback 特性的回调对象
    #[inline]
    pub fn new(callback: impl TimeoutCallback) -> Self {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Call the callback function
    ///
    /// 调用回调函数
    #[inline]
    pub(crate) fn call(&self, task_id: &str) {
        self.callback.on_timeout(task_id)
    }
}

/// Timeout task record
///
/// One record per monitored task, shared via `Arc`: the registry holds one
/// reference, the slot the task currently sits in holds another, and the
/// callback queue holds one while the task is in transit to a worker. The
/// record is dropped with the last reference.
///
/// 超时任务记录。每个被监控任务一条，通过 `Arc` 共享：
/// 注册表持有一个引用，任务当前所在的槽持有一个引用，
/// 派发期间回调队列持有一个引用。最后一个引用释放时记录被销毁。
pub(crate) struct TimeoutTask {
    /// Unique task identifier
    ///
    /// 唯一任务标识符
    task_id: String,

    /// Opaque node label, carried through for logging only
    ///
    /// 不透明的节点标签，仅用于日志
    node_id: String,

    /// Absolute deadline on the monotonic clock
    ///
    /// 单调时钟上的绝对超时时刻
    expire_time: Instant,

    /// User callback invoked on expiry
    ///
    /// 超时时调用的用户回调
    callback: CallbackWrapper,

    /// Cancellation flag; monotonic, never cleared once set
    ///
    /// 取消标记；单调，一旦设置永不清除
    cancelled: AtomicBool,
}

impl TimeoutTask {
    pub(crate) fn new(
        task_id: String,
        node_id: String,
        expire_time: Instant,
        callback: CallbackWrapper,
    ) -> Self {
        Self {
            task_id,
            node_id,
            expire_time,
            callback,
            cancelled: AtomicBool::new(false),
        }
    }

    #[inline]
    pub(crate) fn task_id(&self) -> &str {
        &self.task_id
    }

    #[inline]
    pub(crate) fn node_id(&self) -> &str {
        &self.node_id
    }

    #[inline]
    pub(crate) fn expire_time(&self) -> Instant {
        self.expire_time
    }

    /// Mark the task as cancelled, visible to all workers immediately
    ///
    /// 标记任务为已取消，立即对所有工作线程可见
    #[inline]
    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[inline]
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Invoke the user callback, catching panics
    ///
    /// A panicking callback is logged and swallowed; it must never take down
    /// the worker thread that happens to run it.
    ///
    /// 调用用户回调并捕获 panic。回调 panic 会被记录并吞掉，
    /// 不能击垮执行它的工作线程。
    pub(crate) fn fire(&self) {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.callback.call(&self.task_id);
        }));
        if result.is_err() {
            error!(
                task_id = %self.task_id,
                node_id = %self.node_id,
                "任务超时回调执行异常 (timeout callback panicked)"
            );
        }
    }
}
