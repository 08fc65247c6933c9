use crate::error::MonitorError;
use crate::task::TimeoutTask;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// 任务注册表 (Task registry)
///
/// `task_id → 任务记录` 的映射，负责重复拒绝与取消查找。
/// 所有操作都是短临界区；需要同时持有注册表锁与槽锁时，
/// 获取顺序固定为注册表在前。
/// (Maps `task_id → task record`, used for duplicate rejection and
/// cancellation lookup. Every operation is a short critical section; when
/// both the registry lock and a slot lock are needed, the registry is
/// acquired first)
pub(crate) struct TaskRegistry {
    tasks: Mutex<FxHashMap<String, Arc<TimeoutTask>>>,
}

impl TaskRegistry {
    pub(crate) fn new() -> Self {
        Self {
            tasks: Mutex::new(FxHashMap::default()),
        }
    }

    /// 若 ID 未被占用则登记任务 (Register the task if its ID is free)
    pub(crate) fn insert(&self, task: Arc<TimeoutTask>) -> Result<(), MonitorError> {
        let mut tasks = self.tasks.lock();
        if tasks.contains_key(task.task_id()) {
            return Err(MonitorError::DuplicateTask {
                task_id: task.task_id().to_string(),
            });
        }
        tasks.insert(task.task_id().to_string(), task);
        Ok(())
    }

    /// 移除并返回任务记录 (Erase and return the task record)
    pub(crate) fn remove(&self, task_id: &str) -> Option<Arc<TimeoutTask>> {
        self.tasks.lock().remove(task_id)
    }

    /// 当前登记的任务数量快照 (Snapshot of the registered task count)
    pub(crate) fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub(crate) fn clear(&self) {
        self.tasks.lock().clear();
    }
}
