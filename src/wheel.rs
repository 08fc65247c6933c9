use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::task::TimeoutTask;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

/// 时间槽 (Time slot)
///
/// 一个槽位持有当前被认为会在该槽时间窗口内超时的任务列表。
/// 槽锁是整个时间轮中粒度最细的锁：插入方追加，tick 线程整体取走。
/// (One slot holds the tasks currently believed to expire inside its time
/// window. The slot mutex is the finest-grained lock in the wheel: inserters
/// append, the tick worker takes the whole list)
pub(crate) struct TimeSlot {
    tasks: Mutex<Vec<Arc<TimeoutTask>>>,
}

impl TimeSlot {
    fn new() -> Self {
        // 大多数槽位通常包含 0-4 个任务，预分配 4 个容量
        // (Most slots typically contain 0-4 tasks, pre-allocate capacity of 4)
        Self {
            tasks: Mutex::new(Vec::with_capacity(4)),
        }
    }

    fn push(&self, task: Arc<TimeoutTask>) {
        self.tasks.lock().push(task);
    }

    /// 原子地取走槽内全部任务 (Atomically take every task out of the slot)
    fn drain(&self) -> Vec<Arc<TimeoutTask>> {
        std::mem::take(&mut *self.tasks.lock())
    }

    fn clear(&self) {
        self.tasks.lock().clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.tasks.lock().len()
    }
}

/// 分层时间轮 (Hierarchical timing wheel)
///
/// `L` 层、每层 `W` 个槽。第 `k` 层每个槽覆盖 `Δ × W^k` 的时间窗口，
/// 整体可覆盖 `Δ × W^L`。
/// (`L` wheels of `W` slots each. A slot on wheel `k` covers a window of
/// `Δ × W^k`; the stack covers `Δ × W^L` in total)
///
/// 槽指针仅由 tick 线程以 `Relaxed` 写入；放置计算以 `Relaxed` 读取。
/// 指针推进一格耗时一个 tick，远慢于一次放置计算，读到新旧值均可接受。
/// (Slot pointers are written only by the tick worker with `Relaxed` stores
/// and read by placement with `Relaxed` loads. A pointer moves once per tick,
/// far slower than one placement, so either value is acceptable)
pub(crate) struct Wheel {
    /// 槽位矩阵，`wheels[k][s]` (Slot matrix, `wheels[k][s]`)
    wheels: Vec<Vec<TimeSlot>>,

    /// 每层的当前槽指针 (Current-slot pointer per wheel)
    current_slots: Vec<AtomicUsize>,

    /// 每层槽数 `W` (Slots per wheel, `W`)
    wheel_size: usize,

    /// 层数 `L` (Number of wheels, `L`)
    num_wheels: usize,

    /// 缓存：槽间隔（毫秒）- 避免重复转换
    /// (Cache: slot interval in milliseconds - avoid repeated conversion)
    slot_interval_ms: u64,
}

impl Wheel {
    /// 创建时间轮 (Create the wheel stack)
    ///
    /// # 注意 (Notes)
    /// 几何参数已在 `MonitorConfig` 验证，因此此方法不会失败。
    /// (Geometry has been validated by `MonitorConfig`, so this method will
    /// not fail)
    pub(crate) fn new(config: &MonitorConfig) -> Self {
        let mut wheels = Vec::with_capacity(config.num_wheels);
        for _ in 0..config.num_wheels {
            let mut slots = Vec::with_capacity(config.wheel_size);
            for _ in 0..config.wheel_size {
                slots.push(TimeSlot::new());
            }
            wheels.push(slots);
        }

        let current_slots = (0..config.num_wheels).map(|_| AtomicUsize::new(0)).collect();

        Self {
            wheels,
            current_slots,
            wheel_size: config.wheel_size,
            num_wheels: config.num_wheels,
            slot_interval_ms: config.slot_interval.as_millis() as u64,
        }
    }

    /// 获取某层的当前槽指针 (Get the current-slot pointer of one wheel)
    pub(crate) fn current_slot(&self, level: usize) -> usize {
        self.current_slots[level].load(Ordering::Relaxed)
    }

    /// 将所有槽指针重置为 0，`start` 时调用
    /// (Reset every slot pointer to 0, invoked by `start`)
    pub(crate) fn reset(&self) {
        for pointer in &self.current_slots {
            pointer.store(0, Ordering::Relaxed);
        }
    }

    /// 清空所有槽位，`stop` 时调用 (Clear every slot, invoked by `stop`)
    pub(crate) fn clear(&self) {
        for wheel in &self.wheels {
            for slot in wheel {
                slot.clear();
            }
        }
    }

    /// 计算任务在时间轮中的位置 (Calculate the task's position in the wheels)
    ///
    /// # 返回 (Returns)
    /// `(层索引, 槽索引)` ((wheel index, slot index))
    ///
    /// # 实现细节 (Implementation Details)
    /// - 已过期或剩余不足 1ms 的任务放入第 0 层的下一个槽，
    ///   让 tick 线程在下次推进时立即看到
    ///      (Expired tasks, or tasks with under 1ms remaining, go to the next
    ///      bottom-wheel slot so the tick worker sees them on its next advance)
    /// - 槽偏移使用整数下取整除法，刻意向下取整：放在高层的任务会在该层
    ///   推进时级联下沉，用更小的剩余时间重算位置，最终达到槽级精度
    ///      (The slot offset uses integer floor division and deliberately
    ///      under-shoots: a task on a higher wheel cascades down as that wheel
    ///      advances, re-running the arithmetic with a smaller remainder until
    ///      slot-level precision is reached)
    /// - 所有层都放不下时退到最外层最后一个槽；`add` 已预先拒绝超出
    ///   最大范围的超时，此回退仅是防御
    ///      (When no wheel fits, fall back to the last slot of the outermost
    ///      wheel; `add` pre-rejects out-of-range timeouts, so the fallback is
    ///      defensive only)
    pub(crate) fn position_for(&self, expire_time: Instant, now: Instant) -> (usize, usize) {
        if expire_time <= now {
            return (0, (self.current_slot(0) + 1) % self.wheel_size);
        }

        let remaining_ms = (expire_time - now).as_millis() as u64;
        if remaining_ms == 0 {
            // 未过期但剩余不足 1ms，视为立即过期
            // (Not yet expired but under 1ms remaining, treat as immediate)
            return (0, (self.current_slot(0) + 1) % self.wheel_size);
        }

        // 不满一个槽的部分向上取整 (Partial slots round up)
        let remaining_slots = remaining_ms.div_ceil(self.slot_interval_ms);

        for level in 0..self.num_wheels {
            let range = (self.wheel_size as u64).pow(level as u32 + 1);
            if remaining_slots <= range {
                let base = (self.wheel_size as u64).pow(level as u32);
                let offset = (remaining_slots / base) as usize;
                let slot = (self.current_slot(level) + offset) % self.wheel_size;
                return (level, slot);
            }
        }

        (self.num_wheels - 1, self.wheel_size - 1)
    }

    /// 将任务插入时间轮 (Insert a task into the wheels)
    ///
    /// 槽内不去重：任务 ID 的唯一性由注册表保证。
    /// (No deduplication inside a slot: identifier uniqueness is enforced by
    /// the registry)
    pub(crate) fn insert_at(
        &self,
        task: &Arc<TimeoutTask>,
        now: Instant,
    ) -> Result<(), MonitorError> {
        let (level, slot) = self.position_for(task.expire_time(), now);

        // 位置由构造保证有效；此检查对应插入路径在 drain/级联期间
        // 不做范围重验的不变量
        // (The position is valid by construction; this check asserts the
        // invariant that the insert path is re-entered during drain/cascade
        // without range re-validation)
        debug_assert!(level < self.num_wheels && slot < self.wheel_size);
        if level >= self.num_wheels || slot >= self.wheel_size {
            return Err(MonitorError::PlacementFailed);
        }

        self.wheels[level][slot].push(Arc::clone(task));
        Ok(())
    }

    /// 推进时间轮一个 tick (Advance the wheel stack by one tick)
    ///
    /// 第 0 层每次推进一格；某层回绕到 0 时推进上一层，并级联该层
    /// 新进入槽中的任务。级联按指针推进顺序由内层向外层执行，
    /// 迭代次数以层数为界。
    /// (The bottom wheel advances one slot per call; when a wheel wraps to 0
    /// the next wheel advances and its newly-entered slot is cascaded. The
    /// cascade runs inner wheels before outer ones and is bounded by the
    /// number of wheels)
    pub(crate) fn advance(&self, now: Instant) {
        for level in 0..self.num_wheels {
            let next = (self.current_slots[level].load(Ordering::Relaxed) + 1) % self.wheel_size;
            self.current_slots[level].store(next, Ordering::Relaxed);

            if level > 0 {
                self.cascade(level, now);
            }

            if next != 0 {
                break;
            }
        }
    }

    /// 级联：取空某高层的当前槽，将未取消的任务重新放置到更低层
    /// (Cascade: drain a higher wheel's current slot and re-place every
    /// non-cancelled task onto a lower wheel)
    fn cascade(&self, level: usize, now: Instant) {
        let slot = self.current_slot(level);
        let moved = self.wheels[level][slot].drain();

        for task in moved {
            if task.is_cancelled() {
                // 惰性删除：被取消的任务在此丢弃
                // (Lazy removal: cancelled tasks are dropped here)
                continue;
            }
            if let Err(err) = self.insert_at(&task, now) {
                // 重放置由构造不可失败；记录而不是丢失线索
                // (Re-placement cannot fail by construction; log rather than
                // lose the trail)
                error!(
                    task_id = %task.task_id(),
                    %err,
                    "级联重新放置任务失败 (cascade re-placement failed)"
                );
            }
        }
    }

    /// 取走第 0 层当前槽的全部任务 (Take every task out of the current
    /// bottom-wheel slot)
    pub(crate) fn take_current_slot(&self) -> Vec<Arc<TimeoutTask>> {
        self.wheels[0][self.current_slot(0)].drain()
    }

    #[cfg(test)]
    pub(crate) fn slot_len(&self, level: usize, slot: usize) -> usize {
        self.wheels[level][slot].len()
    }

    #[cfg(test)]
    pub(crate) fn slot_contains(&self, level: usize, slot: usize, task_id: &str) -> bool {
        self.wheels[level][slot]
            .tasks
            .lock()
            .iter()
            .any(|task| task.task_id() == task_id)
    }
}
