use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::debug;

use crate::common::SessionId;

use super::{LockMode, LockOutcome, TableLock};

/// Something the lock manager can lock: a table.
pub trait LockTarget: Send + Sync {
    /// Name unique across the engine, e.g. `db.table`.
    fn lock_name(&self) -> String;

    /// The target's lock state. Only touched while the manager's mutex is
    /// held.
    fn lock_state(&self) -> MutexGuard<'_, TableLock>;

    /// Called after any lock on the target is released.
    fn on_release(&self);
}

/// Locks one session holds, keyed by target name
#[derive(Default)]
struct SessionLocks {
    shared: BTreeMap<String, Arc<dyn LockTarget>>,
    exclusive: BTreeMap<String, Arc<dyn LockTarget>>,
}

impl SessionLocks {
    fn is_empty(&self) -> bool {
        self.shared.is_empty() && self.exclusive.is_empty()
    }
}

#[derive(Default)]
struct ManagerState {
    /// FIFO of sessions waiting for each (target, mode)
    waiting: HashMap<(String, LockMode), VecDeque<SessionId>>,
    sessions: HashMap<SessionId, SessionLocks>,
}

impl ManagerState {
    fn record(
        &mut self,
        session: SessionId,
        name: &str,
        target: &Arc<dyn LockTarget>,
        mode: LockMode,
        outcome: LockOutcome,
    ) {
        if !matches!(outcome, LockOutcome::Acquired | LockOutcome::Upgraded) {
            return;
        }
        let locks = self.sessions.entry(session).or_default();
        match mode {
            LockMode::Shared => {
                locks.shared.insert(name.to_string(), Arc::clone(target));
            }
            LockMode::Exclusive => {
                locks.shared.remove(name);
                locks.exclusive.insert(name.to_string(), Arc::clone(target));
            }
        }
    }

    fn forget(&mut self, session: SessionId, name: &str, mode: LockMode) {
        if let Some(locks) = self.sessions.get_mut(&session) {
            match mode {
                LockMode::Shared => locks.shared.remove(name),
                LockMode::Exclusive => locks.exclusive.remove(name),
            };
            if locks.is_empty() {
                self.sessions.remove(&session);
            }
        }
    }

    fn is_head(&self, key: &(String, LockMode), session: SessionId) -> bool {
        self.waiting.get(key).and_then(|queue| queue.front()) == Some(&session)
    }

    fn dequeue(&mut self, key: &(String, LockMode), session: SessionId) {
        if let Some(queue) = self.waiting.get_mut(key) {
            queue.retain(|waiter| *waiter != session);
            if queue.is_empty() {
                self.waiting.remove(key);
            }
        }
    }
}

/// Table-level two-phase lock manager shared by all sessions.
///
/// A request that conflicts joins a FIFO queue for its table and mode and
/// retries only while at the head of that queue, sleeping on a condition
/// variable that every release signals. There is no deadlock detection.
#[derive(Default)]
pub struct LockManager {
    state: Mutex<ManagerState>,
    released: Condvar,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until `session` holds a shared lock on `target`.
    pub fn acquire_shared<T: LockTarget + 'static>(&self, session: SessionId, target: &Arc<T>) {
        self.acquire(session, Self::erase(target), LockMode::Shared, None);
    }

    /// Blocks until `session` holds an exclusive lock on `target`.
    pub fn acquire_exclusive<T: LockTarget + 'static>(&self, session: SessionId, target: &Arc<T>) {
        self.acquire(session, Self::erase(target), LockMode::Exclusive, None);
    }

    /// Like `acquire_shared`, giving up after `timeout`.
    pub fn try_acquire_shared_for<T: LockTarget + 'static>(
        &self,
        session: SessionId,
        target: &Arc<T>,
        timeout: Duration,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        self.acquire(session, Self::erase(target), LockMode::Shared, Some(deadline))
    }

    /// Like `acquire_exclusive`, giving up after `timeout`.
    pub fn try_acquire_exclusive_for<T: LockTarget + 'static>(
        &self,
        session: SessionId,
        target: &Arc<T>,
        timeout: Duration,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        self.acquire(session, Self::erase(target), LockMode::Exclusive, Some(deadline))
    }

    /// Releases a shared lock. Returns false if `session` held none.
    pub fn release_shared<T: LockTarget + 'static>(&self, session: SessionId, target: &Arc<T>) -> bool {
        self.release(session, target.as_ref(), LockMode::Shared)
    }

    /// Releases an exclusive lock. Returns false if `session` held none.
    pub fn release_exclusive<T: LockTarget + 'static>(
        &self,
        session: SessionId,
        target: &Arc<T>,
    ) -> bool {
        self.release(session, target.as_ref(), LockMode::Exclusive)
    }

    /// Releases every lock `session` holds and wakes all waiters.
    pub fn release_all(&self, session: SessionId) {
        let mut state = self.state.lock();
        for queue in state.waiting.values_mut() {
            queue.retain(|waiter| *waiter != session);
        }
        state.waiting.retain(|_, queue| !queue.is_empty());

        let Some(locks) = state.sessions.remove(&session) else {
            return;
        };
        let released = locks.shared.len() + locks.exclusive.len();
        for target in locks.exclusive.values() {
            target.lock_state().release_exclusive(session);
            target.on_release();
        }
        for target in locks.shared.values() {
            target.lock_state().release_shared(session);
            target.on_release();
        }

        debug!(session = session.as_u64(), released, "released all locks");
        self.released.notify_all();
    }

    /// Names of the targets `session` holds shared, in order.
    pub fn shared_targets(&self, session: SessionId) -> Vec<String> {
        let state = self.state.lock();
        state
            .sessions
            .get(&session)
            .map(|locks| locks.shared.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Names of the targets `session` holds exclusively, in order.
    pub fn exclusive_targets(&self, session: SessionId) -> Vec<String> {
        let state = self.state.lock();
        state
            .sessions
            .get(&session)
            .map(|locks| locks.exclusive.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of sessions queued for `mode` on the named target.
    pub fn waiting(&self, name: &str, mode: LockMode) -> usize {
        let state = self.state.lock();
        state
            .waiting
            .get(&(name.to_string(), mode))
            .map_or(0, |queue| queue.len())
    }

    fn erase<T: LockTarget + 'static>(target: &Arc<T>) -> Arc<dyn LockTarget> {
        Arc::clone(target) as Arc<dyn LockTarget>
    }

    fn acquire(
        &self,
        session: SessionId,
        target: Arc<dyn LockTarget>,
        mode: LockMode,
        deadline: Option<Instant>,
    ) -> bool {
        let name = target.lock_name();
        let mut state = self.state.lock();

        let outcome = target.lock_state().acquire(mode, session);
        if outcome.is_granted() {
            state.record(session, &name, &target, mode, outcome);
            debug!(session = session.as_u64(), table = %name, ?mode, ?outcome, "lock granted");
            return true;
        }

        let key = (name.clone(), mode);
        state.waiting.entry(key.clone()).or_default().push_back(session);
        debug!(session = session.as_u64(), table = %name, ?mode, "waiting for lock");

        loop {
            if state.is_head(&key, session) {
                let outcome = target.lock_state().acquire(mode, session);
                if outcome.is_granted() {
                    state.dequeue(&key, session);
                    state.record(session, &name, &target, mode, outcome);
                    debug!(session = session.as_u64(), table = %name, ?mode, ?outcome, "lock granted after wait");
                    // The next in line may be grantable too
                    self.released.notify_all();
                    return true;
                }
            }

            match deadline {
                None => self.released.wait(&mut state),
                Some(deadline) => {
                    if self.released.wait_until(&mut state, deadline).timed_out() {
                        state.dequeue(&key, session);
                        debug!(session = session.as_u64(), table = %name, ?mode, "lock wait timed out");
                        self.released.notify_all();
                        return false;
                    }
                }
            }
        }
    }

    fn release(&self, session: SessionId, target: &dyn LockTarget, mode: LockMode) -> bool {
        let name = target.lock_name();
        let mut state = self.state.lock();

        let released = target.lock_state().release(mode, session);
        state.forget(session, &name, mode);
        if released {
            target.on_release();
            debug!(session = session.as_u64(), table = %name, ?mode, "lock released");
            self.released.notify_all();
        }
        released
    }
}
