use std::collections::BTreeSet;

use crate::common::SessionId;

/// Lock mode requested on a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Aggregate state of a table lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Free,
    Shared,
    Exclusive,
}

/// Result of an acquisition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    /// Newly granted
    Acquired,
    /// The sole shared holder became the exclusive holder
    Upgraded,
    /// The session already held a sufficient lock
    AlreadyHeld,
    /// Conflicts with another session's lock
    WouldBlock,
}

impl LockOutcome {
    /// Returns true unless the request would block.
    pub fn is_granted(&self) -> bool {
        !matches!(self, LockOutcome::WouldBlock)
    }
}

/// Shared/exclusive lock state of one table.
///
/// Pure transition table: no waiting happens here. Blocking and queueing
/// are the `LockManager`'s job.
#[derive(Debug, Clone)]
pub struct TableLock {
    state: LockState,
    s_holders: BTreeSet<SessionId>,
    x_holders: BTreeSet<SessionId>,
}

impl TableLock {
    pub fn new() -> Self {
        Self {
            state: LockState::Free,
            s_holders: BTreeSet::new(),
            x_holders: BTreeSet::new(),
        }
    }

    pub fn acquire(&mut self, mode: LockMode, session: SessionId) -> LockOutcome {
        match mode {
            LockMode::Shared => self.acquire_shared(session),
            LockMode::Exclusive => self.acquire_exclusive(session),
        }
    }

    pub fn release(&mut self, mode: LockMode, session: SessionId) -> bool {
        match mode {
            LockMode::Shared => self.release_shared(session),
            LockMode::Exclusive => self.release_exclusive(session),
        }
    }

    /// An exclusive holder already satisfies a shared request.
    pub fn acquire_shared(&mut self, session: SessionId) -> LockOutcome {
        match self.state {
            LockState::Exclusive => {
                if self.x_holders.contains(&session) {
                    LockOutcome::AlreadyHeld
                } else {
                    LockOutcome::WouldBlock
                }
            }
            LockState::Shared | LockState::Free => {
                self.state = LockState::Shared;
                if self.s_holders.insert(session) {
                    LockOutcome::Acquired
                } else {
                    LockOutcome::AlreadyHeld
                }
            }
        }
    }

    /// Succeeds from `Free`, or as an upgrade when `session` is the only
    /// shared holder.
    pub fn acquire_exclusive(&mut self, session: SessionId) -> LockOutcome {
        match self.state {
            LockState::Exclusive => {
                if self.x_holders.contains(&session) {
                    LockOutcome::AlreadyHeld
                } else {
                    LockOutcome::WouldBlock
                }
            }
            LockState::Shared => {
                if self.s_holders.len() == 1 && self.s_holders.contains(&session) {
                    self.s_holders.clear();
                    self.x_holders.insert(session);
                    self.state = LockState::Exclusive;
                    LockOutcome::Upgraded
                } else {
                    LockOutcome::WouldBlock
                }
            }
            LockState::Free => {
                self.x_holders.insert(session);
                self.state = LockState::Exclusive;
                LockOutcome::Acquired
            }
        }
    }

    /// Returns false if `session` held no shared lock.
    pub fn release_shared(&mut self, session: SessionId) -> bool {
        if !self.s_holders.remove(&session) {
            return false;
        }
        if self.s_holders.is_empty() && self.state == LockState::Shared {
            self.state = LockState::Free;
        }
        true
    }

    /// Returns false if `session` was not the exclusive holder.
    pub fn release_exclusive(&mut self, session: SessionId) -> bool {
        if !self.x_holders.remove(&session) {
            return false;
        }
        self.state = LockState::Free;
        true
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn shared_holders(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.s_holders.iter().copied()
    }

    pub fn exclusive_holder(&self) -> Option<SessionId> {
        self.x_holders.iter().next().copied()
    }

    pub fn holds(&self, mode: LockMode, session: SessionId) -> bool {
        match mode {
            LockMode::Shared => self.s_holders.contains(&session),
            LockMode::Exclusive => self.x_holders.contains(&session),
        }
    }
}

impl Default for TableLock {
    fn default() -> Self {
        Self::new()
    }
}
