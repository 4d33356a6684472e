use {
    parking_lot::{Condvar, Mutex},
    std::time::{Duration, Instant},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FenceState {
    Unsignaled,
    Signaled(u64),
    Submitted(u64),
}

/// Host-visible completion of submitted work.
///
/// Submission marks the fence with an epoch and the native completion handler
/// signals it from whatever thread the handler runs on.
#[derive(Debug)]
pub struct CompletionFence {
    state: Mutex<FenceState>,
    signaled: Condvar,
}

impl Default for CompletionFence {
    fn default() -> Self {
        CompletionFence::new(false)
    }
}

impl CompletionFence {
    /// Create new fence in signaled or unsignaled state.
    pub fn new(signaled: bool) -> Self {
        CompletionFence {
            state: Mutex::new(if signaled {
                FenceState::Signaled(0)
            } else {
                FenceState::Unsignaled
            }),
            signaled: Condvar::new(),
        }
    }

    /// Check if fence was submitted and not signaled yet.
    pub fn is_submitted(&self) -> bool {
        match *self.state.lock() {
            FenceState::Submitted(_) => true,
            _ => false,
        }
    }

    /// Check if fence is signaled.
    pub fn is_signaled(&self) -> bool {
        match *self.state.lock() {
            FenceState::Signaled(_) => true,
            _ => false,
        }
    }

    /// Mark unsignaled fence as `Submitted`.
    /// Returns `false` and leaves the fence untouched if it is signaled or submitted.
    pub fn mark_submitted(&self, epoch: u64) -> bool {
        let mut state = self.state.lock();
        match *state {
            FenceState::Unsignaled => {
                *state = FenceState::Submitted(epoch);
                true
            }
            _ => false,
        }
    }

    /// Reset signaled fence.
    /// Panics if submitted.
    /// Becomes unsignaled.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        match *state {
            FenceState::Submitted(_) => panic!("Submitted fence must be waited upon before reset"),
            _ => *state = FenceState::Unsignaled,
        }
    }

    /// Mark submitted fence as signaled and wake up waiters.
    /// Returns submission epoch, or `None` if fence was not submitted.
    pub fn signal(&self) -> Option<u64> {
        let mut state = self.state.lock();
        match *state {
            FenceState::Submitted(epoch) => {
                *state = FenceState::Signaled(epoch);
                self.signaled.notify_all();
                Some(epoch)
            }
            _ => {
                log::warn!("Signaling fence that was not submitted");
                None
            }
        }
    }

    /// Epoch of the last submission, if signaled.
    pub fn signaled_epoch(&self) -> Option<u64> {
        match *self.state.lock() {
            FenceState::Signaled(epoch) => Some(epoch),
            _ => None,
        }
    }

    /// Wait for fence to become signaled.
    ///
    /// Returns `false` when timeout expires first.
    /// Unsignaled fence that was never submitted returns `false` right away.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            match *state {
                FenceState::Signaled(_) => return true,
                FenceState::Unsignaled => return false,
                FenceState::Submitted(_) => {
                    if self.signaled.wait_until(&mut state, deadline).timed_out() {
                        return match *state {
                            FenceState::Signaled(_) => true,
                            _ => false,
                        };
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        std::{sync::Arc, thread},
    };

    #[test]
    fn wait_times_out() {
        let fence = CompletionFence::new(false);
        assert!(fence.mark_submitted(3));
        assert!(!fence.wait(Duration::from_millis(10)));
        assert!(fence.is_submitted());
    }

    #[test]
    fn signal_from_other_thread() {
        let fence = Arc::new(CompletionFence::new(false));
        assert!(fence.mark_submitted(7));

        let signaler = {
            let fence = fence.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(5));
                fence.signal()
            })
        };

        assert!(fence.wait(Duration::from_secs(10)));
        assert_eq!(fence.signaled_epoch(), Some(7));
        assert_eq!(signaler.join().unwrap(), Some(7));
        fence.reset();
        assert!(!fence.is_signaled());
    }

    #[test]
    fn signaled_fence_returns_immediately() {
        let fence = CompletionFence::new(true);
        assert!(fence.wait(Duration::from_secs(0)));
    }

    #[test]
    fn double_submission() {
        let fence = CompletionFence::new(false);
        assert!(fence.mark_submitted(1));
        assert!(!fence.mark_submitted(2));
        assert!(fence.is_submitted());
        assert_eq!(fence.signal(), Some(1));
        assert!(!fence.mark_submitted(3));
        assert_eq!(fence.signaled_epoch(), Some(1));
    }

    #[test]
    fn unsubmitted_wait_returns() {
        let fence = CompletionFence::new(false);
        assert!(!fence.wait(Duration::from_secs(10)));
    }
}
