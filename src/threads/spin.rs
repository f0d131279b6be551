//! Polling waits.
//!
//! The bakery never blocks on an OS primitive: a waiter re-reads shared state
//! until the condition holds. Spinning for the whole time-slice wastes the CPU
//! the lock holder may need, so `Backoff` moves from `spin_loop` hints to
//! `yield_now` once the wait drags on.
use crossbeam_utils::Backoff;

/// Poll `ready` until it returns `true`.
///
/// There is no timeout: if whatever makes `ready` true never runs, neither
/// does the caller.
#[inline]
pub fn spin_until(mut ready: impl FnMut() -> bool) {
    let backoff = Backoff::new();
    while !ready() {
        backoff.snooze();
    }
}

#[cfg(test)]
mod tests {
    use super::spin_until;
    use crossbeam_utils::Backoff;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn it_returns_immediately_when_ready() {
        let mut polls = 0;
        spin_until(|| {
            polls += 1;
            true
        });
        assert_eq!(1, polls);
    }

    #[test]
    fn it_polls_until_the_condition_holds() {
        let mut polls = 0;
        spin_until(|| {
            polls += 1;
            polls == 20
        });
        assert_eq!(20, polls);
    }

    #[test]
    fn it_backs_off_to_yielding() {
        let backoff = Backoff::new();
        let mut snoozes = 0;
        while !backoff.is_completed() {
            backoff.snooze();
            snoozes += 1;
            assert!(snoozes < 64, "backoff never escalated");
        }
        assert!(snoozes > 0);
    }

    #[test]
    fn it_waits_for_another_thread() {
        let flag = Arc::new(AtomicBool::new(false));
        let setter = {
            let flag = Arc::clone(&flag);
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(10));
                flag.store(true, Ordering::Release);
            })
        };
        spin_until(|| flag.load(Ordering::Acquire));
        setter.join().unwrap();
        assert!(flag.load(Ordering::Relaxed));
    }
}
