//! CPU affinity for stress runs.
//!
//! Pinning every participant to one CPU turns a multiprocessor into a
//! uniprocessor: threads still preempt each other at arbitrary points, but
//! every load sees every earlier store. That is the memory model the naive
//! bakery is written against.
//!
//! `man 2 sched_setaffinity`
use std::io;

use crate::error::BakeryError;

/// CPUs the calling thread may run on, in ascending order.
#[cfg(target_os = "linux")]
pub fn allowed_cpus() -> io::Result<Vec<usize>> {
    // SAFETY: `cpu_set_t` is a plain bitmask, all-zero is a valid (empty) set.
    let mut set: libc::cpu_set_t = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::sched_getaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &mut set) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    let cpus = (0..libc::CPU_SETSIZE as usize)
        .filter(|&cpu| unsafe { libc::CPU_ISSET(cpu, &set) })
        .collect();
    Ok(cpus)
}

/// Without an affinity API every CPU counts as allowed.
#[cfg(not(target_os = "linux"))]
pub fn allowed_cpus() -> io::Result<Vec<usize>> {
    let count = std::thread::available_parallelism()?.get();
    Ok((0..count).collect())
}

/// Restrict the calling thread to `cpu`.
#[cfg(target_os = "linux")]
pub fn pin_current_thread(cpu: usize) -> Result<(), BakeryError> {
    if cpu >= libc::CPU_SETSIZE as usize {
        return Err(BakeryError::Affinity {
            cpu,
            source: io::Error::from(io::ErrorKind::InvalidInput),
        });
    }
    let mut set: libc::cpu_set_t = unsafe { std::mem::zeroed() };
    // `pid == 0` means the calling thread.
    let rc = unsafe {
        libc::CPU_SET(cpu, &mut set);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set)
    };
    if rc != 0 {
        return Err(BakeryError::Affinity {
            cpu,
            source: io::Error::last_os_error(),
        });
    }
    tracing::trace!(cpu, "pinned thread");
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn pin_current_thread(cpu: usize) -> Result<(), BakeryError> {
    tracing::trace!(cpu, "thread pinning unsupported on this platform; ignored");
    Ok(())
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::{allowed_cpus, pin_current_thread};

    #[test]
    fn it_lists_at_least_one_cpu() {
        assert!(!allowed_cpus().unwrap().is_empty());
    }

    #[test]
    fn it_pins_a_thread_to_an_allowed_cpu() {
        let cpu = allowed_cpus().unwrap()[0];
        std::thread::spawn(move || {
            pin_current_thread(cpu).unwrap();
            assert_eq!(vec![cpu], allowed_cpus().unwrap());
        })
        .join()
        .unwrap();
    }

    #[test]
    fn it_rejects_a_cpu_outside_the_set() {
        let cpu = libc::CPU_SETSIZE as usize + 1;
        std::thread::spawn(move || {
            assert!(pin_current_thread(cpu).is_err());
        })
        .join()
        .unwrap();
    }
}
