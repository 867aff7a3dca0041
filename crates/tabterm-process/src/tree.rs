//! Process-tree discovery and termination.
//!
//! Shells routinely spawn children of their own. Killing only the direct
//! child leaves those descendants orphaned, so every close path goes through
//! [`kill_tree`].

use std::collections::HashMap;
use std::fmt;

use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, warn};

use tabterm_core::{Error, Result};

/// Enumerates and kills processes.
///
/// [`SystemTreeKiller`] talks to the OS. Other implementations can be
/// swapped in to exercise failure paths.
pub trait ProcessTreeKiller: Send + Sync + fmt::Debug {
    /// All transitive descendants of `pid`, parents before their children.
    fn descendants(&self, pid: u32) -> Vec<u32>;

    /// Forcibly kill a single process.
    ///
    /// Returns [`Error::TerminationRace`] if the process no longer exists and
    /// [`Error::TerminationDenied`] for any other failure.
    fn kill(&self, pid: u32) -> Result<()>;
}

/// Kill `root` and every process it transitively spawned.
///
/// Descendants are killed deepest first so a parent cannot respawn a child
/// that was just killed. Processes that already exited are skipped. Every
/// kill is attempted even after a denial; the first denial is returned.
pub fn kill_tree(killer: &dyn ProcessTreeKiller, root: u32) -> Result<()> {
    let descendants = killer.descendants(root);
    debug!(
        "Killing process tree: root={}, descendants={:?}",
        root, descendants
    );

    let mut first_denial = None;

    for pid in descendants.into_iter().rev().chain(std::iter::once(root)) {
        match killer.kill(pid) {
            Ok(()) => debug!("Killed process {}", pid),
            Err(Error::TerminationRace(pid)) => {
                debug!("Process {} already exited", pid);
            }
            Err(e) => {
                warn!("Failed to kill process {}: {}", pid, e);
                if first_denial.is_none() {
                    first_denial = Some(e);
                }
            }
        }
    }

    match first_denial {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Build the descendant list of `root` from (pid, parent) pairs.
fn collect_descendants(root: u32, parents: impl IntoIterator<Item = (u32, u32)>) -> Vec<u32> {
    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for (pid, parent) in parents {
        if pid != parent {
            children.entry(parent).or_default().push(pid);
        }
    }

    let mut result = Vec::new();
    let mut queue = vec![root];
    let mut index = 0;

    while index < queue.len() {
        let current = queue[index];
        index += 1;
        if let Some(kids) = children.get(&current) {
            for &kid in kids {
                if kid != root && !result.contains(&kid) {
                    result.push(kid);
                    queue.push(kid);
                }
            }
        }
    }

    result
}

/// Process-tree killer backed by the OS process table.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTreeKiller;

impl SystemTreeKiller {
    /// Create a new system killer.
    pub fn new() -> Self {
        Self
    }
}

impl ProcessTreeKiller for SystemTreeKiller {
    fn descendants(&self, pid: u32) -> Vec<u32> {
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);

        let parents = system.processes().iter().filter_map(|(child, process)| {
            // Threads show up as tasks of their process on Linux
            if process.thread_kind().is_some() {
                return None;
            }
            process
                .parent()
                .map(|parent| (child.as_u32(), parent.as_u32()))
        });

        collect_descendants(pid, parents)
    }

    #[cfg(unix)]
    fn kill(&self, pid: u32) -> Result<()> {
        let raw: libc::pid_t = pid.try_into().map_err(|_| Error::TerminationDenied {
            pid,
            reason: "pid out of range".to_string(),
        })?;

        // SAFETY: kill(2) has no memory-safety preconditions.
        let rc = unsafe { libc::kill(raw, libc::SIGKILL) };
        if rc == 0 {
            return Ok(());
        }

        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            Err(Error::TerminationRace(pid))
        } else {
            Err(Error::TerminationDenied {
                pid,
                reason: err.to_string(),
            })
        }
    }

    #[cfg(not(unix))]
    fn kill(&self, pid: u32) -> Result<()> {
        let target = Pid::from_u32(pid);
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);

        match system.process(target) {
            None => Err(Error::TerminationRace(pid)),
            Some(process) if process.kill() => Ok(()),
            Some(_) => Err(Error::TerminationDenied {
                pid,
                reason: "the OS refused to terminate the process".to_string(),
            }),
        }
    }
}

/// Check whether a pid refers to a live (non-zombie) process.
pub fn is_process_alive(pid: u32) -> bool {
    let target = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);

    match system.process(target) {
        Some(process) => !matches!(process.status(), sysinfo::ProcessStatus::Zombie),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Fake process table: (pid, parent) pairs, plus pids that refuse to die.
    #[derive(Debug, Default)]
    struct FakeKiller {
        table: Vec<(u32, u32)>,
        gone: Vec<u32>,
        denied: Vec<u32>,
        killed: Mutex<Vec<u32>>,
    }

    impl ProcessTreeKiller for FakeKiller {
        fn descendants(&self, pid: u32) -> Vec<u32> {
            collect_descendants(pid, self.table.iter().copied())
        }

        fn kill(&self, pid: u32) -> Result<()> {
            self.killed.lock().unwrap().push(pid);
            if self.gone.contains(&pid) {
                Err(Error::TerminationRace(pid))
            } else if self.denied.contains(&pid) {
                Err(Error::TerminationDenied {
                    pid,
                    reason: "Operation not permitted".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_collect_descendants_is_transitive() {
        // 1 -> 2 -> 4, 1 -> 3, 9 unrelated
        let table = vec![(2, 1), (3, 1), (4, 2), (9, 8)];
        assert_eq!(collect_descendants(1, table), vec![2, 3, 4]);
    }

    #[test]
    fn test_collect_descendants_ignores_cycles() {
        let table = vec![(2, 1), (1, 2), (3, 3)];
        assert_eq!(collect_descendants(1, table), vec![2]);
    }

    #[test]
    fn test_kill_tree_kills_deepest_first_then_root() {
        let killer = FakeKiller {
            table: vec![(2, 1), (3, 2)],
            ..Default::default()
        };

        kill_tree(&killer, 1).unwrap();
        assert_eq!(*killer.killed.lock().unwrap(), vec![3, 2, 1]);
    }

    #[test]
    fn test_kill_tree_swallows_race() {
        let killer = FakeKiller {
            table: vec![(2, 1)],
            gone: vec![2, 1],
            ..Default::default()
        };

        assert!(kill_tree(&killer, 1).is_ok());
    }

    #[test]
    fn test_kill_tree_reports_denial_but_continues() {
        let killer = FakeKiller {
            table: vec![(2, 1), (3, 1)],
            denied: vec![3],
            ..Default::default()
        };

        let result = kill_tree(&killer, 1);
        assert!(matches!(result, Err(Error::TerminationDenied { pid: 3, .. })));
        assert_eq!(*killer.killed.lock().unwrap(), vec![3, 2, 1]);
    }

    fn wait_until_dead(pid: u32) -> bool {
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
        while std::time::Instant::now() < deadline {
            if !is_process_alive(pid) {
                return true;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
        false
    }

    #[cfg(unix)]
    #[test]
    fn test_system_killer_reports_missing_process_as_race() {
        // Spawn and reap a short-lived process so its pid is known to be gone.
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();

        let result = SystemTreeKiller::new().kill(pid);
        assert!(matches!(result, Err(Error::TerminationRace(p)) if p == pid));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_killer_finds_children() {
        let mut child = std::process::Command::new("/bin/sh")
            .arg("-c")
            .arg("sleep 5 & wait")
            .spawn()
            .unwrap();
        let pid = child.id();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(3);
        let mut descendants = Vec::new();
        while std::time::Instant::now() < deadline {
            descendants = SystemTreeKiller::new().descendants(pid);
            if !descendants.is_empty() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }

        kill_tree(&SystemTreeKiller::new(), pid).unwrap();
        child.wait().unwrap();

        assert!(!descendants.is_empty(), "sleep should be a descendant of sh");
        for pid in descendants {
            assert!(wait_until_dead(pid), "descendant {pid} survived the tree kill");
        }
    }
}
