//! Integration tests for multi-session management against real shells.

#![cfg(unix)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tabterm_core::{Error, Result, SessionEvent, SessionId};
use tabterm_process::{is_process_alive, ProcessTreeKiller, SystemTreeKiller};
use tabterm_session::{SessionManager, SessionManagerConfig, SessionOptions};

/// Refuses to kill chosen pids, delegating everything else.
#[derive(Debug, Default)]
struct DenyingKiller {
    inner: SystemTreeKiller,
    denied: Mutex<Vec<u32>>,
}

impl DenyingKiller {
    fn deny(&self, pid: u32) {
        self.denied.lock().unwrap().push(pid);
    }
}

impl ProcessTreeKiller for DenyingKiller {
    fn descendants(&self, pid: u32) -> Vec<u32> {
        self.inner.descendants(pid)
    }

    fn kill(&self, pid: u32) -> Result<()> {
        if self.denied.lock().unwrap().contains(&pid) {
            return Err(Error::TerminationDenied {
                pid,
                reason: "denied by test".to_string(),
            });
        }
        self.inner.kill(pid)
    }
}

fn manager_with(max_sessions: usize, killer: Arc<dyn ProcessTreeKiller>) -> SessionManager {
    let mut session = SessionOptions::new("/bin/sh", vec![]);
    session.killer = killer;
    session.termination_timeout = Duration::from_millis(500);
    SessionManager::with_config(SessionManagerConfig {
        max_sessions,
        session,
    })
}

fn pid_of(manager: &SessionManager, id: &SessionId) -> u32 {
    manager.session(id).unwrap().process().pid().unwrap()
}

async fn wait_until_dead(pid: u32) -> bool {
    for _ in 0..50 {
        if !is_process_alive(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

#[tokio::test]
async fn test_cap_rejects_extra_session() {
    let mut manager = manager_with(7, Arc::new(SystemTreeKiller::new()));

    for _ in 0..7 {
        assert!(manager.create_session().unwrap().is_some());
    }
    assert_eq!(manager.create_session().unwrap(), None);
    assert_eq!(manager.session_count(), 7);

    let labels: Vec<String> = manager.list_sessions().into_iter().map(|i| i.label).collect();
    assert_eq!(labels.first().map(String::as_str), Some("Terminal 1"));
    assert_eq!(labels.last().map(String::as_str), Some("Terminal 7"));

    let report = manager.shutdown_all().await;
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_closing_last_session_kills_shell() {
    let mut manager = manager_with(7, Arc::new(SystemTreeKiller::new()));
    let id = manager.create_session().unwrap().unwrap();
    let pid = manager.session(&id).unwrap().process().pid().unwrap();

    let outcome = manager.close_session(&id).await.unwrap();
    assert!(outcome.is_shutdown());
    assert!(manager.is_shut_down());
    assert!(wait_until_dead(pid).await, "shell {pid} survived shutdown");
}

#[tokio::test]
async fn test_close_kills_background_children() {
    let mut manager = manager_with(7, Arc::new(SystemTreeKiller::new()));
    let keep = manager.create_session().unwrap().unwrap();
    let id = manager.create_session().unwrap().unwrap();
    let shell = manager.session(&id).unwrap().process().pid().unwrap();

    manager.submit(&id, "sleep 30 &").unwrap();
    manager.submit(&id, "echo started").unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let children = SystemTreeKiller::new().descendants(shell);
    assert!(!children.is_empty(), "expected a background sleep");

    manager.close_session(&id).await.unwrap();
    assert!(wait_until_dead(shell).await);
    for child in children {
        assert!(wait_until_dead(child).await, "child {child} survived close");
    }
    assert_eq!(manager.active(), Some(keep));

    manager.shutdown_all().await;
}

#[tokio::test]
async fn test_shutdown_continues_past_failure() {
    let killer = Arc::new(DenyingKiller::default());
    let mut manager = manager_with(7, killer.clone());

    let first = manager.create_session().unwrap().unwrap();
    let stuck = manager.create_session().unwrap().unwrap();
    let last = manager.create_session().unwrap().unwrap();

    let first_pid = pid_of(&manager, &first);
    let stuck_pid = pid_of(&manager, &stuck);
    let last_pid = pid_of(&manager, &last);
    killer.deny(stuck_pid);

    let report = manager.shutdown_all().await;
    assert_eq!(report.closed, vec![first, stuck, last]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, stuck);
    assert!(matches!(report.failures[0].1, Error::TerminationDenied { .. }));

    assert!(wait_until_dead(first_pid).await);
    assert!(wait_until_dead(last_pid).await);

    let events = manager.poll_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::CleanupIncomplete { id, .. } if *id == stuck)));
    assert_eq!(events.last(), Some(&SessionEvent::Shutdown));

    let _ = SystemTreeKiller::new().kill(stuck_pid);
    assert!(wait_until_dead(stuck_pid).await);
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let mut manager = manager_with(7, Arc::new(SystemTreeKiller::new()));
    let left = manager.create_session().unwrap().unwrap();
    let right = manager.create_session().unwrap().unwrap();

    manager.submit(&left, "echo left-only").unwrap();
    manager.submit(&right, "echo right-only").unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let done = {
            let l = manager.session(&left).unwrap().scrollback().text();
            let r = manager.session(&right).unwrap().scrollback().text();
            l.contains("left-only") && r.contains("right-only")
        };
        if done {
            break;
        }
        match tokio::time::timeout_at(deadline, manager.next_event()).await {
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => break,
        }
    }

    let l = manager.session(&left).unwrap().scrollback().text().to_string();
    let r = manager.session(&right).unwrap().scrollback().text().to_string();
    assert!(l.contains("left-only") && !l.contains("right-only"));
    assert!(r.contains("right-only") && !r.contains("left-only"));

    assert_eq!(manager.session(&left).unwrap().history().entries(), &["echo left-only"]);
    assert_eq!(manager.session(&right).unwrap().history().entries(), &["echo right-only"]);

    manager.shutdown_all().await;
}

#[tokio::test]
async fn test_shell_exit_keeps_tab_open() {
    let mut manager = manager_with(7, Arc::new(SystemTreeKiller::new()));
    let id = manager.create_session().unwrap().unwrap();
    manager.submit(&id, "exit 2").unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let mut exited = None;
    while exited.is_none() {
        match tokio::time::timeout_at(deadline, manager.next_event()).await {
            Ok(Some(SessionEvent::SessionExited { id: from, code })) if from == id => {
                exited = Some(code)
            }
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => break,
        }
    }

    assert_eq!(exited, Some(Some(2)));
    assert_eq!(manager.session_count(), 1);
    assert!(!manager.session(&id).unwrap().is_alive());
    assert!(matches!(manager.submit(&id, "echo late"), Err(Error::ChannelClosed)));

    manager.shutdown_all().await;
}

#[tokio::test]
async fn test_shutdown_waits_for_stuck_sessions_concurrently() {
    let killer = Arc::new(DenyingKiller::default());
    let mut manager = manager_with(7, killer.clone());

    let mut pids = Vec::new();
    for _ in 0..3 {
        let id = manager.create_session().unwrap().unwrap();
        let pid = pid_of(&manager, &id);
        killer.deny(pid);
        pids.push(pid);
    }

    // Each terminate waits out the 500ms timeout
    let started = std::time::Instant::now();
    let report = manager.shutdown_all().await;
    let elapsed = started.elapsed();

    // Failures are reported in tab order
    let failed: Vec<SessionId> = report.failures.iter().map(|(id, _)| *id).collect();
    assert_eq!(failed.len(), 3);
    assert_eq!(failed, report.closed);
    assert!(
        elapsed < Duration::from_millis(1200),
        "shutdown took {elapsed:?}"
    );

    for pid in pids {
        let _ = SystemTreeKiller::new().kill(pid);
        assert!(wait_until_dead(pid).await);
    }
}
