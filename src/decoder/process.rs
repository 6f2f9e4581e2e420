//! Child processes with a deadline
//!
//! The child is polled with `try_wait` and killed once the call limit
//! expires. Stdin is fed and stdout drained on helper threads so a child
//! that stops reading or floods its pipe cannot stall the wait.

use super::engine::CallLimit;
use std::io::{Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::trace;

const WAIT_POLL: Duration = Duration::from_millis(10);

/// Exit status and captured stdout of a finished child
#[derive(Debug)]
pub struct ChildOutput {
    /// Exit status
    pub status: ExitStatus,
    /// Everything the child wrote to stdout
    pub stdout: Vec<u8>,
}

/// Run `command` to completion or until `limit` expires
///
/// Returns `None` when the program cannot be started, when it overruns
/// (the child is killed), or when its output cannot be collected in time.
pub fn run_bounded(
    command: &mut Command,
    input: Option<Vec<u8>>,
    limit: &CallLimit,
) -> Option<ChildOutput> {
    let stdin = if input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    };
    let mut child = command
        .stdin(stdin)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| trace!(%err, program = ?command.get_program(), "cannot start child"))
        .ok()?;

    if let (Some(mut pipe), Some(bytes)) = (child.stdin.take(), input) {
        thread::spawn(move || {
            if let Err(err) = pipe.write_all(&bytes) {
                trace!(%err, "child stdin closed early");
            }
            drop(pipe);
        });
    }

    let (tx, rx) = mpsc::channel();
    let stdout = child.stdout.take();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = stdout {
            if let Err(err) = pipe.read_to_end(&mut buf) {
                trace!(%err, "child stdout read failed");
            }
        }
        let _ = tx.send(buf);
    });

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(err) => {
                trace!(%err, "cannot wait on child");
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
        }
        if limit.is_expired() {
            trace!(pid = child.id(), "child overran its limit, killing");
            let _ = child.kill();
            let _ = child.wait();
            return None;
        }
        thread::sleep(WAIT_POLL);
    };

    // a grandchild may still hold stdout, so this wait is bounded too
    let stdout = match limit.remaining() {
        Some(left) => rx.recv_timeout(left.max(WAIT_POLL)).ok()?,
        None => rx.recv().ok()?,
    };
    Some(ChildOutput { status, stdout })
}
