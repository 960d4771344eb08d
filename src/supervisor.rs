//! Bounded execution: step budgets and a wall-clock watchdog.
//!
//! The engine itself never gives up on a program. Callers that need a bound
//! run the job through [`supervise`], which executes it on a worker thread and
//! flips the shared cancel flag once the timeout elapses.

use std::io::{Read, Write};
use std::sync::{Arc, atomic::AtomicBool, mpsc};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::engine::{ExecStats, RunError, StepControl};
use crate::interpreter::Interpreter;

/// Budget for one supervised run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Supervision {
    pub max_steps: Option<u64>,
    pub timeout_ms: Option<u64>,
}

impl From<&EngineConfig> for Supervision {
    fn from(config: &EngineConfig) -> Self {
        Self {
            max_steps: config.max_steps,
            timeout_ms: config.timeout_ms,
        }
    }
}

/// Run `job` under `supervision`.
///
/// Without a timeout the job runs on the calling thread. With one, it runs on
/// a worker thread; if the deadline passes first the cancel flag is raised and
/// [`RunError::Timeout`] is returned without waiting for the worker, which
/// stops at its next step (or after a blocking read returns).
pub fn supervise<T, F>(supervision: Supervision, job: F) -> Result<T, RunError>
where
    F: FnOnce(StepControl) -> T + Send + 'static,
    T: Send + 'static,
{
    let cancel = Arc::new(AtomicBool::new(false));
    let control = StepControl::new(supervision.max_steps, cancel);

    let Some(millis) = supervision.timeout_ms else {
        return Ok(job(control));
    };

    let watchdog = control.clone();
    let (tx, rx) = mpsc::channel::<T>();
    thread::spawn(move || {
        let _ = tx.send(job(control));
    });

    match rx.recv_timeout(Duration::from_millis(millis)) {
        Ok(value) => Ok(value),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            watchdog.cancel();
            warn!(millis, "wall-clock timeout exceeded, cancelling run");
            Err(RunError::Timeout { millis })
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            warn!("interpreter worker exited without reporting");
            Err(RunError::Canceled)
        }
    }
}

/// Run `interp` under `supervision`, handing the interpreter back unless the
/// watchdog had to abandon it.
pub fn run_supervised<R, W>(
    mut interp: Interpreter,
    input: R,
    output: W,
    supervision: Supervision,
) -> (Result<ExecStats, RunError>, Option<Interpreter>)
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    debug!(?supervision, len = interp.program().len(), "starting supervised run");
    let outcome = supervise(supervision, move |control| {
        let result = interp.run_with_control(input, output, &control);
        (result, interp)
    });
    match outcome {
        Ok((result, interp)) => (result, Some(interp)),
        Err(err) => (Err(err), None),
    }
}
