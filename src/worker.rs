use std::cell::RefCell;
use std::fmt::{Display, Formatter};
use std::thread::{Scope, ScopedJoinHandle};

use serde::{Deserialize, Serialize};

use crate::error::Error;

thread_local! {
    /// Coordinates of the unit the current worker thread is working on.
    ///
    /// Access to this by calling `unit_coord()`.
    static COORD: RefCell<Option<Coord>> = const { RefCell::new(None) };
}

/// The two halves of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Map,
    Reduce,
}

/// Identifies a single task of a stage: which stage, which phase and the index of the task
/// inside that phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub stage: usize,
    pub phase: Phase,
    pub index: usize,
}

impl Coord {
    pub fn new(stage: usize, phase: Phase, index: usize) -> Self {
        Self {
            stage,
            phase,
            index,
        }
    }
}

impl Display for Coord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let phase = match self.phase {
            Phase::Map => "m",
            Phase::Reduce => "r",
        };
        write!(f, "s{}{}{}", self.stage, phase, self.index)
    }
}

/// Get the coord of the unit the current thread is working on.
///
/// This will return `Some(coord)` only when called from a worker thread, otherwise `None` is
/// returned.
pub fn unit_coord() -> Option<Coord> {
    COORD.with(|x| *x.borrow())
}

/// Call a function if this struct goes out of scope without calling `defuse`, including during a
/// panic stack-unwinding.
struct CatchPanic<F: FnOnce()> {
    /// True if the function should be called.
    primed: bool,
    /// Function to call.
    ///
    /// The `Drop` implementation will move out the function.
    handler: Option<F>,
}

impl<F: FnOnce()> CatchPanic<F> {
    fn new(handler: F) -> Self {
        Self {
            primed: true,
            handler: Some(handler),
        }
    }

    /// Avoid calling the function on drop.
    fn defuse(&mut self) {
        self.primed = false;
    }
}

impl<F: FnOnce()> Drop for CatchPanic<F> {
    fn drop(&mut self) {
        if self.primed {
            if let Some(handler) = self.handler.take() {
                handler();
            }
        }
    }
}

/// Spawn a named thread inside `scope` that runs the task at `coord`.
pub(crate) fn spawn_worker<'scope, 'env, T, F>(
    scope: &'scope Scope<'scope, 'env>,
    coord: Coord,
    task: F,
) -> Result<ScopedJoinHandle<'scope, Result<T, Error>>, Error>
where
    T: Send + 'scope,
    F: FnOnce() -> Result<T, Error> + Send + 'scope,
{
    debug!("starting worker {coord}");
    let handle = std::thread::Builder::new()
        .name(format!("worker-{coord}"))
        .spawn_scoped(scope, move || {
            // remember in the thread-local the coordinate of this task
            COORD.with(|x| *x.borrow_mut() = Some(coord));
            let mut catch_panic = CatchPanic::new(|| {
                error!("worker {coord} crashed!");
            });
            let result = task();
            catch_panic.defuse();
            match &result {
                Ok(_) => debug!("worker {coord} completed"),
                Err(Error::Aborted) => debug!("worker {coord} aborted"),
                Err(e) => warn!("worker {coord} failed: {e}"),
            }
            result
        })?;
    Ok(handle)
}

/// Wait for a worker, turning a panic into an error.
pub(crate) fn join_worker<T>(
    coord: Coord,
    handle: ScopedJoinHandle<'_, Result<T, Error>>,
) -> Result<T, Error> {
    handle.join().map_err(|_| Error::WorkerPanicked(coord))?
}
