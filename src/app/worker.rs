use std::sync::mpsc;

/// Runs collaborator calls off the event loop.
pub trait Executor: Send + Sync {
    fn execute(&self, job: Box<dyn FnOnce() + Send + 'static>);
}

/// One detached thread per job.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadExecutor;

impl Executor for ThreadExecutor {
    fn execute(&self, job: Box<dyn FnOnce() + Send + 'static>) {
        std::thread::spawn(job);
    }
}

/// Runs the job before returning. Completions still arrive through the channel,
/// so ordering matches the threaded case minus the latency.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, job: Box<dyn FnOnce() + Send + 'static>) {
        job();
    }
}

pub(crate) fn spawn_worker_action<T, W>(executor: &dyn Executor, tx: &mpsc::Sender<T>, work: W)
where
    T: Send + 'static,
    W: FnOnce() -> T + Send + 'static,
{
    let tx = tx.clone();
    executor.execute(Box::new(move || {
        let result = work();
        let _ = tx.send(result);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_executor_delivers_before_returning() {
        let (tx, rx) = mpsc::channel();
        spawn_worker_action(&InlineExecutor, &tx, || 42);
        assert_eq!(rx.try_recv(), Ok(42));
    }

    #[test]
    fn thread_executor_delivers_eventually() {
        let (tx, rx) = mpsc::channel();
        spawn_worker_action(&ThreadExecutor, &tx, || "done");
        assert_eq!(
            rx.recv_timeout(std::time::Duration::from_secs(5)),
            Ok("done")
        );
    }
}
