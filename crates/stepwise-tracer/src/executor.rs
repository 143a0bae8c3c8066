use std::future::Future;

use tokio::sync::{mpsc, oneshot};

type Request<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Executor of trace calls.
///
/// The OS only accepts trace calls for a debuggee from the thread which
/// attached to it. The executor owns a dedicated OS thread which creates (and
/// attaches) the trace state `S`, then serves requests one at a time, in the
/// order they were submitted.
///
/// Cloning the executor yields another handle to the same thread. The thread
/// stops once every handle is dropped.
pub struct TraceExecutor<S> {
    requests: mpsc::UnboundedSender<Request<S>>,
}

impl<S> Clone for TraceExecutor<S> {
    fn clone(&self) -> Self {
        Self {
            requests: self.requests.clone(),
        }
    }
}

impl<S: 'static> TraceExecutor<S> {
    /// Spawns the trace thread.
    ///
    /// The trace state is created by `init`, **on the trace thread**.
    pub async fn spawn<F>(name: impl Into<String>, init: F) -> crate::Result<Self>
    where
        F: FnOnce() -> crate::Result<S> + Send + 'static,
    {
        let (requests, mut queue) = mpsc::unbounded_channel::<Request<S>>();
        let (ready_tx, ready_rx) = oneshot::channel();

        let name = name.into();

        std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let mut state = match init() {
                    Ok(state) => {
                        let _ = ready_tx.send(Ok(()));
                        state
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                while let Some(request) = queue.blocking_recv() {
                    request(&mut state);
                }

                tracing::debug!(name = %name, "trace thread stopped");
            })
            .map_err(|e| crate::Error::trace_io("spawn trace thread", e))?;

        ready_rx.await.map_err(|_| crate::Error::TraceThreadGone)??;

        Ok(Self { requests })
    }

    /// Runs `f` on the trace thread and returns its result.
    ///
    /// The request is queued when this function is called, so requests are
    /// served in call order even if their futures are awaited in another
    /// order.
    pub fn run<F, R>(&self, f: F) -> impl Future<Output = crate::Result<R>> + use<F, R, S>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let queued = self
            .requests
            .send(Box::new(move |state: &mut S| {
                let _ = reply_tx.send(f(state));
            }))
            .is_ok();

        async move {
            if !queued {
                return Err(crate::Error::TraceThreadGone);
            }

            reply_rx.await.map_err(|_| crate::Error::TraceThreadGone)
        }
    }
}
