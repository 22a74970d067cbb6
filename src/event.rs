//! Notifications from the process runner to its collaborator.
//!
//! The runner talks to whoever issued an invocation through [`RunObserver`].
//! Two observers ship with the crate:
//!
//! - [`Callbacks`]: three closures, one per event kind.
//! - `UnboundedSender<RunnerEvent>`: forwards everything into a channel so a
//!   front-end can pick events up from its own `tokio::select!` loop.
//!
//! All methods of one observer are called from the same supervisor task, one
//! at a time. `on_complete` consumes the observer, so it can only run once.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::error;

use crate::runner::{CompletionResult, InvocationId, OutputEvent, StreamKind};

/// Receiver of the three event kinds produced by one invocation.
pub trait RunObserver: Send + 'static {
    /// Called for every decoded standard-output line.
    fn on_output_line(&mut self, id: InvocationId, line: String);

    /// Called for every decoded standard-error line.
    fn on_error_line(&mut self, id: InvocationId, line: String);

    /// Called exactly once when the invocation is over.
    fn on_complete(self, id: InvocationId, result: CompletionResult);

    /// Route a tagged line to the matching callback.
    fn on_line(&mut self, id: InvocationId, event: OutputEvent) {
        match event.stream {
            StreamKind::Stdout => self.on_output_line(id, event.line),
            StreamKind::Stderr => self.on_error_line(id, event.line),
        }
    }
}

/// Closure-backed observer.
pub struct Callbacks<O, E, C>
where
    O: FnMut(String) + Send + 'static,
    E: FnMut(String) + Send + 'static,
    C: FnOnce(CompletionResult) + Send + 'static,
{
    on_output_line: O,
    on_error_line: E,
    on_complete: C,
}

impl<O, E, C> Callbacks<O, E, C>
where
    O: FnMut(String) + Send + 'static,
    E: FnMut(String) + Send + 'static,
    C: FnOnce(CompletionResult) + Send + 'static,
{
    pub fn new(on_output_line: O, on_error_line: E, on_complete: C) -> Self {
        Self {
            on_output_line,
            on_error_line,
            on_complete,
        }
    }
}

impl<O, E, C> RunObserver for Callbacks<O, E, C>
where
    O: FnMut(String) + Send + 'static,
    E: FnMut(String) + Send + 'static,
    C: FnOnce(CompletionResult) + Send + 'static,
{
    fn on_output_line(&mut self, _id: InvocationId, line: String) {
        (self.on_output_line)(line)
    }

    fn on_error_line(&mut self, _id: InvocationId, line: String) {
        (self.on_error_line)(line)
    }

    fn on_complete(self, _id: InvocationId, result: CompletionResult) {
        (self.on_complete)(result)
    }
}

/// Event forwarded through the runner channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerEvent {
    /// A line of output from one of the pipes
    Output {
        id: InvocationId,
        event: OutputEvent,
    },
    /// The invocation finished; no further events follow for `id`
    Completed {
        id: InvocationId,
        result: CompletionResult,
    },
}

impl RunObserver for UnboundedSender<RunnerEvent> {
    fn on_output_line(&mut self, id: InvocationId, line: String) {
        self.on_line(id, OutputEvent::stdout(line));
    }

    fn on_error_line(&mut self, id: InvocationId, line: String) {
        self.on_line(id, OutputEvent::stderr(line));
    }

    fn on_line(&mut self, id: InvocationId, event: OutputEvent) {
        if let Err(e) = self.send(RunnerEvent::Output { id, event }) {
            error!("Failed to send output event for {}: {:?}", id, e);
        }
    }

    fn on_complete(self, id: InvocationId, result: CompletionResult) {
        if let Err(e) = self.send(RunnerEvent::Completed { id, result }) {
            error!("Failed to send completion event for {}: {:?}", id, e);
        }
    }
}

/// Creates the channel pair used to observe the runner from an event loop.
///
/// Unbounded because the collaborator is expected to drain it continuously
/// and the runner must never block on a slow consumer.
pub fn init_runner_eventsource() -> (UnboundedSender<RunnerEvent>, UnboundedReceiver<RunnerEvent>) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_callbacks_route_by_stream() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let out = seen.clone();
        let err = seen.clone();
        let done = seen.clone();

        let mut cb = Callbacks::new(
            move |line| out.lock().unwrap().push(format!("out:{}", line)),
            move |line| err.lock().unwrap().push(format!("err:{}", line)),
            move |result| done.lock().unwrap().push(format!("done:{}", result)),
        );

        let id = InvocationId(1);
        cb.on_line(id, OutputEvent::stdout("a"));
        cb.on_line(id, OutputEvent::stderr("b"));
        cb.on_complete(id, CompletionResult::ExitCode(0));

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["out:a", "err:b", "done:exited with code 0"]
        );
    }

    #[tokio::test]
    async fn test_channel_observer_forwards_events() {
        let (mut tx, mut rx) = init_runner_eventsource();
        let id = InvocationId(7);

        tx.on_output_line(id, "hello".to_string());
        tx.on_error_line(id, "warn".to_string());
        tx.on_complete(id, CompletionResult::ExitCode(2));

        assert_eq!(
            rx.recv().await,
            Some(RunnerEvent::Output {
                id,
                event: OutputEvent::stdout("hello")
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(RunnerEvent::Output {
                id,
                event: OutputEvent::stderr("warn")
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(RunnerEvent::Completed {
                id,
                result: CompletionResult::ExitCode(2)
            })
        );
        // Sender was consumed by on_complete
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_channel_observer_tolerates_dropped_receiver() {
        let (mut tx, rx) = init_runner_eventsource();
        drop(rx);
        tx.on_output_line(InvocationId(1), "lost".to_string());
        tx.on_complete(InvocationId(1), CompletionResult::Cancelled);
    }
}
