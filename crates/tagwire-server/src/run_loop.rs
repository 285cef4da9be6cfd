//! Single-threaded FIFO run loop with test-observability hooks.
//!
//! A [`RunLoop`] owns a queue of labeled [`Event`]s drained by one dedicated
//! worker thread, strictly in insertion order. Producers on any thread
//! enqueue work; the worker parks when the queue is empty and resumes when
//! work arrives. A quit event terminates the worker without executing a
//! handler and without draining whatever is still queued; a terminated loop
//! accepts no further events.
//!
//! # Hooks
//!
//! Any thread may block until the worker is *about to execute* the next
//! event with a given label ([`RunLoop::wait_before`]) or has *just
//! finished* one ([`RunLoop::wait_after`]). A waiter is released exactly
//! once per registration, and release is a rendezvous: the worker does not
//! start (respectively, move past) the matching handler until every waiter
//! released by that transition has resumed. This makes cross-thread
//! execution order observable deterministically, which is what the test
//! suite uses the hooks for.
//!
//! One monitor (a single mutex plus condvar) guards the queue and both
//! waiter tables together.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

/// Label of the events the connection cycle enqueues for dispatched calls.
pub const CALL_EVENT_LABEL: &str = "call";
/// Label of the terminal event.
pub const QUIT_EVENT_LABEL: &str = "quit";

enum Action {
    Run(Box<dyn FnOnce() + Send>),
    Quit,
}

/// A unit of deferred work: a label naming the event's kind plus the work
/// itself. Consumed when executed; no identity beyond insertion order.
pub struct Event {
    label: String,
    action: Action,
}

impl Event {
    /// Wraps a closure as an event with the given label.
    pub fn new(label: impl Into<String>, work: impl FnOnce() + Send + 'static) -> Self {
        Event {
            label: label.into(),
            action: Action::Run(Box::new(work)),
        }
    }

    /// The terminal event: dequeuing it stops the worker.
    pub fn quit() -> Self {
        Event {
            label: QUIT_EVENT_LABEL.to_owned(),
            action: Action::Quit,
        }
    }

    /// This event's label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// One side's waiter table: a signal generation per label, plus the targets
/// of waiters that have registered but not yet resumed.
#[derive(Default)]
struct HookTable {
    signals: HashMap<String, u64>,
    waiting: HashMap<String, Vec<u64>>,
}

impl HookTable {
    /// Registers a waiter for the next transition of `label`, returning the
    /// generation that releases it.
    fn register(&mut self, label: &str) -> u64 {
        let target = self.generation(label) + 1;
        self.waiting.entry(label.to_owned()).or_default().push(target);
        target
    }

    fn generation(&self, label: &str) -> u64 {
        self.signals.get(label).copied().unwrap_or(0)
    }

    fn signaled(&self, label: &str, target: u64) -> bool {
        self.generation(label) >= target
    }

    /// Marks one transition of `label`, releasing every waiter registered
    /// for it.
    fn signal(&mut self, label: &str) {
        *self.signals.entry(label.to_owned()).or_insert(0) += 1;
    }

    /// Removes a resumed (or abandoned) waiter's registration.
    fn acknowledge(&mut self, label: &str, target: u64) {
        if let Some(targets) = self.waiting.get_mut(label) {
            if let Some(index) = targets.iter().position(|&t| t == target) {
                targets.swap_remove(index);
            }
            if targets.is_empty() {
                self.waiting.remove(label);
            }
        }
    }

    /// True while a released waiter has yet to resume; the worker
    /// rendezvouses on this before proceeding.
    fn has_released_waiters(&self, label: &str) -> bool {
        let generation = self.generation(label);
        self.waiting
            .get(label)
            .is_some_and(|targets| targets.iter().any(|&t| t <= generation))
    }
}

#[derive(Default)]
struct LoopState {
    queue: VecDeque<Event>,
    terminated: bool,
    before: HookTable,
    after: HookTable,
}

struct Shared {
    state: Mutex<LoopState>,
    cond: Condvar,
}

/// Handle to one run loop. Clones share the same queue and worker.
#[derive(Clone)]
pub struct RunLoop {
    shared: Arc<Shared>,
}

impl Default for RunLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLoop {
    pub fn new() -> Self {
        RunLoop {
            shared: Arc::new(Shared {
                state: Mutex::new(LoopState::default()),
                cond: Condvar::new(),
            }),
        }
    }

    /// Starts the worker on a fresh thread.
    pub fn spawn(&self) -> thread::JoinHandle<()> {
        let run_loop = self.clone();
        thread::spawn(move || run_loop.run())
    }

    /// Appends an event; returns false if the loop already terminated and
    /// the event was refused.
    pub fn enqueue(&self, event: Event) -> bool {
        let mut state = self.lock();
        if state.terminated {
            return false;
        }
        state.queue.push_back(event);
        self.shared.cond.notify_all();
        true
    }

    /// Enqueues the terminal event.
    pub fn quit(&self) {
        self.enqueue(Event::quit());
    }

    /// True once the worker has processed a quit event.
    pub fn is_terminated(&self) -> bool {
        self.lock().terminated
    }

    /// Drains the queue on the calling thread until a quit event arrives.
    ///
    /// Handlers run outside the monitor, so producers keep enqueueing while
    /// one executes.
    pub fn run(&self) {
        loop {
            let (label, action) = {
                let mut state = self.lock();
                let event = loop {
                    if let Some(event) = state.queue.pop_front() {
                        break event;
                    }
                    state = self.wait(state);
                };

                // About-to-execute transition: release matching waiters and
                // rendezvous with them before touching the handler.
                state.before.signal(&event.label);
                self.shared.cond.notify_all();
                while state.before.has_released_waiters(&event.label) {
                    state = self.wait(state);
                }

                if matches!(event.action, Action::Quit) {
                    state.terminated = true;
                    self.shared.cond.notify_all();
                    return;
                }
                (event.label, event.action)
            };

            if let Action::Run(work) = action {
                work();
            }

            let mut state = self.lock();
            state.after.signal(&label);
            self.shared.cond.notify_all();
            while state.after.has_released_waiters(&label) {
                state = self.wait(state);
            }
        }
    }

    /// Blocks until the worker is about to execute the next event labeled
    /// `label`. Returns false if the loop terminated first.
    pub fn wait_before(&self, label: &str) -> bool {
        self.wait_hook(label, true)
    }

    /// Blocks until the worker finishes executing the next event labeled
    /// `label`. Returns false if the loop terminated first.
    pub fn wait_after(&self, label: &str) -> bool {
        self.wait_hook(label, false)
    }

    fn wait_hook(&self, label: &str, before: bool) -> bool {
        let mut state = self.lock();
        if state.terminated {
            return false;
        }

        let target = {
            let table = if before { &mut state.before } else { &mut state.after };
            table.register(label)
        };

        loop {
            let signaled = {
                let table = if before { &state.before } else { &state.after };
                table.signaled(label, target)
            };
            if signaled || state.terminated {
                let table = if before { &mut state.before } else { &mut state.after };
                table.acknowledge(label, target);
                self.shared.cond.notify_all();
                return signaled;
            }
            state = self.wait(state);
        }
    }

    fn lock(&self) -> MutexGuard<'_, LoopState> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, LoopState>) -> MutexGuard<'a, LoopState> {
        self.shared
            .cond
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }
}
