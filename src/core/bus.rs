//! # Command Bus
//!
//! Multicasts each [`Command`] to every subscriber, in registration order.
//!
//! ```text
//!   execute(X) ──► queue: [X]
//!                   │
//!                   ├─► subscriber 1 ──► outbox: [Y]
//!                   ├─► subscriber 2
//!                   └─► subscriber 3 ──► outbox: [Z]
//!                  queue: [Y, Z] ──► ... until empty
//! ```
//!
//! A subscriber never calls back into the bus. It pushes follow-up commands
//! into the [`Outbox`] it is handed, and the bus appends them to the tail of
//! its FIFO queue once that subscriber returns. A command's full fan-out is
//! therefore finished before the next queued command is delivered, whatever
//! order the handlers happen to emit in.
//!
//! The bus is generic over the context `C` its subscribers operate on, so the
//! state they share is passed in by reference instead of living in globals.

use log::debug;
use std::collections::VecDeque;

use crate::core::command::Command;

/// Upper bound on commands drained by a single `execute` call.
/// A pair of subscribers that keep emitting each other would otherwise spin forever.
pub const MAX_COMMANDS_PER_DISPATCH: usize = 256;

/// Follow-up commands emitted by a subscriber while it handles a delivery.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: Vec<Command>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `command` for delivery after the current fan-out completes.
    pub fn execute(&mut self, command: Command) {
        self.pending.push(command);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Command> + '_ {
        self.pending.drain(..)
    }
}

type Handler<C> = Box<dyn FnMut(Command, &mut C, &mut Outbox)>;

/// Index of a subscriber in delivery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberId(usize);

pub struct CommandBus<C> {
    subscribers: Vec<(&'static str, Handler<C>)>,
    queue: VecDeque<Command>,
}

impl<C> Default for CommandBus<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> CommandBus<C> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            queue: VecDeque::new(),
        }
    }

    /// Register a handler. Handlers receive commands in the order they were registered.
    pub fn subscribe<F>(&mut self, name: &'static str, handler: F) -> SubscriberId
    where
        F: FnMut(Command, &mut C, &mut Outbox) + 'static,
    {
        self.subscribers.push((name, Box::new(handler)));
        SubscriberId(self.subscribers.len() - 1)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver `command` to every subscriber, then drain anything they emitted.
    ///
    /// Returns the number of deliveries performed (commands drained), which is
    /// mostly useful to tests.
    pub fn execute(&mut self, command: Command, ctx: &mut C) -> usize {
        self.queue.push_back(command);
        self.drain(ctx)
    }

    /// Deliver every command in `outbox`, in the order it was filled.
    pub fn execute_all(&mut self, outbox: &mut Outbox, ctx: &mut C) -> usize {
        self.queue.extend(outbox.drain());
        self.drain(ctx)
    }

    fn drain(&mut self, ctx: &mut C) -> usize {
        let mut delivered = 0;
        let mut outbox = Outbox::new();

        while let Some(command) = self.queue.pop_front() {
            if delivered == MAX_COMMANDS_PER_DISPATCH {
                log::warn!(
                    "Command bus dropped {} queued commands after {} deliveries (cycle?)",
                    self.queue.len() + 1,
                    delivered
                );
                self.queue.clear();
                break;
            }
            delivered += 1;
            debug!("Dispatching {:?}", command);

            for (name, handler) in self.subscribers.iter_mut() {
                handler(command, ctx, &mut outbox);
                if !outbox.is_empty() {
                    debug!("{} emitted {} follow-up command(s)", name, outbox.pending.len());
                    self.queue.extend(outbox.drain());
                }
            }
        }

        delivered
    }
}
