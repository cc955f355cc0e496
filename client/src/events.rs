//! Mailbox between the relay receiver and the simulation loop
//!
//! The receiver only decodes and pushes; the loop drains everything queued
//! once per tick, in arrival order, before advancing the simulation.

use shared::Message;
use tokio::sync::mpsc::{self, error::TryRecvError};

#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Message(Message),
    /// The relay connection ended; nothing follows this event.
    RelayClosed,
}

/// Producer half, owned by the receiver.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<InboundEvent>,
}

impl EventSender {
    /// Returns false once the consuming side is gone.
    pub fn push(&self, event: InboundEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Consumer half, owned by the simulation loop.
#[derive(Debug)]
pub struct NetworkEventQueue {
    rx: mpsc::UnboundedReceiver<InboundEvent>,
}

impl NetworkEventQueue {
    pub fn channel() -> (EventSender, NetworkEventQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventSender { tx }, NetworkEventQueue { rx })
    }

    /// Pops the next queued event without waiting.
    ///
    /// Once every producer is dropped and the queue is empty this yields
    /// [`InboundEvent::RelayClosed`], so a receiver that dies without saying
    /// goodbye still ends the session.
    pub fn try_next(&mut self) -> Option<InboundEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(InboundEvent::RelayClosed),
        }
    }

    /// Drains the queue in order, stopping after a terminal event.
    pub fn drain(&mut self) -> Vec<InboundEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_next() {
            let terminal = event == InboundEvent::RelayClosed;
            events.push(event);
            if terminal {
                break;
            }
        }
        events
    }
}
