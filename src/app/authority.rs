//! The authority loop
//!
//! One task owns the [`War`]. Each tick drains queued console commands, runs
//! due deferred tasks and publishes the zone status board. Nothing else
//! touches game state, so the core needs no locks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;
use tracing::{debug, info};

use crate::command::{self, Sender};
use crate::war::War;

use super::state::StatusBoard;

/// A console line and the channel its output goes back on
#[derive(Debug)]
pub struct ConsoleRequest {
    pub line: String,
    pub reply: oneshot::Sender<Vec<String>>,
}

pub struct Authority {
    war: War,
    console_rx: mpsc::Receiver<ConsoleRequest>,
    status: Arc<StatusBoard>,
    tick_rate: u32,
}

impl Authority {
    pub fn new(war: War, tick_rate: u32, status: Arc<StatusBoard>) -> (Self, mpsc::Sender<ConsoleRequest>) {
        let (console_tx, console_rx) = mpsc::channel(64);
        let authority = Self {
            war,
            console_rx,
            status,
            tick_rate: tick_rate.max(1),
        };
        (authority, console_tx)
    }

    /// Run until every console sender is dropped
    pub async fn run(mut self) {
        info!(tick_rate = self.tick_rate, "Authority loop started");
        self.publish();

        let tick_duration = Duration::from_micros(1_000_000 / u64::from(self.tick_rate));
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;

            if !self.process_console() {
                break;
            }

            let ran = self.war.tick();
            if ran > 0 {
                debug!(tasks = ran, "Ran deferred tasks");
            }

            self.publish();
        }

        info!("Authority loop stopped");
    }

    /// Drain queued commands; false once the channel is closed
    fn process_console(&mut self) -> bool {
        loop {
            match self.console_rx.try_recv() {
                Ok(request) => {
                    let output = command::dispatch(&mut self.war, Sender::Console, &request.line);
                    // the HTTP caller may have timed out already
                    let _ = request.reply.send(output);
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn publish(&self) {
        self.status
            .publish(self.war.status(), self.war.sessions().len());
    }
}
