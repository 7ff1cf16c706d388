//! The client-side demultiplexer.
//!
//! UDP delivers server datagrams late, twice or not at all. This state
//! machine restores a strictly ordered stream: within one game every event
//! number is forwarded exactly once and in order, duplicates are dropped, and
//! gaps wait for the server's retransmission (triggered by the heartbeat's
//! `next_expected_event`).

use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::protocol::{Event, ServerMessage};

use super::frontend::FrontendUpdate;

#[derive(Debug, Default)]
pub struct Demux {
    game_id: Option<u32>,
    next_expected_event: u32,
    maxx: u32,
    maxy: u32,
    player_names: Vec<String>,
}

/// What one datagram contributed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DemuxOutcome {
    /// Lines to forward, in event order.
    pub updates: Vec<FrontendUpdate>,
    /// A new game replaced the previous one; pending lines from the old game
    /// must be discarded before `updates` are queued.
    pub game_changed: bool,
}

impl Demux {
    /// The lowest event number still wanted, advertised in every heartbeat.
    pub fn next_expected_event(&self) -> u32 {
        self.next_expected_event
    }

    pub fn ingest(&mut self, msg: &ServerMessage) -> DemuxOutcome {
        let mut outcome = DemuxOutcome::default();

        if self.game_id != Some(msg.game_id) {
            // A foreign game id is only honored when the datagram opens with
            // that game's first event.
            let starts_new_game = matches!(
                msg.events.first(),
                Some(record) if record.event_no == 0 && matches!(record.event, Event::NewGame { .. })
            );
            if !starts_new_game {
                debug!(game_id = msg.game_id, "dropping datagram for foreign game");
                return outcome;
            }
            self.game_id = Some(msg.game_id);
            self.next_expected_event = 0;
            self.player_names.clear();
            outcome.game_changed = true;
        }

        for record in &msg.events {
            match record.event_no.cmp(&self.next_expected_event) {
                Ordering::Less => continue, // duplicate
                Ordering::Greater => break, // gap, wait for retransmission
                Ordering::Equal => {}
            }

            match &record.event {
                Event::NewGame {
                    maxx,
                    maxy,
                    player_names,
                } => {
                    self.maxx = *maxx;
                    self.maxy = *maxy;
                    self.player_names = player_names.clone();
                    outcome.updates.push(FrontendUpdate::NewGame {
                        maxx: *maxx,
                        maxy: *maxy,
                        player_names: player_names.clone(),
                    });
                }
                Event::Pixel {
                    player_number,
                    x,
                    y,
                } => {
                    let Some(name) = self.player_names.get(*player_number as usize) else {
                        warn!(player = *player_number, "pixel for unknown player, dropping tail");
                        break;
                    };
                    if *x > self.maxx || *y > self.maxy {
                        warn!(x = *x, y = *y, "pixel outside the board, dropping tail");
                        break;
                    }
                    outcome.updates.push(FrontendUpdate::Pixel {
                        x: *x,
                        y: *y,
                        player_name: name.clone(),
                    });
                }
                Event::PlayerEliminated { player_number } => {
                    let Some(name) = self.player_names.get(*player_number as usize) else {
                        warn!(player = *player_number, "elimination of unknown player, dropping tail");
                        break;
                    };
                    outcome.updates.push(FrontendUpdate::PlayerEliminated {
                        player_name: name.clone(),
                    });
                }
                // Nothing to draw; the next game announces itself with a
                // fresh game id and a NewGame at event 0.
                Event::GameOver => {}
            }
            self.next_expected_event = record.event_no + 1;
        }

        outcome
    }
}
