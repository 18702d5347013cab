//! Process-wide table of live rooms

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::config::RoomSettings;
use crate::game::room::{Outbox, RoomError};
use crate::game::{InputUpdate, PlayerIdentity, Room, RoomPhase};
use crate::ws::protocol::{ConnectionId, ServerMsg};

use super::code::generate_code;
use super::results::MatchResult;
use super::scheduler;

/// A registered room plus its scheduling state
pub struct LiveRoom {
    pub room: Room,
    /// Set once the room is destroyed; late callers holding the Arc treat it as gone
    pub closed: bool,
    /// Countdown/tick/linger task, if one is running
    pub task: Option<AbortHandle>,
}

impl LiveRoom {
    fn new(room: Room) -> Self {
        Self {
            room,
            closed: false,
            task: None,
        }
    }

    fn cancel_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

pub type RoomHandle = Arc<Mutex<LiveRoom>>;

/// Room registry. Owns every live room and the connection -> room lookup.
pub struct RoomRegistry {
    rooms: DashMap<String, RoomHandle>,
    connections: DashMap<ConnectionId, String>,
    settings: RoomSettings,
    results_tx: mpsc::Sender<MatchResult>,
}

impl RoomRegistry {
    pub fn new(settings: RoomSettings, results_tx: mpsc::Sender<MatchResult>) -> Self {
        Self {
            rooms: DashMap::new(),
            connections: DashMap::new(),
            settings,
            results_tx,
        }
    }

    pub fn settings(&self) -> &RoomSettings {
        &self.settings
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn active_players(&self) -> usize {
        self.connections.len()
    }

    /// Code of the room a connection currently sits in
    pub fn room_of(&self, conn: &ConnectionId) -> Option<String> {
        self.connections.get(conn).map(|c| c.value().clone())
    }

    fn get(&self, code: &str) -> Option<RoomHandle> {
        self.rooms.get(code).map(|r| r.value().clone())
    }

    /// Open a new room with the requester as host. Leaves any room the connection was in.
    pub fn create_room(
        &self,
        conn: ConnectionId,
        identity: PlayerIdentity,
        outbox: Outbox,
    ) -> Result<String, RoomError> {
        self.leave_room(&conn);

        let host_name = identity.display_name.clone();
        let mut rng = rand::thread_rng();
        let (code, handle) = loop {
            let code = generate_code(&mut rng);
            match self.rooms.entry(code.clone()) {
                Entry::Occupied(_) => {
                    debug!(room = %code, "Join code collision, regenerating");
                }
                Entry::Vacant(slot) => {
                    let handle = Arc::new(Mutex::new(LiveRoom::new(Room::new(
                        code.clone(),
                        rand::random::<u64>(),
                    ))));
                    slot.insert(handle.clone());
                    break (code, handle);
                }
            }
        };

        {
            let mut live = handle.lock();
            if let Err(e) = live.room.add_player(conn, identity, outbox) {
                drop(live);
                self.rooms.remove(&code);
                return Err(e);
            }
            live.room.send_to(
                &conn,
                ServerMsg::RoomCreated {
                    code: code.clone(),
                    host_name,
                },
            );
            live.room.broadcast_roster();
        }
        self.connections.insert(conn, code.clone());

        info!(room = %code, conn = %conn, active_rooms = self.rooms.len(), "Room created");
        Ok(code)
    }

    /// Seat the requester in an existing room. The second seat starts the countdown.
    pub fn join_room(
        self: &Arc<Self>,
        conn: ConnectionId,
        code: &str,
        identity: PlayerIdentity,
        outbox: Outbox,
    ) -> Result<String, RoomError> {
        self.leave_room(&conn);

        if code.is_empty() {
            return Err(RoomError::NotFound);
        }
        let handle = self.get(code).ok_or(RoomError::NotFound)?;

        let name = identity.display_name.clone();
        let mut live = handle.lock();
        if live.closed {
            return Err(RoomError::NotFound);
        }
        live.room.add_player(conn, identity, outbox)?;
        self.connections.insert(conn, code.to_string());

        live.room.send_to(
            &conn,
            ServerMsg::RoomJoined {
                code: code.to_string(),
                name,
            },
        );
        live.room.broadcast_roster();

        if live.room.begin_countdown() {
            live.cancel_task();
            live.task = Some(scheduler::spawn(
                self.clone(),
                code.to_string(),
                handle.clone(),
            ));
        }
        Ok(code.to_string())
    }

    /// Remove a connection from its room, if any. Empty rooms are destroyed at once.
    pub fn leave_room(&self, conn: &ConnectionId) {
        let Some((_, code)) = self.connections.remove(conn) else {
            return;
        };
        let Some(handle) = self.get(&code) else {
            return;
        };

        let emptied = {
            let mut live = handle.lock();
            if live.closed {
                return;
            }
            let before = live.room.phase();
            live.room.remove_player(conn);

            if live.room.is_empty() {
                // Closed before the lock drops so a racing join sees NotFound
                self.close(&code, &mut live);
                true
            } else {
                if before == RoomPhase::Countdown && live.room.phase() == RoomPhase::Waiting {
                    live.cancel_task();
                }
                false
            }
        };

        if emptied {
            self.rooms.remove_if(&code, |_, h| Arc::ptr_eq(h, &handle));
            info!(room = %code, active_rooms = self.rooms.len(), "Room destroyed");
        }
    }

    /// Merge validated input into the connection's player. No-op outside a room.
    pub fn route_input(&self, conn: &ConnectionId, update: &InputUpdate) {
        let Some(code) = self.room_of(conn) else {
            return;
        };
        let Some(handle) = self.get(&code) else {
            return;
        };
        let mut live = handle.lock();
        if !live.closed {
            live.room.apply_input(conn, update);
        }
    }

    /// Unregister a room, cancel its task and release its occupants' lookups
    pub fn destroy_room(&self, code: &str) {
        let Some((_, handle)) = self.rooms.remove(code) else {
            return;
        };

        let occupants = {
            let mut live = handle.lock();
            self.close(code, &mut live)
        };
        for id in occupants {
            self.connections.remove_if(&id, |_, c| c == code);
        }

        info!(room = %code, active_rooms = self.rooms.len(), "Room destroyed");
    }

    /// Mark a locked room closed, stop its task and hand off a result nobody published yet.
    /// Returns the connections still seated.
    fn close(&self, code: &str, live: &mut LiveRoom) -> Vec<ConnectionId> {
        live.closed = true;
        live.cancel_task();
        if let Some(summary) = live.room.take_summary() {
            let result = MatchResult::new(code.to_string(), summary);
            if let Err(e) = self.results_tx.try_send(result) {
                warn!(room = %code, error = %e, "Dropping match result of closed room");
            }
        }
        live.room.player_ids()
    }

    /// Queue a finished match for the account-progress consumer
    pub(super) async fn publish_result(&self, result: MatchResult) {
        let code = result.code.clone();
        if self.results_tx.send(result).await.is_err() {
            warn!(room = %code, "Result consumer gone, dropping match result");
        }
    }
}
