#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative client-side world state for Tankfield.
//!
//! The [`World`] holds the single consistent snapshot of the match: map
//! layout, roster, brick damage, and the timed pickups. The network layer
//! writes into it through [`apply`], an external driver advances it once per
//! server tick through [`advance_frame`], and every notification is handed to
//! an [`EventSink`] synchronously on the caller's stack.
//!
//! The world performs no locking. Exactly one logical tick loop may drive a
//! given instance; writes coming from other threads must be funnelled into
//! that loop between frames.

mod events;
mod render;

use std::{collections::BTreeSet, time::Duration};

use tankfield_core::{
    Brick, Coin, Command, Event, EventKind, LifePack, MapDetails, NegativeHonourReason, Player,
    WorldState,
};
use tracing::{debug, info, trace, warn};

pub use events::{EventBus, EventSink, Subscription};

/// Server tick cadence used when no other frame length is configured.
pub const DEFAULT_FRAME_DURATION: Duration = Duration::from_secs(1);

/// Configuration parameters required to construct a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    frame_duration: Duration,
}

impl Config {
    /// Creates a configuration decaying timed pickups by `frame_duration`
    /// every frame.
    #[must_use]
    pub const fn new(frame_duration: Duration) -> Self {
        Self { frame_duration }
    }

    /// Simulated time that elapses in a single frame.
    #[must_use]
    pub const fn frame_duration(&self) -> Duration {
        self.frame_duration
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_DURATION)
    }
}

/// Errors reported when a command cannot be applied.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// A command addressed a player number outside the roster.
    #[error("player number {number} is outside the roster of {roster_size}")]
    UnknownPlayer {
        /// Player number carried by the command.
        number: usize,
        /// Number of players in the roster.
        roster_size: usize,
    },
    /// A roster listed the same player name twice.
    #[error("player name `{0}` appears more than once in the roster")]
    DuplicatePlayerName(String),
}

/// Represents the client-side Tankfield world.
#[derive(Debug)]
pub struct World {
    state: WorldState,
    map: Option<MapDetails>,
    players: Vec<Player>,
    bricks: Vec<Brick>,
    coins: Vec<Coin>,
    life_packs: Vec<LifePack>,
    my_player_number: usize,
    input_allowed: bool,
    dead_player_names: BTreeSet<String>,
    frame_duration: Duration,
    frame_index: u64,
}

impl World {
    /// Creates an empty world that has not joined a match yet.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            state: WorldState::NotStarted,
            map: None,
            players: Vec::new(),
            bricks: Vec::new(),
            coins: Vec::new(),
            life_packs: Vec::new(),
            my_player_number: 0,
            input_allowed: false,
            dead_player_names: BTreeSet::new(),
            frame_duration: config.frame_duration(),
            frame_index: 0,
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// Applies the provided command to the world.
pub fn apply<S>(world: &mut World, command: Command, sink: &mut S) -> Result<(), WorldError>
where
    S: EventSink + ?Sized,
{
    match command {
        Command::ConfigureMap { map } => {
            debug!(size = map.size, bricks = map.bricks.len(), "map configured");
            world.map = Some(map);
        }
        Command::SetRoster { players } => {
            let mut names = BTreeSet::new();
            for player in &players {
                if !names.insert(player.name.as_str()) {
                    return Err(WorldError::DuplicatePlayerName(player.name.clone()));
                }
            }
            debug!(players = players.len(), "roster replaced");
            world.players = players;
        }
        Command::SetMyPlayerNumber { number } => {
            world.my_player_number = number;
        }
        Command::UpdatePlayer { number, player } => {
            let roster_size = world.players.len();
            let clash = world
                .players
                .iter()
                .enumerate()
                .any(|(index, other)| index != number && other.name == player.name);
            if clash && number < roster_size {
                return Err(WorldError::DuplicatePlayerName(player.name));
            }
            let slot = world
                .players
                .get_mut(number)
                .ok_or(WorldError::UnknownPlayer {
                    number,
                    roster_size,
                })?;
            *slot = player;
        }
        Command::SetBrickState { bricks } => {
            world.bricks = bricks;
        }
        Command::AddCoin { coin } => {
            world.coins.push(coin);
        }
        Command::AddLifePack { life_pack } => {
            world.life_packs.push(life_pack);
        }
        Command::TransitionTo { state } => {
            let _ = transition_to(world, state, sink);
        }
        Command::ReportNegativeHonour { reason } => {
            notify_negative_honour(world, reason, sink);
        }
        Command::AdvanceFrame => {
            advance_frame(world, sink);
        }
    }
    Ok(())
}

/// Moves the world into `state` and announces the entry when required.
///
/// Entering [`WorldState::Running`] publishes [`Event::GameStarted`] and
/// entering [`WorldState::Finished`] publishes [`Event::GameFinished`], once per
/// call, even when the world already was in that state. No transition is
/// rejected. Returns the kind of event that was published, if any.
pub fn transition_to<S>(world: &mut World, state: WorldState, sink: &mut S) -> Option<EventKind>
where
    S: EventSink + ?Sized,
{
    let previous = world.state;
    world.state = state;

    if previous == state {
        warn!(%state, "world state assigned again");
    } else if previous == WorldState::Finished {
        warn!(from = %previous, to = %state, "world left the finished state");
    } else {
        debug!(from = %previous, to = %state, "world state changed");
    }

    let event = match state {
        WorldState::Running => Event::GameStarted,
        WorldState::Finished => Event::GameFinished,
        WorldState::NotStarted | WorldState::Ready => return None,
    };
    sink.publish(world, &event);
    Some(event.kind())
}

/// Advances the world by one frame.
///
/// Timed pickups decay first and expired ones leave the world, then input is
/// unlocked and [`Event::FrameAdvanced`] is published. Only afterwards are
/// players with no health left turned into death-drop coins, each exactly once
/// per match, with one [`Event::PlayerDied`] per newly dead player.
pub fn advance_frame<S>(world: &mut World, sink: &mut S)
where
    S: EventSink + ?Sized,
{
    let frame = world.frame_duration;
    world.life_packs.retain_mut(|pack| pack.advance_frame(frame));
    world.coins.retain_mut(|coin| coin.advance_frame(frame));
    world.input_allowed = true;
    world.frame_index = world.frame_index.saturating_add(1);

    trace!(
        frame = world.frame_index,
        coins = world.coins.len(),
        life_packs = world.life_packs.len(),
        "frame advanced"
    );
    sink.publish(world, &Event::FrameAdvanced);

    for index in 0..world.players.len() {
        let player = &world.players[index];
        if !player.is_dead() {
            continue;
        }
        if !world.dead_player_names.insert(player.name.clone()) {
            continue;
        }

        let coin = Coin::death_drop(player);
        let player = player.clone();
        world.coins.push(coin);

        info!(
            player = %player.name,
            position = %player.position,
            coins = player.coins,
            "player died"
        );
        sink.publish(world, &Event::PlayerDied { player });
    }
}

/// Announces a rule violation reported by the server.
pub fn notify_negative_honour<S>(world: &World, reason: NegativeHonourReason, sink: &mut S)
where
    S: EventSink + ?Sized,
{
    info!(%reason, "negative honour reported");
    sink.publish(world, &Event::NegativeHonour { reason });
}

/// Consumes the input permit granted by the last frame.
///
/// Returns `true` at most once per frame; the server penalises clients that
/// send more than one move within a tick.
pub fn take_input_permit(world: &mut World) -> bool {
    std::mem::replace(&mut world.input_allowed, false)
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::World;
    use tankfield_core::{Brick, Coin, LifePack, MapDetails, Player, WorldState};

    /// Current lifecycle state.
    #[must_use]
    pub fn state(world: &World) -> WorldState {
        world.state
    }

    /// Static map layout, once the server sent it.
    #[must_use]
    pub fn map(world: &World) -> Option<&MapDetails> {
        world.map.as_ref()
    }

    /// Roster ordered by player number.
    #[must_use]
    pub fn players(world: &World) -> &[Player] {
        &world.players
    }

    /// Looks up a roster entry by player number.
    #[must_use]
    pub fn player(world: &World, number: usize) -> Option<&Player> {
        world.players.get(number)
    }

    /// Player number controlled by this client.
    #[must_use]
    pub fn my_player_number(world: &World) -> usize {
        world.my_player_number
    }

    /// Roster entry controlled by this client, once the roster covers it.
    #[must_use]
    pub fn my_player(world: &World) -> Option<&Player> {
        world.players.get(world.my_player_number)
    }

    /// Latest brick damage array.
    #[must_use]
    pub fn bricks(world: &World) -> &[Brick] {
        &world.bricks
    }

    /// Coin piles still on the map.
    #[must_use]
    pub fn coins(world: &World) -> &[Coin] {
        &world.coins
    }

    /// Life packs still on the map.
    #[must_use]
    pub fn life_packs(world: &World) -> &[LifePack] {
        &world.life_packs
    }

    /// Whether the client may send a move during the current frame.
    #[must_use]
    pub fn input_allowed(world: &World) -> bool {
        world.input_allowed
    }

    /// Whether the world already processed the named player's death.
    #[must_use]
    pub fn is_recorded_dead(world: &World, name: &str) -> bool {
        world.dead_player_names.contains(name)
    }

    /// Number of frames advanced since the world was created.
    #[must_use]
    pub fn frame_index(world: &World) -> u64 {
        world.frame_index
    }

    /// Simulated time covered by a single frame.
    #[must_use]
    pub fn frame_duration(world: &World) -> Duration {
        world.frame_duration
    }
}
