#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Tankfield client.
//!
//! This crate defines the data surface that connects the network layer, the
//! client-side world, and presentation adapters. The network layer submits
//! [`Command`] values describing server-driven mutations, the world executes
//! those commands via its `apply` entry point, and then publishes [`Event`]
//! values to whoever subscribed. Entity records defined here are passive data
//! holders; only the timed pickups ([`Coin`] and [`LifePack`]) carry per-frame
//! decay behaviour.

mod messages;

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

pub use messages::{Message, MessageOrigin, NegativeHonourMessage};

/// Health assigned to a tank when it enters the match.
pub const INITIAL_HEALTH: i32 = 100;

/// Damage level at which a brick is fully destroyed.
pub const MAX_BRICK_DAMAGE: u8 = 4;

/// Lifecycle of the client-side world.
///
/// The world only ever moves forward in normal play, but no transition is
/// rejected: any state may be entered from any other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorldState {
    /// No match has been joined yet.
    #[default]
    NotStarted,
    /// The player joined a match and waits for the server to start it.
    Ready,
    /// The server sent its first global update, so the match is in progress.
    Running,
    /// The server announced the end of the match.
    Finished,
}

impl fmt::Display for WorldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotStarted => "NotStarted",
            Self::Ready => "Ready",
            Self::Running => "Running",
            Self::Finished => "Finished",
        };
        f.write_str(label)
    }
}

/// Mutations the network layer may request from the world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Installs the static map layout received when joining a match.
    ConfigureMap {
        /// Layout of the non-movable map geometry.
        map: MapDetails,
    },
    /// Replaces the roster once the match player count is known.
    SetRoster {
        /// Players ordered by their player number.
        players: Vec<Player>,
    },
    /// Records which roster entry is controlled by this client.
    SetMyPlayerNumber {
        /// Zero-based index into the roster.
        number: usize,
    },
    /// Overwrites a single roster entry with fresh server data.
    UpdatePlayer {
        /// Zero-based index into the roster.
        number: usize,
        /// Replacement record for the player.
        player: Player,
    },
    /// Replaces the brick damage array.
    SetBrickState {
        /// Bricks in map order.
        bricks: Vec<Brick>,
    },
    /// Adds a coin pile announced by the server.
    AddCoin {
        /// Coin pile to add.
        coin: Coin,
    },
    /// Adds a life pack announced by the server.
    AddLifePack {
        /// Life pack to add.
        life_pack: LifePack,
    },
    /// Moves the world into the provided lifecycle state.
    TransitionTo {
        /// State to enter.
        state: WorldState,
    },
    /// Reports a rule violation signalled by the server.
    ReportNegativeHonour {
        /// Reason code attached to the violation.
        reason: NegativeHonourReason,
    },
    /// Advances the world by one simulation frame.
    AdvanceFrame,
}

impl From<NegativeHonourMessage> for Command {
    fn from(message: NegativeHonourMessage) -> Self {
        Self::ReportNegativeHonour {
            reason: message.reason(),
        }
    }
}

/// Notifications published by the world.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// A new simulation frame has been applied.
    FrameAdvanced,
    /// The world entered [`WorldState::Running`].
    GameStarted,
    /// The world entered [`WorldState::Finished`].
    GameFinished,
    /// A player was observed dead for the first time in the match.
    PlayerDied {
        /// Record of the player at the moment of death.
        player: Player,
    },
    /// The server reported a rule violation.
    NegativeHonour {
        /// Reason code attached to the violation.
        reason: NegativeHonourReason,
    },
}

impl Event {
    /// Channel the event is delivered on.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::FrameAdvanced => EventKind::FrameAdvanced,
            Self::GameStarted => EventKind::GameStarted,
            Self::GameFinished => EventKind::GameFinished,
            Self::PlayerDied { .. } => EventKind::PlayerDied,
            Self::NegativeHonour { .. } => EventKind::NegativeHonour,
        }
    }
}

/// Independently subscribable notification channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    /// Fired once per frame after timed pickups decayed.
    FrameAdvanced,
    /// Fired whenever the world is set to running.
    GameStarted,
    /// Fired whenever the world is set to finished.
    GameFinished,
    /// Fired once per player death.
    PlayerDied,
    /// Fired whenever a rule violation is reported.
    NegativeHonour,
}

impl EventKind {
    /// Every channel in declaration order.
    pub const ALL: [EventKind; 5] = [
        EventKind::FrameAdvanced,
        EventKind::GameStarted,
        EventKind::GameFinished,
        EventKind::PlayerDied,
        EventKind::NegativeHonour,
    ];
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::FrameAdvanced => "frame_advanced",
            Self::GameStarted => "game_started",
            Self::GameFinished => "game_finished",
            Self::PlayerDied => "player_died",
            Self::NegativeHonour => "negative_honour",
        };
        f.write_str(label)
    }
}

/// Location of a single map cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    x: u32,
    y: u32,
}

impl GridPosition {
    /// Creates a new grid position.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column of the cell.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row of the cell.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Facing of a tank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Facing toward decreasing rows.
    #[default]
    North,
    /// Facing toward increasing columns.
    East,
    /// Facing toward increasing rows.
    South,
    /// Facing toward decreasing columns.
    West,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::North => "North",
            Self::East => "East",
            Self::South => "South",
            Self::West => "West",
        };
        f.write_str(label)
    }
}

/// Server-reported state of a single tank.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    /// Name assigned by the server, unique within a match.
    pub name: String,
    /// Zero-based player number, stable for the match.
    pub number: usize,
    /// Cell currently occupied by the tank.
    pub position: GridPosition,
    /// Direction the tank faces.
    #[serde(default)]
    pub direction: Direction,
    /// Remaining health. Zero or below means the tank is dead.
    #[serde(default = "initial_health")]
    pub health: i32,
    /// Coins carried by the tank.
    #[serde(default)]
    pub coins: u32,
    /// Points scored so far.
    #[serde(default)]
    pub points: u32,
    /// Whether the tank fired during the last server update.
    #[serde(default)]
    pub is_shot: bool,
}

impl Player {
    /// Creates a healthy player with an empty purse.
    #[must_use]
    pub fn new(name: impl Into<String>, number: usize, position: GridPosition) -> Self {
        Self {
            name: name.into(),
            number,
            position,
            direction: Direction::default(),
            health: INITIAL_HEALTH,
            coins: 0,
            points: 0,
            is_shot: false,
        }
    }

    /// Reports whether the player's health has run out.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.health <= 0
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} #{} at {} facing {} health={} coins={} points={}",
            self.name,
            self.number,
            self.position,
            self.direction,
            self.health,
            self.coins,
            self.points
        )?;
        if self.is_shot {
            f.write_str(" (shot)")?;
        }
        Ok(())
    }
}

const fn initial_health() -> i32 {
    INITIAL_HEALTH
}

/// Destructible wall segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Brick {
    /// Cell occupied by the brick.
    pub position: GridPosition,
    /// Accumulated damage, from zero up to [`MAX_BRICK_DAMAGE`].
    #[serde(default)]
    pub damage_level: u8,
}

impl Brick {
    /// Creates an undamaged brick.
    #[must_use]
    pub const fn new(position: GridPosition) -> Self {
        Self {
            position,
            damage_level: 0,
        }
    }

    /// Reports whether the brick has been shot away.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.damage_level >= MAX_BRICK_DAMAGE
    }
}

impl fmt::Display for Brick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let percent = u32::from(self.damage_level.min(MAX_BRICK_DAMAGE)) * 25;
        write!(f, "Brick {} damage={percent}%", self.position)
    }
}

/// Coin pile that can be collected by driving over it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    /// Cell holding the pile.
    pub position: GridPosition,
    /// Number of coins in the pile.
    pub value: u32,
    /// Remaining lifetime of the pile.
    pub time_limit: Duration,
}

impl Coin {
    /// Lifetime sentinel for piles that stay until the match ends.
    pub const NEVER_EXPIRES: Duration = Duration::MAX;

    /// Creates a coin pile.
    #[must_use]
    pub const fn new(position: GridPosition, value: u32, time_limit: Duration) -> Self {
        Self {
            position,
            value,
            time_limit,
        }
    }

    /// Builds the pile a dead player leaves behind.
    ///
    /// The pile sits where the player died, holds the player's whole purse and
    /// never expires.
    #[must_use]
    pub const fn death_drop(player: &Player) -> Self {
        Self::new(player.position, player.coins, Self::NEVER_EXPIRES)
    }

    /// Reports whether the pile carries the never-expiring sentinel.
    #[must_use]
    pub fn never_expires(&self) -> bool {
        self.time_limit == Self::NEVER_EXPIRES
    }

    /// Reports whether the pile's lifetime ran out.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        self.time_limit.is_zero()
    }

    /// Decays the pile by one frame and reports whether it is still active.
    pub fn advance_frame(&mut self, frame: Duration) -> bool {
        if self.never_expires() {
            return true;
        }
        decay(&mut self.time_limit, frame)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coin {} value={} ", self.position, self.value)?;
        if self.never_expires() {
            f.write_str("ttl=never")
        } else {
            write!(f, "ttl={}ms", self.time_limit.as_millis())
        }
    }
}

/// Health pickup with a limited lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LifePack {
    /// Cell holding the pack.
    pub position: GridPosition,
    /// Remaining lifetime of the pack.
    pub time_limit: Duration,
}

impl LifePack {
    /// Creates a life pack.
    #[must_use]
    pub const fn new(position: GridPosition, time_limit: Duration) -> Self {
        Self {
            position,
            time_limit,
        }
    }

    /// Reports whether the pack's lifetime ran out.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        self.time_limit.is_zero()
    }

    /// Decays the pack by one frame and reports whether it is still active.
    pub fn advance_frame(&mut self, frame: Duration) -> bool {
        decay(&mut self.time_limit, frame)
    }
}

impl fmt::Display for LifePack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LifePack {} ttl={}ms",
            self.position,
            self.time_limit.as_millis()
        )
    }
}

fn decay(time_limit: &mut Duration, frame: Duration) -> bool {
    *time_limit = time_limit.saturating_sub(frame);
    !time_limit.is_zero()
}

/// Static layout of the non-movable map geometry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapDetails {
    /// Number of cells along each edge of the square map.
    pub size: u32,
    /// Cells initially holding bricks.
    #[serde(default)]
    pub bricks: Vec<GridPosition>,
    /// Cells holding indestructible stone.
    #[serde(default)]
    pub stones: Vec<GridPosition>,
    /// Cells holding water, fatal to enter.
    #[serde(default)]
    pub water: Vec<GridPosition>,
}

impl MapDetails {
    /// Creates an empty map of the provided edge length.
    #[must_use]
    pub const fn new(size: u32) -> Self {
        Self {
            size,
            bricks: Vec::new(),
            stones: Vec::new(),
            water: Vec::new(),
        }
    }

    /// Reports whether the cell lies on the map.
    #[must_use]
    pub const fn contains(&self, position: GridPosition) -> bool {
        position.x() < self.size && position.y() < self.size
    }
}

impl fmt::Display for MapDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{0}x{0}", self.size)?;
        write_cells(f, "bricks", &self.bricks)?;
        write_cells(f, "stones", &self.stones)?;
        write_cells(f, "water", &self.water)
    }
}

fn write_cells(f: &mut fmt::Formatter<'_>, label: &str, cells: &[GridPosition]) -> fmt::Result {
    write!(f, " {label}=[")?;
    for (index, cell) in cells.iter().enumerate() {
        if index > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{cell}")?;
    }
    f.write_str("]")
}

/// Rule violations the server reports against this client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NegativeHonourReason {
    /// The requested move runs into an obstacle.
    Obstacle,
    /// The requested cell is occupied by another tank.
    CellOccupied,
    /// The tank is dead and cannot act.
    Dead,
    /// More than one command was sent within a single frame.
    TooQuick,
    /// The requested cell lies outside the map.
    InvalidCell,
    /// The match already ended.
    GameHasFinished,
    /// The match has not started yet.
    GameNotStartedYet,
    /// The client is not registered as a contestant.
    NotAValidContestant,
    /// The tank drove into water.
    Pitfall,
}

impl NegativeHonourReason {
    /// Every reason in declaration order.
    pub const ALL: [NegativeHonourReason; 9] = [
        Self::Obstacle,
        Self::CellOccupied,
        Self::Dead,
        Self::TooQuick,
        Self::InvalidCell,
        Self::GameHasFinished,
        Self::GameNotStartedYet,
        Self::NotAValidContestant,
        Self::Pitfall,
    ];

    /// Textual code used by the server for the reason.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Obstacle => "OBSTACLE",
            Self::CellOccupied => "CELL_OCCUPIED",
            Self::Dead => "DEAD",
            Self::TooQuick => "TOO_QUICK",
            Self::InvalidCell => "INVALID_CELL",
            Self::GameHasFinished => "GAME_HAS_FINISHED",
            Self::GameNotStartedYet => "GAME_NOT_STARTED_YET",
            Self::NotAValidContestant => "NOT_A_VALID_CONTESTANT",
            Self::Pitfall => "PITFALL",
        }
    }
}

impl fmt::Display for NegativeHonourReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for NegativeHonourReason {
    type Err = UnknownHonourCode;

    /// Parses a server code, ignoring a trailing `#` terminator and any
    /// `;`-separated payload.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let code = value
            .trim()
            .trim_end_matches('#')
            .split(';')
            .next()
            .unwrap_or("");
        Self::ALL
            .into_iter()
            .find(|reason| reason.code() == code)
            .ok_or_else(|| UnknownHonourCode(value.trim().to_owned()))
    }
}

/// Error returned when a server code names no known honour reason.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown negative honour code `{0}`")]
pub struct UnknownHonourCode(pub String);

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn player_dies_at_zero_health() {
        let mut player = Player::new("P0", 0, GridPosition::new(1, 2));
        assert!(!player.is_dead());

        player.health = 0;
        assert!(player.is_dead());

        player.health = -10;
        assert!(player.is_dead());
    }

    #[test]
    fn coin_expires_after_its_time_limit() {
        let frame = Duration::from_secs(1);
        let mut coin = Coin::new(GridPosition::new(3, 3), 50, Duration::from_secs(2));

        assert!(coin.advance_frame(frame));
        assert_eq!(coin.time_limit, Duration::from_secs(1));
        assert!(!coin.advance_frame(frame));
        assert!(coin.is_expired());
    }

    #[test]
    fn partial_frame_leftover_still_counts_as_alive() {
        let mut coin = Coin::new(GridPosition::new(0, 0), 1, Duration::from_millis(1500));
        assert!(coin.advance_frame(Duration::from_secs(1)));
        assert!(!coin.advance_frame(Duration::from_secs(1)));
        assert!(coin.time_limit.is_zero());
    }

    #[test]
    fn death_drop_coin_never_decays() {
        let mut player = Player::new("P1", 1, GridPosition::new(4, 7));
        player.coins = 320;

        let mut coin = Coin::death_drop(&player);
        assert_eq!(coin.position, GridPosition::new(4, 7));
        assert_eq!(coin.value, 320);
        assert!(coin.never_expires());

        for _ in 0..1_000 {
            assert!(coin.advance_frame(Duration::from_secs(60)));
        }
        assert_eq!(coin.time_limit, Coin::NEVER_EXPIRES);
    }

    #[test]
    fn life_pack_decays_to_zero() {
        let mut pack = LifePack::new(GridPosition::new(2, 2), Duration::from_millis(500));
        assert!(!pack.advance_frame(Duration::from_secs(1)));
        assert!(pack.is_expired());
    }

    #[test]
    fn brick_destroyed_at_max_damage() {
        let mut brick = Brick::new(GridPosition::new(5, 5));
        assert!(!brick.is_destroyed());
        assert_eq!(brick.to_string(), "Brick (5,5) damage=0%");

        brick.damage_level = 3;
        assert_eq!(brick.to_string(), "Brick (5,5) damage=75%");

        brick.damage_level = MAX_BRICK_DAMAGE;
        assert!(brick.is_destroyed());
    }

    #[test]
    fn honour_codes_parse_with_server_terminators() {
        assert_eq!(
            "TOO_QUICK#".parse::<NegativeHonourReason>(),
            Ok(NegativeHonourReason::TooQuick)
        );
        assert_eq!(
            " OBSTACLE;25# ".parse::<NegativeHonourReason>(),
            Ok(NegativeHonourReason::Obstacle)
        );
        for reason in NegativeHonourReason::ALL {
            assert_eq!(reason.code().parse::<NegativeHonourReason>(), Ok(reason));
        }
    }

    #[test]
    fn unknown_honour_code_is_rejected() {
        let error = "SPEEDING#"
            .parse::<NegativeHonourReason>()
            .expect_err("unknown code must fail");
        assert_eq!(error, UnknownHonourCode("SPEEDING#".to_owned()));
        assert_eq!(error.to_string(), "unknown negative honour code `SPEEDING#`");
    }

    #[test]
    fn honour_reason_round_trips_through_bincode() {
        assert_round_trip(&NegativeHonourReason::NotAValidContestant);
    }

    #[test]
    fn event_kind_matches_variant() {
        let player = Player::new("P2", 2, GridPosition::new(0, 0));
        assert_eq!(Event::FrameAdvanced.kind(), EventKind::FrameAdvanced);
        assert_eq!(Event::PlayerDied { player }.kind(), EventKind::PlayerDied);
        assert_eq!(
            Event::NegativeHonour {
                reason: NegativeHonourReason::Pitfall
            }
            .kind(),
            EventKind::NegativeHonour
        );
    }

    #[test]
    fn map_display_lists_geometry() {
        let mut map = MapDetails::new(10);
        map.bricks = vec![GridPosition::new(1, 2), GridPosition::new(3, 4)];
        map.water = vec![GridPosition::new(9, 9)];

        assert_eq!(
            map.to_string(),
            "10x10 bricks=[(1,2) (3,4)] stones=[] water=[(9,9)]"
        );
        assert!(map.contains(GridPosition::new(9, 0)));
        assert!(!map.contains(GridPosition::new(10, 0)));
    }
}
