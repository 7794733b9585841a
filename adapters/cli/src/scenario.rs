//! Scripted match description loaded from TOML.

use std::{collections::BTreeSet, fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;
use tankfield_core::{
    Brick, Coin, Command, Direction, GridPosition, LifePack, MapDetails, NegativeHonourMessage,
    Player, UnknownHonourCode, WorldState,
};
use tankfield_world::Config;

const DEFAULT_FRAME_MILLIS: u64 = 1_000;

/// Problems detected while validating a scenario after it parsed.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ScenarioError {
    /// Frames must cover some simulated time.
    #[error("frame_millis must be greater than zero")]
    ZeroFrameLength,
    /// Ticks are numbered from one.
    #[error("script entry uses tick 0, ticks are numbered from 1")]
    TickZero,
    /// Two roster entries share a name.
    #[error("player `{0}` is listed more than once")]
    DuplicatePlayer(String),
    /// A script entry carried a code the server never sends.
    #[error("tick {tick}: invalid honour code")]
    Honour {
        /// Tick of the offending entry.
        tick: u64,
        /// Parser failure.
        #[source]
        source: UnknownHonourCode,
    },
    /// A script entry updates a player that is not in the roster.
    #[error("tick {tick}: player {number} is not in the roster of {roster_size}")]
    UnknownPlayer {
        /// Tick of the offending entry.
        tick: u64,
        /// Player number named by the entry.
        number: usize,
        /// Number of players in the roster.
        roster_size: usize,
    },
}

/// A whole match: initial world contents plus per-tick server traffic.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    #[serde(default = "default_frame_millis")]
    frame_millis: u64,
    #[serde(default)]
    my_player_number: usize,
    #[serde(default)]
    map: Option<MapDetails>,
    #[serde(default)]
    players: Vec<PlayerEntry>,
    #[serde(default)]
    bricks: Vec<Brick>,
    #[serde(default)]
    coins: Vec<CoinEntry>,
    #[serde(default)]
    life_packs: Vec<LifePackEntry>,
    #[serde(default)]
    script: Vec<ScriptEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlayerEntry {
    name: String,
    position: GridPosition,
    #[serde(default)]
    direction: Direction,
    #[serde(default)]
    health: Option<i32>,
    #[serde(default)]
    coins: u32,
    #[serde(default)]
    points: u32,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CoinEntry {
    position: GridPosition,
    value: u32,
    ttl_millis: u64,
}

impl CoinEntry {
    fn to_coin(self) -> Coin {
        Coin::new(
            self.position,
            self.value,
            Duration::from_millis(self.ttl_millis),
        )
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LifePackEntry {
    position: GridPosition,
    ttl_millis: u64,
}

impl LifePackEntry {
    fn to_life_pack(self) -> LifePack {
        LifePack::new(self.position, Duration::from_millis(self.ttl_millis))
    }
}

/// Server traffic delivered before the frame numbered `tick` advances.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptEntry {
    tick: u64,
    #[serde(default)]
    state: Option<WorldState>,
    #[serde(default)]
    update: Option<PlayerUpdate>,
    #[serde(default)]
    bricks: Option<Vec<Brick>>,
    #[serde(default)]
    coin: Option<CoinEntry>,
    #[serde(default)]
    life_pack: Option<LifePackEntry>,
    #[serde(default)]
    honour: Option<String>,
}

/// Partial player record; missing fields keep the current value.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlayerUpdate {
    number: usize,
    #[serde(default)]
    position: Option<GridPosition>,
    #[serde(default)]
    direction: Option<Direction>,
    #[serde(default)]
    health: Option<i32>,
    #[serde(default)]
    coins: Option<u32>,
    #[serde(default)]
    points: Option<u32>,
    #[serde(default)]
    is_shot: Option<bool>,
}

impl PlayerUpdate {
    fn patch(&self, current: &Player) -> Player {
        let mut player = current.clone();
        if let Some(position) = self.position {
            player.position = position;
        }
        if let Some(direction) = self.direction {
            player.direction = direction;
        }
        if let Some(health) = self.health {
            player.health = health;
        }
        if let Some(coins) = self.coins {
            player.coins = coins;
        }
        if let Some(points) = self.points {
            player.points = points;
        }
        player.is_shot = self.is_shot.unwrap_or(false);
        player
    }
}

const fn default_frame_millis() -> u64 {
    DEFAULT_FRAME_MILLIS
}

impl Scenario {
    /// Reads and validates the scenario stored at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid scenario at {}", path.display()))
    }

    /// Parses and validates a scenario from TOML text.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let scenario: Self =
            toml::from_str(contents).context("failed to parse scenario toml contents")?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        if self.frame_millis == 0 {
            return Err(ScenarioError::ZeroFrameLength);
        }

        let mut names = BTreeSet::new();
        for entry in &self.players {
            if !names.insert(entry.name.as_str()) {
                return Err(ScenarioError::DuplicatePlayer(entry.name.clone()));
            }
        }

        let roster_size = self.players.len();
        for entry in &self.script {
            if entry.tick == 0 {
                return Err(ScenarioError::TickZero);
            }
            if let Some(code) = &entry.honour {
                let _ = parse_honour(entry.tick, code)?;
            }
            if let Some(update) = &entry.update {
                if update.number >= roster_size {
                    return Err(ScenarioError::UnknownPlayer {
                        tick: entry.tick,
                        number: update.number,
                        roster_size,
                    });
                }
            }
        }
        Ok(())
    }

    /// World configuration derived from the scenario.
    pub(crate) fn config(&self) -> Config {
        Config::new(Duration::from_millis(self.frame_millis))
    }

    /// Last tick that carries scripted traffic, or one for an empty script.
    pub(crate) fn last_tick(&self) -> u64 {
        self.script
            .iter()
            .map(|entry| entry.tick)
            .max()
            .unwrap_or(1)
    }

    /// Commands that populate the world before the first frame.
    pub(crate) fn setup_commands(&self) -> Vec<Command> {
        let mut commands = Vec::new();
        if let Some(map) = &self.map {
            commands.push(Command::ConfigureMap { map: map.clone() });
        }

        let players = self
            .players
            .iter()
            .enumerate()
            .map(|(number, entry)| {
                let mut player = Player::new(entry.name.clone(), number, entry.position);
                player.direction = entry.direction;
                player.coins = entry.coins;
                player.points = entry.points;
                if let Some(health) = entry.health {
                    player.health = health;
                }
                player
            })
            .collect();
        commands.push(Command::SetRoster { players });
        commands.push(Command::SetMyPlayerNumber {
            number: self.my_player_number,
        });

        if !self.bricks.is_empty() {
            commands.push(Command::SetBrickState {
                bricks: self.bricks.clone(),
            });
        }
        commands.extend(
            self.coins
                .iter()
                .map(|entry| Command::AddCoin {
                    coin: entry.to_coin(),
                }),
        );
        commands.extend(self.life_packs.iter().map(|entry| Command::AddLifePack {
            life_pack: entry.to_life_pack(),
        }));
        commands
    }

    /// Commands delivered before frame `tick` advances.
    ///
    /// Player updates are patched onto the record returned by `lookup`, which
    /// reflects the world as it stands when the tick begins.
    pub(crate) fn commands_for_tick<'w>(
        &self,
        tick: u64,
        lookup: impl Fn(usize) -> Option<&'w Player>,
    ) -> Result<Vec<Command>, ScenarioError> {
        let mut commands = Vec::new();
        for entry in self.script.iter().filter(|entry| entry.tick == tick) {
            if let Some(update) = &entry.update {
                let current = lookup(update.number).ok_or(ScenarioError::UnknownPlayer {
                    tick,
                    number: update.number,
                    roster_size: self.players.len(),
                })?;
                commands.push(Command::UpdatePlayer {
                    number: update.number,
                    player: update.patch(current),
                });
            }
            if let Some(bricks) = &entry.bricks {
                commands.push(Command::SetBrickState {
                    bricks: bricks.clone(),
                });
            }
            if let Some(coin) = entry.coin {
                commands.push(Command::AddCoin {
                    coin: coin.to_coin(),
                });
            }
            if let Some(life_pack) = entry.life_pack {
                commands.push(Command::AddLifePack {
                    life_pack: life_pack.to_life_pack(),
                });
            }
            if let Some(code) = &entry.honour {
                commands.push(parse_honour(tick, code)?.into());
            }
            if let Some(state) = entry.state {
                commands.push(Command::TransitionTo { state });
            }
        }
        Ok(commands)
    }
}

fn parse_honour(tick: u64, code: &str) -> Result<NegativeHonourMessage, ScenarioError> {
    code.parse()
        .map_err(|source| ScenarioError::Honour { tick, source })
}
