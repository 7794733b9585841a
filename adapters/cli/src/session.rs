//! Tick driver owning one world and its event bus.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use anyhow::{Context, Result};
use tankfield_core::{Command, EventKind};
use tankfield_world::{self as world, query, EventBus, World};
use tracing::{debug, info, warn};

use crate::scenario::Scenario;

/// Number of events observed per kind.
pub(crate) type Tally = BTreeMap<EventKind, u64>;

/// A single match replayed against an explicitly owned world.
pub(crate) struct Session {
    world: World,
    bus: EventBus,
    tally: Rc<RefCell<Tally>>,
}

impl Session {
    /// Creates a session and subscribes its logging and counting observers.
    pub(crate) fn new(scenario: &Scenario) -> Self {
        let mut bus = EventBus::new();
        let tally = Rc::new(RefCell::new(
            EventKind::ALL.into_iter().map(|kind| (kind, 0)).collect::<Tally>(),
        ));

        let counter = Rc::clone(&tally);
        let _ = bus.on_frame_advanced(move |sender| {
            bump(&counter, EventKind::FrameAdvanced);
            debug!(
                frame = query::frame_index(sender),
                coins = query::coins(sender).len(),
                life_packs = query::life_packs(sender).len(),
                "frame"
            );
        });

        let counter = Rc::clone(&tally);
        let _ = bus.on_game_started(move |sender| {
            bump(&counter, EventKind::GameStarted);
            info!(players = query::players(sender).len(), "game started");
        });

        let counter = Rc::clone(&tally);
        let _ = bus.on_game_finished(move |sender| {
            bump(&counter, EventKind::GameFinished);
            info!(frame = query::frame_index(sender), "game finished");
        });

        let counter = Rc::clone(&tally);
        let _ = bus.on_player_died(move |sender, player| {
            bump(&counter, EventKind::PlayerDied);
            let mine = query::my_player_number(sender) == player.number;
            info!(player = %player.name, mine, coins = player.coins, "tank destroyed");
        });

        let counter = Rc::clone(&tally);
        let _ = bus.on_negative_honour(move |_, reason| {
            bump(&counter, EventKind::NegativeHonour);
            warn!(%reason, "server rejected the last move");
        });

        Self {
            world: World::new(scenario.config()),
            bus,
            tally,
        }
    }

    /// Loads the initial world contents.
    pub(crate) fn setup(&mut self, scenario: &Scenario) -> Result<()> {
        for command in scenario.setup_commands() {
            self.apply(command).context("failed to set up the world")?;
        }
        Ok(())
    }

    /// Delivers the scripted traffic for `tick` and then advances one frame.
    pub(crate) fn step(&mut self, scenario: &Scenario, tick: u64) -> Result<()> {
        let current = &self.world;
        let commands = scenario.commands_for_tick(tick, |number| query::player(current, number))?;
        for command in commands {
            self.apply(command)
                .with_context(|| format!("failed to apply scripted traffic for tick {tick}"))?;
        }

        world::advance_frame(&mut self.world, &mut self.bus);
        Ok(())
    }

    fn apply(&mut self, command: Command) -> Result<(), world::WorldError> {
        world::apply(&mut self.world, command, &mut self.bus)
    }

    /// World owned by the session.
    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    /// Snapshot of the per-kind event counts.
    pub(crate) fn tally(&self) -> Tally {
        self.tally.borrow().clone()
    }
}

fn bump(tally: &RefCell<Tally>, kind: EventKind) {
    *tally.borrow_mut().entry(kind).or_insert(0) += 1;
}
