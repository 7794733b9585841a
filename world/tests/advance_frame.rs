use std::{
    cell::RefCell,
    panic::{self, AssertUnwindSafe},
    rc::Rc,
    time::Duration,
};

use tankfield_core::{Coin, Command, Event, EventKind, GridPosition, LifePack, Player};
use tankfield_world::{self as world, query, Config, EventBus, World};

fn world_with_roster(players: Vec<Player>) -> World {
    let mut world = World::new(Config::new(Duration::from_secs(1)));
    let mut events: Vec<Event> = Vec::new();
    world::apply(&mut world, Command::SetRoster { players }, &mut events).expect("roster");
    world
}

fn dead(name: &str, number: usize, position: GridPosition, coins: u32) -> Player {
    let mut player = Player::new(name, number, position);
    player.health = 0;
    player.coins = coins;
    player
}

#[test]
fn dead_player_scenario_fires_once_and_drops_one_coin() {
    let player_a = dead("PlayerA", 0, GridPosition::new(1, 2), 5);
    let mut world = world_with_roster(vec![player_a.clone()]);

    let mut first: Vec<Event> = Vec::new();
    world::advance_frame(&mut world, &mut first);

    let deaths: Vec<&Event> = first
        .iter()
        .filter(|event| event.kind() == EventKind::PlayerDied)
        .collect();
    assert_eq!(
        deaths,
        [&Event::PlayerDied {
            player: player_a.clone()
        }]
    );

    let coins = query::coins(&world);
    assert_eq!(coins.len(), 1);
    assert_eq!(coins[0].value, 5);
    assert_eq!(coins[0].position, GridPosition::new(1, 2));
    assert_eq!(coins[0].time_limit, Coin::NEVER_EXPIRES);

    let mut second: Vec<Event> = Vec::new();
    world::advance_frame(&mut world, &mut second);

    assert_eq!(second, vec![Event::FrameAdvanced]);
    assert_eq!(query::coins(&world).len(), 1);
}

#[test]
fn death_is_recognised_at_most_once_over_many_frames() {
    let mut world = world_with_roster(vec![
        dead("P0", 0, GridPosition::new(0, 0), 10),
        Player::new("P1", 1, GridPosition::new(5, 5)),
    ]);

    let mut events: Vec<Event> = Vec::new();
    for _ in 0..25 {
        world::advance_frame(&mut world, &mut events);
    }

    let frames = events
        .iter()
        .filter(|event| **event == Event::FrameAdvanced)
        .count();
    let deaths = events
        .iter()
        .filter(|event| event.kind() == EventKind::PlayerDied)
        .count();
    assert_eq!(frames, 25);
    assert_eq!(deaths, 1);
    assert_eq!(query::coins(&world).len(), 1);
}

#[test]
fn frame_advanced_precedes_death_notifications() {
    let mut world = world_with_roster(vec![
        dead("P0", 0, GridPosition::new(0, 0), 1),
        dead("P1", 1, GridPosition::new(1, 0), 2),
    ]);

    let mut events: Vec<Event> = Vec::new();
    world::advance_frame(&mut world, &mut events);

    let kinds: Vec<EventKind> = events.iter().map(Event::kind).collect();
    assert_eq!(
        kinds,
        [
            EventKind::FrameAdvanced,
            EventKind::PlayerDied,
            EventKind::PlayerDied
        ]
    );
}

#[test]
fn player_dying_on_a_later_frame_drops_purse_from_that_moment() {
    let mut world = world_with_roster(vec![Player::new("P0", 0, GridPosition::new(2, 2))]);
    let mut events: Vec<Event> = Vec::new();
    world::advance_frame(&mut world, &mut events);
    assert!(query::coins(&world).is_empty());

    let mut hit = dead("P0", 0, GridPosition::new(3, 2), 250);
    hit.points = 40;
    world::apply(
        &mut world,
        Command::UpdatePlayer {
            number: 0,
            player: hit.clone(),
        },
        &mut events,
    )
    .expect("update");

    world::advance_frame(&mut world, &mut events);

    assert_eq!(query::coins(&world), &[Coin::death_drop(&hit)]);
    assert!(events.contains(&Event::PlayerDied { player: hit }));
}

#[test]
fn revived_record_does_not_trigger_a_second_death() {
    let mut world = world_with_roster(vec![dead("P0", 0, GridPosition::new(0, 0), 3)]);
    let mut events: Vec<Event> = Vec::new();
    world::advance_frame(&mut world, &mut events);

    world::apply(
        &mut world,
        Command::UpdatePlayer {
            number: 0,
            player: Player::new("P0", 0, GridPosition::new(0, 0)),
        },
        &mut events,
    )
    .expect("update");
    world::advance_frame(&mut world, &mut events);

    world::apply(
        &mut world,
        Command::UpdatePlayer {
            number: 0,
            player: dead("P0", 0, GridPosition::new(4, 4), 9),
        },
        &mut events,
    )
    .expect("update");
    world::advance_frame(&mut world, &mut events);

    let deaths = events
        .iter()
        .filter(|event| event.kind() == EventKind::PlayerDied)
        .count();
    assert_eq!(deaths, 1);
    assert_eq!(query::coins(&world).len(), 1);
}

#[test]
fn expired_life_pack_is_not_decayed_again() {
    let mut world = World::new(Config::new(Duration::from_millis(500)));
    let mut events: Vec<Event> = Vec::new();
    for (seconds, x) in [(1, 0), (3, 1)] {
        world::apply(
            &mut world,
            Command::AddLifePack {
                life_pack: LifePack::new(GridPosition::new(x, 0), Duration::from_secs(seconds)),
            },
            &mut events,
        )
        .expect("life pack");
    }

    world::advance_frame(&mut world, &mut events);
    assert_eq!(query::life_packs(&world).len(), 2);

    world::advance_frame(&mut world, &mut events);
    let remaining = query::life_packs(&world);
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].position, GridPosition::new(1, 0));
    assert_eq!(remaining[0].time_limit, Duration::from_secs(2));

    world::advance_frame(&mut world, &mut events);
    assert_eq!(query::life_packs(&world)[0].time_limit, Duration::from_millis(1500));
}

#[test]
fn server_coins_expire_but_death_drops_persist() {
    let mut world = world_with_roster(vec![dead("P0", 0, GridPosition::new(6, 6), 77)]);
    let mut events: Vec<Event> = Vec::new();
    world::apply(
        &mut world,
        Command::AddCoin {
            coin: Coin::new(GridPosition::new(1, 1), 500, Duration::from_secs(2)),
        },
        &mut events,
    )
    .expect("coin");

    for _ in 0..5 {
        world::advance_frame(&mut world, &mut events);
    }

    let coins = query::coins(&world);
    assert_eq!(coins.len(), 1);
    assert_eq!(coins[0].value, 77);
    assert!(coins[0].never_expires());
}

#[test]
fn frame_unlocks_input_before_observers_run() {
    let mut world = World::default();
    let mut bus = EventBus::new();
    let observed = Rc::new(RefCell::new(Vec::new()));

    let log = Rc::clone(&observed);
    let _ = bus.on_frame_advanced(move |sender| log.borrow_mut().push(query::input_allowed(sender)));

    assert!(!query::input_allowed(&world));
    world::advance_frame(&mut world, &mut bus);

    assert_eq!(*observed.borrow(), [true]);
}

#[test]
fn death_observer_sees_drop_coin_already_added() {
    let player = dead("P0", 0, GridPosition::new(8, 1), 12);
    let mut world = world_with_roster(vec![player.clone()]);
    let mut bus = EventBus::new();
    let observed = Rc::new(RefCell::new(Vec::new()));

    let log = Rc::clone(&observed);
    let _ = bus.on_player_died(move |sender, died| {
        log.borrow_mut()
            .push((died.name.clone(), query::coins(sender).to_vec()));
    });

    world::advance_frame(&mut world, &mut bus);

    assert_eq!(
        *observed.borrow(),
        [("P0".to_owned(), vec![Coin::death_drop(&player)])]
    );
    assert!(query::is_recorded_dead(&world, "P0"));
}

#[test]
fn panicking_observer_abandons_the_rest_of_the_frame() {
    let first = dead("A", 0, GridPosition::new(0, 0), 4);
    let mut world = world_with_roster(vec![first.clone(), dead("B", 1, GridPosition::new(2, 2), 6)]);
    let mut bus = EventBus::new();
    let _ = bus.on_player_died(|_, player| panic!("observer failed on {}", player.name));

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        world::advance_frame(&mut world, &mut bus);
    }));

    assert!(outcome.is_err());
    assert!(query::is_recorded_dead(&world, "A"));
    assert!(!query::is_recorded_dead(&world, "B"));
    assert_eq!(query::coins(&world), &[Coin::death_drop(&first)]);
}
