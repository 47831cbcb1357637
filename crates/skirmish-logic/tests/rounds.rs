//! Drives whole rounds through the public pull API with scripted players.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use skirmish_logic::{Broadcast, Logic, Phase, Reply, Request, Transition};
use skirmish_rules::{Action, HandSign, Place, RuleConfig, UpgradeKind};

/// A player that fights as soon as it can: buy a weapon at home, walk to
/// the hub, hit whoever is there.
fn bot_reply(logic: &Logic, player: &str, request: &Request, pool_leader: &str) -> Reply {
    match request {
        // The first player of the pool always wins, so ordering terminates.
        Request::HandSign if player == pool_leader => Reply::HandSign(HandSign::Stone),
        Request::HandSign => Reply::HandSign(HandSign::Scissors),
        Request::OrderClaim { open_slots, tokens } => {
            Reply::OrderClaim(open_slots.iter().take(*tokens).copied().collect())
        }
        Request::Action => {
            let room = logic.room();
            let me = room.player(player).unwrap();
            let prey = room
                .alive_roster()
                .into_iter()
                .find(|p| p.name() != player && p.place() == me.place());
            let action = match prey {
                Some(prey) if me.has_weapon() => Action::AttackMelee {
                    target: prey.name().to_string(),
                },
                _ if !me.has_weapon() => Action::BuyWeapon,
                _ if !me.place().is_hub() => Action::Move {
                    place: Place::Country,
                },
                _ => Action::Pass,
            };
            Reply::Action(action)
        }
        Request::Upgrade { points } => {
            Reply::Upgrade(vec![UpgradeKind::Weapon; *points as usize])
        }
    }
}

/// Answers every outstanding request, falling back on refusal.
fn answer(logic: &mut Logic, t: &Transition) {
    let leader = t.requests.first().map(|(n, _)| n.clone()).unwrap_or_default();
    for (player, request) in &t.requests {
        let reply = bot_reply(logic, player, request, &leader);
        if logic.submit(player, reply).is_err() {
            logic.fallback(player).unwrap();
        }
    }
}

#[test]
fn test_bot_game_plays_rounds_with_consistent_order() {
    let config = RuleConfig {
        player_count: 3,
        start_hp: 4,
        melee_damage: 2,
        ..Default::default()
    };
    let mut logic = Logic::new(config).unwrap();
    for name in ["ann", "bob", "cid"] {
        logic.add_player(name).unwrap();
    }

    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    logic.observe(move |b| sink.lock().unwrap().push(b.clone()));

    let mut t = logic.start().unwrap();
    let mut steps = 0;
    while logic.round() < 4 && !logic.is_finished() {
        answer(&mut logic, &t);
        assert!(logic.is_ready());
        t = logic.advance().unwrap();
        steps += 1;
        assert!(steps < 10_000, "game made no progress");
    }

    let log = log.lock().unwrap();
    let mut rounds_over = 0;
    for broadcast in log.iter() {
        match broadcast {
            Broadcast::OrderConfirmed(confirmed) => {
                let distinct: BTreeSet<_> = confirmed.order.iter().collect();
                assert_eq!(distinct.len(), confirmed.order.len());
                assert!(confirmed.order.len() >= 2);
            }
            Broadcast::RoundOver(over) => {
                assert!(over.survivors.len() <= 1);
                rounds_over += 1;
            }
            _ => {}
        }
    }
    assert!(rounds_over >= 3);
}

#[test]
fn test_unanswered_requests_can_all_fall_back() {
    let mut logic = Logic::new(RuleConfig {
        player_count: 2,
        ..Default::default()
    })
    .unwrap();
    logic.add_player("ann").unwrap();
    logic.add_player("bob").unwrap();

    let t = logic.start().unwrap();
    for (player, _) in &t.requests {
        logic.fallback(player).unwrap();
    }
    // Both fell back to stone: a tie, asked again.
    let t = logic.advance().unwrap();
    assert_eq!(logic.phase(), Phase::TieBreakForOrder);
    assert_eq!(t.requests.len(), 2);
    assert!(logic.outstanding().all(|(_, r)| *r == Request::HandSign));
}
