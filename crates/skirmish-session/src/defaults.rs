//! Replies the server picks on a seat's behalf.

use rand::Rng;
use skirmish_logic::{Reply, Request};
use skirmish_rules::{Action, HandSign, UpgradeKind};

/// The reply used when a seat times out, disconnects, is untrusted, or
/// sends something unusable.
///
/// - hand sign: uniformly random
/// - order claim: the open slots in the order offered, up to the tokens
/// - action: pass
/// - upgrade: every point on max HP
///
/// The upgrade default can overshoot the max-HP ceiling; the room falls
/// back to the state machine's own fitting upgrades when it is rejected.
pub fn default_reply(request: &Request) -> Reply {
    match request {
        Request::HandSign => {
            let index = rand::rng().random_range(0..HandSign::ALL.len());
            Reply::HandSign(HandSign::ALL[index])
        }
        Request::OrderClaim { open_slots, tokens } => {
            Reply::OrderClaim(open_slots.iter().take(*tokens).copied().collect())
        }
        Request::Action => Reply::Action(Action::Pass),
        Request::Upgrade { points } => Reply::Upgrade(vec![UpgradeKind::MaxHp; *points as usize]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_reply_hand_sign_is_one_of_three() {
        for _ in 0..32 {
            let Reply::HandSign(sign) = default_reply(&Request::HandSign) else {
                panic!("expected a hand sign");
            };
            assert!(HandSign::ALL.contains(&sign));
        }
    }

    #[test]
    fn test_default_reply_order_claim_takes_offered_slots_up_to_tokens() {
        let request = Request::OrderClaim {
            open_slots: vec![2, 3, 4],
            tokens: 2,
        };
        assert_eq!(default_reply(&request), Reply::OrderClaim(vec![2, 3]));
    }

    #[test]
    fn test_default_reply_order_claim_with_spare_tokens_takes_all() {
        let request = Request::OrderClaim {
            open_slots: vec![4],
            tokens: 3,
        };
        assert_eq!(default_reply(&request), Reply::OrderClaim(vec![4]));
    }

    #[test]
    fn test_default_reply_action_is_pass() {
        assert_eq!(default_reply(&Request::Action), Reply::Action(Action::Pass));
    }

    #[test]
    fn test_default_reply_upgrade_spends_all_on_max_hp() {
        assert_eq!(
            default_reply(&Request::Upgrade { points: 3 }),
            Reply::Upgrade(vec![UpgradeKind::MaxHp; 3])
        );
    }
}
