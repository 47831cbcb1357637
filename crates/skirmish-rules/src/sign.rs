//! Hand signs and the tie-break that decides who claims action slots.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the three hand signs shown in a tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandSign {
    Stone,
    Scissors,
    Cloth,
}

impl HandSign {
    pub const ALL: [HandSign; 3] = [Self::Stone, Self::Scissors, Self::Cloth];

    /// Stone beats Scissors, Scissors beats Cloth, Cloth beats Stone.
    pub fn beats(self, other: HandSign) -> bool {
        matches!(
            (self, other),
            (Self::Stone, Self::Scissors)
                | (Self::Scissors, Self::Cloth)
                | (Self::Cloth, Self::Stone)
        )
    }
}

impl fmt::Display for HandSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stone => "stone",
            Self::Scissors => "scissors",
            Self::Cloth => "cloth",
        };
        f.write_str(name)
    }
}

/// A decided tie-break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandOutcome {
    /// Players who showed the dominant sign, in submission order.
    pub winners: Vec<String>,
    /// Players who showed the beaten sign, in submission order.
    pub losers: Vec<String>,
}

impl HandOutcome {
    /// Claim tokens granted to each winner: one per loser.
    pub fn tokens(&self) -> usize {
        self.losers.len()
    }
}

/// Resolves one round of hand signs.
///
/// Returns `None` when the signs do not reduce to exactly two distinct
/// values (everyone agreed, or all three were shown).
pub fn resolve_hands(hands: &[(String, HandSign)]) -> Option<HandOutcome> {
    let shown: BTreeSet<HandSign> = hands.iter().map(|(_, sign)| *sign).collect();
    let mut distinct = shown.into_iter();
    let (a, b) = match (distinct.next(), distinct.next(), distinct.next()) {
        (Some(a), Some(b), None) => (a, b),
        _ => return None,
    };
    let (winning, losing) = if a.beats(b) { (a, b) } else { (b, a) };

    let pick = |sign: HandSign| {
        hands
            .iter()
            .filter(|(_, s)| *s == sign)
            .map(|(name, _)| name.clone())
            .collect::<Vec<_>>()
    };
    Some(HandOutcome {
        winners: pick(winning),
        losers: pick(losing),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hands(list: &[(&str, HandSign)]) -> Vec<(String, HandSign)> {
        list.iter().map(|(n, s)| (n.to_string(), *s)).collect()
    }

    #[test]
    fn test_beats_cycle() {
        assert!(HandSign::Stone.beats(HandSign::Scissors));
        assert!(HandSign::Scissors.beats(HandSign::Cloth));
        assert!(HandSign::Cloth.beats(HandSign::Stone));
        for sign in HandSign::ALL {
            assert!(!sign.beats(sign));
        }
    }

    #[test]
    fn test_resolve_hands_two_signs_picks_dominant() {
        use HandSign::*;
        let outcome = resolve_hands(&hands(&[
            ("a", Stone),
            ("b", Stone),
            ("c", Scissors),
            ("d", Scissors),
        ]))
        .unwrap();
        assert_eq!(outcome.winners, vec!["a", "b"]);
        assert_eq!(outcome.losers, vec!["c", "d"]);
        assert_eq!(outcome.tokens(), 2);
    }

    #[test]
    fn test_resolve_hands_cloth_beats_stone() {
        use HandSign::*;
        let outcome = resolve_hands(&hands(&[("a", Stone), ("b", Cloth), ("c", Stone)])).unwrap();
        assert_eq!(outcome.winners, vec!["b"]);
        assert_eq!(outcome.losers, vec!["a", "c"]);
        assert_eq!(outcome.tokens(), 2);
    }

    #[test]
    fn test_resolve_hands_three_signs_is_none() {
        use HandSign::*;
        assert!(
            resolve_hands(&hands(&[
                ("a", Stone),
                ("b", Scissors),
                ("c", Cloth),
                ("d", Stone)
            ]))
            .is_none()
        );
    }

    #[test]
    fn test_resolve_hands_all_same_is_none() {
        use HandSign::*;
        assert!(resolve_hands(&hands(&[("a", Cloth), ("b", Cloth)])).is_none());
    }

    #[test]
    fn test_resolve_hands_empty_is_none() {
        assert!(resolve_hands(&[]).is_none());
    }

    #[test]
    fn test_hand_sign_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&HandSign::Scissors).unwrap(),
            "\"scissors\""
        );
        let sign: HandSign = serde_json::from_str("\"cloth\"").unwrap();
        assert_eq!(sign, HandSign::Cloth);
    }
}
