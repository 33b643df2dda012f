//! Pure S.K.A.T.E. rules.
//!
//! Everything in here is a total function over immutable values: letter
//! accretion, phase and sub-phase bookkeeping, role swaps after a judgment,
//! and setter rotation for the multi-player variant. No I/O, no clocks.
//!
//! - [`Letters`] — a player's board, always a prefix of "SKATE"
//! - [`Phase`] / [`TurnPhase`] — session lifecycle and round sub-phase
//! - [`Judgment`] / [`Verdict`] — pending vs final calls on a set trick
//! - [`Roles`] — offensive/defensive pointers and the swap rules
//! - [`rotation`] — eliminated-player skipping for live sessions

mod judgment;
mod letters;
mod phase;
mod roles;
pub mod rotation;

pub use judgment::*;
pub use letters::*;
pub use phase::*;
pub use roles::*;

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // boards stay prefixes of the word under any gain/strip sequence
        #[test]
        fn letters_stay_prefixes(steps in proptest::collection::vec(any::<bool>(), 0..32)) {
            let mut letters = Letters::NONE;
            for gain in steps {
                letters = match gain {
                    true => letters.gain(),
                    false => letters.strip(),
                };
                prop_assert!(WORD.starts_with(letters.as_str()));
                prop_assert!(letters.count() <= 5);
            }
        }

        // LAND always swaps and never letters; BAIL never swaps and
        // always letters the defender; setter-bail swaps and letters
        // the setter
        #[test]
        fn role_laws_hold(offensive in 0u8..8, defensive in 8u8..16, landed in any::<bool>()) {
            let roles = Roles::new(offensive, defensive);
            let verdict = match landed {
                true => Verdict::Landed,
                false => Verdict::Missed,
            };
            let close = roles.judged(verdict);
            match verdict {
                Verdict::Landed => {
                    prop_assert_eq!(close.roles, roles.swap());
                    prop_assert_eq!(close.letter_to, None);
                }
                Verdict::Missed => {
                    prop_assert_eq!(close.roles, roles);
                    prop_assert_eq!(close.letter_to, Some(defensive));
                }
            }
            let bail = roles.setter_bail();
            prop_assert_eq!(bail.roles, roles.swap());
            prop_assert_eq!(bail.letter_to, Some(offensive));
        }

        // the scan only ever lands on a survivor other than the origin,
        // and returns None exactly when no such slot exists
        #[test]
        fn rotation_lands_on_survivors(
            outs in proptest::collection::vec(any::<bool>(), 1..9),
            seed in any::<usize>(),
        ) {
            let from = seed % outs.len();
            match rotation::next_active(&outs, from) {
                Some(slot) => {
                    prop_assert!(slot != from);
                    prop_assert!(!outs[slot]);
                }
                None => {
                    prop_assert!(
                        outs.iter().enumerate().all(|(i, out)| *out || i == from)
                    );
                }
            }
        }
    }
}
