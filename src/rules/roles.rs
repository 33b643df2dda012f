use super::Verdict;

/// Offensive/defensive role pointers for a 1v1 duel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Roles<P> {
    pub offensive: P,
    pub defensive: P,
}

/// Which side of the duel a player is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Offensive,
    Defensive,
}

/// Outcome of closing a round: who sets next and who picked up a letter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundClose<P> {
    pub roles: Roles<P>,
    pub letter_to: Option<P>,
}

impl<P: Copy + Eq> Roles<P> {
    pub fn new(offensive: P, defensive: P) -> Self {
        Self {
            offensive,
            defensive,
        }
    }
    pub fn swap(self) -> Self {
        Self {
            offensive: self.defensive,
            defensive: self.offensive,
        }
    }
    pub fn side(&self, player: P) -> Option<Side> {
        if player == self.offensive {
            Some(Side::Offensive)
        } else if player == self.defensive {
            Some(Side::Defensive)
        } else {
            None
        }
    }
    /// Close the round on the defender's call.
    ///
    /// LAND swaps roles and grants no letter. BAIL keeps roles as they are
    /// and pins a letter on the defender.
    pub fn judged(self, verdict: Verdict) -> RoundClose<P> {
        match verdict {
            Verdict::Landed => RoundClose {
                roles: self.swap(),
                letter_to: None,
            },
            Verdict::Missed => RoundClose {
                letter_to: Some(self.defensive),
                roles: self,
            },
        }
    }
    /// Close the round on the setter declaring their own attempt a bail.
    /// The setter earns the letter and roles swap.
    pub fn setter_bail(self) -> RoundClose<P> {
        RoundClose {
            letter_to: Some(self.offensive),
            roles: self.swap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P1: u8 = 1;
    const P2: u8 = 2;

    fn roles() -> Roles<u8> {
        Roles::new(P1, P2)
    }

    #[test]
    fn land_swaps_without_letter() {
        let close = roles().judged(Verdict::Landed);
        assert_eq!(close.roles, Roles::new(P2, P1));
        assert_eq!(close.letter_to, None);
    }
    #[test]
    fn bail_letters_defender_and_keeps_roles() {
        let close = roles().judged(Verdict::Missed);
        assert_eq!(close.roles, roles());
        assert_eq!(close.letter_to, Some(P2));
    }
    #[test]
    fn setter_bail_letters_setter_and_swaps() {
        let close = roles().setter_bail();
        assert_eq!(close.roles, Roles::new(P2, P1));
        assert_eq!(close.letter_to, Some(P1));
    }
    #[test]
    fn side_lookup() {
        assert_eq!(roles().side(P1), Some(Side::Offensive));
        assert_eq!(roles().side(P2), Some(Side::Defensive));
        assert_eq!(roles().side(3), None);
    }
}
