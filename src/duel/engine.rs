//! Pure transition engine for the async 1v1 duel.
//!
//! Each function validates one command against canonical state the gateway
//! re-read under the row lock, and returns the [`Transition`] to persist
//! plus the [`Effect`]s to emit after commit. Nothing here touches a clock,
//! a connection, or a socket; the scenario tests at the bottom drive whole
//! games through these functions directly.

use super::*;
use crate::ID;
use crate::Knobs;
use crate::TurnNumber;
use crate::Unique;
use crate::notify::Kind;
use crate::rooms::RoomKey;
use crate::rules::*;
use serde_json::json;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Open a challenge. The opponent's existence was checked by the caller
/// against the profile store.
pub fn create(
    id: ID<Game>,
    challenger: PlayerId,
    challenger_name: String,
    opponent: PlayerId,
    opponent_name: String,
    now: SystemTime,
) -> Result<Transition, Reject> {
    if challenger == opponent {
        return Err(Reject::SelfChallenge);
    }
    let name = challenger_name.clone();
    let game = Game::challenge(id, challenger, challenger_name, opponent, opponent_name, now);
    Ok(Transition::of(game).with_effect(Effect::notify(
        opponent,
        Kind::ChallengeReceived,
        json!({ "gameId": id, "opponentName": name }),
    )))
}

/// Accept or decline a pending challenge. Only the challenged player acts.
pub fn respond(
    mut game: Game,
    actor: PlayerId,
    accept: bool,
    now: SystemTime,
    knobs: &Knobs,
) -> Result<Transition, Reject> {
    if game.phase() != Phase::Pending {
        return Err(Reject::WrongPhase);
    }
    if !game.is_player(actor) {
        return Err(Reject::NotAPlayer);
    }
    if actor != game.player2().player {
        return Err(Reject::Forbidden);
    }
    if accept {
        let challenger = game.player1().player;
        let name = game.player2().name.clone();
        game.accept(now, knobs.turn_deadline);
        let state = state_payload(&game);
        let id = game.id();
        Ok(Transition::of(game)
            .with_effect(Effect::broadcast(RoomKey::battle(id), "game:update", state))
            .with_effect(Effect::notify(
                challenger,
                Kind::YourTurn,
                json!({ "gameId": id, "opponentName": name }),
            )))
    } else {
        game.decline(now);
        Ok(Transition::of(game))
    }
}

/// Record a take. In `set_trick` the offensive player opens the round; in
/// `respond_trick` the defensive player answers with their one take.
pub fn submit(
    mut game: Game,
    actor: PlayerId,
    clip: Clip,
    next_number: TurnNumber,
    now: SystemTime,
    knobs: &Knobs,
    host: &str,
) -> Result<Transition, Reject> {
    expect_active(&game)?;
    expect_player(&game, actor)?;
    let kind = match game.turn_phase() {
        Some(TurnPhase::SetTrick) => TurnKind::Set,
        Some(TurnPhase::RespondTrick) => TurnKind::Response,
        _ => return Err(Reject::WrongPhase),
    };
    expect_turn(&game, actor)?;
    expect_fresh(&game, now)?;
    clip.validate(knobs, host)?;
    let name = game.name_of(actor).to_string();
    let turn = Turn::new(
        ID::default(),
        game.id(),
        actor,
        name,
        next_number,
        kind,
        clip.clone(),
    );
    match kind {
        TurnKind::Set => {
            let defender = game.defensive();
            let setter_name = game.name_of(actor).to_string();
            game.begin_respond(
                LastTrick {
                    description: clip.description.clone(),
                    by: actor,
                },
                now,
                knobs.turn_deadline,
            );
            let state = state_payload(&game);
            let id = game.id();
            Ok(Transition::of(game)
                .with_turn(turn)
                .with_effect(Effect::broadcast(RoomKey::battle(id), "game:update", state))
                .with_effect(Effect::notify(
                    defender,
                    Kind::YourTurn,
                    json!({ "gameId": id, "opponentName": setter_name }),
                )))
        }
        TurnKind::Response => {
            game.begin_judge(now, knobs.turn_deadline);
            let state = state_payload(&game);
            let id = game.id();
            Ok(Transition::of(game)
                .with_turn(turn)
                .with_effect(Effect::broadcast(RoomKey::battle(id), "game:update", state)))
        }
    }
}

/// The defender calls LAND or BAIL on their own attempt. Requires the
/// round's set turn still pending and a recorded response after it.
pub fn judge(
    mut game: Game,
    set_turn: &Turn,
    has_response: bool,
    actor: PlayerId,
    verdict: Verdict,
    now: SystemTime,
    knobs: &Knobs,
) -> Result<Transition, Reject> {
    expect_active(&game)?;
    expect_player(&game, actor)?;
    if game.turn_phase() != Some(TurnPhase::Judge) {
        return Err(Reject::WrongPhase);
    }
    expect_turn(&game, actor)?;
    expect_fresh(&game, now)?;
    if set_turn.game() != game.id() {
        return Err(Reject::TurnNotFound);
    }
    if set_turn.kind() != TurnKind::Set {
        return Err(Reject::Validation(String::from("only set turns are judged")));
    }
    if !set_turn.judgment().pending() {
        return Err(Reject::AlreadyJudged);
    }
    if !has_response {
        return Err(Reject::ResponseRequired);
    }
    game.apply_close(game.roles().judged(verdict));
    let update = JudgeUpdate {
        turn: set_turn.id(),
        judgment: verdict.into(),
        by: actor,
        at: now,
    };
    let mut transition = close_or_continue(game, now, knobs);
    transition.judge_update = Some(update);
    Ok(transition)
}

/// The setter writes off their own attempt: a letter for them, and the
/// offense changes hands.
pub fn setter_bail(
    mut game: Game,
    actor: PlayerId,
    now: SystemTime,
    knobs: &Knobs,
) -> Result<Transition, Reject> {
    expect_active(&game)?;
    expect_player(&game, actor)?;
    if game.turn_phase() != Some(TurnPhase::SetTrick) {
        return Err(Reject::WrongPhase);
    }
    expect_turn(&game, actor)?;
    expect_fresh(&game, now)?;
    game.apply_close(game.roles().setter_bail());
    Ok(close_or_continue(game, now, knobs))
}

/// File the single-use appeal of a BAIL call against the setter's trick.
pub fn file_dispute(
    mut game: Game,
    turn: &Turn,
    actor: PlayerId,
    now: SystemTime,
) -> Result<Transition, Reject> {
    expect_active(&game)?;
    expect_player(&game, actor)?;
    if game.seat(actor).map(|s| s.dispute_used).unwrap_or(true) {
        return Err(Reject::DisputeQuotaUsed);
    }
    if turn.game() != game.id() {
        return Err(Reject::TurnNotFound);
    }
    if turn.judgment() != Judgment::Missed {
        return Err(Reject::WrongJudgment);
    }
    if turn.player() != actor {
        return Err(Reject::NotSetter);
    }
    let respondent = turn.judged_by().unwrap_or(game.opponent_of(actor));
    let name = game.name_of(actor).to_string();
    game.use_dispute(actor);
    let id = game.id();
    let dispute = Dispute::open(id, turn.id(), actor, respondent, now);
    let mut transition = Transition::of(game);
    transition.new_dispute = Some(dispute);
    transition.effects.push(Effect::notify(
        respondent,
        Kind::DisputeFiled,
        json!({ "gameId": id, "opponentName": name, "turnId": turn.id() }),
    ));
    Ok(transition)
}

/// Resolve a dispute. Upholding (`landed`) strips the BAIL letter from the
/// judger's board and swaps roles exactly as a LAND call would have; the
/// penalty always lands on whichever side the resolution went against.
pub fn resolve_dispute(
    mut game: Game,
    mut dispute: Dispute,
    actor: PlayerId,
    verdict: Verdict,
    now: SystemTime,
    knobs: &Knobs,
) -> Result<Transition, Reject> {
    if dispute.resolved() {
        return Err(Reject::AlreadyResolved);
    }
    if actor != dispute.against() {
        return Err(Reject::NotRespondent);
    }
    expect_active(&game)?;
    dispute.resolve(verdict, actor, now);
    let penalty_to = dispute.penalty_to();
    let disputer = dispute.disputed_by();
    let mut judge_update = None;
    if verdict == Verdict::Landed {
        game.pardon(dispute.against());
        game.apply_close(RoundClose {
            roles: game.roles().swap(),
            letter_to: None,
        });
        game.open_round(now, knobs.turn_deadline);
        judge_update = Some(JudgeUpdate {
            turn: dispute.turn(),
            judgment: Judgment::Landed,
            by: actor,
            at: now,
        });
    }
    let id = game.id();
    let state = state_payload(&game);
    let mut transition = Transition::of(game);
    transition.resolve_dispute = Some(dispute);
    transition.judge_update = judge_update;
    transition.penalty_to = penalty_to;
    transition
        .effects
        .push(Effect::broadcast(RoomKey::battle(id), "game:update", state));
    transition.effects.push(Effect::notify(
        disputer,
        Kind::DisputeResolved,
        json!({
            "gameId": id,
            "finalResult": Judgment::from(verdict),
            "penalizedId": penalty_to,
        }),
    ));
    Ok(transition)
}

/// Walk away. The other player takes the win.
pub fn forfeit(mut game: Game, actor: PlayerId, now: SystemTime) -> Result<Transition, Reject> {
    expect_active(&game)?;
    expect_player(&game, actor)?;
    let winner = game.opponent_of(actor);
    game.finish(Phase::Forfeited, Some(winner), now);
    let mut transition = finished(game);
    transition.effects.push(Effect::notify(
        winner,
        Kind::OpponentForfeited,
        json!({ "gameId": transition.game.id(), "winnerId": winner }),
    ));
    Ok(transition)
}

/// Reconciler: the current-turn player sat on the clock too long.
pub fn expire(game: Game, now: SystemTime) -> Result<Transition, Reject> {
    expect_active(&game)?;
    if !game.expired(now) {
        return Err(Reject::Validation(String::from("deadline not passed")));
    }
    let loser = game.current_turn().expect("active game has a turn pointer");
    let winner = game.opponent_of(loser);
    Ok(timeout_forfeit(game, winner, "turn_timeout", now))
}

/// Reconciler: session alive past the hard cap. Closest to losing loses.
pub fn stall(game: Game, now: SystemTime, knobs: &Knobs) -> Result<Transition, Reject> {
    expect_active(&game)?;
    match now.duration_since(game.created_at()) {
        Ok(age) if age > knobs.hard_cap => {}
        _ => return Err(Reject::Validation(String::from("inside the hard cap"))),
    }
    let loser = game.stalled_loser();
    let winner = game.opponent_of(loser);
    Ok(timeout_forfeit(game, winner, "stalled", now))
}

/// Reconciler: heads-up when the deadline is inside the warning window.
/// The persisted warning time keeps repeats outside the cooldown.
pub fn warn(
    mut game: Game,
    now: SystemTime,
    window: Duration,
    cooldown: Duration,
) -> Result<Transition, Reject> {
    expect_active(&game)?;
    let deadline = game.deadline_at().ok_or(Reject::WrongPhase)?;
    let remaining = deadline
        .duration_since(now)
        .map_err(|_| Reject::Validation(String::from("deadline already passed")))?;
    if remaining > window {
        return Err(Reject::Validation(String::from("outside warning window")));
    }
    if let Some(warned) = game.warned_at() {
        if now.duration_since(warned).unwrap_or_default() < cooldown {
            return Err(Reject::Validation(String::from("warning cooldown")));
        }
    }
    let player = game.current_turn().expect("active game has a turn pointer");
    game.record_warning(now);
    let id = game.id();
    Ok(Transition::of(game).with_effect(Effect::notify(
        player,
        Kind::DeadlineWarning,
        json!({ "gameId": id, "minutesRemaining": remaining.as_secs() / 60 }),
    )))
}

// shared plumbing

fn expect_active(game: &Game) -> Result<(), Reject> {
    match game.phase() {
        Phase::Active => Ok(()),
        _ => Err(Reject::WrongPhase),
    }
}

fn expect_player(game: &Game, actor: PlayerId) -> Result<(), Reject> {
    match game.is_player(actor) {
        true => Ok(()),
        false => Err(Reject::NotAPlayer),
    }
}

fn expect_turn(game: &Game, actor: PlayerId) -> Result<(), Reject> {
    match game.current_turn() == Some(actor) {
        true => Ok(()),
        false => Err(Reject::NotYourTurn),
    }
}

fn expect_fresh(game: &Game, now: SystemTime) -> Result<(), Reject> {
    match game.expired(now) {
        true => Err(Reject::DeadlinePassed),
        false => Ok(()),
    }
}

/// A round just closed: either someone spelled the word, or the next round
/// opens for the (possibly new) offense.
fn close_or_continue(mut game: Game, now: SystemTime, knobs: &Knobs) -> Transition {
    if let Some(loser) = game.eliminated() {
        let winner = game.opponent_of(loser);
        game.finish(Phase::Completed, Some(winner), now);
        let mut transition = finished(game);
        let id = transition.game.id();
        for player in [transition.game.player1().player, transition.game.player2().player] {
            transition.effects.push(Effect::notify(
                player,
                Kind::GameOver,
                json!({ "gameId": id, "winnerId": winner }),
            ));
        }
        transition
    } else {
        let next = game.offensive();
        let opponent = game.name_of(game.defensive()).to_string();
        game.open_round(now, knobs.turn_deadline);
        let state = state_payload(&game);
        let id = game.id();
        Transition::of(game)
            .with_effect(Effect::broadcast(RoomKey::battle(id), "game:update", state))
            .with_effect(Effect::notify(
                next,
                Kind::YourTurn,
                json!({ "gameId": id, "opponentName": opponent }),
            ))
    }
}

/// State plus game-ended broadcasts in canonical order. Per-player
/// notifications append after these.
fn finished(game: Game) -> Transition {
    let id = game.id();
    let state = state_payload(&game);
    let ended = json!({ "gameId": id, "winnerId": game.winner() });
    Transition::of(game)
        .with_effect(Effect::broadcast(RoomKey::battle(id), "game:update", state))
        .with_effect(Effect::broadcast(RoomKey::battle(id), "game:ended", ended))
}

fn timeout_forfeit(mut game: Game, winner: PlayerId, reason: &str, now: SystemTime) -> Transition {
    game.finish(Phase::Forfeited, Some(winner), now);
    let mut transition = finished(game);
    let id = transition.game.id();
    for player in [transition.game.player1().player, transition.game.player2().player] {
        transition.effects.push(Effect::notify(
            player,
            Kind::GameForfeitedTimeout,
            json!({ "gameId": id, "winnerId": winner, "reason": reason }),
        ));
    }
    transition
}

/// Room-facing snapshot of the session row.
pub fn state_payload(game: &Game) -> serde_json::Value {
    json!({
        "gameId": game.id(),
        "status": game.phase(),
        "turnPhase": game.turn_phase(),
        "currentTurn": game.current_turn(),
        "offensiveId": game.offensive(),
        "defensiveId": game.defensive(),
        "player1Letters": game.player1().letters,
        "player2Letters": game.player2().letters,
        "deadlineAt": game.deadline_at().map(epoch_millis),
        "winnerId": game.winner(),
    })
}

fn epoch_millis(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "media.skateduel.app";

    fn knobs() -> Knobs {
        Knobs {
            turn_deadline: Duration::from_secs(86_400),
            hard_cap: Duration::from_secs(604_800),
            reconnect_window: Duration::from_secs(120),
            video_cap_ms: 15_000,
            dedup_cap: 100,
        }
    }
    fn t0() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }
    fn clip(desc: &str) -> Clip {
        Clip {
            description: desc.to_string(),
            video_url: format!("https://{}/clips/{}.mp4", HOST, desc.replace(' ', "-")),
            duration_ms: 10_000,
            thumbnail_url: None,
        }
    }

    struct Duel {
        game: Game,
        p1: PlayerId,
        p2: PlayerId,
        turns: Vec<Turn>,
        now: SystemTime,
    }

    impl Duel {
        /// Challenge created and accepted.
        fn active() -> Self {
            let p1 = PlayerId::default();
            let p2 = PlayerId::default();
            let t = create(
                ID::default(),
                p1,
                String::from("Tony"),
                p2,
                String::from("Rodney"),
                t0(),
            )
            .unwrap();
            let t = respond(t.game, p2, true, t0(), &knobs()).unwrap();
            Self {
                game: t.game,
                p1,
                p2,
                turns: Vec::new(),
                now: t0(),
            }
        }
        fn next_number(&self) -> TurnNumber {
            self.turns.len() as TurnNumber + 1
        }
        fn submit(&mut self, actor: PlayerId, c: Clip) {
            let t = submit(
                self.game.clone(),
                actor,
                c,
                self.next_number(),
                self.now,
                &knobs(),
                HOST,
            )
            .unwrap();
            self.turns.push(t.new_turn.clone().unwrap());
            self.game = t.game;
        }
        /// Set, respond, judge; returns the closing transition.
        fn round(&mut self, verdict: Verdict) -> Transition {
            let setter = self.game.offensive();
            let defender = self.game.defensive();
            self.submit(setter, clip("kickflip"));
            self.submit(defender, clip("kickflip attempt"));
            let set_index = self.turns.len() - 2;
            let t = judge(
                self.game.clone(),
                &self.turns[set_index],
                true,
                defender,
                verdict,
                self.now,
                &knobs(),
            )
            .unwrap();
            let update = t.judge_update.clone().unwrap();
            self.turns[set_index].judge(update.judgment, update.by, update.at);
            self.game = t.game.clone();
            t
        }
    }

    #[test]
    fn challenge_starts_pending_with_challenger_on_offense() {
        let p1 = PlayerId::default();
        let p2 = PlayerId::default();
        let t = create(ID::default(), p1, String::from("a"), p2, String::from("b"), t0()).unwrap();
        assert_eq!(t.game.phase(), Phase::Pending);
        assert_eq!(t.game.current_turn(), Some(p1));
        assert_eq!(t.game.offensive(), p1);
        assert_eq!(t.game.deadline_at(), None);
        assert!(matches!(
            t.effects.as_slice(),
            [Effect::Notify { to, kind: Kind::ChallengeReceived, .. }] if *to == p2
        ));
    }
    #[test]
    fn self_challenge_rejected() {
        let p = PlayerId::default();
        assert_eq!(
            create(ID::default(), p, String::from("a"), p, String::from("a"), t0()).unwrap_err(),
            Reject::SelfChallenge
        );
    }
    #[test]
    fn accept_activates_and_starts_the_clock() {
        let duel = Duel::active();
        assert_eq!(duel.game.phase(), Phase::Active);
        assert_eq!(duel.game.turn_phase(), Some(TurnPhase::SetTrick));
        assert_eq!(
            duel.game.deadline_at(),
            Some(t0() + Duration::from_secs(86_400))
        );
    }
    #[test]
    fn decline_is_terminal_without_winner() {
        let p1 = PlayerId::default();
        let p2 = PlayerId::default();
        let t = create(ID::default(), p1, String::from("a"), p2, String::from("b"), t0()).unwrap();
        let t = respond(t.game, p2, false, t0(), &knobs()).unwrap();
        assert_eq!(t.game.phase(), Phase::Declined);
        assert_eq!(t.game.winner(), None);
        assert_eq!(t.game.turn_phase(), None);
        assert_eq!(t.game.deadline_at(), None);
        assert!(t.effects.is_empty());
    }
    #[test]
    fn only_the_challenged_player_responds() {
        let p1 = PlayerId::default();
        let p2 = PlayerId::default();
        let t = create(ID::default(), p1, String::from("a"), p2, String::from("b"), t0()).unwrap();
        assert_eq!(
            respond(t.game.clone(), p1, true, t0(), &knobs()).unwrap_err(),
            Reject::Forbidden
        );
        assert_eq!(
            respond(t.game, PlayerId::default(), true, t0(), &knobs()).unwrap_err(),
            Reject::NotAPlayer
        );
    }

    // E1: happy path to completion.
    #[test]
    fn five_bails_spell_the_word() {
        let mut duel = Duel::active();
        for expected in ["S", "SK", "SKA", "SKAT"] {
            let t = duel.round(Verdict::Missed);
            assert_eq!(duel.game.phase(), Phase::Active);
            assert_eq!(duel.game.seat(duel.p2).unwrap().letters.as_str(), expected);
            // BAIL keeps roles: challenger stays on offense
            assert_eq!(duel.game.offensive(), duel.p1);
            assert_eq!(duel.game.current_turn(), Some(duel.p1));
            assert_eq!(duel.game.turn_phase(), Some(TurnPhase::SetTrick));
            assert!(t.judge_update.is_some());
        }
        let t = duel.round(Verdict::Missed);
        assert_eq!(duel.game.phase(), Phase::Completed);
        assert_eq!(duel.game.winner(), Some(duel.p1));
        assert_eq!(duel.game.turn_phase(), None);
        assert_eq!(duel.game.current_turn(), None);
        assert_eq!(duel.game.deadline_at(), None);
        assert_eq!(duel.game.seat(duel.p2).unwrap().letters, Letters::FULL);
        // canonical order: state update, game ended, then both notifications
        assert!(matches!(t.effects[0], Effect::Broadcast { event: "game:update", .. }));
        assert!(matches!(t.effects[1], Effect::Broadcast { event: "game:ended", .. }));
        let over: Vec<_> = t
            .effects
            .iter()
            .filter(|e| matches!(e, Effect::Notify { kind: Kind::GameOver, .. }))
            .collect();
        assert_eq!(over.len(), 2);
    }
    #[test]
    fn land_swaps_roles_without_letters() {
        let mut duel = Duel::active();
        duel.round(Verdict::Landed);
        assert_eq!(duel.game.offensive(), duel.p2);
        assert_eq!(duel.game.current_turn(), Some(duel.p2));
        assert_eq!(duel.game.seat(duel.p1).unwrap().letters, Letters::NONE);
        assert_eq!(duel.game.seat(duel.p2).unwrap().letters, Letters::NONE);
    }
    #[test]
    fn turn_numbers_are_dense() {
        let mut duel = Duel::active();
        duel.round(Verdict::Missed);
        duel.round(Verdict::Landed);
        let numbers: Vec<TurnNumber> = duel.turns.iter().map(Turn::number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }
    #[test]
    fn submit_enforces_phase_and_turn() {
        let mut duel = Duel::active();
        // defender cannot set
        assert_eq!(
            submit(duel.game.clone(), duel.p2, clip("x"), 1, duel.now, &knobs(), HOST).unwrap_err(),
            Reject::NotYourTurn
        );
        duel.submit(duel.p1, clip("kickflip"));
        // setter cannot respond
        assert_eq!(
            submit(duel.game.clone(), duel.p1, clip("y"), 2, duel.now, &knobs(), HOST).unwrap_err(),
            Reject::NotYourTurn
        );
        duel.submit(duel.p2, clip("attempt"));
        // judge phase accepts no clips
        assert_eq!(
            submit(duel.game.clone(), duel.p2, clip("z"), 3, duel.now, &knobs(), HOST).unwrap_err(),
            Reject::WrongPhase
        );
    }

    // E6: video too long.
    #[test]
    fn overlong_video_rejected_without_a_turn() {
        let duel = Duel::active();
        let mut c = clip("huge");
        c.duration_ms = 20_000;
        assert_eq!(
            submit(duel.game.clone(), duel.p1, c, 1, duel.now, &knobs(), HOST).unwrap_err(),
            Reject::VideoTooLong
        );
    }
    #[test]
    fn judging_twice_is_rejected() {
        let mut duel = Duel::active();
        duel.round(Verdict::Missed);
        let judged = &duel.turns[0];
        assert_eq!(
            judge(duel.game.clone(), judged, true, duel.p2, Verdict::Landed, duel.now, &knobs())
                .unwrap_err(),
            Reject::WrongPhase
        );
    }
    #[test]
    fn judge_requires_a_response() {
        let mut duel = Duel::active();
        duel.submit(duel.p1, clip("kickflip"));
        duel.submit(duel.p2, clip("attempt"));
        let set = &duel.turns[0];
        assert_eq!(
            judge(duel.game.clone(), set, false, duel.p2, Verdict::Missed, duel.now, &knobs())
                .unwrap_err(),
            Reject::ResponseRequired
        );
    }

    #[test]
    fn setter_bail_letters_the_setter_and_swaps() {
        let mut duel = Duel::active();
        let t = setter_bail(duel.game.clone(), duel.p1, duel.now, &knobs()).unwrap();
        duel.game = t.game;
        assert_eq!(duel.game.seat(duel.p1).unwrap().letters.as_str(), "S");
        assert_eq!(duel.game.offensive(), duel.p2);
        assert_eq!(duel.game.current_turn(), Some(duel.p2));
        assert_eq!(duel.game.turn_phase(), Some(TurnPhase::SetTrick));
    }
    #[test]
    fn setter_bail_can_end_the_game() {
        let mut duel = Duel::active();
        // p1 bails four rounds in a row: letters pile on p1 while offense
        // bounces; bring p1 to SKAT, with p1 back on offense each time
        for _ in 0..4 {
            let t = setter_bail(duel.game.clone(), duel.game.offensive(), duel.now, &knobs())
                .unwrap();
            duel.game = t.game;
        }
        // letters alternated between the two; finish whoever is at SKAT
        let about_to_lose = duel.game.offensive();
        let mut t = setter_bail(duel.game.clone(), about_to_lose, duel.now, &knobs()).unwrap();
        while t.game.phase() == Phase::Active {
            t = setter_bail(t.game.clone(), t.game.offensive(), duel.now, &knobs()).unwrap();
        }
        assert_eq!(t.game.phase(), Phase::Completed);
        assert!(t.game.winner().is_some());
        assert_eq!(t.game.deadline_at(), None);
    }

    // E2: dispute overturn restores the board and swaps roles LAND-style.
    #[test]
    fn upheld_dispute_reverses_the_bail() {
        let mut duel = Duel::active();
        duel.round(Verdict::Missed);
        assert_eq!(duel.game.seat(duel.p2).unwrap().letters.as_str(), "S");
        let set = duel.turns[0].clone();
        let t = file_dispute(duel.game.clone(), &set, duel.p1, duel.now).unwrap();
        duel.game = t.game;
        let dispute = t.new_dispute.unwrap();
        assert_eq!(dispute.against(), duel.p2);
        assert!(duel.game.seat(duel.p1).unwrap().dispute_used);
        assert!(matches!(
            t.effects.as_slice(),
            [Effect::Notify { to, kind: Kind::DisputeFiled, .. }] if *to == duel.p2
        ));

        let t = resolve_dispute(duel.game.clone(), dispute, duel.p2, Verdict::Landed, duel.now, &knobs())
            .unwrap();
        duel.game = t.game;
        // letter restored to its pre-BAIL value
        assert_eq!(duel.game.seat(duel.p2).unwrap().letters, Letters::NONE);
        // roles swapped exactly as a direct LAND from the same state
        assert_eq!(duel.game.offensive(), duel.p2);
        assert_eq!(duel.game.current_turn(), Some(duel.p2));
        assert_eq!(duel.game.turn_phase(), Some(TurnPhase::SetTrick));
        // the judger ate the penalty and the turn reads landed
        assert_eq!(t.penalty_to, Some(duel.p2));
        let update = t.judge_update.unwrap();
        assert_eq!(update.judgment, Judgment::Landed);
        let resolved = t.resolve_dispute.unwrap();
        assert_eq!(resolved.penalty_to(), Some(duel.p2));
        assert!(resolved.resolved());
    }
    #[test]
    fn denied_dispute_only_penalizes_the_disputer() {
        let mut duel = Duel::active();
        duel.round(Verdict::Missed);
        let set = duel.turns[0].clone();
        let t = file_dispute(duel.game.clone(), &set, duel.p1, duel.now).unwrap();
        let dispute = t.new_dispute.unwrap();
        let before = t.game.clone();
        let t = resolve_dispute(t.game, dispute, duel.p2, Verdict::Missed, duel.now, &knobs())
            .unwrap();
        assert_eq!(t.penalty_to, Some(duel.p1));
        assert!(t.judge_update.is_none());
        assert_eq!(t.game.offensive(), before.offensive());
        assert_eq!(
            t.game.seat(duel.p2).unwrap().letters,
            before.seat(duel.p2).unwrap().letters
        );
    }

    // E4: dispute quota.
    #[test]
    fn second_dispute_hits_the_quota() {
        let mut duel = Duel::active();
        duel.round(Verdict::Missed);
        let set = duel.turns[0].clone();
        let t = file_dispute(duel.game.clone(), &set, duel.p1, duel.now).unwrap();
        duel.game = t.game;
        assert_eq!(
            file_dispute(duel.game.clone(), &set, duel.p1, duel.now).unwrap_err(),
            Reject::DisputeQuotaUsed
        );
    }
    #[test]
    fn dispute_requires_a_bail_by_the_setter() {
        let mut duel = Duel::active();
        duel.round(Verdict::Landed);
        let set = duel.turns[0].clone();
        assert_eq!(
            file_dispute(duel.game.clone(), &set, duel.p1, duel.now).unwrap_err(),
            Reject::WrongJudgment
        );
        duel.round(Verdict::Missed);
        let set = duel.turns[2].clone();
        // defender (now p1 after the land) cannot dispute the setter's trick
        let defender = duel.game.defensive();
        assert_eq!(
            file_dispute(duel.game.clone(), &set, defender, duel.now).unwrap_err(),
            Reject::NotSetter
        );
    }
    #[test]
    fn resolve_is_single_shot_and_respondent_only() {
        let mut duel = Duel::active();
        duel.round(Verdict::Missed);
        let set = duel.turns[0].clone();
        let t = file_dispute(duel.game.clone(), &set, duel.p1, duel.now).unwrap();
        let dispute = t.new_dispute.unwrap();
        assert_eq!(
            resolve_dispute(t.game.clone(), dispute.clone(), duel.p1, Verdict::Landed, duel.now, &knobs())
                .unwrap_err(),
            Reject::NotRespondent
        );
        let t2 = resolve_dispute(t.game.clone(), dispute, duel.p2, Verdict::Missed, duel.now, &knobs())
            .unwrap();
        let resolved = t2.resolve_dispute.unwrap();
        assert_eq!(
            resolve_dispute(t2.game, resolved, duel.p2, Verdict::Missed, duel.now, &knobs())
                .unwrap_err(),
            Reject::AlreadyResolved
        );
    }

    #[test]
    fn forfeit_hands_the_win_over() {
        let duel = Duel::active();
        let t = forfeit(duel.game.clone(), duel.p1, duel.now).unwrap();
        assert_eq!(t.game.phase(), Phase::Forfeited);
        assert_eq!(t.game.winner(), Some(duel.p2));
        assert!(t.effects.iter().any(|e| matches!(
            e,
            Effect::Notify { to, kind: Kind::OpponentForfeited, .. } if *to == duel.p2
        )));
    }

    // E3: deadline forfeit, idempotent on the second tick.
    #[test]
    fn expired_deadline_forfeits_the_current_turn_player() {
        let duel = Duel::active();
        let late = duel.now + Duration::from_secs(86_401);
        let t = expire(duel.game.clone(), late).unwrap();
        assert_eq!(t.game.phase(), Phase::Forfeited);
        assert_eq!(t.game.winner(), Some(duel.p2));
        let timeouts: Vec<_> = t
            .effects
            .iter()
            .filter(|e| matches!(e, Effect::Notify { kind: Kind::GameForfeitedTimeout, .. }))
            .collect();
        assert_eq!(timeouts.len(), 2);
        // a second tick finds nothing to do
        assert_eq!(expire(t.game, late).unwrap_err(), Reject::WrongPhase);
    }
    #[test]
    fn expire_needs_an_actually_passed_deadline() {
        let duel = Duel::active();
        assert!(matches!(
            expire(duel.game.clone(), duel.now).unwrap_err(),
            Reject::Validation(_)
        ));
    }
    #[test]
    fn deadline_passed_blocks_submissions() {
        let duel = Duel::active();
        let late = duel.now + Duration::from_secs(86_401);
        assert_eq!(
            submit(duel.game.clone(), duel.p1, clip("late"), 1, late, &knobs(), HOST).unwrap_err(),
            Reject::DeadlinePassed
        );
    }

    #[test]
    fn stall_picks_the_most_lettered_loser() {
        let mut duel = Duel::active();
        duel.round(Verdict::Missed); // p2: "S"
        let late = t0() + Duration::from_secs(604_801);
        let t = stall(duel.game.clone(), late, &knobs()).unwrap();
        assert_eq!(t.game.phase(), Phase::Forfeited);
        assert_eq!(t.game.winner(), Some(duel.p1));
    }
    #[test]
    fn stall_tie_breaks_on_current_turn() {
        let duel = Duel::active();
        let late = t0() + Duration::from_secs(604_801);
        let t = stall(duel.game.clone(), late, &knobs()).unwrap();
        // no letters anywhere: the player on the clock (p1) loses
        assert_eq!(t.game.winner(), Some(duel.p2));
    }

    #[test]
    fn warning_fires_once_per_cooldown() {
        let duel = Duel::active();
        let window = Duration::from_secs(3_600);
        let cooldown = Duration::from_secs(1_800);
        let near = duel.now + Duration::from_secs(86_400 - 1_200);
        let t = warn(duel.game.clone(), near, window, cooldown).unwrap();
        assert!(matches!(
            t.effects.as_slice(),
            [Effect::Notify { kind: Kind::DeadlineWarning, .. }]
        ));
        assert!(matches!(
            warn(t.game.clone(), near + Duration::from_secs(60), window, cooldown).unwrap_err(),
            Reject::Validation(_)
        ));
        // far from the deadline there is nothing to warn about
        assert!(matches!(
            warn(duel.game.clone(), duel.now, window, cooldown).unwrap_err(),
            Reject::Validation(_)
        ));
    }
}
