//! Phase state machine for a single 1v1 match.
//!
//! A round runs Setup -> AttackSelect -> Attacking -> Finishing. Finishing is
//! entered at most once per round, whichever of a strategy completion or a
//! deadline gets there first; the loser of that race is a no-op. After the
//! round summary has been on screen for a while an `AdvanceRound` timer swaps
//! roles and starts the next Setup, or concludes the match after round six.

use crate::attack::{self, Resolution, S4State, Table};
use crate::config::Timings;
use crate::deadline::{Deadline, PhaseClock, ScheduledTimer, Timer};
use crate::defense::validate_defense;
use crate::error::ActionError;
use crate::ledger::ScoreLedger;
use crate::outbox::Outbox;
use log::{debug, info};
use shared::{
    AttackMove, BoxContent, HistoryEntry, MatchId, Phase, Role, RoundOutcome, Rule, ServerPacket,
    Strategy, UserId, ATTACK_ATTEMPTS, DEFENSE_TIMEOUT_PENALTY, ROUNDS_PER_MATCH,
};

/// Everything a match may touch outside itself while handling one event.
pub struct RoundContext<'a> {
    pub room_id: &'a str,
    pub ledger: &'a mut ScoreLedger,
    pub history: &'a mut Vec<HistoryEntry>,
    pub outbox: &'a mut Outbox,
    pub timings: &'a Timings,
    pub now: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttackState {
    Idle,
    /// Strategies 1 and 2.
    Attempts { remaining: u8 },
    /// Strategy 3.
    Probe { guesses: u32 },
    /// Strategy 4.
    TwoPhase(S4State),
}

/// Per-round state, replaced wholesale when a new round starts.
#[derive(Debug, Clone)]
pub struct GameData {
    pub phase: Phase,
    pub rule: Option<Rule>,
    pub strategy: Option<Strategy>,
    pub table: Option<Table>,
    /// Total debited from the defender at deployment.
    pub deployed: i64,
    /// Total credited to the attacker by strategy resolution.
    pub profit: i64,
    /// Value consumed by failed comparative guesses.
    pub burned: i64,
    pub attack: AttackState,
}

impl GameData {
    pub fn new() -> Self {
        Self {
            phase: Phase::Setup,
            rule: None,
            strategy: None,
            table: None,
            deployed: 0,
            profit: 0,
            burned: 0,
            attack: AttackState::Idle,
        }
    }
}

impl Default for GameData {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of an `AdvanceRound` timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Stale,
    NextRound,
    Concluded,
}

#[derive(Debug, Clone)]
pub struct Match {
    pub id: MatchId,
    pub p1: UserId,
    pub p2: UserId,
    pub defender: UserId,
    pub attacker: UserId,
    pub round: u8,
    pub clock: PhaseClock,
    pub game: GameData,
    pub concluded: bool,
}

impl Match {
    /// Creates a match in round 1 with `p1` defending, and arms the setup deadline.
    pub fn new(id: MatchId, p1: UserId, p2: UserId, ctx: &mut RoundContext) -> Self {
        let mut new_match = Self {
            id,
            defender: p1.clone(),
            attacker: p2.clone(),
            p1,
            p2,
            round: 1,
            clock: PhaseClock::new(),
            game: GameData::new(),
            concluded: false,
        };
        let timer = new_match.arm(ctx.timings.setup, ctx);
        ctx.outbox.schedule(timer);
        new_match
    }

    pub fn has_player(&self, user: &str) -> bool {
        self.p1 == user || self.p2 == user
    }

    pub fn role_of(&self, user: &str) -> Option<Role> {
        if self.defender == user {
            Some(Role::Defender)
        } else if self.attacker == user {
            Some(Role::Attacker)
        } else {
            None
        }
    }

    fn arm(&mut self, duration: std::time::Duration, ctx: &RoundContext) -> ScheduledTimer {
        self.clock
            .arm(ctx.room_id, &self.id, self.round, duration, ctx.now)
    }

    fn require(&self, user: &str, role: Role, phase: Phase) -> Result<(), ActionError> {
        if self.concluded || self.role_of(user) != Some(role) || self.game.phase != phase {
            return Err(ActionError::Ignored);
        }
        Ok(())
    }

    pub fn lock_rule(&mut self, user: &str, rule: Rule) -> Result<(), ActionError> {
        self.require(user, Role::Defender, Phase::Setup)?;
        self.game.rule = Some(rule);
        Ok(())
    }

    /// Validates and deploys the defender's layout, then hands the round to the attacker.
    pub fn submit_defense(
        &mut self,
        user: &str,
        boxes: &[BoxContent],
        ctx: &mut RoundContext,
    ) -> Result<(), ActionError> {
        self.require(user, Role::Defender, Phase::Setup)?;
        let rule = self.game.rule.ok_or(ActionError::RuleNotLocked)?;
        let total = validate_defense(rule, boxes, ctx.ledger.balance(user))?;

        ctx.ledger.debit(user, total);
        self.game.table = Some(Table::deploy(boxes));
        self.game.deployed = total;
        self.game.phase = Phase::AttackSelect;
        let timer = self.arm(ctx.timings.attack, ctx);
        ctx.outbox.schedule(timer);

        info!(
            "Match {} round {}: {} deployed {} under {:?}",
            self.id, self.round, user, total, rule
        );
        Ok(())
    }

    pub fn select_strategy(&mut self, user: &str, strategy: Strategy) -> Result<(), ActionError> {
        self.require(user, Role::Attacker, Phase::AttackSelect)?;
        let rule = self.game.rule.ok_or(ActionError::Ignored)?;
        if !strategy.is_compatible_with(rule) {
            return Err(ActionError::IncompatibleStrategy);
        }

        self.game.attack = match strategy {
            Strategy::BlindPick | Strategy::Comparative => AttackState::Attempts {
                remaining: ATTACK_ATTEMPTS,
            },
            Strategy::BinarySearch => AttackState::Probe { guesses: 0 },
            Strategy::TwoPhaseTarget => AttackState::TwoPhase(S4State::new()),
        };
        self.game.strategy = Some(strategy);
        self.game.phase = Phase::Attacking;
        debug!("Match {} round {}: strategy {:?}", self.id, self.round, strategy);
        Ok(())
    }

    /// Resolves one move of strategies 1 to 3.
    pub fn execute_attack(
        &mut self,
        user: &str,
        attack: &AttackMove,
        ctx: &mut RoundContext,
    ) -> Result<(), ActionError> {
        self.require(user, Role::Attacker, Phase::Attacking)?;
        let game = &mut self.game;
        let table = game.table.as_mut().ok_or(ActionError::Ignored)?;

        let resolution = match (game.strategy, &mut game.attack, attack) {
            (
                Some(Strategy::BlindPick),
                AttackState::Attempts { remaining },
                AttackMove::BlindPick { box_index },
            ) => attack::blind_pick(table, remaining, *box_index)?,
            (
                Some(Strategy::Comparative),
                AttackState::Attempts { remaining },
                AttackMove::Compare { box_a, box_b, guess },
            ) => {
                let resolution = attack::compare(table, remaining, *box_a, *box_b, *guess)?;
                let verdict = if resolution.profit > 0 { "correct" } else { "wrong" };
                ctx.outbox.info(ctx.room_id, format!("Comparison guess {}", verdict));
                resolution
            }
            (
                Some(Strategy::BinarySearch),
                AttackState::Probe { guesses },
                AttackMove::Probe { guess_index },
            ) => attack::probe(table, guesses, *guess_index)?,
            _ => return Err(ActionError::Ignored),
        };

        self.apply(resolution, ctx);
        Ok(())
    }

    fn apply(&mut self, resolution: Resolution, ctx: &mut RoundContext) {
        if resolution.profit > 0 {
            ctx.ledger.credit(&self.attacker, resolution.profit);
        }
        self.game.profit += resolution.profit;
        self.game.burned += resolution.burned;

        if let Some(hint) = resolution.hint {
            let count = match self.game.attack {
                AttackState::Probe { guesses } => guesses,
                _ => 0,
            };
            ctx.outbox.to_room(
                ctx.room_id,
                ServerPacket::ProbeHint {
                    match_id: self.id.clone(),
                    hint,
                    count,
                },
            );
        }
        if resolution.finished {
            self.finish(RoundOutcome::Normal, ctx);
        }
    }

    fn two_phase(&mut self) -> Result<(&mut S4State, &mut Table), ActionError> {
        if self.game.phase != Phase::Attacking || self.concluded {
            return Err(ActionError::Ignored);
        }
        match (&mut self.game.attack, self.game.table.as_mut()) {
            (AttackState::TwoPhase(s4), Some(table)) => Ok((s4, table)),
            _ => Err(ActionError::Ignored),
        }
    }

    pub fn s4_submit_target(
        &mut self,
        user: &str,
        target: u8,
        ctx: &mut RoundContext,
    ) -> Result<(), ActionError> {
        let role = self.role_of(user).ok_or(ActionError::Ignored)?;
        let (s4, table) = self.two_phase()?;
        s4.submit_target(table, role, target)?;
        let seeker = if role == Role::Attacker { "Attacker" } else { "Defender" };
        ctx.outbox.info(ctx.room_id, format!("{} is looking for {}", seeker, target));
        Ok(())
    }

    /// Reveals a box; the 7th reveal of a phase schedules its scoring after a pause.
    pub fn s4_reveal(
        &mut self,
        user: &str,
        index: usize,
        ctx: &mut RoundContext,
    ) -> Result<(), ActionError> {
        if self.role_of(user) != Some(Role::Attacker) {
            return Err(ActionError::Ignored);
        }
        let round = self.round;
        let match_id = self.id.clone();
        let (s4, table) = self.two_phase()?;
        if s4.reveal(table, index)? {
            ctx.outbox.schedule(ScheduledTimer {
                delay: ctx.timings.reveal_pause,
                timer: Timer::SettleReveal {
                    room_id: ctx.room_id.to_string(),
                    match_id,
                    round,
                    stage: s4.stage,
                },
            });
        }
        Ok(())
    }

    /// Scores a finished reveal phase. Returns false if the match has moved on.
    pub fn settle_reveal(&mut self, round: u8, stage: u8, ctx: &mut RoundContext) -> bool {
        if self.round != round {
            return false;
        }
        let Ok((s4, table)) = self.two_phase() else {
            return false;
        };
        let target = if stage == 1 { s4.target_x } else { s4.target_y };
        match s4.settle(table, stage) {
            Some(found) => {
                let verdict = if found { "found" } else { "not found" };
                ctx.outbox.info(ctx.room_id, format!("Target {} {}", target, verdict));
                true
            }
            None => false,
        }
    }

    pub fn s4_execute_pick(
        &mut self,
        user: &str,
        indices: &[usize],
        ctx: &mut RoundContext,
    ) -> Result<(), ActionError> {
        if self.role_of(user) != Some(Role::Attacker) {
            return Err(ActionError::Ignored);
        }
        let (s4, table) = self.two_phase()?;
        let resolution = s4.execute_pick(table, indices)?;
        ctx.outbox.info(ctx.room_id, format!("Payout pick took {}", resolution.profit));
        self.apply(resolution, ctx);
        Ok(())
    }

    /// Relays the attacker's in-progress box selection to the room.
    pub fn sync_selection(
        &self,
        user: &str,
        indices: &[usize],
        ctx: &mut RoundContext,
    ) -> Result<(), ActionError> {
        if self.role_of(user) != Some(Role::Attacker) {
            return Err(ActionError::Ignored);
        }
        ctx.outbox.to_room(
            ctx.room_id,
            ServerPacket::SelectionSync {
                match_id: self.id.clone(),
                indices: indices.to_vec(),
            },
        );
        Ok(())
    }

    /// Handles an elapsed phase deadline. Returns false if it was stale.
    pub fn on_deadline(&mut self, deadline: &Deadline, ctx: &mut RoundContext) -> bool {
        if !self.clock.is_live(deadline) || deadline.round != self.round {
            debug!("Stale deadline for match {} round {}", self.id, deadline.round);
            return false;
        }
        match self.game.phase {
            Phase::Setup => {
                ctx.ledger
                    .transfer(&self.defender, &self.attacker, DEFENSE_TIMEOUT_PENALTY);
                ctx.outbox.info(
                    ctx.room_id,
                    format!("Defender timed out, {} paid to the attacker", DEFENSE_TIMEOUT_PENALTY),
                );
                self.finish(RoundOutcome::DefenderTimeout, ctx)
            }
            Phase::AttackSelect | Phase::Attacking => {
                ctx.outbox.info(ctx.room_id, "Attacker timed out, round over");
                self.finish(RoundOutcome::AttackerTimeout, ctx)
            }
            Phase::Finishing => false,
        }
    }

    /// Closes the round: refunds untaken value, records history, and schedules
    /// the next round. Returns false if the round was already closing.
    pub fn finish(&mut self, outcome: RoundOutcome, ctx: &mut RoundContext) -> bool {
        if self.game.phase == Phase::Finishing {
            debug!("Match {} round {} already finishing", self.id, self.round);
            return false;
        }
        self.game.phase = Phase::Finishing;
        self.clock.disarm();

        let refund = self.game.table.as_ref().map_or(0, Table::untaken_value);
        ctx.ledger.credit(&self.defender, refund);

        let penalty = if outcome == RoundOutcome::DefenderTimeout {
            DEFENSE_TIMEOUT_PENALTY
        } else {
            0
        };
        ctx.history.push(HistoryEntry {
            match_id: self.id.clone(),
            round: self.round,
            defender: self.defender.clone(),
            attacker: self.attacker.clone(),
            rule: self.game.rule,
            strategy: self.game.strategy,
            outcome,
            pnl_attacker: self.game.profit + penalty,
            pnl_defender: refund - self.game.deployed - penalty,
        });
        ctx.outbox.to_room(
            ctx.room_id,
            ServerPacket::RoundSummary {
                match_id: self.id.clone(),
                round: self.round,
                refund,
                outcome,
            },
        );
        ctx.outbox.schedule(ScheduledTimer {
            delay: ctx.timings.round_display,
            timer: Timer::AdvanceRound {
                room_id: ctx.room_id.to_string(),
                match_id: self.id.clone(),
                round: self.round,
            },
        });

        info!(
            "Match {} round {} finished ({:?}): refund {}, attacker profit {}",
            self.id, self.round, outcome, refund, self.game.profit
        );
        true
    }

    /// Starts the next round with roles swapped, or concludes after the last round.
    pub fn advance(&mut self, round: u8, ctx: &mut RoundContext) -> Advance {
        if self.concluded || self.round != round || self.game.phase != Phase::Finishing {
            return Advance::Stale;
        }
        if self.round >= ROUNDS_PER_MATCH {
            self.concluded = true;
            info!("Match {} concluded", self.id);
            return Advance::Concluded;
        }

        std::mem::swap(&mut self.defender, &mut self.attacker);
        self.round += 1;
        self.game = GameData::new();
        let timer = self.arm(ctx.timings.setup, ctx);
        ctx.outbox.schedule(timer);
        Advance::NextRound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Comparison, BOX_COUNT, STARTING_BALANCE};

    struct Harness {
        ledger: ScoreLedger,
        history: Vec<HistoryEntry>,
        outbox: Outbox,
        timings: Timings,
        now: u64,
    }

    impl Harness {
        fn new() -> Self {
            let mut ledger = ScoreLedger::new();
            ledger.open("d");
            ledger.open("a");
            Self {
                ledger,
                history: Vec::new(),
                outbox: Outbox::new(),
                timings: Timings::default(),
                now: 0,
            }
        }

        fn ctx(&mut self) -> RoundContext<'_> {
            RoundContext {
                room_id: "room",
                ledger: &mut self.ledger,
                history: &mut self.history,
                outbox: &mut self.outbox,
                timings: &self.timings,
                now: self.now,
            }
        }

        fn last_deadline(&self) -> Deadline {
            self.outbox
                .timers
                .iter()
                .rev()
                .find_map(|scheduled| match &scheduled.timer {
                    Timer::PhaseDeadline(deadline) => Some(deadline.clone()),
                    _ => None,
                })
                .expect("a deadline was armed")
        }
    }

    fn flat_layout() -> Vec<BoxContent> {
        vec![BoxContent::new(20, 0); BOX_COUNT]
    }

    fn deployed(h: &mut Harness, rule: Rule, boxes: &[BoxContent]) -> Match {
        let mut m = Match::new("m1".to_string(), "d".to_string(), "a".to_string(), &mut h.ctx());
        m.lock_rule("d", rule).unwrap();
        m.submit_defense("d", boxes, &mut h.ctx()).unwrap();
        m
    }

    #[test]
    fn test_new_match_arms_setup_deadline() {
        let mut h = Harness::new();
        h.now = 1_000;
        let m = Match::new("m1".to_string(), "d".to_string(), "a".to_string(), &mut h.ctx());
        assert_eq!(m.round, 1);
        assert_eq!(m.game.phase, Phase::Setup);
        assert_eq!(m.clock.deadline_ms(), 301_000);
        let deadline = h.last_deadline();
        assert_eq!(deadline.duration, h.timings.setup);
        assert!(m.clock.is_live(&deadline));
    }

    #[test]
    fn test_out_of_turn_actions_are_ignored() {
        let mut h = Harness::new();
        let mut m = Match::new("m1".to_string(), "d".to_string(), "a".to_string(), &mut h.ctx());
        assert_eq!(m.lock_rule("a", Rule::Progression), Err(ActionError::Ignored));
        assert_eq!(m.select_strategy("a", Strategy::BlindPick), Err(ActionError::Ignored));
        assert_eq!(
            m.submit_defense("d", &flat_layout(), &mut h.ctx()),
            Err(ActionError::RuleNotLocked)
        );
        assert_eq!(m.game.phase, Phase::Setup);
    }

    #[test]
    fn test_submit_defense_debits_and_rearms() {
        let mut h = Harness::new();
        let m = deployed(&mut h, Rule::Progression, &flat_layout());
        assert_eq!(h.ledger.balance("d"), STARTING_BALANCE - 4_400);
        assert_eq!(m.game.phase, Phase::AttackSelect);
        assert_eq!(h.last_deadline().duration, h.timings.attack);
        assert!(m.clock.is_live(&h.last_deadline()));
    }

    #[test]
    fn test_rejected_defense_changes_nothing() {
        let mut h = Harness::new();
        let mut m = Match::new("m1".to_string(), "d".to_string(), "a".to_string(), &mut h.ctx());
        m.lock_rule("d", Rule::SingleSpecial).unwrap();
        let generation = m.clock.generation();
        let err = m.submit_defense("d", &flat_layout(), &mut h.ctx()).unwrap_err();
        assert!(matches!(err, ActionError::Defense(_)));
        assert_eq!(m.game.phase, Phase::Setup);
        assert_eq!(m.clock.generation(), generation);
        assert_eq!(h.ledger.balance("d"), STARTING_BALANCE);
    }

    #[test]
    fn test_incompatible_strategy_rejected() {
        let mut h = Harness::new();
        let mut m = deployed(&mut h, Rule::Progression, &flat_layout());
        assert_eq!(
            m.select_strategy("a", Strategy::TwoPhaseTarget),
            Err(ActionError::IncompatibleStrategy)
        );
        assert_eq!(m.game.phase, Phase::AttackSelect);
        m.select_strategy("a", Strategy::Comparative).unwrap();
        assert_eq!(m.game.attack, AttackState::Attempts { remaining: ATTACK_ATTEMPTS });
    }

    #[test]
    fn test_wrong_move_for_strategy_is_ignored() {
        let mut h = Harness::new();
        let mut m = deployed(&mut h, Rule::Progression, &flat_layout());
        m.select_strategy("a", Strategy::BlindPick).unwrap();
        let mv = AttackMove::Probe { guess_index: 3 };
        assert_eq!(m.execute_attack("a", &mv, &mut h.ctx()), Err(ActionError::Ignored));
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut h = Harness::new();
        let mut m = deployed(&mut h, Rule::Progression, &flat_layout());
        assert!(m.finish(RoundOutcome::Normal, &mut h.ctx()));
        assert!(!m.finish(RoundOutcome::AttackerTimeout, &mut h.ctx()));
        assert_eq!(h.history.len(), 1);
        assert_eq!(h.ledger.balance("d"), STARTING_BALANCE);
    }

    #[test]
    fn test_setup_timeout_applies_penalty() {
        let mut h = Harness::new();
        let mut m = Match::new("m1".to_string(), "d".to_string(), "a".to_string(), &mut h.ctx());
        let deadline = h.last_deadline();
        assert!(m.on_deadline(&deadline, &mut h.ctx()));
        assert_eq!(h.ledger.balance("d"), STARTING_BALANCE - DEFENSE_TIMEOUT_PENALTY);
        assert_eq!(h.ledger.balance("a"), STARTING_BALANCE + DEFENSE_TIMEOUT_PENALTY);
        assert_eq!(h.history[0].outcome, RoundOutcome::DefenderTimeout);
        assert_eq!(h.history[0].pnl_defender, -DEFENSE_TIMEOUT_PENALTY);
        assert!(!m.on_deadline(&deadline, &mut h.ctx()));
    }

    #[test]
    fn test_setup_deadline_is_stale_after_deployment() {
        let mut h = Harness::new();
        let mut m = Match::new("m1".to_string(), "d".to_string(), "a".to_string(), &mut h.ctx());
        let setup_deadline = h.last_deadline();
        m.lock_rule("d", Rule::Progression).unwrap();
        m.submit_defense("d", &flat_layout(), &mut h.ctx()).unwrap();

        assert!(!m.on_deadline(&setup_deadline, &mut h.ctx()));
        assert_eq!(m.game.phase, Phase::AttackSelect);
        assert!(h.history.is_empty());
    }

    #[test]
    fn test_attack_timeout_refunds_everything() {
        let mut h = Harness::new();
        let mut m = deployed(&mut h, Rule::Progression, &flat_layout());
        m.select_strategy("a", Strategy::BlindPick).unwrap();
        let deadline = h.last_deadline();
        assert!(m.on_deadline(&deadline, &mut h.ctx()));
        assert_eq!(h.ledger.balance("d"), STARTING_BALANCE);
        assert_eq!(h.history[0].outcome, RoundOutcome::AttackerTimeout);
        assert_eq!(h.history[0].pnl_attacker, 0);
    }

    #[test]
    fn test_comparative_burn_is_not_refunded() {
        let mut h = Harness::new();
        let boxes: Vec<BoxContent> = (0..BOX_COUNT as i32)
            .map(|i| BoxContent::new(10 + i, 0))
            .collect();
        let mut m = deployed(&mut h, Rule::Progression, &boxes);
        m.select_strategy("a", Strategy::Comparative).unwrap();
        let miss = AttackMove::Compare {
            box_a: 0,
            box_b: 1,
            guess: Comparison::Less,
        };
        m.execute_attack("a", &miss, &mut h.ctx()).unwrap();
        assert_eq!(m.game.burned, 210);
        m.finish(RoundOutcome::Normal, &mut h.ctx());

        let refund = h.ledger.balance("d") - (STARTING_BALANCE - 4_510);
        assert_eq!(refund + m.game.profit + m.game.burned, m.game.deployed);
    }

    #[test]
    fn test_advance_swaps_roles_and_concludes_after_six() {
        let mut h = Harness::new();
        let mut m = Match::new("m1".to_string(), "d".to_string(), "a".to_string(), &mut h.ctx());
        assert_eq!(m.advance(1, &mut h.ctx()), Advance::Stale);

        for round in 1..=ROUNDS_PER_MATCH {
            assert_eq!(m.round, round);
            m.finish(RoundOutcome::Normal, &mut h.ctx());
            let expected = if round == ROUNDS_PER_MATCH {
                Advance::Concluded
            } else {
                Advance::NextRound
            };
            assert_eq!(m.advance(round, &mut h.ctx()), expected);
        }
        assert!(m.concluded);
        assert_eq!(m.defender, "a");
        assert_eq!(m.advance(ROUNDS_PER_MATCH, &mut h.ctx()), Advance::Stale);
    }

    #[test]
    fn test_probe_hint_is_broadcast() {
        let mut h = Harness::new();
        let boxes: Vec<BoxContent> = (0..BOX_COUNT)
            .map(|i| if i == 4 { BoxContent::new(0, 10) } else { BoxContent::new(10, 0) })
            .collect();
        let mut m = deployed(&mut h, Rule::SingleSpecial, &boxes);
        m.select_strategy("a", Strategy::BinarySearch).unwrap();
        h.outbox.packets.clear();
        m.execute_attack("a", &AttackMove::Probe { guess_index: 10 }, &mut h.ctx())
            .unwrap();
        assert!(h.outbox.packets.iter().any(|(_, packet)| matches!(
            packet,
            ServerPacket::ProbeHint { hint: shared::Hint::Larger, count: 1, .. }
        )));
    }

    #[test]
    fn test_only_attacker_syncs_selection() {
        let mut h = Harness::new();
        let m = deployed(&mut h, Rule::Progression, &flat_layout());
        h.outbox.packets.clear();
        assert_eq!(m.sync_selection("d", &[1, 2], &mut h.ctx()), Err(ActionError::Ignored));
        m.sync_selection("a", &[1, 2], &mut h.ctx()).unwrap();
        assert_eq!(h.outbox.packets.len(), 1);
        assert!(matches!(
            &h.outbox.packets[0].1,
            ServerPacket::SelectionSync { indices, .. } if indices == &vec![1, 2]
        ));
    }
}
