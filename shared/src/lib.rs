use serde::{Deserialize, Serialize};

pub mod protocol;

pub use protocol::{Action, AttackMove, ClientPacket, ServerPacket};

pub type UserId = String;
pub type RoomId = String;
pub type MatchId = String;

pub const BOX_COUNT: usize = 22;
pub const ROUNDS_PER_MATCH: u8 = 6;
pub const STARTING_BALANCE: i64 = 10_000;
pub const MIN_DEPLOYMENT: i64 = 3_000;
pub const DEFENSE_TIMEOUT_PENALTY: i64 = 3_000;
pub const MAX_ROOM_PLAYERS: usize = 10;
pub const ATTACK_ATTEMPTS: u8 = 8;
pub const REVEALS_PER_PHASE: usize = 7;
pub const LUCKY_GUESSES: [u32; 5] = [1, 2, 3, 7, 8];
/// Chat messages kept per room and replayed in snapshots.
pub const CHAT_LOG_LIMIT: usize = 20;
pub const MAX_CHAT_CHARS: usize = 200;

/// Placement constraint the defender commits to before deploying.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Sorted box values form an arithmetic progression.
    Progression = 1,
    /// Equal token counts, exactly one box of 100-value tokens.
    SingleSpecial = 2,
    /// 10-value counts are a permutation of 1..=22.
    Permutation = 3,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    BlindPick = 1,
    Comparative = 2,
    BinarySearch = 3,
    TwoPhaseTarget = 4,
}

impl Strategy {
    /// Whether the attacker may use this strategy against `rule`.
    pub fn is_compatible_with(self, rule: Rule) -> bool {
        match self {
            Strategy::BlindPick => true,
            Strategy::Comparative => rule == Rule::Progression,
            Strategy::BinarySearch => rule == Rule::SingleSpecial,
            Strategy::TwoPhaseTarget => rule == Rule::Permutation,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    AttackSelect,
    Attacking,
    Finishing,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Lobby,
    Game,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Defender,
    Attacker,
    Spectator,
    Bye,
}

/// Why a round ended.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    Normal,
    DefenderTimeout,
    AttackerTimeout,
}

/// Coarse size hint shown for hidden boxes.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    Few,
    Moderate,
    Many,
}

impl Grade {
    pub fn for_tokens(total_tokens: i64) -> Self {
        if total_tokens <= 10 {
            Grade::Few
        } else if total_tokens <= 20 {
            Grade::Moderate
        } else {
            Grade::Many
        }
    }
}

/// Guess made with the comparative strategy: is box B worth at least box A?
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    MoreOrEqual,
    Less,
}

/// Direction hint for a missed binary-search guess, relative to the special box.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    Larger,
    Smaller,
}

/// Token counts the defender places in one box.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoxContent {
    pub c10: i32,
    pub c100: i32,
}

impl BoxContent {
    pub fn new(c10: i32, c100: i32) -> Self {
        Self { c10, c100 }
    }

    pub fn value(&self) -> i64 {
        self.c10 as i64 * 10 + self.c100 as i64 * 100
    }

    pub fn tokens(&self) -> i64 {
        self.c10 as i64 + self.c100 as i64
    }
}

/// What every client may see of a box.
///
/// `real_c10` and `real_c100` stay zero until the engine reveals the box.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PublicBox {
    pub id: usize,
    pub grade: Grade,
    pub revealed: bool,
    pub taken: bool,
    pub real_c10: i32,
    pub real_c100: i32,
}

impl PublicBox {
    pub fn hidden(id: usize, grade: Grade) -> Self {
        Self {
            id,
            grade,
            revealed: false,
            taken: false,
            real_c10: 0,
            real_c100: 0,
        }
    }

    pub fn reveal(&mut self, content: BoxContent) {
        self.revealed = true;
        self.real_c10 = content.c10;
        self.real_c100 = content.c100;
    }

    pub fn hide(&mut self) {
        self.revealed = false;
        self.real_c10 = 0;
        self.real_c100 = 0;
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MatchSummary {
    pub id: MatchId,
    pub p1: UserId,
    pub p2: UserId,
    pub round: u8,
    pub phase: Phase,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct S4View {
    pub stage: u8,
    pub target_x: u8,
    pub target_y: u8,
    pub revealed_phase1: Vec<usize>,
    pub revealed_phase2: Vec<usize>,
    pub wins: u8,
}

/// Public projection of one match.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MatchView {
    pub id: MatchId,
    pub p1: UserId,
    pub p2: UserId,
    pub defender: UserId,
    pub attacker: UserId,
    pub round: u8,
    pub phase: Phase,
    pub rule: Option<Rule>,
    pub strategy: Option<Strategy>,
    pub boxes: Vec<PublicBox>,
    pub attempts: Option<u8>,
    pub guesses: Option<u32>,
    pub s4: Option<S4View>,
}

/// Per-user game state pushed after every change.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GameView {
    pub room_id: RoomId,
    pub role: Role,
    pub match_id: Option<MatchId>,
    pub matches: Vec<MatchSummary>,
    pub scores: Vec<(UserId, i64)>,
    pub current: Option<MatchView>,
    pub round_deadline: u64,
    pub server_time: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub match_id: MatchId,
    pub round: u8,
    pub defender: UserId,
    pub attacker: UserId,
    pub rule: Option<Rule>,
    pub strategy: Option<Strategy>,
    pub outcome: RoundOutcome,
    pub pnl_attacker: i64,
    pub pnl_defender: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LobbyEntry {
    pub id: RoomId,
    pub owner: UserId,
    pub count: usize,
    pub state: RoomState,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub owner: UserId,
    pub state: RoomState,
    pub players: Vec<UserId>,
    pub ready: Vec<(UserId, bool)>,
    pub scores: Vec<(UserId, i64)>,
    pub bye: Option<UserId>,
    pub chat: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Chat,
    Info,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub user: String,
    pub text: String,
    pub kind: ChatKind,
}

impl ChatMessage {
    pub fn chat(user: &str, text: &str) -> Self {
        Self {
            user: user.to_string(),
            text: text.to_string(),
            kind: ChatKind::Chat,
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            user: "referee".to_string(),
            text: text.into(),
            kind: ChatKind::Info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_value() {
        assert_eq!(BoxContent::new(3, 2).value(), 230);
        assert_eq!(BoxContent::new(0, 0).value(), 0);
        assert_eq!(BoxContent::new(20, 0).tokens(), 20);
    }

    #[test]
    fn test_grade_thresholds() {
        assert_eq!(Grade::for_tokens(1), Grade::Few);
        assert_eq!(Grade::for_tokens(10), Grade::Few);
        assert_eq!(Grade::for_tokens(11), Grade::Moderate);
        assert_eq!(Grade::for_tokens(20), Grade::Moderate);
        assert_eq!(Grade::for_tokens(21), Grade::Many);
    }

    #[test]
    fn test_strategy_compatibility() {
        for rule in [Rule::Progression, Rule::SingleSpecial, Rule::Permutation] {
            assert!(Strategy::BlindPick.is_compatible_with(rule));
        }
        assert!(Strategy::Comparative.is_compatible_with(Rule::Progression));
        assert!(!Strategy::Comparative.is_compatible_with(Rule::Permutation));
        assert!(Strategy::BinarySearch.is_compatible_with(Rule::SingleSpecial));
        assert!(!Strategy::BinarySearch.is_compatible_with(Rule::Progression));
        assert!(Strategy::TwoPhaseTarget.is_compatible_with(Rule::Permutation));
        assert!(!Strategy::TwoPhaseTarget.is_compatible_with(Rule::SingleSpecial));
    }

    #[test]
    fn test_public_box_hide_clears_values() {
        let mut public = PublicBox::hidden(4, Grade::Moderate);
        public.reveal(BoxContent::new(12, 1));
        assert!(public.revealed);
        assert_eq!(public.real_c10, 12);

        public.hide();
        assert!(!public.revealed);
        assert_eq!(public.real_c10, 0);
        assert_eq!(public.real_c100, 0);
    }
}
