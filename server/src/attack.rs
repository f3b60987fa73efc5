//! The four attack strategies, resolved against a deployed table of boxes.

use crate::error::ActionError;
use shared::{
    BoxContent, Comparison, Grade, Hint, PublicBox, Role, S4View, BOX_COUNT, LUCKY_GUESSES,
    REVEALS_PER_PHASE,
};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxSlot {
    pub content: BoxContent,
    pub taken: bool,
}

/// The private layout of one round alongside its public projection.
///
/// Raw slots never leave the server; clients only ever receive `public`.
#[derive(Debug, Clone)]
pub struct Table {
    slots: Vec<BoxSlot>,
    public: Vec<PublicBox>,
}

impl Table {
    pub fn deploy(boxes: &[BoxContent]) -> Self {
        let slots = boxes
            .iter()
            .map(|content| BoxSlot {
                content: *content,
                taken: false,
            })
            .collect();
        let public = boxes
            .iter()
            .enumerate()
            .map(|(id, content)| PublicBox::hidden(id, Grade::for_tokens(content.tokens())))
            .collect();
        Self { slots, public }
    }

    pub fn public(&self) -> &[PublicBox] {
        &self.public
    }

    pub fn content(&self, index: usize) -> Option<BoxContent> {
        self.slots.get(index).map(|slot| slot.content)
    }

    pub fn is_open(&self, index: usize) -> bool {
        self.slots.get(index).map_or(false, |slot| !slot.taken)
    }

    /// Value of every box still on the table.
    pub fn untaken_value(&self) -> i64 {
        self.slots
            .iter()
            .filter(|slot| !slot.taken)
            .map(|slot| slot.content.value())
            .sum()
    }

    /// Index of the box holding 100-value tokens.
    pub fn special_index(&self) -> Option<usize> {
        self.slots.iter().position(|slot| slot.content.c100 > 0)
    }

    pub fn reveal(&mut self, index: usize) {
        let content = self.slots[index].content;
        self.public[index].reveal(content);
    }

    /// Reveals and removes a box, returning its value.
    pub fn take(&mut self, index: usize) -> i64 {
        self.reveal(index);
        self.public[index].taken = true;
        let slot = &mut self.slots[index];
        slot.taken = true;
        slot.content.value()
    }

    pub fn hide_open_boxes(&mut self) {
        for (slot, public) in self.slots.iter().zip(self.public.iter_mut()) {
            if !slot.taken {
                public.hide();
            }
        }
    }
}

/// Value movement caused by one attacker action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Credited to the attacker.
    pub profit: i64,
    /// Consumed without credit and excluded from the refund.
    pub burned: i64,
    /// The strategy has run its course and the round should finalize.
    pub finished: bool,
    pub hint: Option<Hint>,
}

/// Strategy 1: take one box at full value.
pub fn blind_pick(
    table: &mut Table,
    remaining: &mut u8,
    index: usize,
) -> Result<Resolution, ActionError> {
    if *remaining == 0 || !table.is_open(index) {
        return Err(ActionError::Ignored);
    }
    let profit = table.take(index);
    *remaining -= 1;
    Ok(Resolution {
        profit,
        finished: *remaining == 0,
        ..Resolution::default()
    })
}

/// Strategy 2: guess whether box B is worth at least box A.
///
/// A correct guess takes both boxes for their combined value. A wrong guess
/// still consumes both, and their value is burned rather than refunded.
pub fn compare(
    table: &mut Table,
    remaining: &mut u8,
    box_a: usize,
    box_b: usize,
    guess: Comparison,
) -> Result<Resolution, ActionError> {
    if *remaining == 0 || box_a == box_b || !table.is_open(box_a) || !table.is_open(box_b) {
        return Err(ActionError::Ignored);
    }
    let value_a = table.take(box_a);
    let value_b = table.take(box_b);
    let correct = match guess {
        Comparison::MoreOrEqual => value_b >= value_a,
        Comparison::Less => value_b < value_a,
    };
    *remaining -= 1;

    let mut resolution = Resolution {
        finished: *remaining == 0,
        ..Resolution::default()
    };
    if correct {
        resolution.profit = value_a + value_b;
    } else {
        resolution.burned = value_a + value_b;
    }
    Ok(resolution)
}

/// Strategy 3: search for the special box, with a jackpot on lucky turns.
pub fn probe(
    table: &mut Table,
    guesses: &mut u32,
    guess: usize,
) -> Result<Resolution, ActionError> {
    let special = table.special_index().ok_or(ActionError::Ignored)?;
    if guess >= BOX_COUNT {
        return Err(ActionError::Ignored);
    }
    *guesses += 1;

    if guess != special {
        let hint = if guess > special { Hint::Larger } else { Hint::Smaller };
        return Ok(Resolution {
            hint: Some(hint),
            ..Resolution::default()
        });
    }

    let profit = if LUCKY_GUESSES.contains(guesses) {
        let open: Vec<usize> = (0..BOX_COUNT).filter(|&index| table.is_open(index)).collect();
        open.into_iter().map(|index| table.take(index)).sum()
    } else {
        table.take(special)
    };
    Ok(Resolution {
        profit,
        finished: true,
        ..Resolution::default()
    })
}

/// Sub-game state for strategy 4.
///
/// Stages: 0 attacker names X, 1 attacker reveals, 2 defender names Y,
/// 3 attacker reveals, 4 attacker picks the payout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S4State {
    pub stage: u8,
    pub target_x: u8,
    pub target_y: u8,
    pub revealed_phase1: Vec<usize>,
    pub revealed_phase2: Vec<usize>,
    pub wins: u8,
}

impl S4State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit_target(
        &mut self,
        table: &mut Table,
        role: Role,
        target: u8,
    ) -> Result<(), ActionError> {
        if target < 1 || target as usize > BOX_COUNT {
            return Err(ActionError::Ignored);
        }
        match (self.stage, role) {
            (0, Role::Attacker) => {
                self.target_x = target;
                self.stage = 1;
            }
            (2, Role::Defender) => {
                self.target_y = target;
                self.stage = 3;
                table.hide_open_boxes();
            }
            _ => return Err(ActionError::Ignored),
        }
        Ok(())
    }

    fn current_reveals(&mut self) -> Option<&mut Vec<usize>> {
        match self.stage {
            1 => Some(&mut self.revealed_phase1),
            3 => Some(&mut self.revealed_phase2),
            _ => None,
        }
    }

    /// Reveals one box. Returns true when this was the last reveal of the phase.
    pub fn reveal(&mut self, table: &mut Table, index: usize) -> Result<bool, ActionError> {
        let revealed = self.current_reveals().ok_or(ActionError::Ignored)?;
        if revealed.len() >= REVEALS_PER_PHASE
            || revealed.contains(&index)
            || !table.is_open(index)
        {
            return Err(ActionError::Ignored);
        }
        revealed.push(index);
        let complete = revealed.len() == REVEALS_PER_PHASE;
        table.reveal(index);
        Ok(complete)
    }

    /// Scores a completed reveal phase and moves to the next stage.
    ///
    /// Returns whether the target was found, or `None` if `stage` is not a
    /// completed reveal phase.
    pub fn settle(&mut self, table: &mut Table, stage: u8) -> Option<bool> {
        if self.stage != stage {
            return None;
        }
        let (revealed, target) = match stage {
            1 => (&self.revealed_phase1, self.target_x),
            3 => (&self.revealed_phase2, self.target_y),
            _ => return None,
        };
        if revealed.len() < REVEALS_PER_PHASE {
            return None;
        }
        let found = revealed
            .iter()
            .filter_map(|&index| table.content(index))
            .any(|content| content.c10 == target as i32);
        if found {
            self.wins += 1;
        }
        table.hide_open_boxes();
        self.stage += 1;
        Some(found)
    }

    /// Required number of picks, or `None` when any number is allowed.
    pub fn pick_limit(&self) -> Option<usize> {
        match self.wins {
            0 => Some(5),
            1 => Some(7),
            _ => None,
        }
    }

    pub fn execute_pick(
        &mut self,
        table: &mut Table,
        indices: &[usize],
    ) -> Result<Resolution, ActionError> {
        if self.stage != 4 {
            return Err(ActionError::Ignored);
        }
        let picks: BTreeSet<usize> = indices
            .iter()
            .copied()
            .filter(|&index| table.is_open(index))
            .collect();
        if let Some(limit) = self.pick_limit() {
            if picks.len() != limit || indices.len() != limit {
                return Err(ActionError::WrongPickCount(limit));
            }
        }
        let profit = picks.into_iter().map(|index| table.take(index)).sum();
        Ok(Resolution {
            profit,
            finished: true,
            ..Resolution::default()
        })
    }

    pub fn view(&self) -> S4View {
        S4View {
            stage: self.stage,
            target_x: self.target_x,
            target_y: self.target_y,
            revealed_phase1: self.revealed_phase1.clone(),
            revealed_phase2: self.revealed_phase2.clone(),
            wins: self.wins,
        }
    }
}
