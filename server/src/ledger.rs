//! Per-room token balances.

use log::debug;
use shared::{UserId, STARTING_BALANCE};

/// Balance of every seated player in a room, in seating order.
///
/// Balances are signed: deployment never overdraws, but the defender timeout
/// penalty may push a player below zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreLedger {
    balances: Vec<(UserId, i64)>,
}

impl ScoreLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seats a player at the starting balance. No-op if already seated.
    pub fn open(&mut self, user: &str) {
        if self.position(user).is_none() {
            self.balances.push((user.to_string(), STARTING_BALANCE));
        }
    }

    pub fn close(&mut self, user: &str) {
        self.balances.retain(|(id, _)| id != user);
    }

    pub fn balance(&self, user: &str) -> i64 {
        self.position(user)
            .map(|index| self.balances[index].1)
            .unwrap_or(0)
    }

    pub fn credit(&mut self, user: &str, amount: i64) {
        match self.position(user) {
            Some(index) => self.balances[index].1 += amount,
            None => {
                debug!("Opening ledger entry for {} on credit", user);
                self.balances.push((user.to_string(), amount));
            }
        }
    }

    pub fn debit(&mut self, user: &str, amount: i64) {
        self.credit(user, -amount);
    }

    pub fn transfer(&mut self, from: &str, to: &str, amount: i64) {
        self.debit(from, amount);
        self.credit(to, amount);
    }

    /// Puts every listed player back at the starting balance and drops anyone else.
    pub fn reset(&mut self, members: &[UserId]) {
        self.balances = members
            .iter()
            .map(|user| (user.clone(), STARTING_BALANCE))
            .collect();
    }

    pub fn snapshot(&self) -> Vec<(UserId, i64)> {
        self.balances.clone()
    }

    /// Highest balance; the earliest-seated player wins ties.
    pub fn leader(&self) -> Option<UserId> {
        let mut best: Option<&(UserId, i64)> = None;
        for entry in &self.balances {
            if best.map_or(true, |(_, top)| entry.1 > *top) {
                best = Some(entry);
            }
        }
        best.map(|(user, _)| user.clone())
    }

    fn position(&self, user: &str) -> Option<usize> {
        self.balances.iter().position(|(id, _)| id == user)
    }
}
