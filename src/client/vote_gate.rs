//! Per-option guard against double vote submission.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::ClientError;

#[derive(Debug, Clone, Copy)]
enum GateState {
    InFlight,
    CoolingDown { until: Instant },
}

/// Admits at most one vote per option at a time, plus a cooldown after each.
///
/// Options are independent: voting on one never blocks another.
#[derive(Debug, Clone)]
pub struct VoteGate {
    cooldown: Duration,
    entries: Arc<Mutex<HashMap<i64, GateState>>>,
}

impl VoteGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Enter the critical section for `option_id`.
    ///
    /// The returned permit holds the section until dropped, after which the
    /// cooldown starts.
    pub fn try_acquire(&self, option_id: i64) -> Result<VotePermit, ClientError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        match entries.get(&option_id) {
            Some(GateState::InFlight) => {
                return Err(ClientError::StateConflict(
                    "A vote for this option is already being submitted".to_string(),
                ));
            }
            Some(GateState::CoolingDown { until }) if *until > now => {
                return Err(ClientError::StateConflict(
                    "Please wait a moment before voting again".to_string(),
                ));
            }
            _ => {}
        }

        // Expired cooldowns are dropped lazily here.
        entries.retain(|_, state| match state {
            GateState::InFlight => true,
            GateState::CoolingDown { until } => *until > now,
        });
        entries.insert(option_id, GateState::InFlight);

        Ok(VotePermit {
            option_id,
            cooldown: self.cooldown,
            entries: self.entries.clone(),
        })
    }

    pub fn is_busy(&self, option_id: i64) -> bool {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(&option_id) {
            Some(GateState::InFlight) => true,
            Some(GateState::CoolingDown { until }) => *until > Instant::now(),
            None => false,
        }
    }
}

/// Proof of holding the vote section for one option.
#[derive(Debug)]
pub struct VotePermit {
    option_id: i64,
    cooldown: Duration,
    entries: Arc<Mutex<HashMap<i64, GateState>>>,
}

impl VotePermit {
    pub fn option_id(&self) -> i64 {
        self.option_id
    }
}

impl Drop for VotePermit {
    fn drop(&mut self) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            self.option_id,
            GateState::CoolingDown {
                until: Instant::now() + self.cooldown,
            },
        );
    }
}
