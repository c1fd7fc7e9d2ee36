//! Per-user turn ordering.
//!
//! Each user gets a lane handing out numbered tickets. A ticket is taken
//! synchronously when an event arrives, so arrival order is fixed before any
//! task is spawned; the holder then waits until the lane serves its number.
//! Lanes of different users never share a lock beyond the brief map lookup.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::domain::UserId;

type Lanes = Arc<Mutex<HashMap<UserId, Arc<Lane>>>>;

#[derive(Default)]
struct Lane {
    state: Mutex<LaneState>,
    turn_changed: Notify,
}

#[derive(Default)]
struct LaneState {
    next_ticket: u64,
    serving: u64,
    abandoned: BTreeSet<u64>,
    outstanding: usize,
}

impl LaneState {
    fn advance(&mut self) {
        self.serving += 1;
        while self.abandoned.remove(&self.serving) {
            self.serving += 1;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Default)]
pub struct UserSequencer {
    lanes: Lanes,
}

impl UserSequencer {
    /// Reserves the next turn for `user_id`. Never blocks.
    pub fn enter(&self, user_id: &UserId) -> Ticket {
        let mut lanes = lock(&self.lanes);
        let lane = Arc::clone(lanes.entry(user_id.clone()).or_default());
        let number = {
            let mut state = lock(&lane.state);
            let number = state.next_ticket;
            state.next_ticket += 1;
            state.outstanding += 1;
            number
        };
        drop(lanes);

        Ticket {
            slot: Some(Slot {
                user_id: user_id.clone(),
                number,
                lane,
                lanes: Arc::clone(&self.lanes),
            }),
        }
    }

    /// Users with at least one outstanding ticket.
    pub fn active_lanes(&self) -> usize {
        lock(&self.lanes).len()
    }
}

struct Slot {
    user_id: UserId,
    number: u64,
    lane: Arc<Lane>,
    lanes: Lanes,
}

impl Slot {
    /// Gives up this slot's number, whether it was being served or still
    /// waiting, then prunes the lane if nobody else holds a ticket.
    fn release(self) {
        {
            let mut state = lock(&self.lane.state);
            if state.serving == self.number {
                state.advance();
            } else if state.serving < self.number {
                state.abandoned.insert(self.number);
            }
            state.outstanding = state.outstanding.saturating_sub(1);
        }
        self.lane.turn_changed.notify_waiters();

        let mut lanes = lock(&self.lanes);
        let idle = lanes.get(&self.user_id).is_some_and(|current| {
            Arc::ptr_eq(current, &self.lane) && lock(&current.state).outstanding == 0
        });
        if idle {
            lanes.remove(&self.user_id);
        }
    }
}

/// A reserved position in one user's lane. Dropping it before admission
/// forfeits the turn without stalling later tickets.
pub struct Ticket {
    slot: Option<Slot>,
}

impl Ticket {
    /// Waits until every earlier ticket for the same user has been released.
    /// Cancelling the wait drops the ticket, which forfeits the turn.
    pub async fn admit(mut self) -> TurnGuard {
        loop {
            let Some(slot) = self.slot.as_ref() else {
                return TurnGuard { slot: None };
            };
            let lane = Arc::clone(&slot.lane);
            let number = slot.number;

            let notified = lane.turn_changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if lock(&lane.state).serving == number {
                break;
            }
            notified.await;
        }

        TurnGuard { slot: self.slot.take() }
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.release();
        }
    }
}

/// Exclusive access to one user's session until dropped.
pub struct TurnGuard {
    slot: Option<Slot>,
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tokio::time::timeout;

    use super::UserSequencer;
    use crate::domain::UserId;

    #[tokio::test]
    async fn same_user_is_admitted_in_ticket_order() {
        let sequencer = UserSequencer::default();
        let user = UserId::new("573001112233");
        let order = Arc::new(Mutex::new(Vec::new()));

        let tickets: Vec<_> = (0..4).map(|_| sequencer.enter(&user)).collect();
        let mut handles = Vec::new();
        for (index, ticket) in tickets.into_iter().enumerate().rev() {
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let _turn = ticket.admit().await;
                tokio::time::sleep(Duration::from_millis(5)).await;
                order.lock().expect("order lock").push(index);
            }));
        }
        for handle in handles {
            handle.await.expect("task completes");
        }

        assert_eq!(*order.lock().expect("order lock"), vec![0, 1, 2, 3]);
        assert_eq!(sequencer.active_lanes(), 0);
    }

    #[tokio::test]
    async fn other_users_are_not_blocked() {
        let sequencer = UserSequencer::default();
        let busy = sequencer.enter(&UserId::new("57300")).admit().await;
        let _queued = sequencer.enter(&UserId::new("57300"));

        let other_user = sequencer.enter(&UserId::new("57301"));
        let other = timeout(Duration::from_millis(200), other_user.admit()).await;
        assert!(other.is_ok(), "a different user must be admitted immediately");
        drop(busy);
    }

    #[tokio::test]
    async fn dropped_ticket_does_not_stall_the_lane() {
        let sequencer = UserSequencer::default();
        let user = UserId::new("57300");

        let first = sequencer.enter(&user).admit().await;
        let second = sequencer.enter(&user);
        let third = sequencer.enter(&user);

        drop(second);
        drop(first);

        let admitted = timeout(Duration::from_millis(200), third.admit()).await;
        assert!(admitted.is_ok(), "third ticket must be served after the gap");
        drop(admitted);
        assert_eq!(sequencer.active_lanes(), 0);
    }

    #[tokio::test]
    async fn cancelled_wait_releases_its_turn() {
        let sequencer = UserSequencer::default();
        let user = UserId::new("57300");

        let first = sequencer.enter(&user).admit().await;
        let second = sequencer.enter(&user);
        let third = sequencer.enter(&user);

        let cancelled = timeout(Duration::from_millis(20), second.admit()).await;
        assert!(cancelled.is_err(), "second must still be waiting behind first");

        drop(first);
        let admitted = timeout(Duration::from_millis(200), third.admit()).await;
        assert!(admitted.is_ok());
    }
}
