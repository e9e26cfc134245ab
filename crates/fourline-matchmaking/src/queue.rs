//! The waiting queue: plain data, owned by the coordinator task.
//!
//! Entries are kept in join order by a per-queue ticket. Every removal
//! path ([`remove`](WaitingQueue::remove), [`take_if_ticket`](WaitingQueue::take_if_ticket),
//! [`next_pair`](WaitingQueue::next_pair)) takes the entry out of the map,
//! so an entry can leave the queue only once. Dropping an entry cancels
//! its bot-escalation timer.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use fourline_protocol::{MatchPreferences, PlayerId};
use fourline_session::{PlayerProfile, SharedHandle};
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::QueueError;

/// A waiting player.
pub struct QueueEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub joined_at: Instant,
    pub preferences: MatchPreferences,
    /// Join order within the queue. Also identifies this particular stay,
    /// so a stale timer for an earlier stay can be told apart.
    pub ticket: u64,
    /// Where to send `game_found`.
    pub handle: SharedHandle,
    escalation: Option<AbortHandle>,
}

impl QueueEntry {
    pub fn profile(&self) -> PlayerProfile {
        PlayerProfile::human(self.player_id, self.name.clone())
    }

    pub fn waited(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.joined_at)
    }

    /// Stops the pending bot escalation, if any. Idempotent.
    pub fn cancel_escalation(&mut self) {
        if let Some(timer) = self.escalation.take() {
            timer.abort();
        }
    }

    pub fn has_escalation(&self) -> bool {
        self.escalation.is_some()
    }
}

impl Drop for QueueEntry {
    fn drop(&mut self) {
        self.cancel_escalation();
    }
}

impl std::fmt::Debug for QueueEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueEntry")
            .field("player_id", &self.player_id)
            .field("name", &self.name)
            .field("ticket", &self.ticket)
            .field("preferences", &self.preferences)
            .finish_non_exhaustive()
    }
}

/// Counters since the queue was created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Entries currently waiting.
    pub size: usize,
    pub total_joined: u64,
    pub total_left: u64,
    /// Human-vs-human matches.
    pub total_matched: u64,
    pub total_bot_matches: u64,
    /// Mean time from join to match over every matched entry.
    pub average_wait: Duration,
}

/// Where a new entry landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub ticket: u64,
    /// 1-based FIFO position.
    pub position: usize,
    pub queue_size: usize,
}

#[derive(Debug)]
pub struct WaitingQueue {
    entries: HashMap<PlayerId, QueueEntry>,
    order: BTreeMap<u64, PlayerId>,
    capacity: usize,
    next_ticket: u64,
    stats: QueueStats,
    wait_total: Duration,
    waits_counted: u32,
}

impl WaitingQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            capacity,
            next_ticket: 0,
            stats: QueueStats::default(),
            wait_total: Duration::ZERO,
            waits_counted: 0,
        }
    }

    /// Adds a player at the back of the queue.
    ///
    /// # Errors
    /// [`QueueError::AlreadyQueued`] if the id is waiting already,
    /// [`QueueError::QueueFull`] at capacity.
    pub fn insert(
        &mut self,
        player_id: PlayerId,
        name: String,
        preferences: MatchPreferences,
        handle: SharedHandle,
        now: Instant,
    ) -> Result<Placement, QueueError> {
        if self.entries.contains_key(&player_id) {
            return Err(QueueError::AlreadyQueued(player_id));
        }
        if self.entries.len() >= self.capacity {
            return Err(QueueError::QueueFull {
                capacity: self.capacity,
            });
        }

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.entries.insert(
            player_id,
            QueueEntry {
                player_id,
                name,
                joined_at: now,
                preferences,
                ticket,
                handle,
                escalation: None,
            },
        );
        self.order.insert(ticket, player_id);
        self.stats.total_joined += 1;

        Ok(Placement {
            ticket,
            position: self.order.len(),
            queue_size: self.entries.len(),
        })
    }

    /// Attaches the escalation timer to a waiting entry. If the entry is
    /// gone, the timer is aborted right away.
    pub fn arm(&mut self, player_id: PlayerId, ticket: u64, timer: AbortHandle) {
        match self.entries.get_mut(&player_id) {
            Some(entry) if entry.ticket == ticket => {
                entry.cancel_escalation();
                entry.escalation = Some(timer);
            }
            _ => timer.abort(),
        }
    }

    /// Removes a player who asked to leave.
    ///
    /// # Errors
    /// [`QueueError::NotInQueue`] if the id is not waiting.
    pub fn remove(&mut self, player_id: PlayerId) -> Result<QueueEntry, QueueError> {
        let entry = self.take(player_id).ok_or(QueueError::NotInQueue(player_id))?;
        self.stats.total_left += 1;
        Ok(entry)
    }

    /// Removes the entry only if it is still the stay identified by
    /// `ticket`. `None` means someone else already took it.
    pub fn take_if_ticket(&mut self, player_id: PlayerId, ticket: u64) -> Option<QueueEntry> {
        match self.entries.get(&player_id) {
            Some(entry) if entry.ticket == ticket => self.take(player_id),
            _ => None,
        }
    }

    /// Removes and returns the two oldest compatible entries, oldest
    /// first.
    ///
    /// Entries are compatible when their skill levels differ by at most
    /// `tolerance`.
    pub fn next_pair(&mut self, tolerance: u8) -> Option<(QueueEntry, QueueEntry)> {
        let waiting: Vec<(PlayerId, u8)> = self
            .order
            .values()
            .filter_map(|id| self.entries.get(id))
            .map(|e| (e.player_id, e.preferences.skill_level))
            .collect();

        let (first, second) = waiting.iter().enumerate().find_map(|(i, &(a, skill_a))| {
            waiting[i + 1..]
                .iter()
                .find(|&&(_, skill_b)| skill_a.abs_diff(skill_b) <= tolerance)
                .map(|&(b, _)| (a, b))
        })?;

        let first = self.take(first)?;
        let second = self.take(second)?;
        Some((first, second))
    }

    /// Records a completed match for the statistics.
    pub fn record_match(&mut self, waits: &[Duration], vs_bot: bool) {
        if vs_bot {
            self.stats.total_bot_matches += 1;
        } else {
            self.stats.total_matched += 1;
        }
        for wait in waits {
            self.wait_total += *wait;
            self.waits_counted += 1;
        }
        if self.waits_counted > 0 {
            self.stats.average_wait = self.wait_total / self.waits_counted;
        }
    }

    /// 1-based FIFO position of a waiting player.
    pub fn position(&self, player_id: PlayerId) -> Option<usize> {
        let ticket = self.entries.get(&player_id)?.ticket;
        Some(self.order.range(..ticket).count() + 1)
    }

    pub fn get(&self, player_id: PlayerId) -> Option<&QueueEntry> {
        self.entries.get(&player_id)
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.entries.contains_key(&player_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            size: self.entries.len(),
            ..self.stats.clone()
        }
    }

    /// Empties the queue, cancelling every pending escalation.
    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }

    fn take(&mut self, player_id: PlayerId) -> Option<QueueEntry> {
        let entry = self.entries.remove(&player_id)?;
        self.order.remove(&entry.ticket);
        Some(entry)
    }
}
