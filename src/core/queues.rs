use super::types::{Client, ServiceClass};
use log::debug;
use std::collections::VecDeque;

/// The waiting area: one preferential line plus `m` general lines.
///
/// Routing and rebalancing are pure functions of the line lengths; ties
/// always go to the lowest index.
#[derive(Debug, Clone)]
pub struct QueueSet {
    preferential: VecDeque<Client>,
    general: Vec<VecDeque<Client>>,
}

impl QueueSet {
    /// Create empty lines. At least one general line always exists.
    pub fn new(general_lines: usize) -> Self {
        Self {
            preferential: VecDeque::new(),
            general: (0..general_lines.max(1)).map(|_| VecDeque::new()).collect(),
        }
    }

    pub fn preferential(&self) -> &VecDeque<Client> {
        &self.preferential
    }

    pub fn general(&self) -> &[VecDeque<Client>] {
        &self.general
    }

    pub fn general_line_count(&self) -> usize {
        self.general.len()
    }

    pub fn preferential_len(&self) -> usize {
        self.preferential.len()
    }

    /// Total clients across all general lines
    pub fn general_len(&self) -> usize {
        self.general.iter().map(VecDeque::len).sum()
    }

    pub fn total_len(&self) -> usize {
        self.preferential_len() + self.general_len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }

    /// Place an arriving client. Preferential clients join the VIP line,
    /// general clients join the shortest general line.
    /// Returns the general line index used, if any.
    pub fn enqueue(&mut self, client: Client) -> Option<usize> {
        match client.class {
            ServiceClass::Preferential => {
                self.preferential.push_back(client);
                None
            }
            ServiceClass::General => {
                let idx = self.shortest_general();
                self.general[idx].push_back(client);
                Some(idx)
            }
        }
    }

    /// Index of the shortest general line
    pub fn shortest_general(&self) -> usize {
        let mut idx = 0;
        let mut min = usize::MAX;
        for (i, line) in self.general.iter().enumerate() {
            if line.len() < min {
                min = line.len();
                idx = i;
            }
        }
        idx
    }

    /// Index of the longest non-empty general line
    pub fn fullest_general(&self) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for (i, line) in self.general.iter().enumerate() {
            let len = line.len();
            if len > best.map_or(0, |(_, l)| l) {
                best = Some((i, len));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Take the head of the VIP line
    pub fn pop_preferential(&mut self) -> Option<Client> {
        self.preferential.pop_front()
    }

    /// Take the head of the fullest general line
    pub fn pop_fullest_general(&mut self) -> Option<Client> {
        let idx = self.fullest_general()?;
        self.general[idx].pop_front()
    }

    /// Move one client from the tail of the longest general line to the
    /// shortest when their lengths differ by at least `threshold`.
    /// Returns true if a client was moved.
    pub fn rebalance(&mut self, threshold: usize) -> bool {
        if self.general.len() <= 1 {
            return false;
        }
        let (mut min, mut min_i) = (usize::MAX, 0);
        let (mut max, mut max_i) = (0usize, 0);
        for (i, line) in self.general.iter().enumerate() {
            let len = line.len();
            if len < min {
                min = len;
                min_i = i;
            }
            if len > max {
                max = len;
                max_i = i;
            }
        }
        if max - min < threshold.max(1) {
            return false;
        }
        match self.general[max_i].pop_back() {
            Some(client) => {
                debug!("Rebalanced client {} from line {} to line {}", client.id, max_i, min_i);
                self.general[min_i].push_back(client);
                true
            }
            None => false,
        }
    }

    /// Remove every client whose patience ran out at `now`.
    /// Returns the number of clients that left.
    pub fn renege(&mut self, now: f64) -> u64 {
        let mut left = 0u64;
        for line in std::iter::once(&mut self.preferential).chain(self.general.iter_mut()) {
            let before = line.len();
            line.retain(|client| !client.has_run_out_of_patience(now));
            left += (before - line.len()) as u64;
        }
        left
    }

    /// Iterate over every waiting client
    pub fn iter(&self) -> impl Iterator<Item = &Client> {
        self.preferential.iter().chain(self.general.iter().flatten())
    }
}
