use tracing::debug;

/// Per-match net-score aggregation over a stream of game results.
///
/// Each game names two contenders and a signed outcome: +1 the first
/// contender won, -1 the second won, 0 a draw. Discarded once a winner
/// is resolved.
#[derive(Debug, Clone)]
pub struct Scoreboard {
    scores: Vec<i32>,
    games_expected: usize,
    games_seen: usize,
}

impl Scoreboard {
    pub fn new(contenders: usize, games_expected: usize) -> Self {
        Self {
            scores: vec![0; contenders],
            games_expected,
            games_seen: 0,
        }
    }

    pub fn record(&mut self, first: usize, second: usize, outcome: i32) {
        if first >= self.scores.len() || second >= self.scores.len() || first == second {
            debug!("Dropping game result with bad contender pair ({first}, {second})");
            return;
        }
        self.scores[first] += outcome;
        self.scores[second] -= outcome;
        self.games_seen += 1;
    }

    /// Index of the maximum net score; ties go to the lowest index.
    pub fn winner(&self) -> usize {
        let mut best = 0;
        for (idx, &score) in self.scores.iter().enumerate() {
            if score > self.scores[best] {
                best = idx;
            }
        }
        best
    }

    pub fn score(&self, contender: usize) -> i32 {
        self.scores[contender]
    }

    /// Leader's net score minus the runner-up's.
    pub fn margin(&self) -> i32 {
        let leader = self.winner();
        let runner_up = self
            .scores
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != leader)
            .map(|(_, &s)| s)
            .max()
            .unwrap_or(0);
        self.scores[leader] - runner_up
    }

    pub fn games_seen(&self) -> usize {
        self.games_seen
    }

    pub fn games_remaining(&self) -> usize {
        self.games_expected.saturating_sub(self.games_seen)
    }

    pub fn is_complete(&self) -> bool {
        self.games_seen >= self.games_expected
    }

    /// True once the outcome can no longer change: all games played, or
    /// the lead is larger than the remaining games can swing (each game
    /// moves a pairwise difference by at most 2).
    pub fn is_decided(&self) -> bool {
        self.is_complete() || self.margin() > 2 * self.games_remaining() as i32
    }
}
