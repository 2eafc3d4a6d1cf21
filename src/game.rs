//! Guess/clue state machine. Owns the attempt counter, duplicate tracking,
//! the clue unlock schedule and the win/loss transition, and persists the
//! session on every state-changing step. Rendering is a projection of this
//! state, never the reverse.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::logging::{log, obj, v_str, Domain, Level};
use crate::model::{FinancialMetrics, StockRecord};
use crate::roster::Roster;
use crate::stats::{LifetimeStats, STATS_KEY};
use crate::storage::Store;

pub const SESSION_KEY: &str = "current_session";

/// A clue about the daily answer, gated behind a wrong-guess threshold.
/// `unlock_at_attempt == 1` is visible from game start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClueDefinition {
    pub id: String,
    pub title: String,
    pub unlock_at_attempt: u32,
    pub value: String,
}

/// One accepted guess, in arrival order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuessRecord {
    pub name: String,
    pub ticker: String,
    pub sector: String,
    pub is_correct: bool,
    pub attempt_index: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    pub date: NaiveDate,
    /// 1-based; never exceeds `max_attempts + 1`.
    pub current_attempt: u32,
    pub max_attempts: u32,
    pub game_over: bool,
    pub won: bool,
    /// One canonical identifier (base ticker) per accepted guess.
    pub guessed_identifiers: BTreeSet<String>,
    pub guesses: Vec<GuessRecord>,
    /// Clue ids revealed so far; never shrinks within a session.
    pub unlocked_clues: BTreeSet<String>,
}

impl GameSession {
    pub fn new(date: NaiveDate, max_attempts: u32) -> Self {
        Self {
            date,
            current_attempt: 1,
            max_attempts,
            game_over: false,
            won: false,
            guessed_identifiers: BTreeSet::new(),
            guesses: Vec::new(),
            unlocked_clues: BTreeSet::new(),
        }
    }

    pub fn attempts_left(&self) -> u32 {
        self.max_attempts.saturating_sub(self.current_attempt - 1)
    }
}

/// Typed rejections from `submit_guess`. None of these mutate state or
/// consume an attempt; all surface as transient messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuessError {
    /// Input matched no roster entry.
    NotFound,
    /// Identifier already guessed this session.
    Duplicate,
    /// Session already finished.
    GameOver,
}

impl fmt::Display for GuessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuessError::NotFound => write!(f, "no listed company matches that guess"),
            GuessError::Duplicate => write!(f, "that company was already guessed today"),
            GuessError::GameOver => write!(f, "today's game is already finished"),
        }
    }
}

impl std::error::Error for GuessError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuessOutcome {
    Won { attempt: u32 },
    Incorrect { next_attempt: u32, newly_unlocked: Vec<String> },
    Lost,
}

/// The explicit per-day game instance: daily answer, roster, clue set,
/// session and stats, persisted through the injected store.
pub struct Game {
    pub answer: StockRecord,
    pub roster: Roster,
    pub clues: Vec<ClueDefinition>,
    pub session: GameSession,
    pub stats: LifetimeStats,
    store: Box<dyn Store>,
}

impl Game {
    /// Builds today's game, rehydrating a stored session when its date
    /// matches `today` and discarding it otherwise. Lifetime stats always
    /// carry over.
    pub fn new(
        answer: StockRecord,
        roster: Roster,
        clues: Vec<ClueDefinition>,
        mut store: Box<dyn Store>,
        today: NaiveDate,
        max_attempts: u32,
    ) -> Self {
        let session = restore_session(store.as_mut(), today, max_attempts);
        let stats = restore_stats(store.as_mut());
        let mut game = Game { answer, roster, clues, session, stats, store };
        game.unlock_reached_clues();
        game
    }

    /// Submits one guess. Invalid and duplicate inputs are rejected without
    /// consuming an attempt; a valid novel guess either wins or advances the
    /// attempt counter, unlocking any newly reached clues.
    pub fn submit_guess(&mut self, input: &str) -> Result<GuessOutcome, GuessError> {
        if self.session.game_over {
            return Err(GuessError::GameOver);
        }
        let entry = self.roster.find(input).ok_or(GuessError::NotFound)?;
        // Every input resolves to a roster entry first, so the entry's base
        // ticker is the one canonical identifier per company.
        let identifier = entry.ticker.to_lowercase();
        if self.session.guessed_identifiers.contains(&identifier) {
            return Err(GuessError::Duplicate);
        }

        // Base-ticker equality is the only authoritative win check; a name
        // match merely resolves the guess to a roster entry.
        let is_correct = entry.ticker == self.answer.ticker;
        let attempt = self.session.current_attempt;
        let record = GuessRecord {
            name: entry.name.clone(),
            ticker: entry.ticker.clone(),
            sector: entry.sector.clone(),
            is_correct,
            attempt_index: attempt,
        };
        self.session.guessed_identifiers.insert(identifier);
        self.session.guesses.push(record);

        let outcome = if is_correct {
            self.session.won = true;
            self.session.game_over = true;
            self.unlock_all_clues();
            self.stats.record_outcome(true, attempt);
            GuessOutcome::Won { attempt }
        } else {
            let next = attempt + 1;
            self.session.current_attempt = next;
            if next > self.session.max_attempts {
                self.session.game_over = true;
                self.unlock_all_clues();
                self.stats.record_outcome(false, self.session.max_attempts);
                GuessOutcome::Lost
            } else {
                let newly_unlocked = self.unlock_reached_clues();
                GuessOutcome::Incorrect { next_attempt: next, newly_unlocked }
            }
        };

        log(
            Level::Info,
            Domain::Game,
            "guess_submitted",
            obj(&[
                ("ticker", v_str(&self.session.guesses.last().map(|g| g.ticker.clone()).unwrap_or_default())),
                ("attempt", json!(attempt)),
                ("correct", json!(is_correct)),
                ("game_over", json!(self.session.game_over)),
            ]),
        );
        self.persist();
        Ok(outcome)
    }

    /// Clues visible right now, schedule order. Unlocks are monotonic: a
    /// revealed clue stays revealed for the rest of the session.
    pub fn unlocked_clues(&self) -> Vec<&ClueDefinition> {
        self.clues
            .iter()
            .filter(|c| self.session.unlocked_clues.contains(&c.id))
            .collect()
    }

    /// Guesses newest first, for display.
    pub fn guesses_recent_first(&self) -> impl Iterator<Item = &GuessRecord> {
        self.session.guesses.iter().rev()
    }

    pub fn suggestions(&self, fragment: &str, limit: usize) -> Vec<&crate::model::RosterEntry> {
        self.roster.suggest(fragment, limit)
    }

    /// Emoji-grid summary of the finished (or ongoing) session.
    pub fn share_grid(&self) -> String {
        let mut grid = String::new();
        for slot in 1..=self.session.max_attempts {
            let cell = match self.session.guesses.iter().find(|g| g.attempt_index == slot) {
                Some(g) if g.is_correct => '\u{1F7E9}', // green
                Some(_) => '\u{1F7E5}',                 // red
                None => '\u{2B1C}',                     // unused
            };
            grid.push(cell);
        }
        let score = if self.session.won {
            self.session
                .guesses
                .iter()
                .find(|g| g.is_correct)
                .map(|g| g.attempt_index.to_string())
                .unwrap_or_default()
        } else if self.session.game_over {
            "X".to_string()
        } else {
            "?".to_string()
        };
        format!(
            "Finansle {} {}/{}\n{}",
            self.session.date, score, self.session.max_attempts, grid
        )
    }

    fn unlock_reached_clues(&mut self) -> Vec<String> {
        let attempt = self.session.current_attempt;
        let mut newly = Vec::new();
        for clue in &self.clues {
            if clue.unlock_at_attempt <= attempt && self.session.unlocked_clues.insert(clue.id.clone()) {
                newly.push(clue.id.clone());
            }
        }
        newly
    }

    fn unlock_all_clues(&mut self) {
        for clue in &self.clues {
            self.session.unlocked_clues.insert(clue.id.clone());
        }
    }

    /// Local-store failures are logged and tolerated; the in-memory session
    /// stays authoritative for the rest of the run.
    fn persist(&mut self) {
        let session = serde_json::to_string(&self.session).expect("session serializes");
        if let Err(err) = self.store.set(SESSION_KEY, &session) {
            log(
                Level::Error,
                Domain::Game,
                "session_persist_failed",
                obj(&[("error", v_str(&err.to_string()))]),
            );
        }
        let stats = serde_json::to_string(&self.stats).expect("stats serialize");
        if let Err(err) = self.store.set(STATS_KEY, &stats) {
            log(
                Level::Error,
                Domain::Stats,
                "stats_persist_failed",
                obj(&[("error", v_str(&err.to_string()))]),
            );
        }
    }
}

fn restore_session(store: &mut dyn Store, today: NaiveDate, max_attempts: u32) -> GameSession {
    let stored = match store.get(SESSION_KEY) {
        Ok(v) => v,
        Err(err) => {
            log(
                Level::Warn,
                Domain::Game,
                "session_load_failed",
                obj(&[("error", v_str(&err.to_string()))]),
            );
            None
        }
    };
    match stored.and_then(|s| serde_json::from_str::<GameSession>(&s).ok()) {
        Some(session) if session.date == today => session,
        Some(stale) => {
            log(
                Level::Info,
                Domain::Game,
                "stale_session_discarded",
                obj(&[("stored_date", v_str(&stale.date.to_string()))]),
            );
            GameSession::new(today, max_attempts)
        }
        None => GameSession::new(today, max_attempts),
    }
}

fn restore_stats(store: &mut dyn Store) -> LifetimeStats {
    store
        .get(STATS_KEY)
        .ok()
        .flatten()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

/// Builds the daily clue set from the answer record and the optional
/// financial metrics document. Enrichment gaps fall back to placeholder
/// text instead of dropping the slot.
pub fn build_clues(answer: &StockRecord, financials: Option<&FinancialMetrics>) -> Vec<ClueDefinition> {
    const NOT_AVAILABLE: &str = "not available";
    let or_na = |s: &str| {
        if s.trim().is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            s.to_string()
        }
    };

    let size = if answer.employees > 0 {
        format!("{} · {} employees", or_na(&answer.market_cap), answer.employees)
    } else {
        or_na(&answer.market_cap)
    };

    let performance = format!(
        "1y {:+.1}% · 5y {:+.1}% · volatility {:.1}%",
        answer.performance_1y, answer.performance_5y, answer.volatility
    );

    let key_figures = financials
        .map(|f| {
            let parts: Vec<String> = [
                f.revenue_formatted.as_ref().map(|v| format!("revenue {}", v)),
                f.ebitda_formatted.as_ref().map(|v| format!("EBITDA {}", v)),
                f.net_income_formatted.as_ref().map(|v| format!("net income {}", v)),
                f.target_price_formatted.as_ref().map(|v| format!("target price {}", v)),
            ]
            .into_iter()
            .flatten()
            .collect();
            if parts.is_empty() {
                NOT_AVAILABLE.to_string()
            } else {
                parts.join(" · ")
            }
        })
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let location = match (answer.headquarters.trim(), answer.industry.trim()) {
        ("", "") => NOT_AVAILABLE.to_string(),
        (hq, "") => hq.to_string(),
        ("", ind) => ind.to_string(),
        (hq, ind) => format!("{} · {}", hq, ind),
    };

    vec![
        ClueDefinition {
            id: "sector".to_string(),
            title: "Sector".to_string(),
            unlock_at_attempt: 1,
            value: or_na(&answer.sector),
        },
        ClueDefinition {
            id: "size".to_string(),
            title: "Market value".to_string(),
            unlock_at_attempt: 2,
            value: size,
        },
        ClueDefinition {
            id: "performance".to_string(),
            title: "Performance".to_string(),
            unlock_at_attempt: 3,
            value: performance,
        },
        ClueDefinition {
            id: "key_figures".to_string(),
            title: "Key figures".to_string(),
            unlock_at_attempt: 4,
            value: key_figures,
        },
        ClueDefinition {
            id: "location".to_string(),
            title: "Headquarters & industry".to_string(),
            unlock_at_attempt: 5,
            value: location,
        },
        ClueDefinition {
            id: "description".to_string(),
            title: "Description".to_string(),
            unlock_at_attempt: 6,
            value: or_na(&answer.description),
        },
    ]
}
