//! Game awards - turns a finished mini-game session into points and badges
//!
//! The games themselves live in the portal UI; they hand us a
//! [`GameSession`] once a round is over.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ledger::RewardsLedger;
use super::models::Reward;
use super::RewardsError;

/// Mini-games that award points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    TypingTest,
    WordPuzzle,
    Quiz,
}

impl GameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TypingTest => "typing_test",
            Self::WordPuzzle => "word_puzzle",
            Self::Quiz => "quiz",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::TypingTest => "Typing Test",
            Self::WordPuzzle => "Word Puzzle",
            Self::Quiz => "Quiz",
        }
    }
}

impl FromStr for GameKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "typing_test" | "typing" => Ok(Self::TypingTest),
            "word_puzzle" | "puzzle" => Ok(Self::WordPuzzle),
            "quiz" => Ok(Self::Quiz),
            other => Err(format!(
                "unknown game '{other}' (expected typing_test, word_puzzle or quiz)"
            )),
        }
    }
}

/// Result of one finished round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    pub game: GameKind,
    pub score: u32,
    /// Percentage, 0-100
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub words_per_minute: Option<u32>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl GameSession {
    pub fn new(game: GameKind, score: u32) -> Self {
        Self {
            game,
            score,
            accuracy: None,
            words_per_minute: None,
            duration_ms: None,
        }
    }

    fn validate(&self) -> Result<(), RewardsError> {
        if let Some(accuracy) = self.accuracy {
            if !(0.0..=100.0).contains(&accuracy) {
                return Err(RewardsError::InvalidInput(format!(
                    "accuracy must be between 0 and 100, got {accuracy}"
                )));
            }
        }
        Ok(())
    }
}

/// Something the ledger recorded for a session
#[derive(Debug, Clone, PartialEq)]
pub enum RewardEvent {
    PointsAwarded { amount: i64, reason: String },
    BadgeEarned(Reward),
}

/// Badge awarded when `earned` holds for a session
pub struct BadgeRule {
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    earned: fn(&GameSession) -> bool,
}

impl BadgeRule {
    pub fn is_earned(&self, session: &GameSession) -> bool {
        (self.earned)(session)
    }
}

/// Minimum typing speed for Speed Demon
pub const SPEED_DEMON_WPM: u32 = 60;
/// Word puzzles solved faster than this earn Wordsmith
pub const WORDSMITH_MAX_MS: u64 = 60_000;
/// Score needed for High Scorer in any game
pub const HIGH_SCORE: u32 = 1000;

fn perfect(session: &GameSession) -> bool {
    session.accuracy.is_some_and(|a| a >= 100.0)
}

/// All badge rules, checked in this order
pub static BADGE_RULES: &[BadgeRule] = &[
    BadgeRule {
        name: "Speed Demon",
        description: "Type 60 words per minute or faster",
        icon: "zap",
        earned: |s| {
            s.game == GameKind::TypingTest
                && s.words_per_minute.is_some_and(|wpm| wpm >= SPEED_DEMON_WPM)
        },
    },
    BadgeRule {
        name: "Sharpshooter",
        description: "Finish a typing test without a single mistake",
        icon: "target",
        earned: |s| s.game == GameKind::TypingTest && perfect(s),
    },
    BadgeRule {
        name: "Wordsmith",
        description: "Solve a word puzzle in under a minute",
        icon: "puzzle",
        earned: |s| {
            s.game == GameKind::WordPuzzle && s.duration_ms.is_some_and(|ms| ms < WORDSMITH_MAX_MS)
        },
    },
    BadgeRule {
        name: "Quiz Whiz",
        description: "Answer every quiz question correctly",
        icon: "brain",
        earned: |s| s.game == GameKind::Quiz && perfect(s),
    },
    BadgeRule {
        name: "High Scorer",
        description: "Score 1000 points in any game",
        icon: "trophy",
        earned: |s| s.score >= HIGH_SCORE,
    },
];

/// Points for a finished session: a tenth of the score, at least 1
pub fn session_points(session: &GameSession) -> i64 {
    i64::from((session.score / 10).max(1))
}

/// Badge rules this session satisfies that the ledger does not hold yet
pub fn check_badges(session: &GameSession, ledger: &RewardsLedger) -> Vec<&'static BadgeRule> {
    BADGE_RULES
        .iter()
        .filter(|rule| rule.is_earned(session) && !ledger.has_reward_named(rule.name))
        .collect()
}

/// Record a finished session: award points, then any newly earned badges
pub fn award_game(
    ledger: &mut RewardsLedger,
    session: &GameSession,
) -> Result<Vec<RewardEvent>, RewardsError> {
    session.validate()?;

    let mut events = Vec::new();

    let amount = session_points(session);
    ledger.add_points(amount)?;
    events.push(RewardEvent::PointsAwarded {
        amount,
        reason: format!("{} score {}", session.game.label(), session.score),
    });

    for rule in check_badges(session, ledger) {
        let reward = ledger.add_reward(rule.name, rule.description, rule.icon)?;
        events.push(RewardEvent::BadgeEarned(reward));
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn ledger() -> RewardsLedger {
        RewardsLedger::load(Arc::new(MemoryStore::new())).unwrap()
    }

    fn badge_names(events: &[RewardEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|e| match e {
                RewardEvent::BadgeEarned(r) => Some(r.name.as_str()),
                RewardEvent::PointsAwarded { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_parse_game_kind() {
        assert_eq!("typing-test".parse::<GameKind>(), Ok(GameKind::TypingTest));
        assert_eq!("Quiz".parse::<GameKind>(), Ok(GameKind::Quiz));
        assert_eq!("puzzle".parse::<GameKind>(), Ok(GameKind::WordPuzzle));
        assert!("chess".parse::<GameKind>().is_err());
    }

    #[test]
    fn test_session_points() {
        assert_eq!(session_points(&GameSession::new(GameKind::Quiz, 0)), 1);
        assert_eq!(session_points(&GameSession::new(GameKind::Quiz, 9)), 1);
        assert_eq!(session_points(&GameSession::new(GameKind::Quiz, 450)), 45);
    }

    #[test]
    fn test_fast_accurate_typing_earns_two_badges() {
        let mut ledger = ledger();
        let session = GameSession {
            words_per_minute: Some(72),
            accuracy: Some(100.0),
            ..GameSession::new(GameKind::TypingTest, 300)
        };

        let events = award_game(&mut ledger, &session).unwrap();
        assert_eq!(
            events[0],
            RewardEvent::PointsAwarded {
                amount: 30,
                reason: "Typing Test score 300".to_string()
            }
        );
        assert_eq!(badge_names(&events), vec!["Speed Demon", "Sharpshooter"]);
        assert_eq!(ledger.total_points(), 30);
    }

    #[test]
    fn test_badge_not_awarded_twice() {
        let mut ledger = ledger();
        let session = GameSession {
            duration_ms: Some(42_000),
            ..GameSession::new(GameKind::WordPuzzle, 120)
        };

        let first = award_game(&mut ledger, &session).unwrap();
        let second = award_game(&mut ledger, &session).unwrap();
        assert_eq!(badge_names(&first), vec!["Wordsmith"]);
        assert!(badge_names(&second).is_empty());
        assert_eq!(ledger.rewards().len(), 1);
        assert_eq!(ledger.total_points(), 24);
    }

    #[test]
    fn test_rules_are_game_specific() {
        let mut ledger = ledger();
        let session = GameSession {
            accuracy: Some(100.0),
            words_per_minute: Some(90),
            ..GameSession::new(GameKind::Quiz, 1000)
        };
        let events = award_game(&mut ledger, &session).unwrap();
        assert_eq!(badge_names(&events), vec!["Quiz Whiz", "High Scorer"]);
    }

    #[test]
    fn test_invalid_accuracy_rejected_without_mutation() {
        let mut ledger = ledger();
        let session = GameSession {
            accuracy: Some(140.0),
            ..GameSession::new(GameKind::TypingTest, 100)
        };
        assert!(matches!(
            award_game(&mut ledger, &session),
            Err(RewardsError::InvalidInput(_))
        ));
        assert_eq!(ledger.total_points(), 0);
    }
}
