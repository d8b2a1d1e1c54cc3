use serde::{Deserialize, Serialize};
use strum_macros::Display;
use uuid::Uuid;

use crate::util::time::get_u64_time_millis;

#[derive(Serialize, Deserialize, Display, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Open,
    Closed
}

#[derive(Serialize, Deserialize, Display, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GameResult {
    Pending,
    Win,
    Loss,
    Draw
}

#[derive(Serialize, Deserialize, Display, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Guest,
    Admin,
    Referee
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: String,
    pub name: String
}

/// Points awarded to each side of a table when its result resolves to the
/// bucket owning this pair. `p1`/`p2` follow seating, not outcome.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct ScorePair {
    pub p1: f64,
    pub p2: f64
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringConfig {
    pub win: ScorePair,
    pub loss: ScorePair,
    pub draw: ScorePair
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            win: ScorePair { p1: 1.0, p2: 0.0 },
            loss: ScorePair { p1: 0.0, p2: 1.0 },
            draw: ScorePair { p1: 0.5, p2: 0.5 }
        }
    }
}

impl ScoringConfig {
    /// The point pair applied for a terminal result. Pending tables award nothing.
    pub fn bucket(&self, result: GameResult) -> Option<ScorePair> {
        match result {
            GameResult::Pending => None,
            GameResult::Win => Some(self.win),
            GameResult::Loss => Some(self.loss),
            GameResult::Draw => Some(self.draw)
        }
    }
}

/// One pairing within a session. `result` is from `player1`'s perspective.
/// A referee submission mutates only `result`, `submitted_by` and `updated_at`;
/// everything else is organizer-owned.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TableMatch {
    pub table_number: u32,
    pub player1: PlayerInfo,
    pub player2: PlayerInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_referee: Option<String>,
    pub result: GameResult,
    #[serde(default)]
    pub submitted_by: Option<String>,
    #[serde(default)]
    pub updated_at: Option<u64>
}

impl TableMatch {
    pub fn new(table_number: u32, player1: PlayerInfo, player2: PlayerInfo) -> Self {
        TableMatch {
            table_number,
            player1,
            player2,
            assigned_referee: None,
            result: GameResult::Pending,
            submitted_by: None,
            updated_at: None
        }
    }

    pub fn is_completed(&self) -> bool {
        self.result != GameResult::Pending
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SubmitError {
    SessionClosed,
    NoResultChosen,
    UnknownTable(u32),
    RefereeNotInRoster(String)
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SessionClosed => write!(f, "The session is closed to submissions"),
            Self::NoResultChosen => write!(f, "A terminal result must be chosen before submitting"),
            Self::UnknownTable(n) => write!(f, "Table {} does not exist in this session", n),
            Self::RefereeNotInRoster(name) => write!(f, "'{}' is not in the referee roster", name)
        }
    }
}

impl std::error::Error for SubmitError {}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MatchSession {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    pub status: MatchStatus,
    pub referees: Vec<String>,
    pub tables: Vec<TableMatch>,
    #[serde(default)]
    pub scoring_config: ScoringConfig,
    pub created_at: u64
}

impl MatchSession {
    pub fn new(title: String, referees: Vec<String>, tables: Vec<TableMatch>, scoring_config: ScoringConfig) -> Self {
        MatchSession {
            id: Uuid::new_v4().to_string(),
            title,
            status: MatchStatus::Open,
            referees,
            tables,
            scoring_config,
            created_at: get_u64_time_millis()
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == MatchStatus::Open
    }

    pub fn find_table(&self, table_number: u32) -> Option<&TableMatch> {
        self.tables.iter().find(|t| t.table_number == table_number)
    }

    /// Records a referee/organizer result for one table. Only the table's
    /// `result`, `submitted_by` and `updated_at` change; a rejected submission
    /// leaves the session untouched.
    pub fn submit_result(
        &mut self,
        table_number: u32,
        result: GameResult,
        submitted_by: &str,
        role: UserRole
    ) -> Result<(), SubmitError> {
        if !self.is_open() {
            return Err(SubmitError::SessionClosed);
        };
        if result == GameResult::Pending {
            return Err(SubmitError::NoResultChosen);
        };
        if role == UserRole::Referee && !self.referees.iter().any(|r| r == submitted_by) {
            return Err(SubmitError::RefereeNotInRoster(submitted_by.to_owned()));
        };
        let table = match self.tables.iter_mut().find(|t| t.table_number == table_number) {
            Some(table) => table,
            None => return Err(SubmitError::UnknownTable(table_number))
        };
        table.result = result;
        table.submitted_by = Some(submitted_by.to_owned());
        table.updated_at = Some(get_u64_time_millis());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, name: &str) -> PlayerInfo {
        PlayerInfo { id: id.to_owned(), name: name.to_owned() }
    }

    fn round_one() -> MatchSession {
        MatchSession::new(
            String::from("R1"),
            vec![String::from("A"), String::from("B")],
            vec![TableMatch::new(1, player("P1", "Alice"), player("P2", "Bob"))],
            ScoringConfig::default()
        )
    }

    #[test]
    fn submission_stamps_reporter_and_time() {
        let mut session = round_one();
        session.submit_result(1, GameResult::Win, "A", UserRole::Referee).unwrap();
        let table = session.find_table(1).unwrap();
        assert_eq!(table.result, GameResult::Win);
        assert_eq!(table.submitted_by.as_deref(), Some("A"));
        assert!(table.updated_at.is_some());
    }

    #[test]
    fn closed_session_rejects_submission_unchanged() {
        let mut session = round_one();
        session.status = MatchStatus::Closed;
        let before = session.tables.clone();
        let err = session.submit_result(1, GameResult::Win, "A", UserRole::Referee).unwrap_err();
        assert_eq!(err, SubmitError::SessionClosed);
        assert_eq!(session.tables, before);
    }

    #[test]
    fn unknown_referee_rejected_but_admin_allowed() {
        let mut session = round_one();
        let err = session.submit_result(1, GameResult::Draw, "Mallory", UserRole::Referee).unwrap_err();
        assert_eq!(err, SubmitError::RefereeNotInRoster(String::from("Mallory")));
        session.submit_result(1, GameResult::Draw, "Mallory", UserRole::Admin).unwrap();
        assert_eq!(session.find_table(1).unwrap().result, GameResult::Draw);
    }

    #[test]
    fn pending_is_not_a_submittable_result() {
        let mut session = round_one();
        let err = session.submit_result(1, GameResult::Pending, "A", UserRole::Referee).unwrap_err();
        assert_eq!(err, SubmitError::NoResultChosen);
    }

    #[test]
    fn missing_table_rejected() {
        let mut session = round_one();
        let err = session.submit_result(42, GameResult::Win, "A", UserRole::Referee).unwrap_err();
        assert_eq!(err, SubmitError::UnknownTable(42));
    }

    #[test]
    fn new_sessions_open_with_default_scoring() {
        let session = round_one();
        assert!(session.is_open());
        assert_eq!(session.scoring_config.win.p1, 1.0);
        assert_eq!(session.scoring_config.draw.p2, 0.5);
    }
}
