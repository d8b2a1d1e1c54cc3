use serde::Deserialize;

use crate::model::{GameResult, MatchStatus, PlayerInfo, ScoringConfig, TableMatch};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableConfigRequest {
    pub table_number: u32,
    pub player1: PlayerInfo,
    pub player2: PlayerInfo,
    #[serde(default)]
    pub assigned_referee: Option<String>,
    #[serde(default)]
    pub result: Option<GameResult>,
    #[serde(default)]
    pub submitted_by: Option<String>,
    #[serde(default)]
    pub updated_at: Option<u64>
}

impl TableConfigRequest {
    pub fn into_table(self) -> TableMatch {
        TableMatch {
            table_number: self.table_number,
            player1: self.player1,
            player2: self.player2,
            assigned_referee: self.assigned_referee,
            result: self.result.unwrap_or(GameResult::Pending),
            submitted_by: self.submitted_by,
            updated_at: self.updated_at
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreateRequest {
    pub title: String,
    pub referees: Vec<String>,
    #[serde(default)]
    pub tables: Vec<TableConfigRequest>,
    #[serde(default)]
    pub scoring_config: Option<ScoringConfig>
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdateRequest {
    pub title: String,
    pub referees: Vec<String>,
    pub tables: Vec<TableConfigRequest>,
    #[serde(default)]
    pub scoring_config: Option<ScoringConfig>
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub status: MatchStatus
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSubmitRequest {
    pub table_number: u32,
    pub result: GameResult,
    pub submitted_by: String
}
