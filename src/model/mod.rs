pub mod session;
pub mod settings;

pub use session::{GameResult, MatchSession, MatchStatus, PlayerInfo, ScorePair, ScoringConfig, SubmitError, TableMatch, UserRole};
pub use settings::AppSettings;
