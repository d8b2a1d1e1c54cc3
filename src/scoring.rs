use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{GameResult, MatchSession, PlayerInfo};

/// Derived standings row. Never persisted; recomputed from the session
/// snapshot on every read.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PlayerScore {
    pub id: String,
    pub name: String,
    pub points: f64,
    pub win_count: u32,
    pub loss_count: u32,
    pub draw_count: u32,
    pub match_count: u32
}

impl PlayerScore {
    fn zeroed(info: &PlayerInfo) -> Self {
        PlayerScore {
            id: info.id.clone(),
            name: info.name.clone(),
            points: 0.0,
            win_count: 0,
            loss_count: 0,
            draw_count: 0,
            match_count: 0
        }
    }
}

/// Folds a session's tables into per-player tallies under its scoring config.
///
/// Every player referenced by any table gets an entry, even if all their
/// tables are still pending. The first name seen for an id wins when the same
/// id appears with different names. A self-paired table accumulates both sides
/// into the one entry. Output is sorted by numeric-aware id order.
pub fn aggregate(session: &MatchSession) -> Vec<PlayerScore> {
    let mut scores: HashMap<String, PlayerScore> = HashMap::new();
    for table in &session.tables {
        scores.entry(table.player1.id.clone()).or_insert_with(|| PlayerScore::zeroed(&table.player1));
        scores.entry(table.player2.id.clone()).or_insert_with(|| PlayerScore::zeroed(&table.player2));

        let pair = match session.scoring_config.bucket(table.result) {
            Some(pair) => pair,
            None => continue
        };

        // Applied one side at a time so a self-paired table hits the same
        // entry twice instead of losing an increment.
        {
            let p1 = scores.get_mut(&table.player1.id).unwrap();
            p1.points += pair.p1;
            p1.match_count += 1;
            match table.result {
                GameResult::Win => p1.win_count += 1,
                GameResult::Loss => p1.loss_count += 1,
                GameResult::Draw => p1.draw_count += 1,
                GameResult::Pending => {}
            };
        }
        {
            let p2 = scores.get_mut(&table.player2.id).unwrap();
            p2.points += pair.p2;
            p2.match_count += 1;
            match table.result {
                GameResult::Win => p2.loss_count += 1,
                GameResult::Loss => p2.win_count += 1,
                GameResult::Draw => p2.draw_count += 1,
                GameResult::Pending => {}
            };
        }
    }

    let mut list: Vec<PlayerScore> = scores.into_values().collect();
    list.sort_by(|a, b| compare_player_ids(&a.id, &b.id));
    list
}

/// Numeric-aware lexicographic comparison: digit runs compare by value, so
/// "P9" sorts before "P10". Shorter input wins on a shared prefix.
pub fn compare_player_ids(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                if x.is_ascii_digit() && y.is_ascii_digit() {
                    let run_a = take_digit_run(&mut left);
                    let run_b = take_digit_run(&mut right);
                    let trimmed_a = run_a.trim_start_matches('0');
                    let trimmed_b = run_b.trim_start_matches('0');
                    let ordering = trimmed_a.len().cmp(&trimmed_b.len())
                        .then_with(|| trimmed_a.cmp(trimmed_b))
                        .then_with(|| run_a.len().cmp(&run_b.len()));
                    if ordering != Ordering::Equal {
                        return ordering;
                    };
                } else {
                    if x != y {
                        return x.cmp(&y);
                    };
                    left.next();
                    right.next();
                }
            }
        }
    }
}

fn take_digit_run(chars: &mut std::iter::Peekable<std::str::Chars>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        };
        run.push(*c);
        chars.next();
    }
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MatchSession, PlayerInfo, ScorePair, ScoringConfig, TableMatch};

    fn player(id: &str, name: &str) -> PlayerInfo {
        PlayerInfo { id: id.to_owned(), name: name.to_owned() }
    }

    fn table(number: u32, p1: PlayerInfo, p2: PlayerInfo, result: GameResult) -> TableMatch {
        TableMatch { result, ..TableMatch::new(number, p1, p2) }
    }

    fn session_with(tables: Vec<TableMatch>, config: ScoringConfig) -> MatchSession {
        MatchSession::new(String::from("test"), vec![String::from("A")], tables, config)
    }

    fn find<'a>(scores: &'a [PlayerScore], id: &str) -> &'a PlayerScore {
        scores.iter().find(|s| s.id == id).unwrap()
    }

    #[test]
    fn empty_session_yields_empty_standings() {
        let session = session_with(vec![], ScoringConfig::default());
        assert!(aggregate(&session).is_empty());
    }

    #[test]
    fn pending_tables_yield_zeroed_entries() {
        let session = session_with(
            vec![table(1, player("P1", "Alice"), player("P2", "Bob"), GameResult::Pending)],
            ScoringConfig::default()
        );
        let scores = aggregate(&session);
        assert_eq!(scores.len(), 2);
        for score in &scores {
            assert_eq!(score.points, 0.0);
            assert_eq!(score.match_count, 0);
        }
    }

    #[test]
    fn win_applies_default_bucket_to_both_sides() {
        let session = session_with(
            vec![table(1, player("P1", "Alice"), player("P2", "Bob"), GameResult::Win)],
            ScoringConfig::default()
        );
        let scores = aggregate(&session);
        let alice = find(&scores, "P1");
        assert_eq!(alice.points, 1.0);
        assert_eq!(alice.win_count, 1);
        assert_eq!(alice.match_count, 1);
        let bob = find(&scores, "P2");
        assert_eq!(bob.points, 0.0);
        assert_eq!(bob.loss_count, 1);
        assert_eq!(bob.match_count, 1);
    }

    #[test]
    fn loss_and_draw_buckets_select_correctly() {
        let config = ScoringConfig {
            win: ScorePair { p1: 3.0, p2: 0.0 },
            loss: ScorePair { p1: 0.5, p2: 2.5 },
            draw: ScorePair { p1: 1.5, p2: 1.5 }
        };
        let session = session_with(
            vec![
                table(1, player("P1", "Alice"), player("P2", "Bob"), GameResult::Loss),
                table(2, player("P1", "Alice"), player("P3", "Cara"), GameResult::Draw)
            ],
            config
        );
        let scores = aggregate(&session);
        let alice = find(&scores, "P1");
        assert_eq!(alice.points, 0.5 + 1.5);
        assert_eq!(alice.loss_count, 1);
        assert_eq!(alice.draw_count, 1);
        let bob = find(&scores, "P2");
        assert_eq!(bob.points, 2.5);
        assert_eq!(bob.win_count, 1);
        let cara = find(&scores, "P3");
        assert_eq!(cara.draw_count, 1);
        assert_eq!(cara.points, 1.5);
    }

    #[test]
    fn match_count_identity_holds() {
        let session = session_with(
            vec![
                table(1, player("P1", "Alice"), player("P2", "Bob"), GameResult::Win),
                table(2, player("P3", "Cara"), player("P4", "Dan"), GameResult::Draw),
                table(3, player("P1", "Alice"), player("P4", "Dan"), GameResult::Pending)
            ],
            ScoringConfig::default()
        );
        let scores = aggregate(&session);
        let total: u32 = scores.iter().map(|s| s.match_count).sum();
        let completed = session.tables.iter().filter(|t| t.is_completed()).count() as u32;
        assert_eq!(total, 2 * completed);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let session = session_with(
            vec![
                table(1, player("P1", "Alice"), player("P2", "Bob"), GameResult::Win),
                table(2, player("P2", "Bob"), player("P1", "Alice"), GameResult::Draw)
            ],
            ScoringConfig::default()
        );
        assert_eq!(aggregate(&session), aggregate(&session));
    }

    #[test]
    fn table_order_does_not_matter() {
        let forward = session_with(
            vec![
                table(1, player("P1", "Alice"), player("P2", "Bob"), GameResult::Win),
                table(2, player("P2", "Bob"), player("P3", "Cara"), GameResult::Loss)
            ],
            ScoringConfig::default()
        );
        let mut reversed = forward.clone();
        reversed.tables.reverse();
        assert_eq!(aggregate(&forward), aggregate(&reversed));
    }

    #[test]
    fn self_paired_table_accumulates_both_sides_into_one_entry() {
        let session = session_with(
            vec![table(1, player("P1", "Alice"), player("P1", "Alice"), GameResult::Win)],
            ScoringConfig::default()
        );
        let scores = aggregate(&session);
        assert_eq!(scores.len(), 1);
        let alice = &scores[0];
        assert_eq!(alice.points, 1.0);
        assert_eq!(alice.win_count, 1);
        assert_eq!(alice.loss_count, 1);
        assert_eq!(alice.match_count, 2);
    }

    #[test]
    fn first_name_seen_for_an_id_wins() {
        let session = session_with(
            vec![
                table(1, player("P1", "Alice"), player("P2", "Bob"), GameResult::Pending),
                table(2, player("P1", "Alicia"), player("P3", "Cara"), GameResult::Pending)
            ],
            ScoringConfig::default()
        );
        let scores = aggregate(&session);
        assert_eq!(find(&scores, "P1").name, "Alice");
    }

    #[test]
    fn standings_sorted_by_numeric_aware_id() {
        let session = session_with(
            vec![
                table(1, player("P2", "Bob"), player("P10", "Jay"), GameResult::Win),
                table(2, player("P1", "Alice"), player("P10", "Jay"), GameResult::Pending)
            ],
            ScoringConfig::default()
        );
        let ids: Vec<String> = aggregate(&session).into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["P1", "P2", "P10"]);
    }

    #[test]
    fn id_comparison_is_numeric_aware() {
        assert_eq!(compare_player_ids("P9", "P10"), Ordering::Less);
        assert_eq!(compare_player_ids("P10", "P2"), Ordering::Greater);
        assert_eq!(compare_player_ids("P1", "P1"), Ordering::Equal);
        assert_eq!(compare_player_ids("9", "10"), Ordering::Less);
        assert_eq!(compare_player_ids("A2B10", "A2B9"), Ordering::Greater);
        assert_eq!(compare_player_ids("abc", "abd"), Ordering::Less);
        assert_eq!(compare_player_ids("P1", "P1x"), Ordering::Less);
    }
}
