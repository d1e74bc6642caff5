use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::matches::Match;

/// Display-ready projection of a [`Match`]. Placeholders are already applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCard {
    pub league: String,
    pub home: String,
    pub away: String,
    /// `"H - A"`, only when both scores are known.
    pub score: Option<String>,
    pub time: String,
}

impl MatchCard {
    pub fn from_match(m: &Match) -> Self {
        Self {
            league: m.league_name().to_owned(),
            home: m.home_name().to_owned(),
            away: m.away_name().to_owned(),
            score: m
                .score_pair()
                .map(|(home, away)| format!("{home} - {away}")),
            time: m.time_label().to_owned(),
        }
    }

    /// Versus line shown under the league name.
    pub fn fixture_line(&self) -> String {
        format!("⚽ {} — {}", self.home, self.away)
    }

    /// Plain-text block for chat messages.
    pub fn summary(&self) -> String {
        let mut out = String::with_capacity(64);
        let _ = write!(out, "🏆 {}\n⚽ {} vs {}", self.league, self.home, self.away);
        if let Some(score) = &self.score {
            let _ = write!(out, " ({score})");
        }
        let time = if self.time.is_empty() { "—" } else { &self.time };
        let _ = write!(out, "\n🕒 {time}");
        out
    }
}

pub fn cards_for(matches: &[Match]) -> Vec<MatchCard> {
    matches.iter().map(MatchCard::from_match).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matches::{League, Scores, Team, Teams};

    fn fixture(league: &str, home: &str, away: &str) -> Match {
        Match {
            league: Some(League {
                name: Some(league.to_owned()),
            }),
            teams: Some(Teams {
                home: Some(Team {
                    name: Some(home.to_owned()),
                }),
                away: Some(Team {
                    name: Some(away.to_owned()),
                }),
            }),
            time: Some("20:00".to_owned()),
            scores: None,
        }
    }

    #[test]
    fn cards_keep_response_order() {
        let matches = vec![
            fixture("Premier League", "Chelsea", "Everton"),
            fixture("La Liga", "Sevilla", "Getafe"),
            fixture("Serie A", "Roma", "Lazio"),
        ];

        let cards = cards_for(&matches);
        let homes: Vec<&str> = cards.iter().map(|c| c.home.as_str()).collect();
        assert_eq!(homes, ["Chelsea", "Sevilla", "Roma"]);
    }

    #[test]
    fn score_line_needs_both_scores() {
        let mut m = fixture("Bundesliga", "Bayern", "Mainz");
        m.scores = Some(Scores {
            home: Some("4".to_owned()),
            away: None,
        });
        assert_eq!(MatchCard::from_match(&m).score, None);

        m.scores = Some(Scores {
            home: Some("4".to_owned()),
            away: Some("1".to_owned()),
        });
        assert_eq!(MatchCard::from_match(&m).score.as_deref(), Some("4 - 1"));
    }

    #[test]
    fn empty_match_uses_placeholders() {
        let card = MatchCard::from_match(&Match::default());
        assert_eq!(card.league, "—");
        assert_eq!(card.home, "Home");
        assert_eq!(card.away, "Away");
        assert_eq!(card.time, "");
        assert_eq!(card.fixture_line(), "⚽ Home — Away");
    }

    #[test]
    fn summary_lists_league_fixture_and_time() {
        let card = MatchCard::from_match(&fixture("Eredivisie", "Ajax", "PSV"));
        assert_eq!(card.summary(), "🏆 Eredivisie\n⚽ Ajax vs PSV\n🕒 20:00");

        let card = MatchCard::from_match(&Match::default());
        assert_eq!(card.summary(), "🏆 —\n⚽ Home vs Away\n🕒 —");
    }

    #[test]
    fn missing_time_is_blank_while_other_fields_render() {
        let mut m = fixture("Ligue 1", "Lyon", "Nice");
        m.time = None;
        m.scores = Some(Scores {
            home: Some("2".to_owned()),
            away: Some("2".to_owned()),
        });

        let card = MatchCard::from_match(&m);
        assert_eq!(card.time, "");
        assert_eq!(card.league, "Ligue 1");
        assert_eq!(card.fixture_line(), "⚽ Lyon — Nice");
        assert_eq!(card.score.as_deref(), Some("2 - 2"));
    }
}
