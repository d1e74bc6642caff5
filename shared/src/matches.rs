use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const LEAGUE_PLACEHOLDER: &str = "—";
pub const HOME_PLACEHOLDER: &str = "Home";
pub const AWAY_PLACEHOLDER: &str = "Away";

/// Body of `GET /api/matches`. Order of `data` is display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchListResponse {
    #[serde(default, deserialize_with = "lenient_list")]
    pub data: Vec<Match>,
}

/// One upstream fixture. Every field may be missing, null or of an
/// unexpected type; any of those decode as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Match {
    #[serde(default, deserialize_with = "lenient")]
    pub league: Option<League>,
    #[serde(default, deserialize_with = "lenient")]
    pub teams: Option<Teams>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub scores: Option<Scores>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct League {
    #[serde(default, deserialize_with = "scalar_text")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Teams {
    #[serde(default, deserialize_with = "lenient")]
    pub home: Option<Team>,
    #[serde(default, deserialize_with = "lenient")]
    pub away: Option<Team>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Team {
    #[serde(default, deserialize_with = "scalar_text")]
    pub name: Option<String>,
}

/// Scores as display text. Upstream sends numbers, some feeds send strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    #[serde(default, deserialize_with = "scalar_text")]
    pub home: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub away: Option<String>,
}

/// Null or missing `data` is the empty list. Entries that are not objects
/// still count as a fixture, with every field missing.
fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<Match>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .into_iter()
        .map(|value| serde_json::from_value::<Match>(value).unwrap_or_default())
        .collect())
}

/// A value of the wrong shape is treated like a missing one.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Strings as-is, numbers in their JSON spelling, anything else `None`.
fn scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

/// Empty strings count as missing, same as null.
fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

impl Match {
    pub fn league_name(&self) -> &str {
        non_empty(self.league.as_ref().and_then(|l| l.name.as_ref())).unwrap_or(LEAGUE_PLACEHOLDER)
    }

    pub fn home_name(&self) -> &str {
        non_empty(
            self.teams
                .as_ref()
                .and_then(|t| t.home.as_ref())
                .and_then(|team| team.name.as_ref()),
        )
        .unwrap_or(HOME_PLACEHOLDER)
    }

    pub fn away_name(&self) -> &str {
        non_empty(
            self.teams
                .as_ref()
                .and_then(|t| t.away.as_ref())
                .and_then(|team| team.name.as_ref()),
        )
        .unwrap_or(AWAY_PLACEHOLDER)
    }

    pub fn time_label(&self) -> &str {
        self.time.as_deref().unwrap_or("")
    }

    /// Both scores, or `None` when either side is missing.
    pub fn score_pair(&self) -> Option<(&str, &str)> {
        let scores = self.scores.as_ref()?;
        Some((scores.home.as_deref()?, scores.away.as_deref()?))
    }
}
