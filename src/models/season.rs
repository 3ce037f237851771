use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive-inclusive year bounds for a season. `None` on either side
/// leaves that side of the window open (all-time seasons).
pub type YearRange = (Option<i32>, Option<i32>);

/// What a season selects: a numbered autoseason slice of the A/B rankings,
/// or a set of named classification words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeasonClass {
    Number(u32),
    Named(Vec<String>),
}

impl SeasonClass {
    /// Column value stored in the season table: the number, or the words
    /// space-joined as entered.
    pub fn storage_key(&self) -> String {
        match self {
            SeasonClass::Number(n) => n.to_string(),
            SeasonClass::Named(words) => words.join(" "),
        }
    }

    pub fn from_storage_key(key: &str) -> Self {
        if key.chars().all(|c| c.is_ascii_digit()) && !key.is_empty() {
            if let Ok(n) = key.parse() {
                return SeasonClass::Number(n);
            }
        }
        SeasonClass::Named(key.split(' ').map(str::to_string).collect())
    }
}

impl std::fmt::Display for SeasonClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// Persisted season metadata. The playlist contents are gathered from the
/// classification tables on demand; only the selection is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonMeta {
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub classification: String,
    pub start_date: Option<NaiveDate>,
    pub stop_date: Option<NaiveDate>,
    pub playlist_spotify_id: String,
}

impl SeasonMeta {
    /// Derive stored year bounds from a day window. A stop date of
    /// January 1 belongs to the previous year (day windows are
    /// inclusive-exclusive).
    pub fn new(
        class: &SeasonClass,
        start_date: Option<NaiveDate>,
        stop_date: Option<NaiveDate>,
        playlist_spotify_id: String,
    ) -> Self {
        use chrono::Datelike;
        let min_year = start_date.map(|d| d.year());
        let max_year = stop_date.map(|d| {
            if d.month() == 1 && d.day() == 1 {
                d.year() - 1
            } else {
                d.year()
            }
        });
        Self {
            min_year,
            max_year,
            classification: class.storage_key(),
            start_date,
            stop_date,
            playlist_spotify_id,
        }
    }
}

/// Predictable playlist name for an automatically created season,
/// e.g. "2020 3" or "2014-2017 1".
pub fn autoseason_name(year_range: (i32, i32), season_number: u32) -> String {
    if year_range.0 == year_range.1 {
        format!("{} {}", year_range.0, season_number)
    } else {
        format!("{}-{} {}", year_range.0, year_range.1, season_number)
    }
}
