use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sha2::{Digest, Sha256};

/// Delimiter for string arrays packed into a single TEXT column.
pub const STRRAY_DELIMITER: &str = "\t";

/// Join a string array into a strray column value.
pub fn to_strray<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: ToString,
{
    items
        .into_iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(STRRAY_DELIMITER)
}

/// Split a strray column value back into a string array.
pub fn from_strray(strray: &str) -> Vec<String> {
    strray.split(STRRAY_DELIMITER).map(str::to_string).collect()
}

/// Static snapshot of a classified project, as stored in the ranking and
/// certification tables. Holds both the point-in-time representation
/// (names, durations) and the dynamic Spotify IDs.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRecord {
    pub release_day: NaiveDate,
    /// Artist names, sorted, paired index-for-index with `artist_ids`.
    pub artist_names: Vec<String>,
    pub artist_ids: Vec<String>,
    pub name: String,
    pub track_names: Vec<String>,
    pub track_durations_sec: Vec<u32>,
    pub track_numbers: Vec<u32>,
    pub track_spotify_ids: Vec<String>,
    pub album_spotify_id: String,
    pub retrieved_time: DateTime<Utc>,
}

impl ProjectRecord {
    /// Identity hash over (release day, sorted artist names, project name).
    /// Stable across re-fetches as long as the release metadata is stable.
    pub fn sha256(&self) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(self.release_day.to_string().as_bytes());
        hasher.update(to_strray(self.artist_names.iter()).as_bytes());
        hasher.update(self.name.as_bytes());
        hasher.finalize().to_vec()
    }

    /// Tab-joined sorted artist names, the stored group key.
    pub fn artist_group(&self) -> String {
        to_strray(self.artist_names.iter())
    }

    pub fn track_count(&self) -> usize {
        self.track_spotify_ids.len()
    }
}

/// Normalize a Spotify release date to a day. Spotify reports year,
/// year-month, or year-month-day precision; coarser precisions resolve to
/// the last covered day.
pub fn parse_release_day(release_date: &str) -> Result<NaiveDate> {
    let parts: Vec<&str> = release_date.split('-').collect();
    match parts.as_slice() {
        [yr, mo, da] => {
            let (yr, mo, da) = (yr.parse()?, mo.parse()?, da.parse()?);
            NaiveDate::from_ymd_opt(yr, mo, da)
                .ok_or_else(|| anyhow!("invalid release date: {}", release_date))
        }
        [yr, mo] => {
            let (yr, mo): (i32, u32) = (yr.parse()?, mo.parse()?);
            last_day_of_month(yr, mo)
                .ok_or_else(|| anyhow!("invalid release month: {}", release_date))
        }
        [yr] => {
            let yr: i32 = yr.parse()?;
            NaiveDate::from_ymd_opt(yr, 12, 31)
                .ok_or_else(|| anyhow!("invalid release year: {}", release_date))
        }
        _ => Err(anyhow!("unrecognized release date: {}", release_date)),
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    first_of_next.map(|d| d.pred_opt().expect("dates above MIN"))
}

/// January 1 of the given year. Season day windows run from one
/// year-beginning to the next, inclusive-exclusive.
pub fn beginning_year(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 1, 1).expect("January 1 always exists")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> ProjectRecord {
        ProjectRecord {
            release_day: NaiveDate::from_ymd_opt(2021, 3, 5).unwrap(),
            artist_names: vec!["Anberlin".to_string()],
            artist_ids: vec!["artist1".to_string()],
            name: "Silverline".to_string(),
            track_names: vec!["Two Graves".to_string(), "Circles".to_string()],
            track_durations_sec: vec![201, 187],
            track_numbers: vec![1, 2],
            track_spotify_ids: vec!["t1".to_string(), "t2".to_string()],
            album_spotify_id: "alb1".to_string(),
            retrieved_time: Utc::now(),
        }
    }

    #[test]
    fn test_strray_round_trip() {
        let items = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        assert_eq!(from_strray(&to_strray(items.iter())), items);
    }

    #[test]
    fn test_hash_stable_across_retrievals() {
        let a = sample_record();
        let mut b = sample_record();
        b.retrieved_time = Utc::now();
        b.album_spotify_id = "relocated".to_string();
        assert_eq!(a.sha256(), b.sha256());
    }

    #[test]
    fn test_hash_changes_with_identity() {
        let a = sample_record();
        let mut b = sample_record();
        b.name = "Silverline (Deluxe)".to_string();
        assert_ne!(a.sha256(), b.sha256());
    }

    #[test]
    fn test_parse_release_day_full_precision() {
        assert_eq!(
            parse_release_day("2021-03-05").unwrap(),
            NaiveDate::from_ymd_opt(2021, 3, 5).unwrap()
        );
    }

    #[test]
    fn test_parse_release_day_month_precision() {
        assert_eq!(
            parse_release_day("2021-03").unwrap(),
            NaiveDate::from_ymd_opt(2021, 3, 31).unwrap()
        );
        assert_eq!(
            parse_release_day("2020-02").unwrap(),
            NaiveDate::from_ymd_opt(2020, 2, 29).unwrap()
        );
    }

    #[test]
    fn test_parse_release_day_year_precision() {
        assert_eq!(
            parse_release_day("1999").unwrap(),
            NaiveDate::from_ymd_opt(1999, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_parse_release_day_garbage() {
        assert!(parse_release_day("not-a-date").is_err());
        assert!(parse_release_day("2021-13-40").is_err());
    }
}
