//! Artist score formulas.
//!
//! Two views of an artist's ranked catalog: street cred measures the
//! accumulated volume of quality music, heat check measures the run of
//! recent quality. Both accept a simulated "as of" date so scores can be
//! computed for any point in time.

use chrono::NaiveDate;

use crate::models::Ranking;
use crate::storage::ScoredProject;

/// Seconds below which a project may count as a single.
const SINGLE_MAX_DURATION_SEC: u32 = 15 * 60;
/// Track count below which a project may count as a single.
const SINGLE_MAX_TRACKS: usize = 5;
/// Fixed general average song length used as the album base value unit.
const AVG_SONG_SEC: f64 = 210.0;
/// Albums shorter than this earn the short-album bonus point.
const SHORT_BONUS_MAX_SEC: u32 = 63 * 60;
/// Albums at least this long earn the long-album bonus point.
const LONG_BONUS_MIN_SEC: u32 = 30 * 60;
/// Minimum share of heat-check playtime that must be on A-ranked projects.
const HEAT_MIN_A_SHARE: f64 = 0.7;

/// The "Street Cred" score (v1.0): volume of quality music up to `as_of`.
///
/// Projects under 15 minutes with fewer than 5 tracks are (multi-)singles
/// worth tracks x ranking points (A 1.8, B 1.0, C 0.2 per track). All
/// other projects are albums worth value x ranking points, where value is
/// duration / 3m30s plus a bonus point below 63 minutes and a separate
/// bonus point at 30 minutes or more.
pub fn street_cred(projects: &[ScoredProject], as_of: Option<NaiveDate>) -> f64 {
    projects
        .iter()
        .filter(|p| as_of.map_or(true, |cutoff| p.release_day <= cutoff))
        .map(project_value)
        .sum()
}

fn project_value(project: &ScoredProject) -> f64 {
    let points = project.ranking.points();
    if is_single(project) {
        return project.track_count as f64 * points;
    }
    let mut value = f64::from(project.duration_sec) / AVG_SONG_SEC;
    if project.duration_sec >= SINGLE_MAX_DURATION_SEC
        && project.duration_sec < SHORT_BONUS_MAX_SEC
    {
        value += 1.0;
    }
    if project.duration_sec >= LONG_BONUS_MIN_SEC {
        value += 1.0;
    }
    value * points
}

fn is_single(project: &ScoredProject) -> bool {
    project.duration_sec < SINGLE_MAX_DURATION_SEC && project.track_count < SINGLE_MAX_TRACKS
}

/// The "Heat Check" score (v1.0): minutes of recent music maintaining a
/// high quality level.
///
/// Walking the catalog in reverse chronological order from `as_of`, the
/// window extends backwards while it contains no C- or E-ranked project
/// and at least 70% of the included playtime is on A-ranked projects. The
/// score is the window's total duration in minutes.
pub fn heat_check(projects: &[ScoredProject], as_of: Option<NaiveDate>) -> f64 {
    let mut recent: Vec<&ScoredProject> = projects
        .iter()
        .filter(|p| as_of.map_or(true, |cutoff| p.release_day <= cutoff))
        .collect();
    recent.sort_by(|a, b| b.release_day.cmp(&a.release_day));

    let mut total_sec = 0.0;
    let mut a_sec = 0.0;
    for project in recent {
        match project.ranking {
            Ranking::C | Ranking::E => break,
            Ranking::A => a_sec += f64::from(project.duration_sec),
            Ranking::B => {}
        }
        let candidate_total = total_sec + f64::from(project.duration_sec);
        if a_sec / candidate_total < HEAT_MIN_A_SHARE {
            break;
        }
        total_sec = candidate_total;
    }
    total_sec / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(day: &str, ranking: Ranking, duration_sec: u32, tracks: usize) -> ScoredProject {
        ScoredProject {
            release_day: day.parse().unwrap(),
            ranking,
            duration_sec,
            track_count: tracks,
        }
    }

    #[test]
    fn test_street_cred_single() {
        // 3-track single, A-ranked: 3 * 1.8
        let projects = vec![project("2020-01-01", Ranking::A, 10 * 60, 3)];
        assert!((street_cred(&projects, None) - 5.4).abs() < 1e-9);
    }

    #[test]
    fn test_street_cred_album_bonuses() {
        // 40-minute B album: 2400/210 + 1 (short) + 1 (long), x1.0
        let projects = vec![project("2020-01-01", Ranking::B, 40 * 60, 10)];
        let expected = 2400.0 / 210.0 + 2.0;
        assert!((street_cred(&projects, None) - expected).abs() < 1e-9);

        // 70-minute album only gets the long bonus
        let long = vec![project("2020-01-01", Ranking::B, 70 * 60, 18)];
        let expected_long = 4200.0 / 210.0 + 1.0;
        assert!((street_cred(&long, None) - expected_long).abs() < 1e-9);
    }

    #[test]
    fn test_street_cred_five_track_short_project_is_album() {
        // 5 tracks under 15 minutes: album path, no bonuses (under 15 min
        // misses the short-album bonus window, under 30 misses the long).
        let projects = vec![project("2020-01-01", Ranking::A, 14 * 60, 5)];
        let expected = (14.0 * 60.0 / 210.0) * 1.8;
        assert!((street_cred(&projects, None) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_street_cred_as_of_cutoff() {
        let projects = vec![
            project("2019-01-01", Ranking::A, 10 * 60, 3),
            project("2021-01-01", Ranking::A, 10 * 60, 3),
        ];
        let cutoff = "2020-01-01".parse().unwrap();
        assert!((street_cred(&projects, Some(cutoff)) - 5.4).abs() < 1e-9);
        assert!((street_cred(&projects, None) - 10.8).abs() < 1e-9);
    }

    #[test]
    fn test_heat_check_stops_at_low_ranking() {
        let projects = vec![
            project("2018-01-01", Ranking::C, 40 * 60, 10),
            project("2019-01-01", Ranking::A, 40 * 60, 10),
            project("2020-01-01", Ranking::A, 30 * 60, 8),
        ];
        // Both A albums count, the C album breaks the streak.
        assert!((heat_check(&projects, None) - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_heat_check_a_share_floor() {
        let projects = vec![
            project("2019-01-01", Ranking::B, 60 * 60, 14),
            project("2020-01-01", Ranking::A, 30 * 60, 8),
        ];
        // Adding the hour-long B album would drop the A share to 1/3.
        assert!((heat_check(&projects, None) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_heat_check_b_only_is_zero() {
        let projects = vec![project("2020-01-01", Ranking::B, 40 * 60, 10)];
        assert_eq!(heat_check(&projects, None), 0.0);
    }

    #[test]
    fn test_heat_check_mixed_window() {
        let projects = vec![
            project("2019-06-01", Ranking::A, 50 * 60, 12),
            project("2020-01-01", Ranking::B, 20 * 60, 6),
            project("2020-06-01", Ranking::A, 40 * 60, 10),
        ];
        // Adding the B project would leave the A share at 40/60 < 0.7, so
        // the window is the latest A album alone.
        assert!((heat_check(&projects, None) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_heat_check_as_of_excludes_later() {
        let projects = vec![
            project("2019-01-01", Ranking::A, 30 * 60, 8),
            project("2021-01-01", Ranking::C, 30 * 60, 8),
        ];
        let cutoff = "2020-01-01".parse().unwrap();
        assert!((heat_check(&projects, Some(cutoff)) - 30.0).abs() < 1e-9);
        assert_eq!(heat_check(&projects, None), 0.0);
    }
}
