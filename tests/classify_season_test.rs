use chrono::{NaiveDate, Utc};
use tempfile::tempdir;

use tunecapsule::models::{autoseason_name, Classification, ProjectRecord, Ranking, SeasonClass, SeasonMeta};
use tunecapsule::stats::{heat_check, street_cred};
use tunecapsule::storage::{SeasonSelection, Storage};

fn open_storage(dir: &tempfile::TempDir) -> Storage {
    let storage = Storage::open_at(&dir.path().join("tunecapsule.db")).unwrap();
    storage.init_schema(false).unwrap();
    storage
}

fn project(artist: &str, name: &str, day: &str, tracks: &[(&str, u32)]) -> ProjectRecord {
    ProjectRecord {
        release_day: day.parse().unwrap(),
        artist_names: vec![artist.to_string()],
        artist_ids: vec![format!("id-{artist}")],
        name: name.to_string(),
        track_names: tracks.iter().map(|(n, _)| n.to_string()).collect(),
        track_durations_sec: tracks.iter().map(|(_, d)| *d).collect(),
        track_numbers: (1..=tracks.len() as u32).collect(),
        track_spotify_ids: tracks
            .iter()
            .map(|(n, _)| format!("track-{artist}-{name}-{n}"))
            .collect(),
        album_spotify_id: format!("album-{artist}-{name}"),
        retrieved_time: Utc::now(),
    }
}

#[test]
fn classified_projects_flow_into_seasons_in_score_order() {
    let dir = tempdir().unwrap();
    let mut storage = open_storage(&dir);

    // Two same-day releases; the lower-scored artist should lead.
    let strong = project("Strong", "Catalog", "2019-05-01", &[("S1", 2400)]);
    let fresh = project("Fresh", "Debut", "2020-06-12", &[("F1", 210)]);
    let rival = project("Strong", "Followup", "2020-06-12", &[("R1", 220)]);
    storage
        .insert_classification(&strong, &Classification::Ranking(Ranking::A))
        .unwrap();
    storage
        .insert_classification(&fresh, &Classification::Ranking(Ranking::A))
        .unwrap();
    storage
        .insert_classification(&rival, &Classification::Ranking(Ranking::B))
        .unwrap();

    for record in [&fresh, &rival] {
        let catalog = storage
            .ranked_projects_for_group(&record.artist_group())
            .unwrap();
        let score = street_cred(&catalog, Some(record.release_day));
        storage
            .upsert_artist_score(&record.artist_group(), record.release_day, score)
            .unwrap();
    }

    let rows = storage
        .season_rows(&SeasonSelection {
            rankings: vec![Ranking::A, Ranking::B],
            start: Some("2020-01-01".parse().unwrap()),
            stop: Some("2021-01-01".parse().unwrap()),
            ..Default::default()
        })
        .unwrap();

    let groups: Vec<&str> = rows.iter().map(|r| r.artist_group.as_str()).collect();
    assert_eq!(groups, vec!["Fresh", "Strong"]);
    assert_eq!(rows[0].track_spotify_ids, vec!["track-Fresh-Debut-F1"]);
}

#[test]
fn certification_words_select_alongside_rankings() {
    let dir = tempdir().unwrap();
    let mut storage = open_storage(&dir);

    let ranked = project("Artist", "Ranked", "2020-02-01", &[("R1", 200)]);
    let certified = project("Artist", "Certified", "2020-04-01", &[("C1", 200)]);
    storage
        .insert_classification(&ranked, &Classification::Ranking(Ranking::A))
        .unwrap();
    storage
        .insert_classification(&certified, &Classification::Certification("🔂".to_string()))
        .unwrap();

    let rows = storage
        .season_rows(&SeasonSelection {
            rankings: vec![Ranking::A],
            certifications: vec!["🔂".to_string()],
            ..Default::default()
        })
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
fn scores_track_the_catalog_as_of_a_date() {
    let dir = tempdir().unwrap();
    let mut storage = open_storage(&dir);

    // 40-minute A album, then a cold C single a year later.
    let album = project(
        "Artist",
        "Album",
        "2019-03-01",
        &[("A1", 480), ("A2", 480), ("A3", 480), ("A4", 480), ("A5", 480)],
    );
    let single = project("Artist", "Cold Single", "2020-03-01", &[("S1", 200)]);
    storage
        .insert_classification(&album, &Classification::Ranking(Ranking::A))
        .unwrap();
    storage
        .insert_classification(&single, &Classification::Ranking(Ranking::C))
        .unwrap();

    let catalog = storage.ranked_projects_for_artist("Artist").unwrap();

    // Album value: 2400 / 210 + short bonus + long bonus, at A points.
    let album_cred = (2400.0 / 210.0 + 2.0) * 1.8;
    let before: NaiveDate = "2019-12-31".parse().unwrap();
    assert!((street_cred(&catalog, Some(before)) - album_cred).abs() < 1e-9);
    let with_single = album_cred + 0.2;
    assert!((street_cred(&catalog, None) - with_single).abs() < 1e-9);

    // The C single ends the streak now, but the 2019 window was hot.
    assert_eq!(heat_check(&catalog, None), 0.0);
    assert!((heat_check(&catalog, Some(before)) - 40.0).abs() < 1e-9);
}

#[test]
fn autoseason_names_come_from_stored_metadata() {
    let dir = tempdir().unwrap();
    let storage = open_storage(&dir);

    let meta = SeasonMeta::new(
        &SeasonClass::Number(3),
        Some("2020-05-01".parse().unwrap()),
        Some("2020-09-01".parse().unwrap()),
        "playlist-id".to_string(),
    );
    assert_eq!(meta.min_year, Some(2020));
    assert_eq!(autoseason_name((2020, 2020), 3), "2020 3");
    storage.store_season_meta(&meta).unwrap();

    let numbered = storage.numbered_seasons(2020).unwrap();
    assert_eq!(numbered.len(), 1);
    assert_eq!(numbered[0].0, 3);
    assert_eq!(numbered[0].1.playlist_spotify_id, "playlist-id");
}
