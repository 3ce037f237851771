// Local classification database backed by SQLite.
//
// Two tables hold classified projects (ranking, certification) keyed by the
// project identity hash; helper tables track artist groups, subsumed
// singles, and cached artist scores. Seasons store selection metadata only;
// their contents are gathered from the classification tables on demand.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::models::{
    from_strray, to_strray, Classification, ProjectRecord, Ranking, SeasonClass, SeasonMeta,
    YearRange,
};

const BUSY_TIMEOUT_MS: u64 = 5_000;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS ranking (
        sha256 BLOB NOT NULL,
        release_day TEXT NOT NULL,
        artist_names TEXT NOT NULL,
        name TEXT NOT NULL,
        classification TEXT NOT NULL,
        track_names TEXT NOT NULL,
        track_durations_sec TEXT NOT NULL,
        track_numbers TEXT NOT NULL,
        retrieved_time TEXT NOT NULL,
        artist_group TEXT NOT NULL,
        album_spotify_id TEXT NOT NULL,
        track_spotify_ids TEXT NOT NULL,
        PRIMARY KEY (release_day, artist_names, name)
    );
    CREATE TABLE IF NOT EXISTS certification (
        sha256 BLOB NOT NULL,
        release_day TEXT NOT NULL,
        artist_names TEXT NOT NULL,
        name TEXT NOT NULL,
        classification TEXT NOT NULL,
        track_names TEXT NOT NULL,
        track_durations_sec TEXT NOT NULL,
        track_numbers TEXT NOT NULL,
        retrieved_time TEXT NOT NULL,
        artist_group TEXT NOT NULL,
        album_spotify_id TEXT NOT NULL,
        track_spotify_ids TEXT NOT NULL,
        PRIMARY KEY (release_day, artist_names, name, classification)
    );
    CREATE TABLE IF NOT EXISTS season (
        min_year INTEGER,
        max_year INTEGER,
        classification TEXT NOT NULL,
        start_date TEXT,
        stop_date TEXT,
        playlist_spotify_id TEXT NOT NULL,
        PRIMARY KEY (min_year, max_year, classification) ON CONFLICT REPLACE
    );
    CREATE TABLE IF NOT EXISTS artist_group (
        artist_group TEXT NOT NULL,
        artist_name TEXT NOT NULL,
        artist_spotify_id TEXT NOT NULL,
        PRIMARY KEY (artist_group, artist_spotify_id) ON CONFLICT IGNORE
    );
    CREATE TABLE IF NOT EXISTS single (
        single_hash BLOB NOT NULL,
        album_hash BLOB NOT NULL,
        PRIMARY KEY (single_hash, album_hash) ON CONFLICT REPLACE
    );
    CREATE TABLE IF NOT EXISTS artist_score (
        artist_group TEXT NOT NULL,
        date_from TEXT NOT NULL,
        score REAL NOT NULL,
        PRIMARY KEY (artist_group, date_from) ON CONFLICT REPLACE
    );
";

const TABLES: [&str; 6] = [
    "ranking",
    "certification",
    "season",
    "artist_group",
    "single",
    "artist_score",
];

/// Result of recording a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifyOutcome {
    RankingStored,
    CertificationStored,
    /// The project already held this certification; nothing changed.
    AlreadyCertified,
}

/// What a season pulls from the classification tables.
#[derive(Debug, Clone, Default)]
pub struct SeasonSelection {
    pub rankings: Vec<Ranking>,
    pub certifications: Vec<String>,
    /// Inclusive lower bound on release day.
    pub start: Option<NaiveDate>,
    /// Exclusive upper bound on release day.
    pub stop: Option<NaiveDate>,
    /// Projects holding any of these certifications are skipped.
    pub exclusions: Vec<String>,
}

/// One selected project, in the order it should appear in the playlist.
#[derive(Debug, Clone)]
pub struct SeasonRow {
    pub sha256: Vec<u8>,
    pub release_day: NaiveDate,
    pub artist_group: String,
    pub track_spotify_ids: Vec<String>,
    pub artist_score: Option<f64>,
}

/// A ranked project reduced to what the score formulas need.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredProject {
    pub release_day: NaiveDate,
    pub ranking: Ranking,
    pub duration_sec: u32,
    pub track_count: usize,
}

pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Database file path (~/.tunecapsule/tunecapsule.db), overridable
    /// with TUNECAPSULE_DB_PATH for tests.
    pub fn db_path() -> Result<PathBuf> {
        if let Ok(test_path) = std::env::var("TUNECAPSULE_DB_PATH") {
            return Ok(PathBuf::from(test_path));
        }
        Ok(crate::config::Config::config_dir()?.join("tunecapsule.db"))
    }

    pub fn open() -> Result<Self> {
        let path = Self::db_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        tracing::debug!("Opening database at {:?}", path);
        let conn = Connection::open(path).context("Failed to open database")?;
        conn.busy_timeout(std::time::Duration::from_millis(BUSY_TIMEOUT_MS))
            .context("Failed to set busy timeout")?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { conn };
        storage.init_schema(false)?;
        Ok(storage)
    }

    /// Create all tables. With `force`, existing tables are dropped first.
    pub fn init_schema(&self, force: bool) -> Result<()> {
        if force {
            for table in TABLES {
                self.conn
                    .execute_batch(&format!("DROP TABLE IF EXISTS {table};"))
                    .with_context(|| format!("Failed to drop table {table}"))?;
            }
        }
        self.conn
            .execute_batch(SCHEMA)
            .context("Failed to create schema")?;
        tracing::info!("Database schema ready");
        Ok(())
    }

    /// Record a classification for a project snapshot.
    ///
    /// Rankings replace any previous ranking of the same project and, when
    /// the project has at least five tracks, mark previously ranked
    /// equal-or-lower singles it covers as subsumed. Certifications are
    /// idempotent per (project, word).
    pub fn insert_classification(
        &mut self,
        record: &ProjectRecord,
        class: &Classification,
    ) -> Result<ClassifyOutcome> {
        let hash = record.sha256();
        let tx = self.conn.transaction()?;

        store_artist_group(&tx, record)?;

        let outcome = match class {
            Classification::Ranking(ranking) => {
                tx.execute("DELETE FROM ranking WHERE sha256 = ?1", params![hash])?;
                insert_project_row(&tx, "ranking", record, &hash, class.as_str())?;
                if record.track_count() >= 5 {
                    record_subsumed_singles(&tx, record, &hash, *ranking)?;
                }
                ClassifyOutcome::RankingStored
            }
            Classification::Certification(word) => {
                let existing: Option<i64> = tx
                    .query_row(
                        "SELECT 1 FROM certification WHERE sha256 = ?1 AND classification = ?2",
                        params![hash, word],
                        |row| row.get(0),
                    )
                    .optional()?;
                if existing.is_some() {
                    ClassifyOutcome::AlreadyCertified
                } else {
                    insert_project_row(&tx, "certification", record, &hash, word)?;
                    ClassifyOutcome::CertificationStored
                }
            }
        };

        tx.commit()?;
        tracing::debug!(
            "Classified {:?} by {} as {}",
            record.name,
            record.artist_group(),
            class
        );
        Ok(outcome)
    }

    /// Gather the projects belonging to a season, in release order with
    /// cached artist score as the tiebreak. Singles subsumed by an album
    /// inside the same selection are dropped.
    pub fn season_rows(&self, selection: &SeasonSelection) -> Result<Vec<SeasonRow>> {
        let mut rows = Vec::new();
        if !selection.rankings.is_empty() {
            let words: Vec<String> = selection
                .rankings
                .iter()
                .map(|r| r.as_str().to_string())
                .collect();
            rows.extend(self.query_season_table("ranking", &words, selection)?);
        }
        if !selection.certifications.is_empty() {
            rows.extend(self.query_season_table(
                "certification",
                &selection.certifications,
                selection,
            )?);
        }

        // Drop singles whose subsuming album made the same selection.
        let selected: HashSet<Vec<u8>> = rows.iter().map(|r| r.sha256.clone()).collect();
        let subsumed = self.subsumed_by_any(&selected)?;
        rows.retain(|r| !subsumed.contains(&r.sha256));

        rows.sort_by(|a, b| {
            a.release_day.cmp(&b.release_day).then(
                a.artist_score
                    .unwrap_or(0.0)
                    .partial_cmp(&b.artist_score.unwrap_or(0.0))
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
        });
        Ok(rows)
    }

    fn query_season_table(
        &self,
        table: &str,
        classifications: &[String],
        selection: &SeasonSelection,
    ) -> Result<Vec<SeasonRow>> {
        // `table` is one of two fixed names; user input only ever lands in
        // the bound parameters.
        let class_marks = placeholders(classifications.len());
        let exclusion_clause = if selection.exclusions.is_empty() {
            String::new()
        } else {
            format!(
                "AND NOT EXISTS (
                    SELECT 1 FROM certification ex
                    WHERE ex.sha256 = t.sha256 AND ex.classification IN ({})
                )",
                placeholders(selection.exclusions.len())
            )
        };
        let sql = format!(
            "SELECT t.sha256, t.release_day, t.artist_group, t.track_spotify_ids, s.score
             FROM {table} t
             LEFT JOIN artist_score s
                 ON s.artist_group = t.artist_group AND s.date_from = t.release_day
             WHERE t.classification IN ({class_marks})
               AND t.release_day >= ?{start_idx}
               AND t.release_day < ?{stop_idx}
               {exclusion_clause}",
            start_idx = classifications.len() + 1,
            stop_idx = classifications.len() + 2,
        );

        // Sentinels sort below/above every 4-digit ISO date as TEXT.
        let start = selection
            .start
            .map(|d| d.to_string())
            .unwrap_or_else(|| "0000-01-01".to_string());
        let stop = selection
            .stop
            .map(|d| d.to_string())
            .unwrap_or_else(|| "9999-12-31".to_string());
        let mut bound: Vec<String> = classifications.to_vec();
        bound.push(start);
        bound.push(stop);
        bound.extend(selection.exclusions.iter().cloned());

        let mut stmt = self.conn.prepare(&sql)?;
        let mapped = stmt.query_map(params_from_iter(bound.iter()), |row| {
            Ok((
                row.get::<_, Vec<u8>>(0)?,
                row.get::<_, NaiveDate>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<f64>>(4)?,
            ))
        })?;

        let mut rows = Vec::new();
        for item in mapped {
            let (sha256, release_day, artist_group, track_ids, artist_score) = item?;
            rows.push(SeasonRow {
                sha256,
                release_day,
                artist_group,
                track_spotify_ids: from_strray(&track_ids),
                artist_score,
            });
        }
        Ok(rows)
    }

    /// Hashes from `selected` that are recorded as subsumed by another
    /// hash also in `selected`.
    fn subsumed_by_any(&self, selected: &HashSet<Vec<u8>>) -> Result<HashSet<Vec<u8>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT single_hash, album_hash FROM single")?;
        let pairs = stmt.query_map([], |row| {
            Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;
        let mut subsumed = HashSet::new();
        for pair in pairs {
            let (single_hash, album_hash) = pair?;
            if selected.contains(&single_hash) && selected.contains(&album_hash) {
                subsumed.insert(single_hash);
            }
        }
        Ok(subsumed)
    }

    pub fn store_season_meta(&self, meta: &SeasonMeta) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO season VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    meta.min_year,
                    meta.max_year,
                    meta.classification,
                    meta.start_date,
                    meta.stop_date,
                    meta.playlist_spotify_id,
                ],
            )
            .context("Failed to store season metadata")?;
        Ok(())
    }

    pub fn get_season_meta(
        &self,
        year_range: YearRange,
        classification: &str,
    ) -> Result<Option<SeasonMeta>> {
        self.conn
            .query_row(
                "SELECT min_year, max_year, classification, start_date, stop_date,
                        playlist_spotify_id
                 FROM season
                 WHERE classification = ?1 AND min_year IS ?2 AND max_year IS ?3",
                params![classification, year_range.0, year_range.1],
                |row| {
                    Ok(SeasonMeta {
                        min_year: row.get(0)?,
                        max_year: row.get(1)?,
                        classification: row.get(2)?,
                        start_date: row.get(3)?,
                        stop_date: row.get(4)?,
                        playlist_spotify_id: row.get(5)?,
                    })
                },
            )
            .optional()
            .context("Failed to read season metadata")
    }

    /// Numbered seasons stored for a single year, sorted by number.
    pub fn numbered_seasons(&self, year: i32) -> Result<Vec<(u32, SeasonMeta)>> {
        let mut stmt = self.conn.prepare(
            "SELECT min_year, max_year, classification, start_date, stop_date,
                    playlist_spotify_id
             FROM season WHERE min_year = ?1 AND max_year = ?1",
        )?;
        let metas = stmt.query_map(params![year], |row| {
            Ok(SeasonMeta {
                min_year: row.get(0)?,
                max_year: row.get(1)?,
                classification: row.get(2)?,
                start_date: row.get(3)?,
                stop_date: row.get(4)?,
                playlist_spotify_id: row.get(5)?,
            })
        })?;
        let mut numbered = Vec::new();
        for meta in metas {
            let meta = meta?;
            if let SeasonClass::Number(number) = SeasonClass::from_storage_key(&meta.classification)
            {
                numbered.push((number, meta));
            }
        }
        numbered.sort_by_key(|(n, _)| *n);
        Ok(numbered)
    }

    /// Earliest release year among ranked projects.
    pub fn min_release_year(&self) -> Result<Option<i32>> {
        use chrono::Datelike;
        let day: Option<NaiveDate> = self
            .conn
            .query_row(
                "SELECT release_day FROM ranking ORDER BY release_day LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(day.map(|d| d.year()))
    }

    pub fn upsert_artist_score(
        &self,
        artist_group: &str,
        date_from: NaiveDate,
        score: f64,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO artist_score VALUES (?1, ?2, ?3)",
                params![artist_group, date_from, score],
            )
            .context("Failed to store artist score")?;
        Ok(())
    }

    /// Ranked projects for every stored group containing the given artist
    /// (by Spotify ID or exact name), deduplicated by project hash.
    pub fn ranked_projects_for_artist(&self, artist: &str) -> Result<Vec<ScoredProject>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT artist_group FROM artist_group
             WHERE artist_spotify_id = ?1 OR artist_name = ?1",
        )?;
        let groups: Vec<String> = stmt
            .query_map(params![artist], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        if groups.is_empty() {
            return Err(anyhow!("No classified projects found for artist: {artist}"));
        }

        let mut seen = HashSet::new();
        let mut projects = Vec::new();
        for group in &groups {
            for (hash, project) in self.ranked_rows_for_group(group)? {
                if seen.insert(hash) {
                    projects.push(project);
                }
            }
        }
        Ok(projects)
    }

    /// Ranked projects having exactly the given artist group.
    pub fn ranked_projects_for_group(&self, artist_group: &str) -> Result<Vec<ScoredProject>> {
        Ok(self
            .ranked_rows_for_group(artist_group)?
            .into_iter()
            .map(|(_, p)| p)
            .collect())
    }

    fn ranked_rows_for_group(
        &self,
        artist_group: &str,
    ) -> Result<Vec<(Vec<u8>, ScoredProject)>> {
        let mut stmt = self.conn.prepare(
            "SELECT sha256, release_day, classification, track_durations_sec,
                    track_spotify_ids
             FROM ranking WHERE artist_group = ?1",
        )?;
        let mapped = stmt.query_map(params![artist_group], |row| {
            Ok((
                row.get::<_, Vec<u8>>(0)?,
                row.get::<_, NaiveDate>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut out = Vec::new();
        for item in mapped {
            let (hash, release_day, classification, durations, track_ids) = item?;
            let ranking: Ranking = classification
                .parse()
                .map_err(|e| anyhow!("Corrupt ranking row: {e}"))?;
            let duration_sec = from_strray(&durations)
                .iter()
                .map(|d| d.parse::<u32>().unwrap_or(0))
                .sum();
            out.push((
                hash,
                ScoredProject {
                    release_day,
                    ranking,
                    duration_sec,
                    track_count: from_strray(&track_ids).len(),
                },
            ));
        }
        Ok(out)
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn insert_project_row(
    conn: &Connection,
    table: &str,
    record: &ProjectRecord,
    hash: &[u8],
    classification: &str,
) -> Result<()> {
    // `table` is a fixed name, never user input.
    let sql = format!(
        "INSERT INTO {table} VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
    );
    conn.execute(
        &sql,
        params![
            hash,
            record.release_day,
            to_strray(record.artist_names.iter()),
            record.name,
            classification,
            to_strray(record.track_names.iter()),
            to_strray(record.track_durations_sec.iter()),
            to_strray(record.track_numbers.iter()),
            record.retrieved_time,
            record.artist_group(),
            record.album_spotify_id,
            to_strray(record.track_spotify_ids.iter()),
        ],
    )
    .with_context(|| format!("Failed to insert into {table}"))?;
    Ok(())
}

/// Insert the artist group membership, or verify it matches what was
/// stored before.
fn store_artist_group(conn: &Connection, record: &ProjectRecord) -> Result<()> {
    let group = record.artist_group();
    let mut stmt = conn.prepare(
        "SELECT artist_name, artist_spotify_id FROM artist_group WHERE artist_group = ?1",
    )?;
    let existing: Vec<(String, String)> = stmt
        .query_map(params![group], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<_>>()?;

    let members: Vec<(String, String)> = record
        .artist_names
        .iter()
        .cloned()
        .zip(record.artist_ids.iter().cloned())
        .collect();

    if existing.is_empty() {
        for (name, id) in &members {
            conn.execute(
                "INSERT INTO artist_group VALUES (?1, ?2, ?3)",
                params![group, name, id],
            )?;
        }
        return Ok(());
    }

    let stored: HashSet<_> = existing.into_iter().collect();
    let incoming: HashSet<_> = members.into_iter().collect();
    if stored != incoming {
        return Err(anyhow!(
            "Artist group {group:?} no longer matches its stored membership"
        ));
    }
    Ok(())
}

/// Mark previously ranked singles covered by a newly ranked project with
/// five or more tracks. Only equal-or-lower rankings are subsumed; a
/// higher-ranked single keeps its own place in seasons.
fn record_subsumed_singles(
    conn: &Connection,
    record: &ProjectRecord,
    album_hash: &[u8],
    album_ranking: Ranking,
) -> Result<()> {
    let album_tracks: HashSet<&str> = record.track_names.iter().map(String::as_str).collect();

    let mut stmt =
        conn.prepare("SELECT sha256, classification, track_names FROM ranking")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, Vec<u8>>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut subsumed: Vec<Vec<u8>> = Vec::new();
    for row in rows {
        let (hash, classification, track_names) = row?;
        if hash == album_hash {
            continue;
        }
        let ranking: Ranking = match classification.parse() {
            Ok(r) => r,
            Err(_) => continue,
        };
        if ranking.quality() > album_ranking.quality() {
            continue;
        }
        let tracks = from_strray(&track_names);
        if tracks.len() < 5 && tracks.iter().all(|t| album_tracks.contains(t.as_str())) {
            subsumed.push(hash);
        }
    }

    for single_hash in subsumed {
        tracing::debug!("Single {:x?} subsumed by {}", &single_hash[..4], record.name);
        conn.execute(
            "INSERT INTO single VALUES (?1, ?2)",
            params![single_hash, album_hash],
        )?;
    }
    Ok(())
}
