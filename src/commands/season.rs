use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, NaiveDate, Utc};
use clap::Args;
use colored::Colorize;

use crate::api::SpotifyClient;
use crate::commands::season_query::{parse_query, SeasonQueryError, SeasonToken};
use crate::config::Config;
use crate::models::{
    autoseason_name, beginning_year, SeasonClass, SeasonMeta, YearRange,
};
use crate::stats::street_cred;
use crate::storage::{SeasonRow, SeasonSelection, Storage};

#[derive(Args)]
pub struct SeasonCommand {
    /// Season query, e.g. "2020 3", "1999-2019 💿", or "update 2020"
    #[arg(required = true)]
    query: Vec<String>,

    /// Playlist to fill (required when creating a named season)
    #[arg(long)]
    playlist: Option<String>,
}

impl SeasonCommand {
    pub async fn execute(self) -> Result<()> {
        let config = Config::load()?;
        let storage = Storage::open()?;
        let client = SpotifyClient::new(config.clone())?;
        let runner = SeasonRunner {
            config,
            storage,
            client,
        };

        let tokens = parse_query(&self.query)?;
        match tokens.as_slice() {
            [SeasonToken::Update] => runner.update_years(None, None).await?,
            [SeasonToken::Update, SeasonToken::Years(min, max)] if min == max => {
                runner.update_year(*min).await?
            }
            [SeasonToken::Update, SeasonToken::Years(min, max)] => {
                runner.update_years(Some(*min), Some(*max)).await?
            }
            [SeasonToken::Update, SeasonToken::Years(min, max), SeasonToken::Number(number)] => {
                runner.update_numbered((*min, *max), *number).await?
            }
            [SeasonToken::Update, SeasonToken::Years(min, max), SeasonToken::Words(words)] => {
                runner
                    .update_named((Some(*min), Some(*max)), words.clone())
                    .await?
            }
            [SeasonToken::Update, SeasonToken::Words(words)] => {
                runner.update_named((None, None), words.clone()).await?
            }
            [SeasonToken::Years(min, max), SeasonToken::Number(number)] => {
                runner
                    .create_numbered((*min, *max), *number, self.playlist)
                    .await?
            }
            [SeasonToken::Years(min, max), SeasonToken::Words(words)] => {
                let playlist = required_playlist(self.playlist)?;
                runner
                    .create_named(
                        words.clone(),
                        Some(beginning_year(*min)),
                        Some(beginning_year(*max + 1)),
                        playlist,
                    )
                    .await?
            }
            [SeasonToken::Words(words)] => {
                let playlist = required_playlist(self.playlist)?;
                runner
                    .create_named(words.clone(), None, None, playlist)
                    .await?
            }
            _ => {
                return Err(SeasonQueryError::Unsupported(self.query.join(" ")).into());
            }
        }

        Ok(())
    }
}

fn required_playlist(playlist: Option<String>) -> Result<String> {
    playlist.ok_or_else(|| anyhow!("Creating this season requires --playlist"))
}

struct SeasonRunner {
    config: Config,
    storage: Storage,
    client: SpotifyClient,
}

impl SeasonRunner {
    /// Selection covered by a season class over a day window.
    fn selection(
        &self,
        class: &SeasonClass,
        start: Option<NaiveDate>,
        stop: Option<NaiveDate>,
    ) -> SeasonSelection {
        let mut selection = SeasonSelection {
            start,
            stop,
            exclusions: self.config.seasons.exclusion_certifications.clone(),
            ..Default::default()
        };
        match class {
            SeasonClass::Number(_) => {
                selection.rankings = self.config.autoseason_rankings();
            }
            SeasonClass::Named(words) => {
                for word in words {
                    match word.parse() {
                        Ok(ranking) => selection.rankings.push(ranking),
                        Err(_) => selection.certifications.push(word.clone()),
                    }
                }
            }
        }
        selection
    }

    /// Fill a playlist with a season's tracks, caching artist scores for
    /// the release-order tiebreak first.
    async fn upload(&self, selection: &SeasonSelection, playlist_id: &str) -> Result<()> {
        for row in self.storage.season_rows(selection)? {
            let projects = self.storage.ranked_projects_for_group(&row.artist_group)?;
            let score = street_cred(&projects, Some(row.release_day));
            self.storage
                .upsert_artist_score(&row.artist_group, row.release_day, score)?;
        }

        let rows = self.storage.season_rows(selection)?;
        if rows.is_empty() {
            return Err(anyhow!("No classified projects match this season"));
        }
        let track_ids: Vec<String> = rows
            .iter()
            .flat_map(|row: &SeasonRow| row.track_spotify_ids.iter().cloned())
            .collect();

        self.client
            .set_playlist_tracks(playlist_id, &track_ids)
            .await
            .context("Failed to upload season to Spotify")?;
        println!(
            "{} Season uploaded: {} projects, {} tracks",
            "✓".green(),
            rows.len(),
            track_ids.len()
        );
        Ok(())
    }

    async fn create_named(
        &self,
        words: Vec<String>,
        start: Option<NaiveDate>,
        stop: Option<NaiveDate>,
        playlist_id: String,
    ) -> Result<()> {
        let class = SeasonClass::Named(words);
        let meta = SeasonMeta::new(&class, start, stop, playlist_id.clone());
        self.storage.store_season_meta(&meta)?;
        self.upload(&self.selection(&class, start, stop), &playlist_id)
            .await
    }

    async fn create_numbered(
        &self,
        years: (i32, i32),
        number: u32,
        playlist: Option<String>,
    ) -> Result<()> {
        let start = self.calculate_start(years.0, number)?;
        let stop = self.calculate_end(start, years.1)?;
        let playlist_id = match playlist {
            Some(id) => id,
            None => self.new_autoseason_playlist(years, number).await?,
        };
        let class = SeasonClass::Number(number);
        let meta = SeasonMeta::new(&class, Some(start), Some(stop), playlist_id.clone());
        self.storage.store_season_meta(&meta)?;
        self.upload(&self.selection(&class, Some(start), Some(stop)), &playlist_id)
            .await
    }

    /// Re-fill the stored playlist of a numbered season over its stored
    /// day window.
    async fn update_numbered(&self, years: (i32, i32), number: u32) -> Result<()> {
        let class = SeasonClass::Number(number);
        let meta = self
            .storage
            .get_season_meta((Some(years.0), Some(years.1)), &class.storage_key())?
            .ok_or_else(|| {
                anyhow!("No stored season matches: {}", autoseason_name(years, number))
            })?;
        self.upload(
            &self.selection(&class, meta.start_date, meta.stop_date),
            &meta.playlist_spotify_id,
        )
        .await
    }

    async fn update_named(&self, years: YearRange, words: Vec<String>) -> Result<()> {
        let class = SeasonClass::Named(words);
        let meta = self
            .storage
            .get_season_meta(years, &class.storage_key())?
            .ok_or_else(|| anyhow!("No stored season matches: {}", class))?;
        self.upload(
            &self.selection(&class, meta.start_date, meta.stop_date),
            &meta.playlist_spotify_id,
        )
        .await
    }

    /// Regenerate every numbered season of one year, recomputing the ~80
    /// track boundaries and creating playlists for gaps in the sequence.
    async fn update_year(&self, year: i32) -> Result<()> {
        let boundaries = self.calculate_year(year)?;
        if boundaries.len() < 2 {
            println!("No classified projects in {year}; nothing to update");
            return Ok(());
        }
        for (number, window) in boundaries.windows(2).enumerate() {
            self.ensure_autoseason((year, year), number as u32 + 1, (window[0], window[1]))
                .await?;
        }
        Ok(())
    }

    /// Walk a year range (or the whole catalog), grouping sparse years
    /// into multi-year seasons that accumulate about the ideal track
    /// count. A year with enough tracks for its own season is never
    /// merged with earlier years.
    async fn update_years(&self, min_year: Option<i32>, max_year: Option<i32>) -> Result<()> {
        let max_year = max_year.unwrap_or_else(|| Utc::now().date_naive().year());
        let Some(start_year) = min_year.or(self.storage.min_release_year()?) else {
            println!("No ranked projects yet; nothing to update");
            return Ok(());
        };

        let mut counts = Vec::new();
        for year in start_year..=max_year {
            counts.push((year, self.year_track_count(year)?));
        }
        for (min, max) in group_years(&counts, self.config.seasons.ideal_length) {
            if min == max {
                self.update_year(min).await?;
            } else {
                self.ensure_autoseason(
                    (min, max),
                    1,
                    (beginning_year(min), beginning_year(max + 1)),
                )
                .await?;
            }
        }
        Ok(())
    }

    /// Upload into the stored playlist for an autoseason, creating the
    /// season (and a predictably named playlist) when absent.
    async fn ensure_autoseason(
        &self,
        years: (i32, i32),
        number: u32,
        window: (NaiveDate, NaiveDate),
    ) -> Result<()> {
        let class = SeasonClass::Number(number);
        let year_range = (Some(years.0), Some(years.1));
        let playlist_id = match self
            .storage
            .get_season_meta(year_range, &class.storage_key())?
        {
            Some(meta) => meta.playlist_spotify_id,
            None => {
                let playlist_id = self.new_autoseason_playlist(years, number).await?;
                let meta = SeasonMeta::new(
                    &class,
                    Some(window.0),
                    Some(window.1),
                    playlist_id.clone(),
                );
                self.storage.store_season_meta(&meta)?;
                playlist_id
            }
        };
        self.upload(
            &self.selection(&class, Some(window.0), Some(window.1)),
            &playlist_id,
        )
        .await
    }

    async fn new_autoseason_playlist(&self, years: (i32, i32), number: u32) -> Result<String> {
        let user = self.client.current_user().await?;
        let name = autoseason_name(years, number);
        let playlist = self.client.create_playlist(&user.id, &name).await?;
        println!("{} Created playlist {}", "✓".green(), name);
        Ok(playlist.id)
    }

    /// First day available to a numbered season: the stop of the latest
    /// lower-numbered season of the year, or January 1.
    fn calculate_start(&self, year: i32, number: u32) -> Result<NaiveDate> {
        let latest_stop = self
            .storage
            .numbered_seasons(year)?
            .into_iter()
            .filter(|(n, _)| *n < number)
            .filter_map(|(_, meta)| meta.stop_date)
            .max();
        Ok(latest_stop.unwrap_or_else(|| beginning_year(year)))
    }

    /// End day for an autoseason starting at `start`.
    fn calculate_end(&self, start: NaiveDate, max_year: i32) -> Result<NaiveDate> {
        let year_end = beginning_year(max_year + 1);
        let selection = self.selection(&SeasonClass::Number(0), Some(start), Some(year_end));
        let rows = self.storage.season_rows(&selection)?;
        Ok(season_end(&rows, self.config.seasons.ideal_length, year_end))
    }

    /// Season boundary dates covering one year. Empty when the year has
    /// no eligible tracks.
    fn calculate_year(&self, year: i32) -> Result<Vec<NaiveDate>> {
        let selection = self.selection(
            &SeasonClass::Number(0),
            Some(beginning_year(year)),
            Some(beginning_year(year + 1)),
        );
        let rows = self.storage.season_rows(&selection)?;
        Ok(year_boundaries(&rows, year, self.config.seasons.ideal_length))
    }

    /// Distinct eligible tracks released in a year.
    fn year_track_count(&self, year: i32) -> Result<usize> {
        let selection = self.selection(
            &SeasonClass::Number(0),
            Some(beginning_year(year)),
            Some(beginning_year(year + 1)),
        );
        let mut tracks = std::collections::HashSet::new();
        for row in self.storage.season_rows(&selection)? {
            tracks.extend(row.track_spotify_ids);
        }
        Ok(tracks.len())
    }
}

/// End boundary for a season over `rows` (in release order): accumulate
/// tracks and cut at the day boundary minimizing deviation from the ideal
/// length, falling back to `fallback` when the rows run out first.
fn season_end(rows: &[SeasonRow], ideal: usize, fallback: NaiveDate) -> NaiveDate {
    let ideal = ideal as i64;
    let mut stop = fallback;
    let mut total: i64 = 0;
    let mut day = None;
    let mut day_tracks: i64 = 0;
    for row in rows {
        let project_tracks = row.track_spotify_ids.len() as i64;
        total += project_tracks;
        if Some(row.release_day) != day {
            day = Some(row.release_day);
            day_tracks = project_tracks;
        } else {
            day_tracks += project_tracks;
        }
        if total >= ideal {
            // Cut before or after this day, whichever lands closer.
            if ideal - (total - day_tracks) < total - ideal {
                stop = row.release_day;
            } else {
                stop = row.release_day.succ_opt().unwrap_or(fallback);
            }
            break;
        }
    }
    stop
}

/// Boundary dates splitting one year of `rows` (in release order) into
/// windows of about the ideal length each. Empty when there are no rows;
/// otherwise the first boundary is January 1 and the last is the next
/// January 1.
fn year_boundaries(rows: &[SeasonRow], year: i32, ideal: usize) -> Vec<NaiveDate> {
    if rows.is_empty() {
        return Vec::new();
    }
    let year_end = beginning_year(year + 1);
    let mut boundaries = vec![beginning_year(year)];
    let mut idx = 0;
    loop {
        let last = *boundaries.last().expect("nonempty");
        if last == year_end {
            break;
        }
        while idx < rows.len() && rows[idx].release_day < last {
            idx += 1;
        }
        let mut next = season_end(&rows[idx..], ideal, year_end);
        if next <= last {
            // A single day can hold more than a full season; give it
            // its own window rather than stalling.
            next = last.succ_opt().unwrap_or(year_end);
        }
        boundaries.push(next);
    }
    boundaries
}

/// Group consecutive years (paired with their eligible track counts) into
/// season year ranges accumulating about the ideal track count. A year
/// with enough tracks for its own season is never merged with earlier
/// years, and groups of only empty years are dropped.
fn group_years(counts: &[(i32, usize)], ideal: usize) -> Vec<(i32, i32)> {
    let (Some(&(start_year, _)), Some(&(max_year, _))) = (counts.first(), counts.last()) else {
        return Vec::new();
    };
    // `counts` covers consecutive years.
    let count_of = |year: i32| counts[(year - start_year) as usize].1;

    let mut groups = Vec::new();
    let mut total = 0usize;
    let mut target_min = start_year;
    let mut target_max = target_min;
    while target_max <= max_year {
        let selected_len = count_of(target_max);
        total += selected_len;
        if total >= ideal || target_max == max_year {
            if target_min != target_max && selected_len >= ideal {
                // Stop the range short: the next year can carry its own
                // season(s).
                target_max -= 1;
            }
            if total > 0 {
                groups.push((target_min, target_max));
            }
            total = 0;
            target_max += 1;
            target_min = target_max;
        } else {
            target_max += 1;
        }
    }
    groups
}
