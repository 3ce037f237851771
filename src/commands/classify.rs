use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;

use crate::api::{album_id_from_ref, Album, SpotifyClient};
use crate::config::Config;
use crate::models::{parse_release_day, Classification, ProjectRecord};
use crate::storage::{ClassifyOutcome, Storage};

#[derive(Args)]
pub struct ClassifyCommand {
    /// Ranking (A/B/C/E) or certification word (e.g. 🔂)
    classification: String,

    /// Albums to classify: Spotify IDs, URIs, or share links
    #[arg(required = true)]
    albums: Vec<String>,
}

impl ClassifyCommand {
    pub async fn execute(self) -> Result<()> {
        let classification = Classification::parse(&self.classification)?;

        let config = Config::load()?;
        let mut storage = Storage::open()?;
        let client = SpotifyClient::new(config)?;

        for reference in &self.albums {
            let album_id = album_id_from_ref(reference)?;
            let album = client
                .album(&album_id)
                .await
                .with_context(|| format!("Failed to fetch album {album_id}"))?;
            let record = project_record(&album)?;

            let title = format!("{} - {}", record.artist_names.join(", "), record.name);
            match storage.insert_classification(&record, &classification)? {
                ClassifyOutcome::RankingStored => {
                    println!("{} {} ranked {}", "✓".green(), title, classification);
                }
                ClassifyOutcome::CertificationStored => {
                    println!("{} {} certified {}", "✓".green(), title, classification);
                }
                ClassifyOutcome::AlreadyCertified => {
                    println!("{} {} already certified {}", "·".dimmed(), title, classification);
                }
            }
        }

        Ok(())
    }
}

/// Snapshot an album into the stored project shape.
fn project_record(album: &Album) -> Result<ProjectRecord> {
    let release_day = parse_release_day(&album.release_date)
        .with_context(|| format!("Album {} has an unusable release date", album.name))?;

    let mut artist_pairs: Vec<(String, String)> = album
        .artists
        .iter()
        .map(|a| (a.name.clone(), a.id.clone()))
        .collect();
    artist_pairs.sort();
    let (artist_names, artist_ids) = artist_pairs.into_iter().unzip();

    Ok(ProjectRecord {
        release_day,
        artist_names,
        artist_ids,
        name: album.name.clone(),
        track_names: album.tracks.iter().map(|t| t.name.clone()).collect(),
        track_durations_sec: album
            .tracks
            .iter()
            .map(|t| (t.duration_ms / 1000) as u32)
            .collect(),
        track_numbers: album.tracks.iter().map(|t| t.track_number).collect(),
        track_spotify_ids: album.tracks.iter().map(|t| t.id.clone()).collect(),
        album_spotify_id: album.id.clone(),
        retrieved_time: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AlbumTrack, ArtistRef};

    #[test]
    fn test_project_record_sorts_artists() {
        let album = Album {
            id: "alb".to_string(),
            name: "Split".to_string(),
            release_date: "2020-05-01".to_string(),
            artists: vec![
                ArtistRef {
                    id: "z-id".to_string(),
                    name: "Zeta".to_string(),
                },
                ArtistRef {
                    id: "a-id".to_string(),
                    name: "Alpha".to_string(),
                },
            ],
            tracks: vec![AlbumTrack {
                id: "t1".to_string(),
                name: "One".to_string(),
                duration_ms: 201_500,
                track_number: 1,
            }],
        };

        let record = project_record(&album).unwrap();
        assert_eq!(record.artist_names, vec!["Alpha", "Zeta"]);
        assert_eq!(record.artist_ids, vec!["a-id", "z-id"]);
        assert_eq!(record.track_durations_sec, vec![201]);
    }
}
