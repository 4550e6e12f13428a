//! SQLite persistence for processed files and their corpus segments

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use voxcorpus_types::{
    FileRecord, ProcessingStatistics, QualityMetrics, QualityStatistics, RunReport,
    SegmentRecord, StoredFile, StoredSegment,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to create database directory {path}: {source}")]
    Directory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS audio_files (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        filename TEXT NOT NULL,
        duration REAL NOT NULL DEFAULT 0,
        transcript TEXT NOT NULL DEFAULT '',
        wpm REAL NOT NULL DEFAULT 0,
        filler_ratio REAL NOT NULL DEFAULT 0,
        sentiment_score REAL NOT NULL DEFAULT 0,
        audio_path TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS audio_segments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        original_file_id INTEGER NOT NULL REFERENCES audio_files(id) ON DELETE CASCADE,
        segment_index INTEGER NOT NULL,
        start_time REAL NOT NULL,
        end_time REAL NOT NULL,
        duration REAL NOT NULL,
        transcript TEXT NOT NULL DEFAULT '',
        audio_path TEXT NOT NULL DEFAULT '',
        wpm REAL NOT NULL DEFAULT 0,
        filler_ratio REAL NOT NULL DEFAULT 0,
        sentiment_score REAL NOT NULL DEFAULT 0,
        quality_score REAL NOT NULL DEFAULT 0,
        volume REAL NOT NULL DEFAULT 0,
        volume_db REAL NOT NULL DEFAULT -60,
        noise_ratio REAL NOT NULL DEFAULT 1,
        snr_estimate REAL NOT NULL DEFAULT 0,
        zero_crossing_rate REAL NOT NULL DEFAULT 0,
        spectral_centroid REAL NOT NULL DEFAULT 0,
        is_acceptable INTEGER NOT NULL DEFAULT 0,
        is_ml_ready INTEGER NOT NULL DEFAULT 0,
        training_priority REAL NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_segments_file ON audio_segments(original_file_id);
    CREATE INDEX IF NOT EXISTS idx_segments_ml_ready
        ON audio_segments(is_ml_ready, training_priority DESC, quality_score DESC);
";

const SEGMENT_COLUMNS: &str = "id, original_file_id, segment_index, start_time, end_time,
    duration, transcript, audio_path, wpm, filler_ratio, sentiment_score, quality_score,
    volume, volume_db, noise_ratio, snr_estimate, zero_crossing_rate, spectral_centroid,
    is_acceptable, is_ml_ready, training_priority, created_at";

const FILE_COLUMNS: &str =
    "id, filename, duration, transcript, wpm, filler_ratio, sentiment_score, audio_path, created_at";

/// Corpus database
pub struct CorpusStore {
    conn: Mutex<Connection>,
}

impl CorpusStore {
    /// Open (or create) the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Directory {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;
        tracing::debug!("Opened corpus database at {:?}", path);
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn insert_file(&self, file: &FileRecord) -> Result<i64> {
        let conn = self.conn.lock();
        insert_file(&conn, file)
    }

    pub fn insert_segment(&self, file_id: i64, segment: &SegmentRecord) -> Result<i64> {
        let conn = self.conn.lock();
        insert_segment(&conn, file_id, segment, &timestamp(Utc::now()))
    }

    /// Persist a run's file row and all of its segments atomically.
    /// Returns the new file id and segment ids in report order.
    pub fn save_run(&self, report: &RunReport) -> Result<(i64, Vec<i64>)> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let file_id = insert_file(&tx, &report.file)?;
        let created_at = timestamp(report.file.processed_at);
        let segment_ids = report
            .segments
            .iter()
            .map(|segment| insert_segment(&tx, file_id, segment, &created_at))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;

        tracing::info!(
            "Stored {} with {} segments (file id {})",
            report.file.filename,
            report.segments.len(),
            file_id
        );
        Ok((file_id, segment_ids))
    }

    /// All files, newest first
    pub fn all_files(&self) -> Result<Vec<StoredFile>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM audio_files ORDER BY created_at DESC, id DESC",
            FILE_COLUMNS
        ))?;
        let rows = stmt.query_map([], file_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn file_by_id(&self, id: i64) -> Result<Option<StoredFile>> {
        let conn = self.conn.lock();
        let file = conn
            .query_row(
                &format!("SELECT {} FROM audio_files WHERE id = ?1", FILE_COLUMNS),
                params![id],
                file_from_row,
            )
            .optional()?;
        Ok(file)
    }

    /// Segments of one file in segment order
    pub fn segments_by_file(&self, file_id: i64) -> Result<Vec<StoredSegment>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM audio_segments WHERE original_file_id = ?1 ORDER BY segment_index",
            SEGMENT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![file_id], segment_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Training-ready segments, highest priority first
    pub fn ml_ready_segments(&self, min_quality: f64, limit: usize) -> Result<Vec<StoredSegment>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM audio_segments
             WHERE quality_score >= ?1 AND is_ml_ready = 1
             ORDER BY training_priority DESC, quality_score DESC
             LIMIT ?2",
            SEGMENT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![min_quality, limit as i64], segment_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Returns `false` when no segment has that id
    pub fn update_segment_ml_status(
        &self,
        segment_id: i64,
        is_ml_ready: bool,
        training_priority: f64,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE audio_segments SET is_ml_ready = ?1, training_priority = ?2 WHERE id = ?3",
            params![is_ml_ready, training_priority, segment_id],
        )?;
        Ok(changed > 0)
    }

    pub fn quality_statistics(&self) -> Result<QualityStatistics> {
        let conn = self.conn.lock();
        let (total, ml_ready) = segment_counts(&conn)?;

        let (avg, min, max, avg_sq): (Option<f64>, Option<f64>, Option<f64>, Option<f64>) = conn
            .query_row(
                "SELECT AVG(quality_score), MIN(quality_score), MAX(quality_score),
                        AVG(quality_score * quality_score)
                 FROM audio_segments",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;

        let (volume, volume_db, noise): (Option<f64>, Option<f64>, Option<f64>) = conn.query_row(
            "SELECT AVG(volume), AVG(volume_db), AVG(noise_ratio) FROM audio_segments",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(QualityStatistics {
            total_segments: total,
            ml_ready_segments: ml_ready,
            average_quality: avg.unwrap_or(0.0),
            min_quality: min.unwrap_or(0.0),
            max_quality: max.unwrap_or(0.0),
            quality_std_dev: sample_std_dev(total, avg, avg_sq),
            average_volume: volume.unwrap_or(0.0),
            average_volume_db: volume_db.unwrap_or(-60.0),
            average_noise_ratio: noise.unwrap_or(1.0),
        })
    }

    pub fn statistics(&self) -> Result<ProcessingStatistics> {
        let conn = self.conn.lock();
        let (total_files, avg_duration, avg_wpm): (i64, Option<f64>, Option<f64>) = conn
            .query_row(
                "SELECT COUNT(*), AVG(duration), AVG(wpm) FROM audio_files",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;
        let (total_segments, ml_ready) = segment_counts(&conn)?;
        let avg_quality: Option<f64> =
            conn.query_row("SELECT AVG(quality_score) FROM audio_segments", [], |row| {
                row.get(0)
            })?;

        Ok(ProcessingStatistics {
            total_files: total_files as usize,
            total_segments,
            ml_ready_segments: ml_ready,
            average_duration: avg_duration.unwrap_or(0.0),
            average_wpm: avg_wpm.unwrap_or(0.0),
            average_quality_score: avg_quality.unwrap_or(0.0),
        })
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

fn insert_file(conn: &Connection, file: &FileRecord) -> Result<i64> {
    conn.execute(
        "INSERT INTO audio_files
         (filename, duration, transcript, wpm, filler_ratio, sentiment_score, audio_path, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            file.filename,
            file.duration,
            file.transcript,
            file.wpm,
            file.filler_ratio,
            file.sentiment_score,
            file.audio_path,
            timestamp(file.processed_at),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_segment(
    conn: &Connection,
    file_id: i64,
    segment: &SegmentRecord,
    created_at: &str,
) -> Result<i64> {
    let m = &segment.metrics;
    conn.execute(
        "INSERT INTO audio_segments
         (original_file_id, segment_index, start_time, end_time, duration, transcript,
          audio_path, wpm, filler_ratio, sentiment_score, quality_score, volume, volume_db,
          noise_ratio, snr_estimate, zero_crossing_rate, spectral_centroid, is_acceptable,
          is_ml_ready, training_priority, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                 ?18, ?19, ?20, ?21)",
        params![
            file_id,
            segment.segment_index as i64,
            segment.start_time,
            segment.end_time,
            segment.duration,
            segment.transcript,
            segment.audio_path,
            segment.wpm,
            segment.filler_ratio,
            segment.sentiment_score,
            m.quality_score,
            m.volume,
            m.volume_db,
            m.noise_ratio,
            m.snr_estimate,
            m.zero_crossing_rate,
            m.spectral_centroid,
            m.is_acceptable,
            segment.is_ml_ready,
            segment.training_priority,
            created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn segment_counts(conn: &Connection) -> Result<(usize, usize)> {
    let (total, ready): (i64, Option<i64>) = conn.query_row(
        "SELECT COUNT(*), SUM(is_ml_ready) FROM audio_segments",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok((total as usize, ready.unwrap_or(0) as usize))
}

/// Sample standard deviation from the mean and mean of squares
fn sample_std_dev(count: usize, mean: Option<f64>, mean_sq: Option<f64>) -> f64 {
    match (mean, mean_sq) {
        (Some(mean), Some(mean_sq)) if count > 1 => {
            let n = count as f64;
            let variance = (mean_sq - mean * mean) * n / (n - 1.0);
            variance.max(0.0).sqrt()
        }
        _ => 0.0,
    }
}

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<StoredFile> {
    Ok(StoredFile {
        id: row.get(0)?,
        filename: row.get(1)?,
        duration: row.get(2)?,
        transcript: row.get(3)?,
        wpm: row.get(4)?,
        filler_ratio: row.get(5)?,
        sentiment_score: row.get(6)?,
        audio_path: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn segment_from_row(row: &Row<'_>) -> rusqlite::Result<StoredSegment> {
    let segment_index: i64 = row.get(2)?;
    Ok(StoredSegment {
        id: row.get(0)?,
        original_file_id: row.get(1)?,
        record: SegmentRecord {
            segment_index: segment_index.max(0) as usize,
            start_time: row.get(3)?,
            end_time: row.get(4)?,
            duration: row.get(5)?,
            transcript: row.get(6)?,
            audio_path: row.get(7)?,
            wpm: row.get(8)?,
            filler_ratio: row.get(9)?,
            sentiment_score: row.get(10)?,
            metrics: QualityMetrics {
                quality_score: row.get(11)?,
                volume: row.get(12)?,
                volume_db: row.get(13)?,
                noise_ratio: row.get(14)?,
                snr_estimate: row.get(15)?,
                zero_crossing_rate: row.get(16)?,
                spectral_centroid: row.get(17)?,
                is_acceptable: row.get(18)?,
            },
            is_ml_ready: row.get(19)?,
            training_priority: row.get(20)?,
        },
        created_at: row.get(21)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxcorpus_types::{LocatorStrategy, RunSummary};

    fn file(name: &str, duration: f64, wpm: f64) -> FileRecord {
        FileRecord {
            filename: name.to_string(),
            duration,
            transcript: "Hello there.".to_string(),
            wpm,
            filler_ratio: 0.0,
            sentiment_score: 0.0,
            audio_path: format!("/tmp/{}_processed.wav", name),
            processed_at: Utc::now(),
        }
    }

    fn segment(index: usize, quality: f64, priority: f64) -> SegmentRecord {
        SegmentRecord {
            segment_index: index,
            start_time: index as f64,
            end_time: index as f64 + 1.0,
            duration: 1.0,
            transcript: format!("Segment number {} is here.", index),
            audio_path: format!("/tmp/seg_{:03}.wav", index),
            wpm: 120.0,
            filler_ratio: 0.0,
            sentiment_score: 0.0,
            metrics: QualityMetrics {
                volume: 0.1,
                volume_db: -20.0,
                noise_ratio: 0.2,
                snr_estimate: 15.0,
                zero_crossing_rate: 0.1,
                spectral_centroid: 1500.0,
                quality_score: quality,
                is_acceptable: quality >= 0.05,
            },
            is_ml_ready: true,
            training_priority: priority,
        }
    }

    fn report(name: &str, segments: Vec<SegmentRecord>) -> RunReport {
        RunReport {
            file: file(name, 10.0, 100.0),
            segments,
            strategy: LocatorStrategy::Timestamps,
            summary: RunSummary {
                candidates: 0,
                rejected_by_gate: 0,
                assessment_failures: 0,
                selected: 0,
                average_quality: 0.0,
                min_quality: 0.0,
                max_quality: 0.0,
                high_quality: 0,
                threshold: None,
            },
        }
    }

    #[test]
    fn test_save_run_and_read_back() {
        let store = CorpusStore::open_in_memory().unwrap();
        let (id, segment_ids) = store
            .save_run(&report("a.wav", vec![segment(1, 0.6, 0.8), segment(0, 0.4, 0.5)]))
            .unwrap();
        assert_eq!(segment_ids.len(), 2);

        let stored = store.file_by_id(id).unwrap().unwrap();
        assert_eq!(stored.filename, "a.wav");
        assert!(store.file_by_id(id + 100).unwrap().is_none());

        let segments = store.segments_by_file(id).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].record.segment_index, 0);
        assert_eq!(segments[1].record, segment(1, 0.6, 0.8));
        assert!(segments.iter().all(|s| s.original_file_id == id));
        assert_eq!(segments[1].id, segment_ids[0]);
    }

    #[test]
    fn test_ml_ready_ordering_and_filter() {
        let store = CorpusStore::open_in_memory().unwrap();
        store
            .save_run(&report(
                "a.wav",
                vec![
                    segment(0, 0.5, 0.6),
                    segment(1, 0.9, 0.6),
                    segment(2, 0.2, 0.9),
                    segment(3, 0.7, 0.95),
                ],
            ))
            .unwrap();

        let ready = store.ml_ready_segments(0.3, 100).unwrap();
        let order: Vec<usize> = ready.iter().map(|s| s.record.segment_index).collect();
        assert_eq!(order, vec![3, 1, 0]);

        assert_eq!(store.ml_ready_segments(0.3, 2).unwrap().len(), 2);

        let demoted = ready[0].id;
        assert!(store.update_segment_ml_status(demoted, false, 0.0).unwrap());
        assert!(!store.update_segment_ml_status(9999, true, 1.0).unwrap());
        let ready = store.ml_ready_segments(0.3, 100).unwrap();
        assert!(ready.iter().all(|s| s.id != demoted));
    }

    #[test]
    fn test_statistics() {
        let store = CorpusStore::open_in_memory().unwrap();

        let empty = store.quality_statistics().unwrap();
        assert_eq!(empty.total_segments, 0);
        assert_eq!(empty.average_volume_db, -60.0);
        assert_eq!(empty.average_noise_ratio, 1.0);
        assert_eq!(empty.quality_std_dev, 0.0);
        assert_eq!(store.statistics().unwrap().total_files, 0);

        store
            .save_run(&report("a.wav", vec![segment(0, 0.2, 0.2), segment(1, 0.4, 0.4)]))
            .unwrap();
        let file_id = store.insert_file(&file("b.wav", 30.0, 140.0)).unwrap();
        let seg_id = store.insert_segment(file_id, &segment(0, 0.6, 0.6)).unwrap();
        store.update_segment_ml_status(seg_id, false, 0.0).unwrap();

        let quality = store.quality_statistics().unwrap();
        assert_eq!(quality.total_segments, 3);
        assert_eq!(quality.ml_ready_segments, 2);
        assert!((quality.average_quality - 0.4).abs() < 1e-9);
        assert!((quality.min_quality - 0.2).abs() < 1e-9);
        assert!((quality.max_quality - 0.6).abs() < 1e-9);
        assert!((quality.quality_std_dev - 0.2).abs() < 1e-6);

        let stats = store.statistics().unwrap();
        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.total_segments, 3);
        assert_eq!(stats.ml_ready_segments, 2);
        assert!((stats.average_duration - 20.0).abs() < 1e-9);
        assert!((stats.average_wpm - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_files_newest_first_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("corpus.db");
        {
            let store = CorpusStore::open(&path).unwrap();
            let mut older = file("old.wav", 1.0, 0.0);
            older.processed_at = Utc::now() - chrono::Duration::hours(1);
            store.insert_file(&older).unwrap();
            store.insert_file(&file("new.wav", 1.0, 0.0)).unwrap();
        }

        let store = CorpusStore::open(&path).unwrap();
        let names: Vec<String> = store
            .all_files()
            .unwrap()
            .into_iter()
            .map(|f| f.filename)
            .collect();
        assert_eq!(names, vec!["new.wav", "old.wav"]);
    }
}
