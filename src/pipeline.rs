//! The row pipeline: parse → deduplicate → route bad rows → resolve the
//! artist → load the song. Rows are handled one at a time, in file order.

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info, warn};

use crate::artist::ArtistResolver;
use crate::bad_data::{route_bad_row, sentinel_song, BadDataMode, Disposition, ReportWriter};
use crate::dedup::{Admission, Deduplicator, DuplicatePolicy};
use crate::error::{ImportError, RowError};
use crate::export::CleanedWriter;
use crate::loader::{load_song, LoadOutcome};
use crate::row::{parse_row, HeaderMap, MalformedRow, SongRow};
use crate::store::{CatalogStore, NewSong};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    pub duplicates: DuplicatePolicy,
    pub bad_data: BadDataMode,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            duplicates: DuplicatePolicy::Keep,
            bad_data: BadDataMode::Drop,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub total_rows: u64,
    pub valid_rows: u64,
    pub malformed_rows: u64,
    pub duplicates_dropped: u64,
    pub duplicates_kept: u64,
    pub songs_inserted: u64,
    pub artists_created: u64,
    pub constraint_violations: u64,
    pub bad_rows_reported: u64,
    pub bad_rows_inserted: u64,
    pub bad_rows_dropped: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AnalysisReport {
    pub total_rows: u64,
    /// `(line, reason)` for every row that failed validation.
    pub malformed: Vec<(u64, String)>,
    pub duplicate_rows: u64,
}

// ---------------------------------------------------------------------------
// Classification (shared by import and pre-analysis)
// ---------------------------------------------------------------------------

enum Classified {
    Valid { row: SongRow, admission: Admission },
    Malformed(MalformedRow),
}

struct Classifier {
    header: HeaderMap,
    dedup: Deduplicator,
}

impl Classifier {
    fn classify(&mut self, record: &StringRecord) -> Classified {
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        match parse_row(record, line, &self.header) {
            Ok(row) => {
                let admission = self.dedup.admit(&row);
                Classified::Valid { row, admission }
            }
            Err(bad) => Classified::Malformed(bad),
        }
    }
}

/// Reads the header and returns the remaining records, or `None` for an
/// empty input.
fn open_records(
    text: &str,
    policy: DuplicatePolicy,
) -> Result<Option<(Classifier, csv::StringRecordsIntoIter<&[u8]>)>, ImportError> {
    let mut records = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes())
        .into_records();

    let header = match records.next() {
        Some(first) => HeaderMap::from_record(&first?)?,
        None => {
            warn!("The CSV file is empty");
            return Ok(None);
        }
    };
    debug!("Header has {} columns", header.width());

    let classifier = Classifier {
        header,
        dedup: Deduplicator::new(policy),
    };
    Ok(Some((classifier, records)))
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Runs the full pipeline over `text`, persisting through `store`.
///
/// `report` receives malformed and dropped-duplicate rows when the
/// bad-data mode is `Report`; `cleaned` receives every forwarded valid row.
pub async fn run_import<S: CatalogStore>(
    store: &mut S,
    text: &str,
    options: ImportOptions,
    mut report: Option<&mut ReportWriter>,
    mut cleaned: Option<&mut CleanedWriter>,
) -> Result<ImportSummary, ImportError> {
    let mut summary = ImportSummary::default();
    let Some((mut classifier, records)) = open_records(text, options.duplicates)? else {
        return Ok(summary);
    };
    let mut resolver = ArtistResolver::new();

    for record in records {
        let record = record?;
        summary.total_rows += 1;

        match classifier.classify(&record) {
            Classified::Malformed(bad) => {
                summary.malformed_rows += 1;
                match route_bad_row(options.bad_data, &bad, report.as_deref_mut())? {
                    Disposition::Dropped => summary.bad_rows_dropped += 1,
                    Disposition::Reported => summary.bad_rows_reported += 1,
                    Disposition::Insert(partial) => {
                        let artist_id = resolver.sentinel(store).await?;
                        let song = sentinel_song(partial, artist_id);
                        match load_song(store, &song, bad.line).await? {
                            LoadOutcome::Inserted => {
                                info!("Inserted bad row at line {} under unknown artist", bad.line);
                                summary.bad_rows_inserted += 1;
                            }
                            LoadOutcome::Skipped(_) => summary.constraint_violations += 1,
                        }
                    }
                }
            }
            Classified::Valid { row, admission } => {
                summary.valid_rows += 1;
                match admission {
                    Admission::First => {}
                    Admission::Repeat { first_line } => {
                        summary.duplicates_kept += 1;
                        debug!(
                            "Line {} repeats UNIQUE_ID {} from line {}",
                            row.line, row.unique_id, first_line
                        );
                    }
                    Admission::Dropped(err) => {
                        summary.duplicates_dropped += 1;
                        debug!("Removing line {}: {}", row.line, err);
                        if options.bad_data == BadDataMode::Report {
                            if let Some(report) = report.as_deref_mut() {
                                report.duplicate(row.line, &row.to_record(), &err)?;
                            }
                        }
                        continue;
                    }
                }

                if let Some(cleaned) = cleaned.as_deref_mut() {
                    cleaned.write(&row)?;
                }

                let artist_id = resolver
                    .resolve(store, &row.artist_raw, &row.artist_clean)
                    .await?;
                let song = NewSong::from_row(&row, artist_id);
                match load_song(store, &song, row.line).await? {
                    LoadOutcome::Inserted => summary.songs_inserted += 1,
                    LoadOutcome::Skipped(_) => summary.constraint_violations += 1,
                }
            }
        }
    }

    summary.artists_created = resolver.created();
    let repeats = summary.duplicates_dropped + summary.duplicates_kept;
    if repeats > 0 {
        info!("Found {} duplicate rows based on UNIQUE_ID", repeats);
    }
    info!(
        "Processed {} rows: {} songs inserted, {} artists created",
        summary.total_rows, summary.songs_inserted, summary.artists_created
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Pre-analysis
// ---------------------------------------------------------------------------

/// Validates and deduplicates `text`. Takes no store, so storage is never
/// touched. Every malformed and duplicate row goes to `report`.
pub fn run_pre_analysis(
    text: &str,
    mut report: Option<&mut ReportWriter>,
) -> Result<AnalysisReport, ImportError> {
    let mut analysis = AnalysisReport::default();
    let Some((mut classifier, records)) = open_records(text, DuplicatePolicy::Remove)? else {
        return Ok(analysis);
    };

    for record in records {
        let record = record?;
        analysis.total_rows += 1;

        match classifier.classify(&record) {
            Classified::Malformed(bad) => {
                if let Some(report) = report.as_deref_mut() {
                    report.malformed(&bad)?;
                }
                analysis.malformed.push((bad.line, bad.reason()));
            }
            Classified::Valid { row, admission } => {
                let err = match admission {
                    Admission::First => continue,
                    Admission::Dropped(err) => err,
                    Admission::Repeat { first_line } => RowError::Duplicate {
                        unique_id: row.unique_id.clone(),
                        first_line,
                    },
                };
                analysis.duplicate_rows += 1;
                if let Some(report) = report.as_deref_mut() {
                    report.duplicate(row.line, &row.to_record(), &err)?;
                }
            }
        }
    }

    info!(
        "Pre-analysis: {} rows, {} malformed, {} duplicates",
        analysis.total_rows,
        analysis.malformed.len(),
        analysis.duplicate_rows
    );
    Ok(analysis)
}
