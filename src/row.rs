use std::fmt;

use csv::StringRecord;

use crate::artist::normalize_name;
use crate::error::ImportError;

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

pub const SONG_RAW: &str = "SONG RAW";
pub const SONG_CLEAN: &str = "Song Clean";
pub const ARTIST_RAW: &str = "ARTIST RAW";
pub const ARTIST_CLEAN: &str = "ARTIST CLEAN";
pub const CALLSIGN: &str = "CALLSIGN";
pub const TIME: &str = "TIME";
pub const UNIQUE_ID: &str = "UNIQUE_ID";
pub const COMBINED: &str = "COMBINED";
pub const FIRST_PLAY: &str = "First?";

/// Header of a well-formed source file, in its canonical order.
pub const EXPECTED_HEADER: [&str; 9] = [
    SONG_RAW,
    SONG_CLEAN,
    ARTIST_RAW,
    ARTIST_CLEAN,
    CALLSIGN,
    TIME,
    UNIQUE_ID,
    COMBINED,
    FIRST_PLAY,
];

/// Column positions resolved from the header record.
#[derive(Debug, Clone)]
pub struct HeaderMap {
    width: usize,
    song_raw: usize,
    song_clean: usize,
    artist_raw: usize,
    artist_clean: usize,
    callsign: usize,
    time: usize,
    unique_id: usize,
    combined: usize,
    first_play: usize,
}

impl HeaderMap {
    pub fn from_record(header: &StringRecord) -> Result<Self, ImportError> {
        let names: Vec<&str> = header.iter().map(str::trim).collect();
        let position = |name: &str| names.iter().position(|h| *h == name);

        let missing: Vec<String> = EXPECTED_HEADER
            .iter()
            .filter(|&&name| position(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::Header { missing });
        }

        let col = |name: &str| position(name).unwrap_or_default();
        Ok(Self {
            width: names.len(),
            song_raw: col(SONG_RAW),
            song_clean: col(SONG_CLEAN),
            artist_raw: col(ARTIST_RAW),
            artist_clean: col(ARTIST_CLEAN),
            callsign: col(CALLSIGN),
            time: col(TIME),
            unique_id: col(UNIQUE_ID),
            combined: col(COMBINED),
            first_play: col(FIRST_PLAY),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    fn columns(&self) -> [(&'static str, usize); 9] {
        [
            (SONG_RAW, self.song_raw),
            (SONG_CLEAN, self.song_clean),
            (ARTIST_RAW, self.artist_raw),
            (ARTIST_CLEAN, self.artist_clean),
            (CALLSIGN, self.callsign),
            (TIME, self.time),
            (UNIQUE_ID, self.unique_id),
            (COMBINED, self.combined),
            (FIRST_PLAY, self.first_play),
        ]
    }
}

// ---------------------------------------------------------------------------
// Parsed rows
// ---------------------------------------------------------------------------

/// A validated play record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongRow {
    pub line: u64,
    pub song_raw: String,
    pub song_clean: String,
    pub artist_raw: String,
    pub artist_clean: String,
    pub callsign: String,
    pub time: i64,
    pub unique_id: String,
    pub combined: String,
    pub first_play: bool,
}

impl SongRow {
    /// Fields in [`EXPECTED_HEADER`] order, for the cleaned-data export.
    pub fn to_record(&self) -> [String; 9] {
        [
            self.song_raw.clone(),
            self.song_clean.clone(),
            self.artist_raw.clone(),
            self.artist_clean.clone(),
            self.callsign.clone(),
            self.time.to_string(),
            self.unique_id.clone(),
            self.combined.clone(),
            if self.first_play { "1" } else { "0" }.to_string(),
        ]
    }
}

/// Whatever could be salvaged from a row that failed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialSong {
    pub song_raw: Option<String>,
    pub song_clean: Option<String>,
    pub callsign: Option<String>,
    pub time: Option<i64>,
    pub unique_id: Option<String>,
    pub combined: Option<String>,
    pub first_play: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldIssue {
    FieldCount { expected: usize, found: usize },
    Missing(&'static str),
    NotAnInteger { column: &'static str, value: String },
    NotABoolean { column: &'static str, value: String },
    /// PostgreSQL text columns cannot store NUL.
    NulByte(&'static str),
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldIssue::FieldCount { expected, found } => {
                write!(f, "expected {expected} fields, found {found}")
            }
            FieldIssue::Missing(column) => write!(f, "missing {column}"),
            FieldIssue::NotAnInteger { column, value } => {
                write!(f, "{column} '{value}' is not an integer")
            }
            FieldIssue::NotABoolean { column, value } => {
                write!(f, "{column} '{value}' is not a boolean")
            }
            FieldIssue::NulByte(column) => write!(f, "{column} contains a NUL byte"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRow {
    pub line: u64,
    pub raw: Vec<String>,
    pub issues: Vec<FieldIssue>,
    pub partial: PartialSong,
}

impl MalformedRow {
    pub fn reason(&self) -> String {
        self.issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn raw_line(&self) -> String {
        self.raw.join(",")
    }
}

impl fmt::Display for MalformedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason())
    }
}

impl std::error::Error for MalformedRow {}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Turns one data record into a [`SongRow`], or collects every problem
/// found in it.
pub fn parse_row(
    record: &StringRecord,
    line: u64,
    header: &HeaderMap,
) -> Result<SongRow, MalformedRow> {
    let field = |idx: usize| record.get(idx).map(str::trim).filter(|s| !s.is_empty());
    // Salvaged fields must still be storable.
    let salvage = |value: Option<&str>| value.filter(|s| !s.contains('\0')).map(str::to_string);
    let mut issues = Vec::new();

    if record.len() != header.width {
        issues.push(FieldIssue::FieldCount {
            expected: header.width,
            found: record.len(),
        });
    }

    for (column, idx) in header.columns() {
        if record.get(idx).is_some_and(|value| value.contains('\0')) {
            issues.push(FieldIssue::NulByte(column));
        }
    }

    let song_raw = field(header.song_raw);
    let song_clean = field(header.song_clean);
    if song_raw.is_none() && song_clean.is_none() {
        issues.push(FieldIssue::Missing(SONG_RAW));
    }

    let artist_clean = field(header.artist_clean).filter(|s| !normalize_name(s).is_empty());
    if artist_clean.is_none() {
        issues.push(FieldIssue::Missing(ARTIST_CLEAN));
    }

    let unique_id = field(header.unique_id);
    if unique_id.is_none() {
        issues.push(FieldIssue::Missing(UNIQUE_ID));
    }

    let time = match field(header.time) {
        None => {
            issues.push(FieldIssue::Missing(TIME));
            None
        }
        Some(value) => match value.parse::<i64>() {
            Ok(t) => Some(t),
            Err(_) => {
                issues.push(FieldIssue::NotAnInteger {
                    column: TIME,
                    value: value.to_string(),
                });
                None
            }
        },
    };

    let first_play = match field(header.first_play) {
        None => {
            issues.push(FieldIssue::Missing(FIRST_PLAY));
            None
        }
        Some(value) => {
            let flag = parse_flag(value);
            if flag.is_none() {
                issues.push(FieldIssue::NotABoolean {
                    column: FIRST_PLAY,
                    value: value.to_string(),
                });
            }
            flag
        }
    };

    let callsign = field(header.callsign);
    let combined = field(header.combined);

    if !issues.is_empty() {
        return Err(MalformedRow {
            line,
            raw: record.iter().map(str::to_string).collect(),
            issues,
            partial: PartialSong {
                song_raw: salvage(song_raw),
                song_clean: salvage(song_clean),
                callsign: salvage(callsign),
                time,
                unique_id: salvage(unique_id),
                combined: salvage(combined),
                first_play,
            },
        });
    }

    // All required fields are present past this point.
    let artist_clean = artist_clean.unwrap_or_default().to_string();
    let song_raw = song_raw.or(song_clean).unwrap_or_default().to_string();
    let song_clean = match song_clean {
        Some(clean) => clean.to_string(),
        None => normalize_name(&song_raw),
    };

    Ok(SongRow {
        line,
        song_raw,
        song_clean,
        artist_raw: field(header.artist_raw)
            .map(str::to_string)
            .unwrap_or_else(|| artist_clean.clone()),
        artist_clean,
        callsign: callsign.unwrap_or_default().to_string(),
        time: time.unwrap_or_default(),
        unique_id: unique_id.unwrap_or_default().to_string(),
        combined: combined.unwrap_or_default().to_string(),
        first_play: first_play.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{header_record, record};

    fn header() -> HeaderMap {
        HeaderMap::from_record(&header_record()).unwrap()
    }

    #[test]
    fn parses_complete_row() {
        let rec = record(&[
            "Caught Up in You", "Caught Up in You", ".38 Special", ".38 Special",
            "KGLK", "1402943314", "KGLK1536", "Caught Up in You by .38 Special", "1",
        ]);
        let row = parse_row(&rec, 2, &header()).unwrap();
        assert_eq!(row.line, 2);
        assert_eq!(row.time, 1402943314);
        assert_eq!(row.unique_id, "KGLK1536");
        assert!(row.first_play);
        assert_eq!(row.artist_raw, ".38 Special");
    }

    #[test]
    fn header_columns_may_be_reordered() {
        let mut names = EXPECTED_HEADER.to_vec();
        names.reverse();
        let map = HeaderMap::from_record(&StringRecord::from(names)).unwrap();

        let rec = record(&[
            "0", "Fly Away by Lenny", "ID9", "1388534400", "WXYZ", "Lenny", "Lenny", "Fly Away", "Fly Away",
        ]);
        let row = parse_row(&rec, 2, &map).unwrap();
        assert_eq!(row.unique_id, "ID9");
        assert_eq!(row.song_raw, "Fly Away");
        assert!(!row.first_play);
    }

    #[test]
    fn missing_header_column_is_fatal() {
        let rec = StringRecord::from(vec!["SONG RAW", "Song Clean", "ARTIST RAW"]);
        match HeaderMap::from_record(&rec) {
            Err(ImportError::Header { missing }) => {
                assert!(missing.contains(&"UNIQUE_ID".to_string()));
                assert_eq!(missing.len(), 6);
            }
            other => panic!("expected header error, got {other:?}"),
        }
    }

    #[test]
    fn missing_timestamp_is_malformed() {
        let rec = record(&["Song", "Song", "Band", "Band", "KXYZ", "", "ID1", "Song by Band", "1"]);
        let bad = parse_row(&rec, 5, &header()).unwrap_err();
        assert_eq!(bad.issues, vec![FieldIssue::Missing(TIME)]);
        assert_eq!(bad.partial.unique_id.as_deref(), Some("ID1"));
        assert_eq!(bad.partial.first_play, Some(true));
        assert_eq!(bad.reason(), "missing TIME");
    }

    #[test]
    fn untypeable_fields_collect_every_issue() {
        let rec = record(&["Song", "Song", "Band", "Band", "KXYZ", "noon", "ID1", "Song by Band", "maybe"]);
        let bad = parse_row(&rec, 3, &header()).unwrap_err();
        assert_eq!(bad.issues.len(), 2);
        assert_eq!(bad.reason(), "TIME 'noon' is not an integer; First? 'maybe' is not a boolean");
    }

    #[test]
    fn short_row_reports_field_count() {
        let rec = record(&["Song", "Song", "Band"]);
        let bad = parse_row(&rec, 4, &header()).unwrap_err();
        assert_eq!(bad.issues[0], FieldIssue::FieldCount { expected: 9, found: 3 });
        assert_eq!(bad.raw_line(), "Song,Song,Band");
    }

    #[test]
    fn blank_song_clean_falls_back_to_normalized_raw() {
        let rec = record(&["  Hey  Jude ", "", "The Beatles", "The Beatles", "KABC", "1", "ID2", "", "no"]);
        let row = parse_row(&rec, 2, &header()).unwrap();
        assert_eq!(row.song_raw, "Hey  Jude");
        assert_eq!(row.song_clean, "hey jude");
    }

    #[test]
    fn nul_bytes_make_the_row_malformed() {
        let rec = record(&["So\0ng", "So\0ng", "Band", "Band", "KXYZ", "1400000000", "ID1", "x", "1"]);
        let bad = parse_row(&rec, 2, &header()).unwrap_err();
        assert_eq!(
            bad.issues,
            vec![FieldIssue::NulByte(SONG_RAW), FieldIssue::NulByte(SONG_CLEAN)]
        );
        assert_eq!(bad.partial.song_raw, None);
        assert_eq!(bad.partial.unique_id.as_deref(), Some("ID1"));
    }

    #[test]
    fn single_letter_t_and_f_are_not_booleans() {
        for value in ["t", "F"] {
            let rec = record(&["Song", "Song", "Band", "Band", "KXYZ", "1", "ID1", "", value]);
            let bad = parse_row(&rec, 2, &header()).unwrap_err();
            assert!(matches!(bad.issues[..], [FieldIssue::NotABoolean { .. }]));
        }
        for (value, expected) in [("Y", true), ("no", false), ("TRUE", true), ("0", false)] {
            let rec = record(&["Song", "Song", "Band", "Band", "KXYZ", "1", "ID1", "", value]);
            assert_eq!(parse_row(&rec, 2, &header()).unwrap().first_play, expected);
        }
    }
}
