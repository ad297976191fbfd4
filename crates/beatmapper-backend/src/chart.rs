//! Chart CSV output, parsing, and inspection.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use beatmapper_spec::{Band, DifficultyTier, NoteEvent};

use crate::analyzer::{AnalyzerError, ReferenceEvent, TimingReference};
use crate::error::{GenerateError, GenerateResult};

/// Header row of every chart file.
pub const CHART_HEADER: &str =
    "Time [s],Enemy Type,Aux Color 1,Aux Color 2,Nº Enemies,interval,Aux";

const COLUMNS: usize = 7;

/// Writes `events` as chart CSV.
///
/// # Arguments
/// * `events` - Finished stream, written in the given order
/// * `writer` - Sink; wrap files in a `BufWriter`
///
/// # Errors
/// [`GenerateError::OutputIo`] when the sink rejects a write.
pub fn write_chart<W: Write>(events: &[NoteEvent], mut writer: W) -> GenerateResult<()> {
    writeln!(writer, "{}", CHART_HEADER)?;
    for event in events {
        let a = event.attributes;
        writeln!(
            writer,
            "{:.2},{},{},{},1,,{}",
            event.time, a.enemy_type, a.color1, a.color2, a.aux
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// A rendered chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartOutput {
    /// CSV bytes.
    pub data: Vec<u8>,
    /// BLAKE3 hash of `data` (hex).
    pub hash: String,
    /// Number of event rows.
    pub event_count: usize,
}

impl ChartOutput {
    /// Renders `events` into memory and hashes the result.
    pub fn render(events: &[NoteEvent]) -> GenerateResult<Self> {
        let mut data = Vec::with_capacity(CHART_HEADER.len() + events.len() * 24);
        write_chart(events, &mut data)?;
        let hash = blake3::hash(&data).to_hex().to_string();
        Ok(Self {
            data,
            hash,
            event_count: events.len(),
        })
    }
}

/// One parsed chart row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRecord {
    pub time: f64,
    pub enemy_type: u8,
    pub color1: u8,
    pub color2: u8,
    pub count: u32,
    pub interval: String,
    pub aux: u8,
}

impl ChartRecord {
    /// Band implied by the record's attribute codes.
    pub fn band(&self) -> Band {
        if self.enemy_type == 2 {
            return Band::Crash;
        }
        match self.aux {
            7 => Band::Kick,
            6 => Band::HiHat,
            _ => Band::Snare,
        }
    }
}

/// Parses chart CSV. A leading header row is skipped; blank lines are ignored.
pub fn read_chart<R: BufRead>(reader: R) -> GenerateResult<Vec<ChartRecord>> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        let row = line.trim_start_matches('\u{feff}').trim();
        if row.is_empty() || (index == 0 && row.starts_with("Time")) {
            continue;
        }
        records.push(parse_row(row, line_no)?);
    }
    Ok(records)
}

fn parse_row(row: &str, line: usize) -> GenerateResult<ChartRecord> {
    let fields: Vec<&str> = row.split(',').map(str::trim).collect();
    if fields.len() < COLUMNS {
        return Err(GenerateError::ChartParse {
            line,
            message: format!("expected {} columns, found {}", COLUMNS, fields.len()),
        });
    }

    let time: f64 = parse_field(fields[0], "time", line)?;
    if !time.is_finite() {
        return Err(GenerateError::ChartParse {
            line,
            message: format!("non-finite time '{}'", fields[0]),
        });
    }
    let count = if fields[4].is_empty() {
        1
    } else {
        parse_field(fields[4], "count", line)?
    };

    Ok(ChartRecord {
        time,
        enemy_type: parse_field(fields[1], "enemy type", line)?,
        color1: parse_field(fields[2], "aux color 1", line)?,
        color2: parse_field(fields[3], "aux color 2", line)?,
        count,
        interval: fields[5].to_string(),
        aux: parse_field(fields[6], "aux", line)?,
    })
}

fn parse_field<T: std::str::FromStr>(raw: &str, name: &str, line: usize) -> GenerateResult<T> {
    raw.parse().map_err(|_| GenerateError::ChartParse {
        line,
        message: format!("invalid {} '{}'", name, raw),
    })
}

/// An existing chart used as a timing reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceChart {
    pub records: Vec<ChartRecord>,
}

impl ReferenceChart {
    pub fn new(records: Vec<ChartRecord>) -> Self {
        Self { records }
    }
}

impl TimingReference for ReferenceChart {
    fn available(&self) -> bool {
        !self.records.is_empty()
    }

    fn reference_events(&self) -> Result<Vec<ReferenceEvent>, AnalyzerError> {
        Ok(self
            .records
            .iter()
            .map(|r| ReferenceEvent {
                time: r.time,
                band: r.band(),
            })
            .collect())
    }
}

/// Summary statistics for a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartStats {
    pub total_events: usize,
    pub distinct_times: usize,
    pub first_time: Option<f64>,
    pub last_time: Option<f64>,
    /// Seconds between the first and last event.
    pub active_span: f64,
    /// Events per second over the active span.
    pub density: f64,
    pub min_interval: Option<f64>,
    pub mean_interval: Option<f64>,
    pub max_interval: Option<f64>,
    /// Event count per enemy type.
    pub enemy_types: BTreeMap<u8, usize>,
    /// Tier whose density band this chart falls into.
    pub recommended_tier: DifficultyTier,
}

impl ChartStats {
    /// Computes statistics over parsed records.
    pub fn from_records(records: &[ChartRecord]) -> Self {
        let mut times: Vec<f64> = records.iter().map(|r| r.time).collect();
        times.sort_by(f64::total_cmp);
        times.dedup();

        let mut enemy_types = BTreeMap::new();
        for record in records {
            *enemy_types.entry(record.enemy_type).or_insert(0) += 1;
        }

        let first_time = times.first().copied();
        let last_time = times.last().copied();
        let active_span = match (first_time, last_time) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        };
        let density = if active_span > 0.0 {
            records.len() as f64 / active_span
        } else {
            0.0
        };

        let intervals: Vec<f64> = times.windows(2).map(|w| w[1] - w[0]).collect();
        let min_interval = intervals.iter().copied().reduce(f64::min);
        let max_interval = intervals.iter().copied().reduce(f64::max);
        let mean_interval = if intervals.is_empty() {
            None
        } else {
            Some(intervals.iter().sum::<f64>() / intervals.len() as f64)
        };

        Self {
            total_events: records.len(),
            distinct_times: times.len(),
            first_time,
            last_time,
            active_span,
            density,
            min_interval,
            mean_interval,
            max_interval,
            enemy_types,
            recommended_tier: DifficultyTier::recommend(density),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatmapper_spec::NoteRole;
    use pretty_assertions::assert_eq;

    fn sample_events() -> Vec<NoteEvent> {
        vec![
            NoteEvent::new(3.0, NoteRole::Accent, Band::Crash),
            NoteEvent::new(3.5, NoteRole::Primary, Band::HiHat),
            NoteEvent::new(4.25, NoteRole::SecondaryAccent, Band::Snare),
        ]
    }

    #[test]
    fn test_write_chart_format() {
        let output = ChartOutput::render(&sample_events()).unwrap();
        let text = String::from_utf8(output.data).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], CHART_HEADER);
        assert_eq!(lines[1], "3.00,2,5,6,1,,5");
        assert_eq!(lines[2], "3.50,1,1,1,1,,6");
        assert_eq!(lines[3], "4.25,1,2,2,1,,7");
        assert_eq!(output.event_count, 3);
        assert_eq!(output.hash.len(), 64);
    }

    #[test]
    fn test_read_back_written_chart() {
        let output = ChartOutput::render(&sample_events()).unwrap();
        let records = read_chart(output.data.as_slice()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].band(), Band::Crash);
        assert_eq!(records[1].band(), Band::HiHat);
        assert_eq!(records[2].band(), Band::Kick);
        assert_eq!(records[2].time, 4.25);
    }

    #[test]
    fn test_read_rejects_short_rows() {
        let csv = format!("{}\n3.00,1,2\n", CHART_HEADER);
        let err = read_chart(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, GenerateError::ChartParse { line: 2, .. }));
    }

    #[test]
    fn test_read_rejects_bad_numbers() {
        let err = read_chart("abc,1,2,2,1,,7\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("invalid time"));
    }

    #[test]
    fn test_write_failure_is_output_io() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let err = write_chart(&sample_events(), Broken).unwrap_err();
        assert!(matches!(err, GenerateError::OutputIo(_)));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_stats() {
        let csv = "Time [s],Enemy Type,Aux Color 1,Aux Color 2,Nº Enemies,interval,Aux\n\
                   3.00,2,5,6,1,,5\n\
                   3.00,1,2,2,1,,7\n\
                   4.00,1,1,1,1,,6\n\
                   6.00,1,2,2,1,,7\n";
        let stats = ChartStats::from_records(&read_chart(csv.as_bytes()).unwrap());
        assert_eq!(stats.total_events, 4);
        assert_eq!(stats.distinct_times, 3);
        assert_eq!(stats.active_span, 3.0);
        assert_eq!(stats.min_interval, Some(1.0));
        assert_eq!(stats.max_interval, Some(2.0));
        assert_eq!(stats.enemy_types.get(&1), Some(&3));
        assert_eq!(stats.recommended_tier, DifficultyTier::Easy);
    }

    #[test]
    fn test_reference_chart_availability() {
        assert!(!ReferenceChart::default().available());
        let chart = ReferenceChart::new(read_chart("5.00,1,1,1,1,,6\n".as_bytes()).unwrap());
        assert!(chart.available());
        assert_eq!(chart.reference_events().unwrap()[0].band, Band::HiHat);
    }
}
