//! Seams to the external audio analyzer and timing reference.
//!
//! Neither component lives in this crate. Callers plug an implementation in
//! through [`AudioAnalyzer`] or [`TimingReference`]; the orchestrator checks
//! availability once per request and calls the analyzer at most once.

use serde::{Deserialize, Serialize};

use beatmapper_spec::{Band, BeatGrid, OnsetCandidate, SongCharacteristics};

/// Error type returned by analyzer and reference implementations.
pub type AnalyzerError = Box<dyn std::error::Error + Send + Sync>;

/// Decoded mono audio handed to the analyzer.
///
/// The backend never inspects samples itself. An analyzer that reads its
/// results from elsewhere may receive [`AudioSamples::empty`].
#[derive(Debug, Clone, Copy)]
pub struct AudioSamples<'a> {
    pub data: &'a [f32],
    pub sample_rate: u32,
}

impl<'a> AudioSamples<'a> {
    /// Wraps a sample buffer.
    pub fn new(data: &'a [f32], sample_rate: u32) -> Self {
        Self { data, sample_rate }
    }

    /// No samples.
    pub fn empty() -> AudioSamples<'static> {
        AudioSamples {
            data: &[],
            sample_rate: 0,
        }
    }

    /// Length in seconds, or 0 when there are no samples.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.data.len() as f64 / self.sample_rate as f64
        }
    }
}

/// One onset as reported by an analyzer, before band mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawOnset {
    pub time: f64,
    pub strength: f64,
    #[serde(default)]
    pub band: u32,
}

/// Everything an analyzer reports about a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Estimated tempo in BPM.
    pub tempo: f64,
    /// Beat positions in seconds.
    #[serde(default, alias = "beatTimes")]
    pub beat_times: Vec<f64>,
    /// Detected onsets.
    #[serde(default, alias = "onsetCandidates", alias = "onsets")]
    pub onset_candidates: Vec<RawOnset>,
    /// Track length in seconds.
    pub duration: f64,
    #[serde(default, alias = "percussiveRatio")]
    pub percussive_ratio: Option<f64>,
    #[serde(default, alias = "rmsEnergy")]
    pub rms_energy: Option<f64>,
}

impl AnalysisReport {
    /// Rejects reports the backend cannot use.
    pub fn check(&self) -> Result<(), String> {
        if !(self.tempo.is_finite() && self.tempo > 0.0 && self.tempo <= 1000.0) {
            return Err(format!("implausible tempo {}", self.tempo));
        }
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(format!("implausible duration {}", self.duration));
        }
        Ok(())
    }

    /// The beat grid, with non-finite beats dropped and the rest sorted.
    pub fn beat_grid(&self) -> BeatGrid {
        let mut beats: Vec<f64> = self
            .beat_times
            .iter()
            .copied()
            .filter(|t| t.is_finite())
            .collect();
        beats.sort_by(f64::total_cmp);
        BeatGrid::new(self.tempo, beats)
    }

    /// Onsets mapped to bands, with unusable entries dropped.
    pub fn onsets(&self) -> Vec<OnsetCandidate> {
        self.onset_candidates
            .iter()
            .filter(|o| o.time.is_finite() && o.strength.is_finite() && o.strength >= 0.0)
            .map(|o| OnsetCandidate::new(o.time, o.strength, Band::from_index(o.band)))
            .collect()
    }

    /// Song characteristics, defaulting whatever the analyzer left out.
    pub fn characteristics(&self) -> SongCharacteristics {
        let defaults = SongCharacteristics::default();
        SongCharacteristics {
            tempo: self.tempo,
            percussive_ratio: self.percussive_ratio.unwrap_or(defaults.percussive_ratio),
            rms_energy: self.rms_energy.unwrap_or(defaults.rms_energy),
        }
    }
}

/// An external audio analyzer.
pub trait AudioAnalyzer {
    /// Cheap availability check, made once before generation starts.
    fn available(&self) -> bool {
        true
    }

    /// Analyses the track.
    fn analyze(&self, audio: &AudioSamples<'_>) -> Result<AnalysisReport, AnalyzerError>;
}

/// One event from an existing chart used as timing reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceEvent {
    pub time: f64,
    pub band: Band,
}

/// A source of pre-authored note timings.
pub trait TimingReference {
    /// Cheap availability check.
    fn available(&self) -> bool {
        true
    }

    /// Returns the reference events.
    fn reference_events(&self) -> Result<Vec<ReferenceEvent>, AnalyzerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_accepts_camel_case() {
        let json = r#"{
            "tempo": 128.0,
            "beatTimes": [0.5, 0.97],
            "onsetCandidates": [{"time": 0.5, "strength": 0.8, "band": 2}],
            "duration": 30.0,
            "percussiveRatio": 0.8
        }"#;
        let report: AnalysisReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.beat_times.len(), 2);
        assert_eq!(report.onsets()[0].band, Band::Snare);
        assert_eq!(report.characteristics().percussive_ratio, 0.8);
        assert_eq!(report.characteristics().rms_energy, 0.1);
        assert!(report.check().is_ok());
    }

    #[test]
    fn test_check_rejects_bad_tempo() {
        let report = AnalysisReport {
            tempo: 0.0,
            beat_times: vec![],
            onset_candidates: vec![],
            duration: 10.0,
            percussive_ratio: None,
            rms_energy: None,
        };
        assert!(report.check().unwrap_err().contains("tempo"));
    }

    #[test]
    fn test_onsets_drop_non_finite() {
        let report = AnalysisReport {
            tempo: 120.0,
            beat_times: vec![2.0, f64::NAN, 1.0],
            onset_candidates: vec![
                RawOnset {
                    time: f64::NAN,
                    strength: 1.0,
                    band: 0,
                },
                RawOnset {
                    time: 4.0,
                    strength: 0.2,
                    band: 9,
                },
            ],
            duration: 10.0,
            percussive_ratio: None,
            rms_energy: None,
        };
        let onsets = report.onsets();
        assert_eq!(onsets.len(), 1);
        assert_eq!(onsets[0].band, Band::Crash);
        assert_eq!(report.beat_grid().beat_times, vec![1.0, 2.0]);
    }

    #[test]
    fn test_sample_duration() {
        let data = vec![0.0f32; 44_100];
        assert_eq!(AudioSamples::new(&data, 22_050).duration(), 2.0);
        assert_eq!(AudioSamples::empty().duration(), 0.0);
    }
}
