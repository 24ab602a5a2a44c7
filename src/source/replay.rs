use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use super::{ObservationSource, SourceError};
use crate::store::schema::Settings;
use crate::tracking::types::RawObservation;

/// Plays back recorded observations from a JSON-lines file, one object per frame.
///
/// `{}` or `null` is a frame without a face. Blank lines are skipped. At end of
/// file the source either rewinds (`looping`) or reports no frame.
#[derive(Debug)]
pub struct ReplaySource {
    path: PathBuf,
    looping: bool,
    reader: Option<BufReader<File>>,
    line: usize,
}

impl ReplaySource {
    pub fn new(path: impl Into<PathBuf>, looping: bool) -> Self {
        Self {
            path: path.into(),
            looping,
            reader: None,
            line: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        let file = File::open(&self.path)
            .map_err(|e| SourceError::Unavailable(format!("{}: {e}", self.path.display())))?;
        self.reader = Some(BufReader::new(file));
        self.line = 0;
        Ok(())
    }

    fn next_line(&mut self) -> Result<Option<String>, SourceError> {
        let Some(reader) = self.reader.as_mut() else {
            return Err(SourceError::Unavailable("source is not open".to_string()));
        };
        let mut buf = String::new();
        loop {
            buf.clear();
            if reader.read_line(&mut buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            if !buf.trim().is_empty() {
                return Ok(Some(buf));
            }
        }
    }
}

impl ObservationSource for ReplaySource {
    fn open(&mut self, settings: &Settings) -> Result<(), SourceError> {
        self.rewind()?;
        tracing::info!(
            path = %self.path.display(),
            camera_index = settings.camera_index,
            frame_width = settings.frame_width,
            frame_height = settings.frame_height,
            looping = self.looping,
            "Replay source opened"
        );
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    fn read(&mut self) -> Result<Option<RawObservation>, SourceError> {
        let mut text = self.next_line()?;
        if text.is_none() && self.looping && self.line > 0 {
            tracing::debug!(path = %self.path.display(), "Replay source rewound");
            self.rewind()?;
            text = self.next_line()?;
        }
        let Some(text) = text else {
            return Ok(None);
        };

        let observation: Option<RawObservation> = serde_json::from_str(text.trim())
            .map_err(|source| SourceError::Decode {
                line: self.line,
                source,
            })?;
        Ok(Some(observation.unwrap_or_default()))
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            tracing::info!(path = %self.path.display(), "Replay source closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn recording(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[test]
    fn missing_file_is_unavailable() {
        let mut source = ReplaySource::new("/nonexistent/observations.jsonl", false);
        let err = source.open(&Settings::default()).unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)));
        assert!(!source.is_open());
    }

    #[test]
    fn read_before_open_fails() {
        let mut source = ReplaySource::new("/nonexistent/observations.jsonl", false);
        assert!(matches!(source.read(), Err(SourceError::Unavailable(_))));
    }

    #[test]
    fn plays_frames_in_order_then_stops() {
        let file = recording(&[
            r#"{"head_angles": [1, 2, 3], "gaze_vector": [0.1, -0.1]}"#,
            "",
            "{}",
            "null",
        ]);
        let mut source = ReplaySource::new(file.path(), false);
        source.open(&Settings::default()).unwrap();

        let first = source.read().unwrap().unwrap();
        assert_eq!(first, RawObservation::face([1.0, 2.0, 3.0], [0.1, -0.1]));
        assert!(source.read().unwrap().unwrap().is_empty());
        assert!(source.read().unwrap().unwrap().is_empty());
        assert!(source.read().unwrap().is_none());
        assert!(source.read().unwrap().is_none());
    }

    #[test]
    fn looping_rewinds_at_end() {
        let file = recording(&[r#"{"gaze_vector": [0.2, 0.2]}"#]);
        let mut source = ReplaySource::new(file.path(), true);
        source.open(&Settings::default()).unwrap();
        for _ in 0..3 {
            let obs = source.read().unwrap().unwrap();
            assert_eq!(obs.gaze_vector, Some([0.2, 0.2]));
        }
    }

    #[test]
    fn malformed_line_reports_position() {
        let file = recording(&["{}", "{ nope"]);
        let mut source = ReplaySource::new(file.path(), false);
        source.open(&Settings::default()).unwrap();
        source.read().unwrap();
        match source.read() {
            Err(SourceError::Decode { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn close_then_reopen_starts_over() {
        let file = recording(&[r#"{"head_angles": [1, 1, 1]}"#, "{}"]);
        let mut source = ReplaySource::new(file.path(), false);
        source.open(&Settings::default()).unwrap();
        source.read().unwrap();
        source.close();
        assert!(!source.is_open());
        source.open(&Settings::default()).unwrap();
        let obs = source.read().unwrap().unwrap();
        assert_eq!(obs.head_angles, Some([1.0, 1.0, 1.0]));
    }
}
