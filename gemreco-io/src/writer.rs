//! File writers for reconstructed GEM hits.

use crate::Result;
use gemreco_algorithms::{EventReconstruction, EventStatistics};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writer for GEM hit output.
///
/// Writes one CSV row per GEM hit; run statistics go to a separate JSON
/// document via [`GemHitWriter::write_summary_json`].
pub struct GemHitWriter {
    writer: BufWriter<File>,
    primary_track: i32,
    wrote_header: bool,
}

/// Per-run summary written next to the hit table.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunSummary {
    pub events: usize,
    pub signal_hits: usize,
    pub statistics: EventStatistics,
}

impl GemHitWriter {
    /// CSV column names.
    pub const HEADER: &'static str = "event,chamber,tracker,x,y,z,r,phi,q_u,q_v,signal";

    /// Creates a new file writer; `primary_track` labels signal hits.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, primary_track: i32) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self {
            writer,
            primary_track,
            wrote_header: false,
        })
    }

    /// Writes the GEM hits of one event, emitting the header first if needed.
    ///
    /// Returns the number of rows written.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_event(&mut self, event_id: u64, event: &EventReconstruction<'_, '_>) -> Result<usize> {
        if !self.wrote_header {
            writeln!(self.writer, "{}", Self::HEADER)?;
            self.wrote_header = true;
        }

        let mut rows = 0;
        for hit in event.gem_hits() {
            writeln!(
                self.writer,
                "{},{},{},{},{},{},{},{},{},{},{}",
                event_id,
                hit.chamber_id(),
                hit.tracker_id(),
                hit.x(),
                hit.y(),
                hit.z(),
                hit.r(),
                hit.phi(),
                hit.charge_u().map(|q| q.to_string()).unwrap_or_default(),
                hit.charge_v().map(|q| q.to_string()).unwrap_or_default(),
                u8::from(hit.is_signal(self.primary_track))
            )?;
            rows += 1;
        }
        Ok(rows)
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Writes a run summary as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_summary_json<P: AsRef<Path>>(path: P, summary: &RunSummary) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, summary)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemreco_algorithms::{reconstruct_event, HitPairMatcher, TrackerInput};
    use gemreco_core::geometry::{ActiveArea, Axis, Projection, ReadoutPlane, TrackerGeometry};
    use gemreco_core::hit::{OneDHit, PlaneClusterHit, PlaneHit, TruthInfo};
    use tempfile::NamedTempFile;

    fn tracker() -> TrackerGeometry {
        TrackerGeometry {
            chamber_id: 5,
            tracker_id: 1,
            z: 3.0,
            rotation: 0.0,
            origin: [0.0, 0.0],
            projection: Projection::Planar,
            active_area: ActiveArea::new(0.0, 1.0, 0.0, 1.0),
            u: ReadoutPlane::new("u", Axis::U, 5, 1, 0.0),
            v: ReadoutPlane::new("v", Axis::V, 5, 1, std::f64::consts::FRAC_PI_2),
        }
    }

    fn hit(plane: &ReadoutPlane, pos: f64, adc: f64) -> PlaneHit<'_> {
        let one_d = OneDHit::new(pos, 1e-4, plane)
            .unwrap()
            .with_truth(TruthInfo::new(1, pos, 0.0, 0));
        PlaneClusterHit::new(one_d, adc, 2, 0).unwrap().into()
    }

    #[test]
    fn test_write_event_csv() {
        let tracker = tracker();
        let u = vec![hit(&tracker.u, 0.25, 100.0)];
        let v = vec![hit(&tracker.v, 0.5, 90.0)];
        let inputs = [TrackerInput::new(&tracker, &u, &v)];
        let event = reconstruct_event(&HitPairMatcher::default(), &inputs);

        let file = NamedTempFile::new().unwrap();
        let mut writer = GemHitWriter::create(file.path(), 1).unwrap();
        assert_eq!(writer.write_event(12, &event).unwrap(), 1);
        assert_eq!(writer.write_event(13, &event).unwrap(), 1);
        writer.flush().unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], GemHitWriter::HEADER);
        assert!(lines[1].starts_with("12,5,1,0.25,0.5,3,"));
        assert!(lines[1].ends_with(",100,90,1"));
        assert!(lines[2].starts_with("13,"));
    }

    #[test]
    fn test_write_summary_json() {
        let file = NamedTempFile::new().unwrap();
        let summary = RunSummary {
            events: 4,
            signal_hits: 3,
            statistics: EventStatistics {
                trackers: 8,
                gem_hits: 5,
                ..Default::default()
            },
        };
        GemHitWriter::write_summary_json(file.path(), &summary).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
        assert_eq!(value["events"], 4);
        assert_eq!(value["statistics"]["gem_hits"], 5);
        assert_eq!(value["statistics"]["matching"]["accepted"], 0);
    }
}
