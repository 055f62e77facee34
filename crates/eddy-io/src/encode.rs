use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use thiserror::Error;

use eddy_fluids::grid::Grid2;
use eddy_fluids::Real;

/// Writes one field's time series to a directory as numbered `.vti`
/// snapshots, and a `<name>.pvd` collection index on [`finish`].
///
/// ```text
/// <dir>/
///   <name>_0000.vti
///   <name>_0001.vti
///   ...
///   <name>.pvd
/// ```
///
/// Frame numbers increase monotonically with each encoded step. Dropping an
/// unfinished encoder writes the index best-effort.
///
/// [`finish`]: FieldSeriesEncoder::finish
pub struct FieldSeriesEncoder {
    dir: PathBuf,
    name: String,
    frame: u64,
    /// (time value, relative filename) per encoded frame.
    entries: Vec<(f64, String)>,
    finished: bool,
}

impl FieldSeriesEncoder {
    /// Create the output directory (and parents) and an empty series.
    pub fn create(dir: impl Into<PathBuf>, name: impl Into<String>) -> Result<Self, EncodingError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            name: name.into(),
            frame: 0,
            entries: Vec::new(),
            finished: false,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frame
    }

    fn frame_file(&self, frame: u64) -> String {
        format!("{}_{frame:04}.vti", self.name)
    }

    /// Serialise one grid as a VTK ImageData file and record it in the
    /// index under the given time value.
    pub fn encode_frame(&mut self, grid: &Grid2, time: f64) -> Result<(), EncodingError> {
        if self.finished {
            return Err(EncodingError::Finished);
        }

        let file = self.frame_file(self.frame);
        let mut w = BufWriter::new(File::create(self.dir.join(&file))?);

        let (nx, ny) = (grid.nx(), grid.ny());
        writeln!(w, "<?xml version=\"1.0\"?>")?;
        writeln!(
            w,
            "<VTKFile type=\"ImageData\" version=\"0.1\" byte_order=\"LittleEndian\">"
        )?;
        writeln!(
            w,
            "  <ImageData WholeExtent=\"0 {} 0 {} 0 0\" Origin=\"0.0 0.0 0.0\" Spacing=\"1.0 1.0 1.0\">",
            nx - 1,
            ny - 1
        )?;
        writeln!(w, "    <Piece Extent=\"0 {} 0 {} 0 0\">", nx - 1, ny - 1)?;
        writeln!(w, "      <PointData Scalars=\"{}\">", self.name)?;
        writeln!(
            w,
            "        <DataArray type=\"{}\" Name=\"{}\" NumberOfComponents=\"1\" format=\"ascii\">",
            scalar_type_name(),
            self.name
        )?;

        // VTI flat lists are x-fastest, so j is the outer loop.
        for j in 0..ny {
            write!(w, "         ")?;
            for i in 0..nx {
                write!(w, " {}", grid.get(i, j))?;
            }
            writeln!(w)?;
        }

        writeln!(w, "        </DataArray>")?;
        writeln!(w, "      </PointData>")?;
        writeln!(w, "    </Piece>")?;
        writeln!(w, "  </ImageData>")?;
        writeln!(w, "</VTKFile>")?;
        w.flush()?;

        self.entries.push((time, file));
        self.frame += 1;
        Ok(())
    }

    /// Write the `.pvd` index and close the series. Idempotent; further
    /// frames are rejected.
    pub fn finish(&mut self) -> Result<(), EncodingError> {
        if self.finished {
            return Ok(());
        }

        let path = self.dir.join(format!("{}.pvd", self.name));
        let mut w = BufWriter::new(File::create(path)?);

        writeln!(
            w,
            "<VTKFile type=\"Collection\" version=\"0.1\" byte_order=\"LittleEndian\">"
        )?;
        writeln!(w, "  <Collection>")?;
        for (time, file) in &self.entries {
            writeln!(w, "    <DataSet timestep=\"{time:.6}\" file=\"{file}\"/>")?;
        }
        writeln!(w, "  </Collection>")?;
        writeln!(w, "</VTKFile>")?;
        w.flush()?;

        self.finished = true;
        Ok(())
    }
}

impl Drop for FieldSeriesEncoder {
    fn drop(&mut self) {
        if !self.finished && !self.entries.is_empty() {
            let _ = self.finish();
        }
    }
}

/// VTK scalar type tag matching the build's working precision.
pub fn scalar_type_name() -> &'static str {
    if std::mem::size_of::<Real>() == 8 {
        "Float64"
    } else {
        "Float32"
    }
}

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("time series already finalised")]
    Finished,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("eddy-io-{tag}-{}", std::process::id()))
    }

    #[test]
    fn writes_numbered_snapshots_and_an_index() {
        let dir = temp_dir("series");
        let _ = fs::remove_dir_all(&dir);

        let mut grid = Grid2::new(3, 2);
        grid.set(1, 1, 4.25);

        let mut enc = FieldSeriesEncoder::create(&dir, "p").unwrap();
        enc.encode_frame(&grid, 0.0).unwrap();
        enc.encode_frame(&grid, 0.5).unwrap();
        enc.finish().unwrap();
        assert_eq!(enc.frames_written(), 2);

        let first = fs::read_to_string(dir.join("p_0000.vti")).unwrap();
        assert!(first.contains("WholeExtent=\"0 2 0 1 0 0\""));
        assert!(first.contains(&format!("type=\"{}\"", scalar_type_name())));
        assert!(first.contains("4.25"));

        let index = fs::read_to_string(dir.join("p.pvd")).unwrap();
        assert!(index.contains("file=\"p_0000.vti\""));
        assert!(index.contains("file=\"p_0001.vti\""));
        assert!(index.contains("timestep=\"0.500000\""));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn finished_series_rejects_more_frames() {
        let dir = temp_dir("finished");
        let _ = fs::remove_dir_all(&dir);

        let grid = Grid2::new(2, 2);
        let mut enc = FieldSeriesEncoder::create(&dir, "u").unwrap();
        enc.encode_frame(&grid, 0.0).unwrap();
        enc.finish().unwrap();
        enc.finish().unwrap();

        assert!(matches!(
            enc.encode_frame(&grid, 1.0),
            Err(EncodingError::Finished)
        ));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn dropping_an_unfinished_series_writes_the_index() {
        let dir = temp_dir("drop");
        let _ = fs::remove_dir_all(&dir);

        let grid = Grid2::new(2, 2);
        {
            let mut enc = FieldSeriesEncoder::create(&dir, "div").unwrap();
            enc.encode_frame(&grid, 0.0).unwrap();
        }

        assert!(dir.join("div.pvd").exists());
        fs::remove_dir_all(&dir).unwrap();
    }
}
