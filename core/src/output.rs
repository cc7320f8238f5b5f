use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Where the averages of one file go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// The sink's default writer (stdout for the CLI)
    Default,
    File(PathBuf),
}

/// Pick the target for `file` given how many files were processed.
///
/// With several files a named output is used as a suffix (`{file}.{suffix}`);
/// with one file it is used as the file name.
pub fn output_target(file: &Path, file_count: usize, output: Option<&str>) -> OutputTarget {
    match output {
        None => OutputTarget::Default,
        Some(name) if file_count > 1 => {
            OutputTarget::File(PathBuf::from(format!("{}.{}", file.display(), name)))
        }
        Some(name) => OutputTarget::File(PathBuf::from(name)),
    }
}

/// Terminal sink for final averages
pub trait OutputSink {
    /// Tell the user which file the next block of default output belongs to
    fn announce(&mut self, label: &str) -> io::Result<()>;

    fn write(&mut self, target: &OutputTarget, label: &str, values: &[f64]) -> io::Result<()>;
}

/// Writes `position,average` rows
pub struct CsvSink<D, S> {
    default: D,
    status: S,
}

impl CsvSink<io::Stdout, io::Stderr> {
    pub fn stdout() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl<D: Write, S: Write> CsvSink<D, S> {
    pub fn new(default: D, status: S) -> Self {
        Self { default, status }
    }

    pub fn into_inner(self) -> (D, S) {
        (self.default, self.status)
    }
}

fn write_rows(writer: &mut impl Write, values: &[f64]) -> io::Result<()> {
    for (position, value) in values.iter().enumerate() {
        writeln!(writer, "{},{:?}", position, value)?;
    }
    writer.flush()
}

impl<D: Write, S: Write> OutputSink for CsvSink<D, S> {
    fn announce(&mut self, label: &str) -> io::Result<()> {
        writeln!(self.status, "{}", label)?;
        self.status.flush()
    }

    fn write(&mut self, target: &OutputTarget, _label: &str, values: &[f64]) -> io::Result<()> {
        match target {
            OutputTarget::Default => write_rows(&mut self.default, values),
            OutputTarget::File(path) => write_rows(&mut BufWriter::new(File::create(path)?), values),
        }
    }
}
