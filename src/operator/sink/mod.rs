//! Writers for the final output of a pipeline.

use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Error;
use crate::triangles::TriangleCount;

/// Write keyed records as text, one `key<TAB>value` line each, replacing the file if it exists.
///
/// Returns the number of written records.
pub fn write_text<P, K, V, I>(path: P, records: I) -> Result<usize, Error>
where
    P: AsRef<Path>,
    K: Display,
    V: Display,
    I: IntoIterator<Item = (K, V)>,
{
    let path = path.as_ref();
    tracing::debug!("writing text output to {}", path.display());
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    let mut written = 0;
    for (key, value) in records {
        writeln!(writer, "{key}\t{value}")?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Write the output record of the triangle counting pipeline.
pub fn write_count<P: AsRef<Path>>(path: P, count: &TriangleCount) -> Result<(), Error> {
    write_text(path, [(count.key, count.total)])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_is_a_single_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("count.txt");
        write_count(&path, &TriangleCount::new(42)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0\t42\n");
        // the file is replaced, not appended
        write_count(&path, &TriangleCount::new(7)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0\t7\n");
    }

    #[test]
    fn text_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.txt");
        let written = write_text(&path, vec![("1,2", 0), ("1,3", 1)]).unwrap();
        assert_eq!(written, 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1,2\t0\n1,3\t1\n");
    }
}
