use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::operator::source::Source;

/// Source that reads a text file line-by-line.
///
/// The file is divided in chunks and is read concurrently by multiple map tasks.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Create a new source that reads the lines from a text file.
    ///
    /// The file is partitioned into byte ranges, one for each map task. It is guaranteed that each
    /// line of the file is emitted by exactly one partition. The line terminator is not included.
    ///
    /// **Note**: the file must be readable and its size must be available. This means that only
    /// regular files can be read.
    ///
    /// ## Example
    ///
    /// ```
    /// # use triad::operator::source::FileSource;
    /// let source = FileSource::new("/datasets/edges.txt");
    /// ```
    pub fn new<P>(path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self { path: path.into() }
    }
}

impl Source<String> for FileSource {
    type Partition = FileChunk;

    fn partitions(self, parallelism: usize) -> Result<Vec<FileChunk>, Error> {
        let file_size = File::open(&self.path)?.metadata()?.len() as usize;
        // every chunk must contain at least one byte
        let parallelism = parallelism.clamp(1, file_size.max(1));
        let range_size = file_size / parallelism;
        debug!(
            "splitting {} ({} bytes) in {} chunks",
            self.path.display(),
            file_size,
            parallelism
        );

        (0..parallelism)
            .map(|index| {
                let start = range_size * index;
                let end = if index == parallelism - 1 {
                    file_size
                } else {
                    start + range_size
                };
                FileChunk::open(&self.path, start, end)
            })
            .collect()
    }
}

/// The lines of a byte range of a file.
///
/// A chunk emits every line that starts inside `[start, end]`, the line that starts exactly at
/// `start` is skipped when `start` is not the beginning of the file since it belongs to the
/// previous chunk.
#[derive(Debug)]
pub struct FileChunk {
    reader: BufReader<File>,
    current: usize,
    end: usize,
    terminated: bool,
}

impl FileChunk {
    fn open(path: &Path, start: usize, end: usize) -> Result<Self, Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut current = start;
        // Seek reader to the first byte to be read
        reader.seek(SeekFrom::Start(start as u64))?;
        if start != 0 {
            // discard first line
            let mut s = String::new();
            current += reader.read_line(&mut s)?;
        }
        Ok(Self {
            reader,
            current,
            end,
            terminated: false,
        })
    }
}

impl Iterator for FileChunk {
    type Item = Result<String, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.terminated || self.current > self.end {
            self.terminated = true;
            return None;
        }
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => {
                self.terminated = true;
                None
            }
            Ok(len) => {
                self.current += len;
                let trimmed = line.trim_end_matches(['\n', '\r']).len();
                line.truncate(trimmed);
                Some(Ok(line))
            }
            Err(e) => {
                self.terminated = true;
                Some(Err(e.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use itertools::Itertools;

    use super::*;

    fn write_lines(lines: &[String]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn every_line_is_read_once() {
        let lines = (0..137).map(|i| format!("{} {}", i, i * 31)).collect_vec();
        let file = write_lines(&lines);
        for parallelism in [1, 2, 3, 4, 7, 16, 200] {
            let chunks = FileSource::new(file.path()).partitions(parallelism).unwrap();
            assert_eq!(chunks.len(), parallelism);
            let read = chunks
                .into_iter()
                .flatten()
                .collect::<Result<Vec<_>, _>>()
                .unwrap();
            assert_eq!(read, lines, "parallelism {parallelism}");
        }
    }

    #[test]
    fn crlf_and_missing_final_newline() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "1 2\r\n2 1\r\n3 4").unwrap();
        file.flush().unwrap();
        let read = FileSource::new(file.path())
            .partitions(2)
            .unwrap()
            .into_iter()
            .flatten()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(read, vec!["1 2", "2 1", "3 4"]);
    }

    #[test]
    fn more_chunks_than_bytes() {
        let file = write_lines(&["1 2".to_string()]);
        let chunks = FileSource::new(file.path()).partitions(64).unwrap();
        assert_eq!(chunks.len(), 4);
        let read = chunks
            .into_iter()
            .flatten()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(read, vec!["1 2"]);

        let empty = tempfile::NamedTempFile::new().unwrap();
        let chunks = FileSource::new(empty.path()).partitions(8).unwrap();
        assert_eq!(chunks.into_iter().flatten().count(), 0);
    }

    #[test]
    fn missing_file_is_an_error() {
        let res = FileSource::new("/this/file/does/not/exist").partitions(2);
        assert!(matches!(res, Err(Error::Io(_))));
    }
}
