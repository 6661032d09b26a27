use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use bincode::config;
use bincode::error::DecodeError;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Error;

/// Writes the records of a partition to a file, in batches of `batch_size` records.
#[derive(Debug)]
pub(crate) struct BincodeCacher<T> {
    buf: Vec<T>,
    batch_size: usize,
    records: usize,
    path: PathBuf,
    file: BufWriter<File>,
}

/// Reads back the records written by a [`BincodeCacher`].
#[derive(Debug)]
pub struct BincodeReplayer<T> {
    buf: std::vec::IntoIter<T>,
    file: BufReader<File>,
    terminated: bool,
}

impl<T: Serialize> BincodeCacher<T> {
    pub(crate) fn create(path: PathBuf, batch_size: usize) -> Result<Self, Error> {
        let file = BufWriter::new(File::create(&path)?);
        Ok(Self {
            buf: Vec::with_capacity(batch_size),
            batch_size,
            records: 0,
            path,
            file,
        })
    }

    fn flush_buf(&mut self) -> Result<(), Error> {
        bincode::serde::encode_into_std_write(&self.buf, &mut self.file, config::standard())?;
        self.buf.clear();
        Ok(())
    }

    pub(crate) fn append(&mut self, item: T) -> Result<(), Error> {
        self.buf.push(item);
        self.records += 1;
        if self.buf.len() >= self.batch_size {
            self.flush_buf()?;
        }
        Ok(())
    }

    /// Flush the pending records and return the path of the file with the number of records.
    pub(crate) fn finalize(mut self) -> Result<(PathBuf, usize), Error> {
        if !self.buf.is_empty() {
            self.flush_buf()?;
        }
        self.file.flush()?;
        Ok((self.path, self.records))
    }
}

impl<T: DeserializeOwned> BincodeReplayer<T> {
    pub(crate) fn open(path: &Path) -> Result<Self, Error> {
        let file = BufReader::new(File::open(path)?);
        Ok(Self {
            buf: Vec::new().into_iter(),
            file,
            terminated: false,
        })
    }
}

impl<T: DeserializeOwned> Iterator for BincodeReplayer<T> {
    type Item = Result<T, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(el) = self.buf.next() {
                return Some(Ok(el));
            }
            if self.terminated {
                return None;
            }

            match bincode::serde::decode_from_std_read::<Vec<T>, _, _>(
                &mut self.file,
                config::standard(),
            ) {
                Ok(data) => self.buf = data.into_iter(),
                Err(DecodeError::Io { inner, .. }) if inner.kind() == ErrorKind::UnexpectedEof => {
                    self.terminated = true;
                    return None;
                }
                Err(e) => {
                    self.terminated = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}
