//! Index codec: the line-oriented manifest format exchanged with clients
//!
//! An index is a schema-version header line followed by one tab-delimited
//! line per entry. Serialization streams from a background producer through a
//! bounded channel so large manifests never need to be buffered whole; parsing
//! is all-or-nothing.

use crate::error::StorageError;
use crate::tree::entry::HashEntry;
use std::collections::HashSet;
use std::io::{self, BufRead, BufReader, Read};
use std::sync::mpsc::{sync_channel, Receiver};
use std::thread::{self, JoinHandle};
use tracing::debug;

/// Schema version token written as the first line of every index
pub const SCHEMA_VERSION: &str = "3";

/// Lines buffered between producer and consumer before the producer blocks
const STREAM_DEPTH: usize = 8;

/// Serialize entries to index bytes in one buffer
pub fn index_bytes(entries: &[HashEntry]) -> Result<Vec<u8>, StorageError> {
    let mut out = Vec::with_capacity(SCHEMA_VERSION.len() + 1 + entries.len() * 96);
    out.extend_from_slice(SCHEMA_VERSION.as_bytes());
    out.push(b'\n');
    for entry in entries {
        out.extend_from_slice(entry.line()?.as_bytes());
        out.push(b'\n');
    }
    Ok(out)
}

/// Lazy, single-pass reader over a serialized index
///
/// Dropping the reader disconnects the channel, which makes the producer's
/// next send fail and the producer thread return.
pub struct IndexReader {
    receiver: Option<Receiver<Vec<u8>>>,
    producer: Option<JoinHandle<()>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl IndexReader {
    /// Start streaming the given entries
    ///
    /// Lines are rendered up front so framing errors surface here rather than
    /// as a truncated stream.
    pub fn from_entries(entries: &[HashEntry]) -> Result<Self, StorageError> {
        let lines = entries
            .iter()
            .map(HashEntry::line)
            .collect::<Result<Vec<_>, _>>()?;

        let (sender, receiver) = sync_channel::<Vec<u8>>(STREAM_DEPTH);
        let producer = thread::Builder::new()
            .name("index-producer".to_string())
            .spawn(move || {
                let mut header = SCHEMA_VERSION.as_bytes().to_vec();
                header.push(b'\n');
                if sender.send(header).is_err() {
                    return;
                }
                for line in lines {
                    let mut bytes = line.into_bytes();
                    bytes.push(b'\n');
                    if sender.send(bytes).is_err() {
                        debug!("index consumer closed early");
                        return;
                    }
                }
            })?;

        Ok(Self {
            receiver: Some(receiver),
            producer: Some(producer),
            chunk: Vec::new(),
            pos: 0,
        })
    }

    /// Stop reading and wait for the producer to wind down
    pub fn close(mut self) {
        self.receiver.take();
        if let Some(handle) = self.producer.take() {
            let _ = handle.join();
        }
    }
}

impl Read for IndexReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.pos < self.chunk.len() {
                let n = buf.len().min(self.chunk.len() - self.pos);
                buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }
            let next = match self.receiver.as_ref() {
                Some(receiver) => receiver.recv().ok(),
                None => None,
            };
            match next {
                Some(chunk) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                None => {
                    self.receiver = None;
                    return Ok(0);
                }
            }
        }
    }
}

impl Drop for IndexReader {
    fn drop(&mut self) {
        self.receiver.take();
    }
}

/// Parse an index stream back into entries
///
/// Any malformed line fails the whole parse; duplicate names are rejected.
pub fn parse_index<R: Read>(reader: R) -> Result<Vec<HashEntry>, StorageError> {
    let mut lines = BufReader::new(reader).lines();

    let header = match lines.next() {
        Some(line) => line?,
        None => {
            return Err(StorageError::IndexFormat {
                line: 1,
                reason: "empty index".to_string(),
            })
        }
    };
    if header.trim_end() != SCHEMA_VERSION {
        return Err(StorageError::IndexFormat {
            line: 1,
            reason: format!("unsupported schema version {:?}", header),
        });
    }

    let mut entries = Vec::new();
    let mut seen = HashSet::new();
    for (i, line) in lines.enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let line_no = i + 2;
        let entry = HashEntry::parse_line(line, line_no)?;
        if !seen.insert(entry.entry_name.clone()) {
            return Err(StorageError::IndexFormat {
                line: line_no,
                reason: format!("duplicate entry {}", entry.entry_name),
            });
        }
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::hasher::compute_hash;

    fn entries(n: usize) -> Vec<HashEntry> {
        (0..n)
            .map(|i| HashEntry::file(format!("file{:04}", i), compute_hash(&i.to_le_bytes())))
            .collect()
    }

    #[test]
    fn test_stream_matches_index_bytes() {
        let files = entries(20);
        let mut streamed = Vec::new();
        IndexReader::from_entries(&files)
            .unwrap()
            .read_to_end(&mut streamed)
            .unwrap();
        assert_eq!(streamed, index_bytes(&files).unwrap());
    }

    #[test]
    fn test_header_is_schema_version() {
        let bytes = index_bytes(&entries(1)).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().next(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_early_close_terminates_producer() {
        let files = entries(1000);
        let mut reader = IndexReader::from_entries(&files).unwrap();
        let mut buf = [0u8; 16];
        reader.read_exact(&mut buf).unwrap();
        // Join returns only if the blocked producer observed the disconnect.
        reader.close();
    }

    #[test]
    fn test_parse_round_trip() {
        let files = entries(5);
        let parsed = parse_index(IndexReader::from_entries(&files).unwrap()).unwrap();
        assert_eq!(parsed, files);
    }

    #[test]
    fn test_parse_rejects_bad_line_without_partial_result() {
        let text = format!("{}\nabcd\t0\tgood\t0\t0\nbroken line\n", SCHEMA_VERSION);
        let err = parse_index(text.as_bytes()).unwrap_err();
        assert!(matches!(err, StorageError::IndexFormat { line: 3, .. }));
    }

    #[test]
    fn test_parse_rejects_unknown_schema() {
        let err = parse_index("9\n".as_bytes()).unwrap_err();
        assert!(matches!(err, StorageError::IndexFormat { line: 1, .. }));
    }

    #[test]
    fn test_parse_rejects_empty_stream() {
        assert!(parse_index("".as_bytes()).is_err());
    }

    #[test]
    fn test_parse_rejects_duplicate_names() {
        let text = format!(
            "{}\nabcd\t0\tsame\t0\t0\nef01\t0\tsame\t0\t0\n",
            SCHEMA_VERSION
        );
        assert!(parse_index(text.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_header_only_is_empty_listing() {
        let parsed = parse_index(format!("{}\n", SCHEMA_VERSION).as_bytes()).unwrap();
        assert!(parsed.is_empty());
    }
}
