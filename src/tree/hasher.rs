//! SHA-256 content addressing for blobs, manifests and trees

use crate::error::StorageError;
use crate::tree::entry::HashEntry;
use crate::tree::index;
use crate::types::Hash;
use sha2::{Digest, Sha256};
use std::io::{self, Read, Write};

/// Compute the content address of arbitrary bytes
///
/// Returns the lowercase hex SHA-256 digest.
pub fn compute_hash(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute the content address of a manifest listing
///
/// The digest covers the exact bytes of the serialized index (schema header
/// plus one line per entry), so a manifest's hash always equals the address
/// of its own index blob. Entries must already be in index order.
pub fn hash_entries(entries: &[HashEntry]) -> Result<Hash, StorageError> {
    let bytes = index::index_bytes(entries)
        .map_err(|e| StorageError::Hashing(format!("cannot serialize listing: {}", e)))?;
    Ok(compute_hash(&bytes))
}

/// Writer adapter that hashes everything passing through it
pub struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
    written: u64,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            written: 0,
        }
    }

    /// Finish hashing, returning the inner writer, digest and byte count
    pub fn finish(self) -> (W, Hash, u64) {
        (self.inner, hex::encode(self.hasher.finalize()), self.written)
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Hash a stream to completion
pub fn hash_reader<R: Read>(reader: &mut R) -> Result<(Hash, u64), StorageError> {
    let mut writer = HashingWriter::new(io::sink());
    io::copy(reader, &mut writer)?;
    let (_, hash, size) = writer.finish();
    Ok((hash, size))
}
