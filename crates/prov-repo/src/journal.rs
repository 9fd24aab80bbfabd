use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use prov_types::{ArtifactSet, ContentId};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{RepoError, RepoResult};
use crate::record::ArtifactRecord;

/// One mutation of a database repo, as persisted in its journal.
///
/// On-disk framing of each entry:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (JSON-encoded JournalOp)]
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JournalOp {
    PutArtifact { record: ArtifactRecord },
    DeleteArtifact { id: ContentId },
    PutSet { set: ArtifactSet },
    DeleteSet { id: ContentId },
}

/// Flush/sync strategy for the journal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every append.
    EveryWrite,
    /// Flush to the OS page cache only.
    #[default]
    OsDefault,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Append-only, crash-recoverable mutation log.
///
/// Opening a journal replays it front-to-back. Entries failing the CRC check
/// are skipped; an entry whose declared length runs past the end of the file
/// is a torn write from a crash, and the file is truncated back to the last
/// complete entry so later appends stay reachable.
pub struct Journal {
    path: PathBuf,
    writer: BufWriter<File>,
    offset: u64,
    sync_mode: SyncMode,
}

impl Journal {
    /// Open (or create) the journal at `path` and return every recovered op.
    pub fn open(path: &Path, sync_mode: SyncMode) -> RepoResult<(Self, Vec<JournalOp>)> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let (ops, valid_len) = recover(&file)?;
        let file_len = file.metadata()?.len();
        if valid_len < file_len {
            warn!(
                path = %path.display(),
                valid_len,
                file_len,
                "truncating torn journal tail"
            );
            file.set_len(valid_len)?;
        }

        debug!(path = %path.display(), recovered = ops.len(), "journal opened");
        let journal = Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            offset: valid_len,
            sync_mode,
        };
        Ok((journal, ops))
    }

    /// Append one op. Returns the byte offset of the entry.
    ///
    /// A failed append leaves the file as it was before the call.
    pub fn append(&mut self, op: &JournalOp) -> RepoResult<u64> {
        let frame = encode_frame(op)?;
        let entry_offset = self.offset;

        if let Err(e) = self.write_frame(&frame) {
            self.reset_to(entry_offset);
            return Err(e);
        }
        self.offset += frame.len() as u64;

        debug!(offset = entry_offset, len = frame.len(), "journal append");
        Ok(entry_offset)
    }

    /// Atomically replace the journal's contents with `ops`.
    ///
    /// The new log is written to a temporary file beside the journal and
    /// renamed over it, so a crash leaves either the old or the new log.
    pub fn rewrite(&mut self, ops: &[JournalOp]) -> RepoResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = NamedTempFile::new_in(&dir)?;
        let mut len = 0u64;
        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            for op in ops {
                let frame = encode_frame(op)?;
                out.write_all(&frame)?;
                len += frame.len() as u64;
            }
            out.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        let file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        self.offset = len;

        debug!(path = %self.path.display(), entries = ops.len(), len, "journal rewritten");
        Ok(())
    }

    /// Current size of the valid log in bytes.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }

    fn write_frame(&mut self, frame: &[u8]) -> RepoResult<()> {
        self.writer.write_all(frame)?;
        self.writer.flush()?;
        if self.sync_mode == SyncMode::EveryWrite {
            self.writer.get_ref().sync_all()?;
        }
        Ok(())
    }

    fn reset_to(&mut self, offset: u64) {
        let file = self.writer.get_ref();
        if let Err(e) = file.set_len(offset) {
            warn!(path = %self.path.display(), error = %e, "failed to discard partial journal entry");
            return;
        }
        // Drop whatever the buffer still holds from the failed frame.
        match file.try_clone() {
            Ok(file) => {
                let old = std::mem::replace(&mut self.writer, BufWriter::new(file));
                let _ = old.into_parts();
            }
            Err(e) => warn!(error = %e, "failed to reset journal writer"),
        }
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("path", &self.path)
            .field("offset", &self.offset)
            .field("sync_mode", &self.sync_mode)
            .finish()
    }
}

fn encode_frame(op: &JournalOp) -> RepoResult<Vec<u8>> {
    let payload = serde_json::to_vec(op)?;
    let length = u32::try_from(payload.len())
        .map_err(|_| RepoError::Journal(format!("entry of {} bytes is too large", payload.len())))?;
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Read every valid entry; returns the ops and the length of the valid prefix.
fn recover(file: &File) -> RepoResult<(Vec<JournalOp>, u64)> {
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    let mut ops = Vec::new();
    let mut offset: u64 = 0;

    while offset + HEADER_SIZE as u64 <= file_len {
        let mut header = [0u8; HEADER_SIZE];
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        let end = offset + HEADER_SIZE as u64 + u64::from(length);
        if length == 0 || end > file_len {
            warn!(offset, length, file_len, "invalid journal entry length; stopping recovery");
            break;
        }

        let mut payload = vec![0u8; length as usize];
        match reader.read_exact(&mut payload) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                warn!(offset, "truncated journal entry; stopping recovery");
                break;
            }
            Err(e) => return Err(e.into()),
        }

        let actual_crc = crc32fast::hash(&payload);
        if actual_crc != expected_crc {
            warn!(
                offset,
                expected = expected_crc,
                actual = actual_crc,
                "CRC mismatch; skipping journal entry"
            );
        } else {
            match serde_json::from_slice::<JournalOp>(&payload) {
                Ok(op) => ops.push(op),
                Err(e) => warn!(offset, error = %e, "undecodable journal entry; skipping"),
            }
        }
        offset = end;
    }

    Ok((ops, offset))
}
