//! File persistence layer
//!
//! Blocks go to an append-only JSON-lines log, one canonical record per
//! line, synced to disk on every append. The pending pool is a single JSON
//! snapshot replaced through a temporary file and an atomic rename.

use crate::core::{canonicalize, Block, Transaction};
use crate::storage::backend::{Backend, StorageError};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Block log file name
pub const BLOCKS_FILE: &str = "blocks.jsonl";

/// Pending pool snapshot file name
pub const MEMPOOL_FILE: &str = "mempool.json";

const TAIL_SCAN_CHUNK: usize = 4096;

/// Backend storing everything under one data directory
pub struct FileBackend {
    data_dir: PathBuf,
    /// Serializes access to the block log
    log_lock: Mutex<()>,
}

impl FileBackend {
    /// Open (and create if needed) a data directory
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        Ok(Self {
            data_dir,
            log_lock: Mutex::new(()),
        })
    }

    /// Data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn blocks_path(&self) -> PathBuf {
        self.data_dir.join(BLOCKS_FILE)
    }

    fn mempool_path(&self) -> PathBuf {
        self.data_dir.join(MEMPOOL_FILE)
    }

    /// Check if a block log exists
    pub fn exists(&self) -> bool {
        self.blocks_path().exists()
    }

    fn open_log(&self) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(self.blocks_path())
    }

    /// Append one newline-terminated record.
    ///
    /// The log is first brought back to a line boundary. If writing or
    /// `sync` fails, the file is cut back to where it was, so a failed
    /// append never leaves part of a record behind.
    fn append_record(
        &self,
        record: &[u8],
        sync: impl FnOnce(&File) -> io::Result<()>,
    ) -> Result<(), StorageError> {
        let _guard = self.log_lock.lock();
        let mut file = self.open_log()?;
        let start = repair_tail(&mut file)?;

        if let Err(e) = write_synced(&mut file, record, sync) {
            log::warn!("Block log append failed, rolling back to {} bytes: {}", start, e);
            if let Err(cut) = file.set_len(start).and_then(|()| file.sync_all()) {
                log::error!("Could not roll back the block log: {}", cut);
            }
            return Err(e.into());
        }
        Ok(())
    }
}

fn write_synced(
    file: &mut File,
    record: &[u8],
    sync: impl FnOnce(&File) -> io::Result<()>,
) -> io::Result<()> {
    file.write_all(record)?;
    file.flush()?;
    sync(file)
}

/// Offset of the first byte after the last newline before `len`
fn last_line_start(file: &mut File, len: u64) -> io::Result<u64> {
    let mut buf = [0u8; TAIL_SCAN_CHUNK];
    let mut end = len;
    while end > 0 {
        let start = end.saturating_sub(TAIL_SCAN_CHUNK as u64);
        let chunk = &mut buf[..(end - start) as usize];
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(chunk)?;
        if let Some(pos) = chunk.iter().rposition(|&b| b == b'\n') {
            return Ok(start + pos as u64 + 1);
        }
        end = start;
    }
    Ok(0)
}

/// Make the log end on a line boundary and return its length.
///
/// An unterminated last line that still holds a whole block gets its
/// newline; anything else there is a torn write and is cut.
fn repair_tail(file: &mut File) -> Result<u64, StorageError> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(0);
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    if last[0] == b'\n' {
        return Ok(len);
    }

    let line_start = last_line_start(file, len)?;
    let mut tail = Vec::new();
    file.seek(SeekFrom::Start(line_start))?;
    file.read_to_end(&mut tail)?;

    if serde_json::from_slice::<Block>(&tail).is_ok() {
        file.write_all(b"\n")?;
        file.sync_all()?;
        Ok(len + 1)
    } else {
        log::warn!("Cutting torn block record at byte {}", line_start);
        file.set_len(line_start)?;
        file.sync_all()?;
        Ok(line_start)
    }
}

impl Backend for FileBackend {
    fn load_blocks(&self) -> Result<Vec<Block>, StorageError> {
        let path = self.blocks_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let _guard = self.log_lock.lock();
        let mut file = self.open_log()?;
        repair_tail(&mut file)?;
        file.seek(SeekFrom::Start(0))?;

        let mut blocks = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            let record = line.trim_end();
            if record.is_empty() {
                continue;
            }
            let block = serde_json::from_str::<Block>(record).map_err(|e| {
                StorageError::Corrupt(format!("line {} of {:?}: {}", index + 1, path, e))
            })?;
            blocks.push(block);
        }

        Ok(blocks)
    }

    fn append_block(&self, block: &Block) -> Result<(), StorageError> {
        let mut record = canonicalize(block).map_err(|e| StorageError::Corrupt(e.to_string()))?;
        record.push(b'\n');
        self.append_record(&record, File::sync_all)
    }

    fn load_pending(&self) -> Result<Vec<Transaction>, StorageError> {
        let path = self.mempool_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    fn store_pending(&self, pending: &[Transaction]) -> Result<(), StorageError> {
        // Write to temporary file first
        let temp_path = self.data_dir.join("mempool.tmp");
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, pending)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;

        // Atomic rename
        fs::rename(&temp_path, self.mempool_path())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn block_at(height: u64) -> Block {
        let mut coinbase = Transaction::coinbase(vec![3; 33], 1000);
        coinbase.tx_id = format!("{:032x}", height);
        Block {
            header: format!("{:064x}", height),
            height,
            timestamp: 1_700_000_000 + height,
            transactions: vec![coinbase],
            nonce: height * 7,
        }
    }

    fn log_len(dir: &Path) -> u64 {
        fs::metadata(dir.join(BLOCKS_FILE)).unwrap().len()
    }

    #[test]
    fn test_fresh_directory_is_empty() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(dir.path().join("node")).unwrap();
        assert!(!backend.exists());
        assert!(backend.load_blocks().unwrap().is_empty());
        assert!(backend.load_pending().unwrap().is_empty());
    }

    #[test]
    fn test_append_and_reload_blocks() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        backend.append_block(&Block::genesis()).unwrap();
        backend.append_block(&block_at(1)).unwrap();

        let reopened = FileBackend::open(dir.path()).unwrap();
        assert_eq!(
            reopened.load_blocks().unwrap(),
            vec![Block::genesis(), block_at(1)]
        );

        let text = fs::read_to_string(dir.path().join(BLOCKS_FILE)).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_truncated_tail_is_dropped() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        backend.append_block(&Block::genesis()).unwrap();

        let mut file = OpenOptions::new()
            .append(true)
            .open(dir.path().join(BLOCKS_FILE))
            .unwrap();
        file.write_all(b"{\"header\":\"ab").unwrap();
        drop(file);

        assert_eq!(backend.load_blocks().unwrap(), vec![Block::genesis()]);

        // The log is usable again after the torn record is cut
        backend.append_block(&block_at(1)).unwrap();
        assert_eq!(
            backend.load_blocks().unwrap(),
            vec![Block::genesis(), block_at(1)]
        );
    }

    #[test]
    fn test_append_after_torn_tail_in_same_process() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        backend.append_block(&Block::genesis()).unwrap();
        OpenOptions::new()
            .append(true)
            .open(dir.path().join(BLOCKS_FILE))
            .unwrap()
            .write_all(b"{\"header\":\"ab")
            .unwrap();

        backend.append_block(&block_at(1)).unwrap();
        assert_eq!(
            backend.load_blocks().unwrap(),
            vec![Block::genesis(), block_at(1)]
        );
    }

    #[test]
    fn test_unterminated_whole_record_is_kept() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        fs::write(
            dir.path().join(BLOCKS_FILE),
            canonicalize(&Block::genesis()).unwrap(),
        )
        .unwrap();

        backend.append_block(&block_at(1)).unwrap();
        assert_eq!(
            backend.load_blocks().unwrap(),
            vec![Block::genesis(), block_at(1)]
        );
    }

    #[test]
    fn test_failed_sync_rolls_back_append() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        backend.append_block(&Block::genesis()).unwrap();
        let before = log_len(dir.path());

        let mut record = canonicalize(&block_at(1)).unwrap();
        record.push(b'\n');
        let result = backend.append_record(&record, |_| {
            Err(io::Error::new(io::ErrorKind::Other, "disk went away"))
        });
        assert!(matches!(result, Err(StorageError::Io(_))));
        assert_eq!(log_len(dir.path()), before);
        assert_eq!(backend.load_blocks().unwrap(), vec![Block::genesis()]);

        // A retry lands exactly once
        backend.append_block(&block_at(1)).unwrap();
        assert_eq!(
            backend.load_blocks().unwrap(),
            vec![Block::genesis(), block_at(1)]
        );
    }

    #[test]
    fn test_corrupt_middle_line() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        backend.append_block(&Block::genesis()).unwrap();
        fs::OpenOptions::new()
            .append(true)
            .open(dir.path().join(BLOCKS_FILE))
            .unwrap()
            .write_all(b"not json\n")
            .unwrap();
        backend.append_block(&block_at(1)).unwrap();

        assert!(matches!(
            backend.load_blocks(),
            Err(StorageError::Corrupt(_))
        ));
    }

    #[test]
    fn test_pending_snapshot_replaced() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();

        let first = Transaction::template();
        let second = Transaction::coinbase_template();
        backend.store_pending(&[first.clone(), second.clone()]).unwrap();
        assert_eq!(backend.load_pending().unwrap(), vec![first.clone(), second]);

        backend.store_pending(&[first.clone()]).unwrap();
        assert_eq!(backend.load_pending().unwrap(), vec![first]);
        assert!(!dir.path().join("mempool.tmp").exists());
    }
}
