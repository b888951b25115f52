use crate::builder::PartitionData;
use crate::{IndexError, PartitionId, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all, File};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const PARTITION_PREFIX: &str = "part-r-";
const MAGIC: &[u8; 4] = b"WDXP";
const TRAILER_LEN: u64 = 8; // footer length (u32 LE) + magic

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_partitions: u32,
    pub document_count: u64,
    pub num_terms: u64,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn partition(&self, id: PartitionId) -> PathBuf { self.root.join(format!("{PARTITION_PREFIX}{id:05}")) }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    fn success(&self) -> PathBuf { self.root.join("_SUCCESS") }
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

pub fn mark_success(paths: &IndexPaths) -> Result<()> {
    File::create(paths.success())?;
    Ok(())
}

pub fn is_complete(paths: &IndexPaths) -> bool { paths.success().is_file() }

/// Recover the partition id from a file name such as `part-r-00003`.
pub fn parse_partition_id(file_name: &str) -> Option<PartitionId> {
    if !file_name.starts_with(PARTITION_PREFIX) {
        return None;
    }
    file_name.rsplit('-').next()?.parse().ok()
}

/// Every partition file under `root`, ordered by id. Other files are ignored.
pub fn list_partition_files(root: &Path) -> Result<Vec<(PartitionId, PathBuf)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if let Some(id) = name.to_str().and_then(parse_partition_id) {
            files.push((id, entry.path()));
        }
    }
    files.sort_by_key(|(id, _)| *id);
    Ok(files)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DirectoryEntry {
    term: String,
    offset: u64,
    len: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct PartitionFooter {
    partition: PartitionId,
    num_partitions: u32,
    directory_offset: u64,
    directory_len: u64,
    metadata_offset: u64,
    metadata_len: u64,
}

/// Write one reduced partition: records, term directory, metadata record, footer.
pub fn write_partition(path: &Path, data: &PartitionData, num_partitions: u32) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    let mut pos: u64 = 0;
    let mut directory = Vec::with_capacity(data.terms.len());
    for (term, record) in &data.terms {
        let len = u32::try_from(record.len())
            .map_err(|_| IndexError::MalformedInput(format!("posting record for {term:?} exceeds 4 GiB")))?;
        out.write_all(record)?;
        directory.push(DirectoryEntry { term: term.clone(), offset: pos, len });
        pos += record.len() as u64;
    }

    let directory_bytes = bincode::serialize(&directory)?;
    out.write_all(&directory_bytes)?;
    let metadata = data.metadata_record();
    out.write_all(&metadata)?;

    let footer = PartitionFooter {
        partition: data.partition,
        num_partitions,
        directory_offset: pos,
        directory_len: directory_bytes.len() as u64,
        metadata_offset: pos + directory_bytes.len() as u64,
        metadata_len: metadata.len() as u64,
    };
    let footer_bytes = bincode::serialize(&footer)?;
    out.write_all(&footer_bytes)?;
    out.write_all(&(footer_bytes.len() as u32).to_le_bytes())?;
    out.write_all(MAGIC)?;
    out.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    Ok(())
}

/// A partition opened for random-access term lookups. The term directory and
/// metadata record are held in memory; posting records are read on demand.
pub struct PartitionFile {
    partition: PartitionId,
    num_partitions: u32,
    directory: Vec<DirectoryEntry>,
    metadata: Vec<u8>,
    file: Mutex<File>,
}

impl PartitionFile {
    pub fn open(path: &Path) -> Result<Self> {
        let corrupt = |reason: String| IndexError::CorruptPartition { path: path.to_path_buf(), reason };

        let mut file = File::open(path)?;
        let file_len = file.metadata()?.len();
        if file_len < TRAILER_LEN {
            return Err(corrupt(format!("{file_len} bytes is too short for a partition")));
        }
        let mut trailer = [0u8; TRAILER_LEN as usize];
        read_at(&mut file, file_len - TRAILER_LEN, &mut trailer)?;
        if &trailer[4..] != MAGIC {
            return Err(corrupt("bad magic".into()));
        }
        let footer_len = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]) as u64;
        let footer_start = (file_len - TRAILER_LEN)
            .checked_sub(footer_len)
            .ok_or_else(|| corrupt("footer length exceeds file".into()))?;
        let mut footer_bytes = vec![0u8; footer_len as usize];
        read_at(&mut file, footer_start, &mut footer_bytes)?;
        let footer: PartitionFooter = bincode::deserialize(&footer_bytes)?;

        let directory_end = footer.directory_offset.checked_add(footer.directory_len);
        let metadata_end = footer.metadata_offset.checked_add(footer.metadata_len);
        match (directory_end, metadata_end) {
            (Some(d), Some(m)) if d <= footer.metadata_offset && m <= footer_start => {}
            _ => return Err(corrupt("section bounds overlap the footer".into())),
        }

        let mut directory_bytes = vec![0u8; footer.directory_len as usize];
        read_at(&mut file, footer.directory_offset, &mut directory_bytes)?;
        let directory: Vec<DirectoryEntry> = bincode::deserialize(&directory_bytes)?;
        if directory.windows(2).any(|w| w[0].term >= w[1].term) {
            return Err(corrupt("term directory is not strictly sorted".into()));
        }
        if directory.iter().any(|e| e.offset.saturating_add(e.len as u64) > footer.directory_offset) {
            return Err(corrupt("posting record runs past the data section".into()));
        }

        let mut metadata = vec![0u8; footer.metadata_len as usize];
        read_at(&mut file, footer.metadata_offset, &mut metadata)?;

        Ok(Self {
            partition: footer.partition,
            num_partitions: footer.num_partitions,
            directory,
            metadata,
            file: Mutex::new(file),
        })
    }

    /// Id the partition was written under.
    pub fn partition(&self) -> PartitionId { self.partition }

    /// Partition count of the build that wrote this file.
    pub fn num_partitions(&self) -> u32 { self.num_partitions }

    pub fn num_terms(&self) -> usize { self.directory.len() }

    pub fn terms(&self) -> impl Iterator<Item = &str> { self.directory.iter().map(|e| e.term.as_str()) }

    pub fn metadata_record(&self) -> &[u8] { &self.metadata }

    /// Raw posting record for `term`, read from disk, or `None` if absent.
    pub fn read_record(&self, term: &str) -> Result<Option<Vec<u8>>> {
        let Ok(i) = self.directory.binary_search_by(|e| e.term.as_str().cmp(term)) else {
            return Ok(None);
        };
        let entry = &self.directory[i];
        let mut buf = vec![0u8; entry.len as usize];
        let mut file = self.file.lock();
        read_at(&mut file, entry.offset, &mut buf)?;
        Ok(Some(buf))
    }
}

fn read_at(file: &mut File, offset: u64, buf: &mut [u8]) -> Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    file.read_exact(buf)?;
    Ok(())
}
