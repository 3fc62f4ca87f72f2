//! Persisted index: the chunk table / embedding matrix pair.
//!
//! The index is two co-located artifacts under the data directory:
//! `rag_index.json` (chunk records in build order) and
//! `rag_embeddings.bin` (a `(rows, dims)` header followed by row-major
//! little-endian `f32` data). Row *i* of the matrix is the embedding of
//! chunk *i* — the pair is only ever replaced whole, never edited in
//! place.
//!
//! Writers stage both artifacts at temporary paths and rename them into
//! place only after both writes succeed, so a concurrent reader can
//! never observe a new chunk table paired with old embeddings.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::models::ChunkRecord;

pub const INDEX_FILE: &str = "rag_index.json";
pub const EMBEDDINGS_FILE: &str = "rag_embeddings.bin";

/// The in-memory index: chunk table plus row-aligned embedding matrix.
#[derive(Debug, Clone)]
pub struct Index {
    pub records: Vec<ChunkRecord>,
    /// One row per record, all rows the same length.
    pub embeddings: Vec<Vec<f32>>,
}

impl Index {
    pub fn new(records: Vec<ChunkRecord>, embeddings: Vec<Vec<f32>>) -> Result<Self> {
        if records.len() != embeddings.len() {
            bail!(
                "Index misalignment: {} chunks but {} embedding rows",
                records.len(),
                embeddings.len()
            );
        }
        Ok(Self {
            records,
            embeddings,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Embedding dimensionality, or 0 for an empty index.
    pub fn dims(&self) -> usize {
        self.embeddings.first().map(|v| v.len()).unwrap_or(0)
    }
}

/// The on-disk locations of the two index artifacts for a data directory.
#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub index: PathBuf,
    pub embeddings: PathBuf,
}

impl IndexPaths {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            index: data_dir.join(INDEX_FILE),
            embeddings: data_dir.join(EMBEDDINGS_FILE),
        }
    }

    /// True when both artifacts are present. A cheap stat on both paths,
    /// not a content check; loading one without the other is "absent".
    pub fn both_exist(&self) -> bool {
        self.index.exists() && self.embeddings.exists()
    }
}

/// Error returned when retrieval is attempted before a successful build.
///
/// Kept distinct from generic I/O errors so callers can show an
/// actionable "run ingestion first" message instead of a stack trace.
#[derive(Debug)]
pub struct IndexNotFound {
    pub index: PathBuf,
    pub embeddings: PathBuf,
}

impl std::fmt::Display for IndexNotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Index files not found.\nExpected:\n  {}\n  {}\nRun `rag ingest` first.",
            self.index.display(),
            self.embeddings.display()
        )
    }
}

impl std::error::Error for IndexNotFound {}

/// Persist the index as the two-artifact pair, atomically as a whole.
///
/// Both files are written to `.tmp` siblings first; the live paths are
/// only touched once both writes have succeeded.
pub fn save_index(index: &Index, paths: &IndexPaths) -> Result<()> {
    if let Some(parent) = paths.index.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data dir: {}", parent.display()))?;
    }

    let index_tmp = paths.index.with_extension("json.tmp");
    let emb_tmp = paths.embeddings.with_extension("bin.tmp");

    let json = serde_json::to_vec_pretty(&index.records)
        .with_context(|| "Failed to serialize chunk table")?;
    std::fs::write(&index_tmp, json)
        .with_context(|| format!("Failed to write {}", index_tmp.display()))?;

    std::fs::write(&emb_tmp, encode_matrix(&index.embeddings)?)
        .with_context(|| format!("Failed to write {}", emb_tmp.display()))?;

    // Both staged; make the pair visible together.
    std::fs::rename(&index_tmp, &paths.index)
        .with_context(|| format!("Failed to replace {}", paths.index.display()))?;
    std::fs::rename(&emb_tmp, &paths.embeddings)
        .with_context(|| format!("Failed to replace {}", paths.embeddings.display()))?;

    Ok(())
}

/// Load a persisted index.
///
/// Fails with [`IndexNotFound`] when either artifact is missing; any
/// other failure (unreadable file, row-count mismatch, truncated matrix)
/// is a distinct corruption/I/O error.
pub fn load_index(paths: &IndexPaths) -> Result<Index> {
    if !paths.both_exist() {
        return Err(IndexNotFound {
            index: paths.index.clone(),
            embeddings: paths.embeddings.clone(),
        }
        .into());
    }

    let json = std::fs::read(&paths.index)
        .with_context(|| format!("Failed to read {}", paths.index.display()))?;
    let records: Vec<ChunkRecord> = serde_json::from_slice(&json)
        .with_context(|| format!("Failed to parse chunk table: {}", paths.index.display()))?;

    let bytes = std::fs::read(&paths.embeddings)
        .with_context(|| format!("Failed to read {}", paths.embeddings.display()))?;
    let embeddings = decode_matrix(&bytes)
        .with_context(|| format!("Corrupt embedding matrix: {}", paths.embeddings.display()))?;

    if records.len() != embeddings.len() {
        bail!(
            "Corrupt index: {} chunks but {} embedding rows",
            records.len(),
            embeddings.len()
        );
    }

    Index::new(records, embeddings)
}

/// Encode the matrix as a `(rows, dims)` u32 header plus row-major
/// little-endian `f32` data.
fn encode_matrix(matrix: &[Vec<f32>]) -> Result<Vec<u8>> {
    let rows = matrix.len();
    let dims = matrix.first().map(|v| v.len()).unwrap_or(0);

    let mut bytes = Vec::with_capacity(8 + rows * dims * 4);
    bytes.extend_from_slice(&(rows as u32).to_le_bytes());
    bytes.extend_from_slice(&(dims as u32).to_le_bytes());

    for row in matrix {
        if row.len() != dims {
            bail!(
                "Embedding matrix is ragged: expected {} dims, found {}",
                dims,
                row.len()
            );
        }
        for &v in row {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
    }

    Ok(bytes)
}

fn decode_matrix(bytes: &[u8]) -> Result<Vec<Vec<f32>>> {
    if bytes.len() < 8 {
        bail!("Embedding file too short for header");
    }
    let rows = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let dims = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;

    let expected = 8 + rows
        .checked_mul(dims)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| anyhow::anyhow!("Embedding header overflow"))?;
    if bytes.len() != expected {
        bail!(
            "Embedding file length {} does not match header ({} rows x {} dims)",
            bytes.len(),
            rows,
            dims
        );
    }

    let mut matrix = Vec::with_capacity(rows);
    let mut offset = 8;
    for _ in 0..rows {
        let mut row = Vec::with_capacity(dims);
        for _ in 0..dims {
            row.push(f32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ]));
            offset += 4;
        }
        matrix.push(row);
    }

    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> Index {
        Index::new(
            vec![
                ChunkRecord {
                    source: "a.txt".into(),
                    chunk_id: 0,
                    text: "alpha".into(),
                },
                ChunkRecord {
                    source: "a.txt".into(),
                    chunk_id: 1,
                    text: "beta".into(),
                },
                ChunkRecord {
                    source: "b.md".into(),
                    chunk_id: 0,
                    text: "gamma".into(),
                },
            ],
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_misaligned_index_rejected() {
        let result = Index::new(
            vec![ChunkRecord {
                source: "a.txt".into(),
                chunk_id: 0,
                text: "alpha".into(),
            }],
            vec![vec![1.0], vec![2.0]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = IndexPaths::new(tmp.path());
        let index = sample_index();

        save_index(&index, &paths).unwrap();
        let loaded = load_index(&paths).unwrap();

        assert_eq!(loaded.records, index.records);
        assert_eq!(loaded.embeddings.len(), index.embeddings.len());
        for (a, b) in loaded.embeddings.iter().zip(index.embeddings.iter()) {
            for (x, y) in a.iter().zip(b.iter()) {
                assert!((x - y).abs() < 1e-6);
            }
        }
        assert_eq!(loaded.dims(), 3);
    }

    #[test]
    fn test_missing_pair_is_index_not_found() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = IndexPaths::new(tmp.path());

        let err = load_index(&paths).unwrap_err();
        assert!(err.downcast_ref::<IndexNotFound>().is_some());
    }

    #[test]
    fn test_one_missing_artifact_is_index_not_found() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = IndexPaths::new(tmp.path());
        save_index(&sample_index(), &paths).unwrap();
        std::fs::remove_file(&paths.embeddings).unwrap();

        let err = load_index(&paths).unwrap_err();
        assert!(err.downcast_ref::<IndexNotFound>().is_some());
        assert!(!paths.both_exist());
    }

    #[test]
    fn test_row_count_mismatch_is_corruption_not_not_found() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = IndexPaths::new(tmp.path());
        save_index(&sample_index(), &paths).unwrap();

        // Truncate the chunk table to two records.
        let records: Vec<ChunkRecord> =
            serde_json::from_slice(&std::fs::read(&paths.index).unwrap()).unwrap();
        std::fs::write(
            &paths.index,
            serde_json::to_vec(&records[..2].to_vec()).unwrap(),
        )
        .unwrap();

        let err = load_index(&paths).unwrap_err();
        assert!(err.downcast_ref::<IndexNotFound>().is_none());
    }

    #[test]
    fn test_truncated_matrix_is_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = IndexPaths::new(tmp.path());
        save_index(&sample_index(), &paths).unwrap();

        let bytes = std::fs::read(&paths.embeddings).unwrap();
        std::fs::write(&paths.embeddings, &bytes[..bytes.len() - 4]).unwrap();

        assert!(load_index(&paths).is_err());
    }

    #[test]
    fn test_no_tmp_files_left_behind() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = IndexPaths::new(tmp.path());
        save_index(&sample_index(), &paths).unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_empty_matrix_roundtrip() {
        let encoded = encode_matrix(&[]).unwrap();
        assert_eq!(decode_matrix(&encoded).unwrap(), Vec::<Vec<f32>>::new());
    }
}
