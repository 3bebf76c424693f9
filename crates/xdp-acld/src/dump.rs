//! Packed store dumps.
//!
//! A dump is the store exactly as the data path sees it, so it can be
//! handed to a loader or reloaded for offline classification.
//!
//! ```text
//! magic "XACL" | version u16 LE
//! table count u32 LE | table records (12 bytes each, directory order)
//! rule count u32 LE  | { bucket index u32 LE | rule record (36 bytes) }*
//! ```
//!
//! Rules appear in bucket index order and, within a bucket, in scan order.

use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use acl_dataplane::layout::{
    decode_rule, decode_table, encode_rule, encode_table, RULE_RECORD_LEN, TABLE_RECORD_LEN,
};
use acl_dataplane::{AclStore, LayoutError, StoreError};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

pub const DUMP_MAGIC: [u8; 4] = *b"XACL";
pub const DUMP_VERSION: u16 = 1;

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("not a store dump (bad magic)")]
    BadMagic,

    #[error("unsupported dump version {0}")]
    Version(u16),

    #[error("truncated dump: {0}")]
    Truncated(#[from] io::Error),

    #[error("bad record: {0}")]
    Layout(#[from] LayoutError),

    #[error("cannot rebuild store: {0}")]
    Store(#[from] StoreError),

    #[error("{count} trailing bytes after last record")]
    Trailing { count: usize },

    #[error("Failed to access dump file {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Serializes a store.
pub fn write_dump<W: Write>(store: &AclStore, out: &mut W) -> io::Result<()> {
    out.write_all(&DUMP_MAGIC)?;
    out.write_u16::<LittleEndian>(DUMP_VERSION)?;

    out.write_u32::<LittleEndian>(store.table_count() as u32)?;
    for table in store.tables() {
        out.write_all(&encode_table(table))?;
    }

    out.write_u32::<LittleEndian>(store.rule_count() as u32)?;
    for (index, bucket) in store.buckets() {
        for rule in bucket.rules() {
            out.write_u32::<LittleEndian>(index as u32)?;
            out.write_all(&encode_rule(rule))?;
        }
    }
    Ok(())
}

/// Rebuilds a store from dump bytes.
pub fn read_dump(bytes: &[u8]) -> Result<AclStore, DumpError> {
    let mut cur = Cursor::new(bytes);

    let mut magic = [0u8; 4];
    cur.read_exact(&mut magic)?;
    if magic != DUMP_MAGIC {
        return Err(DumpError::BadMagic);
    }
    let version = cur.read_u16::<LittleEndian>()?;
    if version != DUMP_VERSION {
        return Err(DumpError::Version(version));
    }

    let mut store = AclStore::new();

    let tables = cur.read_u32::<LittleEndian>()?;
    let mut record = [0u8; TABLE_RECORD_LEN];
    for _ in 0..tables {
        cur.read_exact(&mut record)?;
        store.push_table(decode_table(&record)?)?;
    }

    let rules = cur.read_u32::<LittleEndian>()?;
    let mut record = [0u8; RULE_RECORD_LEN];
    for _ in 0..rules {
        let index = cur.read_u32::<LittleEndian>()? as usize;
        cur.read_exact(&mut record)?;
        let rule = decode_rule(&record)?;
        store.update_bucket(index, |bucket| bucket.push(rule))??;
    }

    let rest = bytes.len() - cur.position() as usize;
    if rest != 0 {
        return Err(DumpError::Trailing { count: rest });
    }
    Ok(store)
}

/// Writes a dump file.
pub fn save_dump(store: &AclStore, path: impl AsRef<Path>) -> Result<usize, DumpError> {
    let path = path.as_ref();
    let file_error = |source| DumpError::File {
        path: path.to_path_buf(),
        source,
    };
    let mut buf = Vec::new();
    write_dump(store, &mut buf).map_err(file_error)?;
    fs::write(path, &buf).map_err(file_error)?;
    Ok(buf.len())
}

/// Reads a dump file.
pub fn load_dump(path: impl AsRef<Path>) -> Result<AclStore, DumpError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| DumpError::File {
        path: path.to_path_buf(),
        source,
    })?;
    read_dump(&bytes)
}
