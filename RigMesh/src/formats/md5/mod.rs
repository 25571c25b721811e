//! id Tech 4 `md5mesh` / `md5anim` text formats.
//!
//! Both parsers share the tokenizer in [`lexer`] and the small validation
//! helpers below. Joint lists in both formats are stored parent-first: a
//! joint's parent index is always lower than its own, and exactly one joint
//! (the first) is the root.

pub mod anim;
pub mod lexer;
pub mod mesh;

pub use anim::parse_anim;
pub use mesh::{ParseOptions, parse_mesh, parse_mesh_with};

use crate::error::{Error, IndexKind, Location, Result};
use lexer::Cursor;

const SUPPORTED_VERSION: i64 = 10;

fn expect_version(cursor: &mut Cursor<'_>, at: Location) -> Result<()> {
    let version = cursor.expect_int("version")?;
    if version != SUPPORTED_VERSION {
        return Err(Error::malformed(
            at,
            format!("unsupported MD5Version {version} (expected {SUPPORTED_VERSION})"),
        ));
    }
    Ok(())
}

/// Read a parent index for the joint at position `own`.
fn expect_parent(cursor: &mut Cursor<'_>, at: Location, own: usize) -> Result<Option<usize>> {
    let parent = cursor.expect_int("parent index")?;
    if parent == -1 {
        return Ok(None);
    }
    check_index(parent, own, IndexKind::Parent, at).map(Some)
}

/// Read the index of a `vert`/`tri`/`weight` record and require it to be next.
fn expect_sequence(
    cursor: &mut Cursor<'_>,
    at: Location,
    keyword: &str,
    expected: usize,
) -> Result<()> {
    let index = cursor.expect_int("record index")?;
    if index != expected as i64 {
        return Err(Error::malformed(
            at,
            format!("{keyword} {index} out of sequence, expected {expected}"),
        ));
    }
    Ok(())
}

fn check_index(value: i64, len: usize, kind: IndexKind, at: Location) -> Result<usize> {
    usize::try_from(value)
        .ok()
        .filter(|v| *v < len)
        .ok_or(Error::IndexOutOfRange {
            at,
            kind,
            index: value,
            len,
        })
}

fn check_declared(declared: Option<(Location, usize)>, actual: usize, header: &str) -> Result<()> {
    match declared {
        Some((at, count)) if count != actual => Err(Error::malformed(
            at,
            format!("{header} declares {count}, found {actual}"),
        )),
        _ => Ok(()),
    }
}

/// Parent order already forces the first joint to be a root; reject any other.
fn check_single_root(
    parents: impl Iterator<Item = Option<usize>>,
    lines: &[Location],
) -> Result<()> {
    for (i, parent) in parents.enumerate().skip(1) {
        if parent.is_none() {
            return Err(Error::malformed(
                lines[i],
                "second root joint, the hierarchy must have exactly one root",
            ));
        }
    }
    Ok(())
}
