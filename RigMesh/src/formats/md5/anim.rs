//! `md5anim` parser.
//!
//! ```text
//! MD5Version 10
//! numFrames 2
//! numJoints 1
//! frameRate 24
//! numAnimatedComponents 1
//! hierarchy {
//!     "origin" -1 1 0
//! }
//! bounds {
//!     ( -1 -1 -1 ) ( 1 1 1 )
//!     ( -1 -1 -1 ) ( 1 1 1 )
//! }
//! baseframe {
//!     ( 0 0 0 ) ( 0 0 0 )
//! }
//! frame 0 { 0.0 }
//! frame 1 { 0.5 }
//! ```

use super::lexer::Cursor;
use crate::error::{Error, IndexKind, Location, Result};
use crate::model::{AnimationClip, BaseFrameEntry, Bounds, ChannelMask, HierarchyEntry};

/// Parse `md5anim` text.
pub fn parse_anim(text: &str) -> Result<AnimationClip> {
    let mut cursor = Cursor::new(text)?;
    let mut commandline = None;
    let mut declared_frames = None;
    let mut declared_joints = None;
    let mut declared_components = None;
    let mut frame_rate = None;
    let mut hierarchy: Option<(Vec<HierarchyEntry>, Vec<Location>)> = None;
    let mut bounds: Option<(Location, Vec<Bounds>)> = None;
    let mut base_frame: Option<(Location, Vec<BaseFrameEntry>)> = None;
    let mut frames: Vec<(Location, Vec<f32>)> = Vec::new();

    while !cursor.is_at_end() {
        let at = cursor.location();
        match cursor.expect_word("section keyword")? {
            "MD5Version" => {
                cursor.begin_record();
                super::expect_version(&mut cursor, at)?;
                cursor.end_record()?;
            }
            "commandline" => {
                cursor.begin_record();
                commandline = Some(cursor.expect_string("command line")?);
                cursor.end_record()?;
            }
            "numFrames" => {
                cursor.begin_record();
                declared_frames = Some((at, cursor.expect_count("frame count")?));
                cursor.end_record()?;
            }
            "numJoints" => {
                cursor.begin_record();
                declared_joints = Some((at, cursor.expect_count("joint count")?));
                cursor.end_record()?;
            }
            "numAnimatedComponents" => {
                cursor.begin_record();
                declared_components = Some((at, cursor.expect_count("component count")?));
                cursor.end_record()?;
            }
            "frameRate" => {
                cursor.begin_record();
                let rate = cursor.expect_int("frame rate")?;
                cursor.end_record()?;
                let rate = u32::try_from(rate)
                    .ok()
                    .filter(|r| *r > 0)
                    .ok_or_else(|| Error::malformed(at, format!("frame rate must be positive, got {rate}")))?;
                frame_rate = Some(rate);
            }
            "hierarchy" => {
                if hierarchy.is_some() {
                    return Err(Error::malformed(at, "duplicate 'hierarchy' block"));
                }
                hierarchy = Some(parse_hierarchy(&mut cursor, at)?);
            }
            "bounds" => {
                if bounds.is_some() {
                    return Err(Error::malformed(at, "duplicate 'bounds' block"));
                }
                bounds = Some((at, parse_bounds(&mut cursor)?));
            }
            "baseframe" => {
                if base_frame.is_some() {
                    return Err(Error::malformed(at, "duplicate 'baseframe' block"));
                }
                base_frame = Some((at, parse_base_frame(&mut cursor)?));
            }
            "frame" => {
                let index = cursor.expect_int("frame index")?;
                if index != frames.len() as i64 {
                    return Err(Error::malformed(
                        at,
                        format!("frame {index} out of sequence, expected {}", frames.len()),
                    ));
                }
                frames.push((at, parse_frame_values(&mut cursor)?));
            }
            other => {
                return Err(Error::malformed(at, format!("unknown section '{other}'")));
            }
        }
    }

    let frame_rate = frame_rate
        .ok_or_else(|| Error::malformed(Location::EndOfInput, "missing 'frameRate'"))?;
    let (hierarchy, hierarchy_lines) = hierarchy
        .ok_or_else(|| Error::malformed(Location::EndOfInput, "missing 'hierarchy' block"))?;
    let (base_at, base_frame) = base_frame
        .ok_or_else(|| Error::malformed(Location::EndOfInput, "missing 'baseframe' block"))?;
    if frames.is_empty() {
        return Err(Error::malformed(Location::EndOfInput, "animation has no frames"));
    }

    super::check_declared(declared_joints, hierarchy.len(), "numJoints")?;
    super::check_declared(declared_frames, frames.len(), "numFrames")?;
    super::check_single_root(hierarchy.iter().map(|h| h.parent), &hierarchy_lines)?;

    if base_frame.len() != hierarchy.len() {
        return Err(Error::malformed(
            base_at,
            format!(
                "baseframe has {} entries, hierarchy has {}",
                base_frame.len(),
                hierarchy.len()
            ),
        ));
    }

    let bounds = match bounds {
        Some((at, b)) if b.len() != frames.len() => {
            return Err(Error::malformed(
                at,
                format!("bounds has {} entries, animation has {} frames", b.len(), frames.len()),
            ));
        }
        Some((_, b)) => b,
        None => Vec::new(),
    };

    let components = frames[0].1.len();
    super::check_declared(declared_components, components, "numAnimatedComponents")?;
    for (at, values) in &frames {
        if values.len() != components {
            return Err(Error::malformed(
                *at,
                format!("frame has {} values, expected {components}", values.len()),
            ));
        }
    }

    for (entry, at) in hierarchy.iter().zip(&hierarchy_lines) {
        let range = entry.channel_range();
        if range.end > components {
            return Err(Error::IndexOutOfRange {
                at: *at,
                kind: IndexKind::Channel,
                index: range.end as i64 - 1,
                len: components,
            });
        }
    }

    let frame_count = frames.len();
    let frame_data: Vec<f32> = frames.into_iter().flat_map(|(_, values)| values).collect();

    tracing::debug!(
        joints = hierarchy.len(),
        frames = frame_count,
        components,
        frame_rate,
        "parsed md5anim"
    );

    Ok(AnimationClip {
        commandline,
        frame_rate,
        hierarchy,
        bounds,
        base_frame,
        components,
        frame_count,
        frame_data,
    })
}

fn parse_hierarchy(
    cursor: &mut Cursor<'_>,
    at: Location,
) -> Result<(Vec<HierarchyEntry>, Vec<Location>)> {
    cursor.expect_open_brace()?;
    let mut entries = Vec::new();
    let mut lines = Vec::new();

    while !cursor.at_close_brace() {
        let line = cursor.begin_record();
        let name = cursor.expect_string("joint name")?;
        let parent = super::expect_parent(cursor, line, entries.len())?;
        let bits = cursor.expect_int("channel mask")?;
        let offset = cursor.expect_count("channel offset")?;
        cursor.end_record()?;

        let mask = u32::try_from(bits)
            .ok()
            .and_then(ChannelMask::from_bits)
            .ok_or_else(|| {
                Error::malformed(line, format!("channel mask {bits} does not fit in 6 bits"))
            })?;

        entries.push(HierarchyEntry {
            name,
            parent,
            mask,
            offset,
        });
        lines.push(line);
    }
    cursor.expect_close_brace()?;
    if entries.is_empty() {
        return Err(Error::malformed(at, "'hierarchy' block is empty"));
    }

    Ok((entries, lines))
}

fn parse_bounds(cursor: &mut Cursor<'_>) -> Result<Vec<Bounds>> {
    cursor.expect_open_brace()?;
    let mut bounds = Vec::new();
    while !cursor.at_close_brace() {
        cursor.begin_record();
        let min = cursor.expect_vec3("bounds minimum")?;
        let max = cursor.expect_vec3("bounds maximum")?;
        cursor.end_record()?;
        bounds.push(Bounds { min, max });
    }
    cursor.expect_close_brace()?;
    Ok(bounds)
}

fn parse_base_frame(cursor: &mut Cursor<'_>) -> Result<Vec<BaseFrameEntry>> {
    cursor.expect_open_brace()?;
    let mut entries = Vec::new();
    while !cursor.at_close_brace() {
        cursor.begin_record();
        let position = cursor.expect_vec3("base position")?;
        let orientation = cursor.expect_vec3("base orientation")?;
        cursor.end_record()?;
        entries.push(BaseFrameEntry {
            position,
            orientation,
        });
    }
    cursor.expect_close_brace()?;
    Ok(entries)
}

/// Frame values may wrap over any number of lines.
fn parse_frame_values(cursor: &mut Cursor<'_>) -> Result<Vec<f32>> {
    cursor.expect_open_brace()?;
    let mut values = Vec::new();
    while !cursor.at_close_brace() {
        values.push(cursor.expect_f32("frame value")?);
    }
    cursor.expect_close_brace()?;
    Ok(values)
}
