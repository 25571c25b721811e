//! Animation clip data: hierarchy, base frame, per-frame channel values.

use glam::Vec3;

use super::Model;
use crate::error::{Error, Result};

/// Which of a joint's six pose components are animated.
///
/// Bits are consumed in this order when reading a frame:
/// translate x, y, z then orientation x, y, z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelMask(u8);

impl ChannelMask {
    pub const TX: u8 = 0x01;
    pub const TY: u8 = 0x02;
    pub const TZ: u8 = 0x04;
    pub const QX: u8 = 0x08;
    pub const QY: u8 = 0x10;
    pub const QZ: u8 = 0x20;
    pub const ALL: u8 = 0x3F;

    /// Channel bits in frame-reading order.
    pub const ORDER: [u8; 6] = [Self::TX, Self::TY, Self::TZ, Self::QX, Self::QY, Self::QZ];

    /// Returns `None` when bits above the sixth are set.
    pub fn from_bits(bits: u32) -> Option<Self> {
        if bits & !u32::from(Self::ALL) != 0 {
            return None;
        }
        Some(Self(bits as u8))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    /// Number of frame values this joint consumes.
    pub fn count(self) -> usize {
        self.0.count_ones() as usize
    }
}

/// One joint of the animated hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyEntry {
    pub name: String,
    pub parent: Option<usize>,
    pub mask: ChannelMask,
    /// First value of this joint's channels within each frame.
    pub offset: usize,
}

impl HierarchyEntry {
    pub fn channel_range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.mask.count()
    }
}

/// Default parent-relative pose of a joint, used for channels the mask leaves unset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseFrameEntry {
    pub position: Vec3,
    /// xyz of the orientation quaternion; w is derived at reconstruction.
    pub orientation: Vec3,
}

/// Axis-aligned bounds of the animated model for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

/// A parsed animation clip. Always holds at least one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub(crate) commandline: Option<String>,
    pub(crate) frame_rate: u32,
    pub(crate) hierarchy: Vec<HierarchyEntry>,
    pub(crate) bounds: Vec<Bounds>,
    pub(crate) base_frame: Vec<BaseFrameEntry>,
    pub(crate) components: usize,
    pub(crate) frame_count: usize,
    pub(crate) frame_data: Vec<f32>,
}

impl AnimationClip {
    pub fn commandline(&self) -> Option<&str> {
        self.commandline.as_deref()
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    pub fn hierarchy(&self) -> &[HierarchyEntry] {
        &self.hierarchy
    }

    pub fn base_frame(&self) -> &[BaseFrameEntry] {
        &self.base_frame
    }

    pub fn joint_count(&self) -> usize {
        self.hierarchy.len()
    }

    /// Number of channel values in every frame.
    pub fn components_per_frame(&self) -> usize {
        self.components
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Channel values of `index`, wrapping around the clip length.
    pub fn frame(&self, index: usize) -> &[f32] {
        let index = index % self.frame_count;
        &self.frame_data[index * self.components..(index + 1) * self.components]
    }

    /// Bounds of `index`, wrapping around the clip length, if the file had them.
    pub fn bounds(&self, index: usize) -> Option<Bounds> {
        if self.bounds.is_empty() {
            return None;
        }
        Some(self.bounds[index % self.bounds.len()])
    }

    /// Clip length in seconds.
    pub fn duration(&self) -> f32 {
        self.frame_count() as f32 / self.frame_rate as f32
    }

    /// The frame shown `seconds` after the clip started, looping.
    pub fn frame_at(&self, seconds: f32) -> usize {
        let frame = (seconds * self.frame_rate as f32).floor() as i64;
        frame.rem_euclid(self.frame_count() as i64) as usize
    }

    /// Check that this clip's hierarchy drives `model`'s skeleton.
    pub fn check_compatible(&self, model: &Model) -> Result<()> {
        let joints = model.joints();
        if joints.len() != self.hierarchy.len() {
            return Err(Error::ClipMismatch {
                message: format!(
                    "clip has {} joints, model has {}",
                    self.hierarchy.len(),
                    joints.len()
                ),
            });
        }
        for (i, (entry, joint)) in self.hierarchy.iter().zip(joints).enumerate() {
            if entry.name != joint.name {
                return Err(Error::ClipMismatch {
                    message: format!(
                        "joint {i} is '{}' in clip but '{}' in model",
                        entry.name, joint.name
                    ),
                });
            }
            if entry.parent != joint.parent {
                return Err(Error::ClipMismatch {
                    message: format!("joint {i} ('{}') has a different parent", entry.name),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_mask_bits() {
        let mask = ChannelMask::from_bits(0b10_0101).unwrap();
        assert!(mask.contains(ChannelMask::TX));
        assert!(!mask.contains(ChannelMask::TY));
        assert!(mask.contains(ChannelMask::TZ));
        assert!(mask.contains(ChannelMask::QZ));
        assert_eq!(mask.count(), 3);
        assert!(ChannelMask::from_bits(64).is_none());
    }

    #[test]
    fn test_channel_range() {
        let entry = HierarchyEntry {
            name: "hip".to_string(),
            parent: None,
            mask: ChannelMask::from_bits(63).unwrap(),
            offset: 4,
        };
        assert_eq!(entry.channel_range(), 4..10);
    }
}
