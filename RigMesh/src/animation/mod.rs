//! Frame reconstruction: turn one frame of an [`AnimationClip`] into an
//! object-space pose the skinning kernels can consume.
//!
//! Each hierarchy entry starts from its base-frame values, overwrites the
//! channels flagged in its mask with consecutive values read from the frame
//! at the entry's offset, then composes the result with its already
//! computed parent.

use glam::Vec3;

use crate::model::{AnimationClip, ChannelMask, JointPose};
use crate::utils::{quat_from_xyz, rotate};

/// Reconstruct the object-space pose of frame `frame_index`.
///
/// Indices past the end wrap around, so a looping clip can be driven by an
/// ever increasing frame counter.
pub fn reconstruct_pose(clip: &AnimationClip, frame_index: usize) -> Vec<JointPose> {
    let mut pose = Vec::with_capacity(clip.joint_count());
    reconstruct_pose_into(clip, frame_index, &mut pose);
    pose
}

/// Like [`reconstruct_pose`], reusing `pose`'s allocation.
pub fn reconstruct_pose_into(clip: &AnimationClip, frame_index: usize, pose: &mut Vec<JointPose>) {
    pose.clear();
    let frame = clip.frame(frame_index);

    for (entry, base) in clip.hierarchy().iter().zip(clip.base_frame()) {
        let mut channels = [
            base.position.x,
            base.position.y,
            base.position.z,
            base.orientation.x,
            base.orientation.y,
            base.orientation.z,
        ];
        let mut next = entry.offset;
        for (value, bit) in channels.iter_mut().zip(ChannelMask::ORDER) {
            if entry.mask.contains(bit) {
                *value = frame[next];
                next += 1;
            }
        }

        let [tx, ty, tz, qx, qy, qz] = channels;
        let local = JointPose::new(Vec3::new(tx, ty, tz), quat_from_xyz(qx, qy, qz));

        // Parents precede children, so pose[parent] is already final.
        let world = match entry.parent {
            Some(parent) => {
                let parent = pose[parent];
                JointPose::new(
                    parent.position + rotate(parent.orientation, local.position),
                    (parent.orientation * local.orientation).normalize(),
                )
            }
            None => local,
        };
        pose.push(world);
    }
}
