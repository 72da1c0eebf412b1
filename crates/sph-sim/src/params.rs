//! Constants shared between the host and the kernels.
//!
//! The kernels receive these through a generated WGSL header (see
//! `kernels::constants_header`), so host and device can never disagree.

/// Default particle population.
pub const PARTICLE_COUNT: u32 = 20_000;

/// Invocations per compute work group. Baked into every kernel's `@workgroup_size`.
pub const WORK_GROUP_SIZE: u32 = 128;

/// Particle radius in world units. Grid spacing is twice this.
pub const PARTICLE_RADIUS: f32 = 0.005;

/// Simulated seconds advanced by one executed step.
pub const TIME_STEP: f32 = 0.0001;

/// Number of work groups needed to cover `particle_count` invocations.
#[inline]
pub const fn work_group_count(particle_count: u32) -> u32 {
    particle_count.div_ceil(WORK_GROUP_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_groups_round_up() {
        assert_eq!(work_group_count(1), 1);
        assert_eq!(work_group_count(128), 1);
        assert_eq!(work_group_count(129), 2);
        assert_eq!(work_group_count(PARTICLE_COUNT), 157);
    }
}
