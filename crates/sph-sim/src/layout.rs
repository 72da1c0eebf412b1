//! Structure-of-arrays layout of the packed particle buffer.
//!
//! Five arrays of `N` elements live back to back in one device buffer, in the
//! fixed order `position, velocity, force, density, pressure`. Binding slot `i`
//! of every kernel addresses field `i`.
//!
//! Offsets are never stored: they are recomputed from `(N, alignment)`. With an
//! alignment of 1 the arrays are dense; devices that constrain storage binding
//! offsets get each array start rounded up to their alignment.

use std::ops::Range;

use crate::vec2::Vec2;

/// One per-particle attribute array.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Field {
    Position,
    Velocity,
    Force,
    Density,
    Pressure,
}

impl Field {
    /// All fields in buffer order.
    pub const ALL: [Field; 5] = [
        Field::Position,
        Field::Velocity,
        Field::Force,
        Field::Density,
        Field::Pressure,
    ];

    /// Kernel binding slot.
    #[inline]
    pub const fn binding(self) -> u32 {
        self as u32
    }

    /// Bytes per particle.
    #[inline]
    pub const fn element_size(self) -> u64 {
        match self {
            Field::Position | Field::Velocity | Field::Force => 8,
            Field::Density | Field::Pressure => 4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Field::Position => "position",
            Field::Velocity => "velocity",
            Field::Force => "force",
            Field::Density => "density",
            Field::Pressure => "pressure",
        }
    }
}

/// Byte range of one field inside the packed buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FieldRange {
    pub offset: u64,
    pub size: u64,
}

impl FieldRange {
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    #[inline]
    pub fn as_range(&self) -> Range<u64> {
        self.offset..self.end()
    }

    /// Whether `[start, start + len)` lies inside this field.
    #[inline]
    pub fn contains(&self, start: u64, len: u64) -> bool {
        start >= self.offset && start + len <= self.end()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ParticleLayout {
    count: u32,
    alignment: u64,
}

impl ParticleLayout {
    /// Dense layout: every field starts where the previous one ends.
    pub const fn dense(count: u32) -> Self {
        Self {
            count,
            alignment: 1,
        }
    }

    /// Layout whose field offsets are multiples of `alignment`.
    ///
    /// An alignment of 0 is treated as 1.
    pub fn aligned(count: u32, alignment: u64) -> Self {
        Self {
            count,
            alignment: alignment.max(1),
        }
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[inline]
    pub fn alignment(&self) -> u64 {
        self.alignment
    }

    /// Offset and size of `field`.
    pub fn field_range(&self, field: Field) -> FieldRange {
        let mut range = FieldRange { offset: 0, size: 0 };
        for f in &Field::ALL[..=field.binding() as usize] {
            range = FieldRange {
                offset: align_up(range.end(), self.alignment),
                size: self.count as u64 * f.element_size(),
            };
        }
        range
    }

    /// All fields with their ranges, in buffer order.
    pub fn ranges(&self) -> impl Iterator<Item = (Field, FieldRange)> + '_ {
        Field::ALL.into_iter().map(|f| (f, self.field_range(f)))
    }

    /// Size of the whole packed buffer.
    pub fn total_size(&self) -> u64 {
        self.field_range(Field::Pressure).end()
    }

    /// Builds the initial buffer contents: `positions` in the position range,
    /// zero everywhere else.
    ///
    /// `positions` must hold exactly `count` elements.
    pub fn initial_image(&self, positions: &[Vec2]) -> Vec<u8> {
        debug_assert_eq!(positions.len(), self.count as usize);

        let mut image = vec![0u8; self.total_size() as usize];
        self.write_field(&mut image, Field::Position, 0, bytemuck::cast_slice(positions));
        image
    }

    /// Copies `bytes` into `field` starting `at` bytes into the field.
    ///
    /// Writing outside the field is a caller bug.
    pub fn write_field(&self, image: &mut [u8], field: Field, at: u64, bytes: &[u8]) {
        let range = self.field_range(field);
        let start = range.offset + at;
        debug_assert!(
            range.contains(start, bytes.len() as u64),
            "write of {} bytes at {at} overruns `{}` ({} bytes)",
            bytes.len(),
            field.name(),
            range.size
        );

        let start = start as usize;
        image[start..start + bytes.len()].copy_from_slice(bytes);
    }
}

#[inline]
fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTS: [u32; 7] = [1, 2, 3, 127, 128, 129, 20_000];

    #[test]
    fn dense_offsets_for_default_population() {
        let layout = ParticleLayout::dense(20_000);
        let offsets: Vec<u64> = layout.ranges().map(|(_, r)| r.offset).collect();

        assert_eq!(offsets, vec![0, 160_000, 320_000, 480_000, 560_000]);
        assert_eq!(layout.total_size(), 640_000);
    }

    #[test]
    fn dense_ranges_are_contiguous_and_sum_to_total() {
        for n in COUNTS {
            let layout = ParticleLayout::dense(n);
            let ranges: Vec<FieldRange> = layout.ranges().map(|(_, r)| r).collect();

            assert_eq!(ranges[0].offset, 0);
            for pair in ranges.windows(2) {
                assert_eq!(pair[0].end(), pair[1].offset, "n = {n}");
                assert!(pair[0].offset < pair[1].offset, "n = {n}");
            }

            let sum: u64 = ranges.iter().map(|r| r.size).sum();
            assert_eq!(sum, layout.total_size(), "n = {n}");
        }
    }

    #[test]
    fn every_field_holds_one_element_per_particle() {
        let layout = ParticleLayout::dense(300);
        for (field, range) in layout.ranges() {
            assert_eq!(range.size, 300 * field.element_size());
        }
    }

    #[test]
    fn aligned_ranges_are_disjoint_and_aligned() {
        for n in COUNTS {
            let layout = ParticleLayout::aligned(n, 256);
            let ranges: Vec<FieldRange> = layout.ranges().map(|(_, r)| r).collect();

            for r in &ranges {
                assert_eq!(r.offset % 256, 0, "n = {n}");
            }
            for pair in ranges.windows(2) {
                assert!(pair[0].end() <= pair[1].offset, "n = {n}");
            }
            assert_eq!(layout.total_size(), ranges[4].end());
        }
    }

    #[test]
    fn alignment_pads_only_where_needed() {
        let layout = ParticleLayout::aligned(20_000, 256);

        // 160_000 and 480_000 are already multiples of 256; 560_000 is not.
        assert_eq!(layout.field_range(Field::Velocity).offset, 160_000);
        assert_eq!(layout.field_range(Field::Density).offset, 480_000);
        assert_eq!(layout.field_range(Field::Pressure).offset, 560_128);
        assert_eq!(layout.total_size(), 640_128);
    }

    #[test]
    fn zero_alignment_is_dense() {
        assert_eq!(ParticleLayout::aligned(77, 0), ParticleLayout::dense(77));
    }

    #[test]
    fn bindings_follow_buffer_order() {
        let bindings: Vec<u32> = Field::ALL.iter().map(|f| f.binding()).collect();
        assert_eq!(bindings, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn initial_image_holds_positions_and_zeros() {
        let positions = [Vec2::new(0.5, -0.25), Vec2::new(1.0, 2.0), Vec2::new(-1.0, 0.0)];
        let layout = ParticleLayout::aligned(3, 16);
        let image = layout.initial_image(&positions);

        assert_eq!(image.len() as u64, layout.total_size());

        let pos = layout.field_range(Field::Position).as_range();
        let pos = pos.start as usize..pos.end as usize;
        let expected: &[u8] = bytemuck::cast_slice(&positions);
        assert_eq!(&image[pos.clone()], expected);

        assert!(image[pos.end..].iter().all(|&b| b == 0));
    }

    #[test]
    #[should_panic(expected = "overruns")]
    #[cfg(debug_assertions)]
    fn writes_past_a_field_are_caught() {
        let layout = ParticleLayout::dense(2);
        let mut image = vec![0u8; layout.total_size() as usize];
        layout.write_field(&mut image, Field::Density, 4, &[1, 2, 3, 4, 5]);
    }
}
