//! Owner of the packed particle buffer.

use wgpu::util::DeviceExt;

use crate::error::SimError;
use crate::layout::{Field, FieldRange, ParticleLayout};
use crate::validation;
use crate::vec2::Vec2;

/// The device buffer holding every particle attribute.
///
/// Allocated once and mutated in place by the compute stages. Dropping the
/// store destroys the buffer.
pub struct ParticleStore {
    layout: ParticleLayout,
    buffer: wgpu::Buffer,
}

impl ParticleStore {
    /// Uploads `positions` and zeroes every other field.
    ///
    /// Fails if `positions` does not hold exactly `layout.count()` elements or
    /// the device cannot hold the buffer.
    pub fn allocate(
        device: &wgpu::Device,
        layout: ParticleLayout,
        positions: &[Vec2],
    ) -> Result<Self, SimError> {
        if layout.count() == 0 || positions.len() != layout.count() as usize {
            return Err(SimError::Allocation(format!(
                "expected {} initial positions, got {}",
                layout.count(),
                positions.len()
            )));
        }
        check_limits(&device.limits(), &layout)?;

        let image = layout.initial_image(positions);
        let (buffer, error) = validation::scoped(device, wgpu::ErrorFilter::OutOfMemory, || {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("sph particle buffer"),
                contents: &image,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::VERTEX
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
            })
        });
        if let Some(error) = error {
            return Err(SimError::Allocation(error.to_string()));
        }

        log::debug!(
            "particle buffer: {} particles, {} bytes (alignment {})",
            layout.count(),
            layout.total_size(),
            layout.alignment()
        );

        Ok(Self { layout, buffer })
    }

    #[inline]
    pub fn layout(&self) -> &ParticleLayout {
        &self.layout
    }

    #[inline]
    pub fn field_range(&self, field: Field) -> FieldRange {
        self.layout.field_range(field)
    }

    /// Binding of one field's range, for the compute bind group.
    pub fn binding(&self, field: Field) -> wgpu::BufferBinding<'_> {
        let range = self.field_range(field);
        wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: range.offset,
            size: wgpu::BufferSize::new(range.size),
        }
    }

    /// The position range, for presentation.
    pub fn position_slice(&self) -> wgpu::BufferSlice<'_> {
        self.buffer.slice(self.field_range(Field::Position).as_range())
    }
}

impl Drop for ParticleStore {
    fn drop(&mut self) {
        self.buffer.destroy();
        log::debug!("particle buffer released");
    }
}

/// Rejects layouts the device cannot bind.
fn check_limits(limits: &wgpu::Limits, layout: &ParticleLayout) -> Result<(), SimError> {
    let total = layout.total_size();
    if total > limits.max_buffer_size {
        return Err(SimError::Allocation(format!(
            "{total} bytes exceed the device buffer limit of {} bytes",
            limits.max_buffer_size
        )));
    }

    let max_binding = limits.max_storage_buffer_binding_size as u64;
    for (field, range) in layout.ranges() {
        if range.size > max_binding {
            return Err(SimError::Allocation(format!(
                "`{}` range of {} bytes exceeds the storage binding limit of {max_binding} bytes",
                field.name(),
                range.size
            )));
        }
        if range.offset % limits.min_storage_buffer_offset_alignment as u64 != 0 {
            return Err(SimError::Allocation(format!(
                "`{}` offset {} violates the device offset alignment of {}",
                field.name(),
                range.offset,
                limits.min_storage_buffer_offset_alignment
            )));
        }
    }
    Ok(())
}
