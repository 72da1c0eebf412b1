//! Initial particle placement.
//!
//! Both scenarios lay particles on a regular grid with spacing
//! `2 * PARTICLE_RADIUS`, filled row-major from the top-left corner downward.
//! The last row may be partial.

use crate::error::SceneError;
use crate::params::PARTICLE_RADIUS;
use crate::vec2::Vec2;

/// Starting configuration of the fluid.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Scenario {
    /// Centered block dropped from the top of the domain.
    #[default]
    Block,
    /// Tall column against the left wall (dam break).
    Column,
}

/// Grid parameters for one scenario.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GridSpec {
    /// Position of particle 0 (top-left of the grid).
    pub origin: Vec2,
    /// Particles per row.
    pub row_width: u32,
    /// Rows that fit above the domain floor.
    pub row_capacity: u32,
}

impl Scenario {
    /// Scenario 0 is the block; any other id selects the column.
    pub fn from_id(id: i64) -> Self {
        if id == 0 {
            Scenario::Block
        } else {
            Scenario::Column
        }
    }

    pub fn id(self) -> i64 {
        match self {
            Scenario::Block => 0,
            Scenario::Column => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Scenario::Block => "block",
            Scenario::Column => "column",
        }
    }

    pub fn grid(self) -> GridSpec {
        match self {
            Scenario::Block => GridSpec {
                origin: Vec2::new(-0.625, 1.0),
                row_width: 125,
                row_capacity: 200,
            },
            Scenario::Column => GridSpec {
                origin: Vec2::new(-0.995, 0.995),
                row_width: 100,
                row_capacity: 200,
            },
        }
    }

    /// Largest particle count the grid can place.
    pub fn capacity(self) -> u32 {
        let grid = self.grid();
        grid.row_width * grid.row_capacity
    }
}

/// Generates the initial positions for `count` particles.
///
/// Deterministic: the same inputs always give the same positions.
pub fn generate(scenario: Scenario, count: u32) -> Result<Vec<Vec2>, SceneError> {
    if count == 0 {
        return Err(SceneError::Empty);
    }

    let grid = scenario.grid();
    let rows = count.div_ceil(grid.row_width);
    if rows > grid.row_capacity {
        return Err(SceneError::TooManyRows {
            scenario: scenario.name(),
            count,
            rows,
            capacity: grid.row_capacity,
        });
    }

    let spacing = 2.0 * PARTICLE_RADIUS;
    let positions = (0..count)
        .map(|i| {
            let col = (i % grid.row_width) as f32;
            let row = (i / grid.row_width) as f32;
            grid.origin + Vec2::new(col, -row) * spacing
        })
        .collect();

    Ok(positions)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn assert_near(actual: Vec2, expected: Vec2) {
        let d = actual - expected;
        assert!(
            d.x.abs() < EPS && d.y.abs() < EPS,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn block_grid_corners() {
        let p = generate(Scenario::Block, 20_000).unwrap();
        assert_eq!(p.len(), 20_000);

        assert_near(p[0], Vec2::new(-0.625, 1.0));
        assert_near(p[124], Vec2::new(-0.625 + 124.0 * 0.01, 1.0));
        assert_near(p[125], Vec2::new(-0.625, 0.99));
        // 160 full rows.
        assert_near(p[19_999], Vec2::new(0.615, 1.0 - 159.0 * 0.01));
    }

    #[test]
    fn column_hugs_left_wall() {
        let p = generate(Scenario::Column, 20_000).unwrap();

        assert_near(p[0], Vec2::new(-0.995, 0.995));
        assert_near(p[99], Vec2::new(-0.995 + 0.99, 0.995));
        assert_near(p[100], Vec2::new(-0.995, 0.985));
        assert!(p.iter().all(|v| v.y > -1.0 && v.x >= -1.0));
    }

    #[test]
    fn generation_is_deterministic() {
        for scenario in [Scenario::Block, Scenario::Column] {
            assert_eq!(generate(scenario, 4_321), generate(scenario, 4_321));
        }
    }

    #[test]
    fn short_final_row_is_kept() {
        let p = generate(Scenario::Block, 130).unwrap();
        assert_eq!(p.len(), 130);
        assert_near(p[129], Vec2::new(-0.625 + 4.0 * 0.01, 0.99));
    }

    #[test]
    fn rejects_empty_and_oversized_populations() {
        assert_eq!(generate(Scenario::Block, 0), Err(SceneError::Empty));

        let over = Scenario::Block.capacity() + 1;
        assert!(matches!(
            generate(Scenario::Block, over),
            Err(SceneError::TooManyRows { rows: 201, capacity: 200, .. })
        ));
        assert!(generate(Scenario::Block, Scenario::Block.capacity()).is_ok());
    }

    #[test]
    fn nonzero_ids_select_the_column() {
        assert_eq!(Scenario::from_id(0), Scenario::Block);
        assert_eq!(Scenario::from_id(1), Scenario::Column);
        assert_eq!(Scenario::from_id(-7), Scenario::Column);
        assert_eq!(Scenario::from_id(Scenario::Column.id()), Scenario::Column);
    }

    #[test]
    fn positions_are_finite_and_inside_domain() {
        for scenario in [Scenario::Block, Scenario::Column] {
            let p = generate(scenario, scenario.capacity()).unwrap();
            assert!(p.iter().all(|v| v.is_finite()));
            assert!(p.iter().all(|v| v.x.abs() <= 1.0 && v.y.abs() <= 1.0));
        }
    }
}
