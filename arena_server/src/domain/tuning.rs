// Arena geometry shared by movement and hit detection.

use super::entities::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArenaTuning {
    // Cells per axis; valid coordinates are `0..grid_size`.
    pub grid_size: i32,
    // World units between neighbouring cell centres.
    pub spacing: f64,
    // Radius of the sphere used for hit tests.
    pub player_radius: f64,
}

impl Default for ArenaTuning {
    fn default() -> Self {
        Self {
            grid_size: 15,
            spacing: 1.0,
            player_radius: 0.5,
        }
    }
}

impl ArenaTuning {
    pub fn max_cell(&self) -> i32 {
        (self.grid_size - 1).max(0)
    }

    pub fn clamp_cell(&self, value: i32) -> i32 {
        value.clamp(0, self.max_cell())
    }

    // World-space centre of the hit sphere for a player standing on `(grid_x, grid_y)`.
    pub fn sphere_center(&self, grid_x: i32, grid_y: i32, base_y: Option<f64>) -> Vec3 {
        let half = f64::from(self.grid_size) / 2.0;
        Vec3::new(
            (f64::from(grid_x) - half + 0.5) * self.spacing,
            base_y.unwrap_or(0.0) + self.player_radius,
            (f64::from(grid_y) - half + 0.5) * self.spacing,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_cell_of_odd_grid_maps_to_world_origin() {
        let tuning = ArenaTuning::default();
        let center = tuning.sphere_center(7, 7, None);
        assert_eq!(center, Vec3::new(0.0, 0.5, 0.0));
    }

    #[test]
    fn base_y_lifts_the_sphere_and_spacing_scales_the_plane() {
        let tuning = ArenaTuning {
            grid_size: 135,
            spacing: 0.2,
            player_radius: 0.5,
        };
        let center = tuning.sphere_center(0, 134, Some(1.25));
        assert!((center.x - (-13.4)).abs() < 1e-9);
        assert!((center.y - 1.75).abs() < 1e-9);
        assert!((center.z - 13.4).abs() < 1e-9);
    }
}
