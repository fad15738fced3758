#[derive(Debug, Clone, PartialEq)]
pub struct SphereGrid {
    pub resolution_x: u32,
    pub resolution_y: u32,
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

pub const DEFAULT_RESOLUTION_X: u32 = 200;
pub const DEFAULT_RESOLUTION_Y: u32 = 100;

impl SphereGrid {
    pub fn new(resolution_x: u32, resolution_y: u32) -> Self {
        let resolution_x = resolution_x.max(2);
        let resolution_y = resolution_y.max(2);

        let mut vertices = Vec::with_capacity((resolution_x * resolution_y * 2) as usize);
        for x in 0..resolution_x {
            for y in 0..resolution_y {
                vertices.push(x as f32 / (resolution_x - 1) as f32);
                vertices.push(y as f32 / (resolution_y - 1) as f32);
            }
        }

        let mut indices = Vec::with_capacity(Self::index_count(resolution_x, resolution_y));
        for x in 0..resolution_x - 1 {
            indices.push(x * resolution_y);
            for y in 0..resolution_y {
                indices.push(x * resolution_y + y);
                indices.push((x + 1) * resolution_y + y);
            }
            let last = indices[indices.len() - 1];
            indices.push(last);
        }

        Self {
            resolution_x,
            resolution_y,
            vertices,
            indices,
        }
    }

    pub fn index_count(resolution_x: u32, resolution_y: u32) -> usize {
        ((resolution_x - 1) * (2 + 2 * resolution_y)) as usize
    }
}

impl Default for SphereGrid {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLUTION_X, DEFAULT_RESOLUTION_Y)
    }
}

/// Nearest hit of a ray with a sphere centred at the origin of body space. Only the first
/// radius is used, like the vertex shader does for every axis.
pub fn ray_intersection(origin: [f64; 3], direction: [f64; 3], radius: f64) -> Option<[f64; 3]> {
    let length = dot(direction, direction).sqrt();
    if length == 0.0 || !length.is_finite() {
        return None;
    }
    let direction = direction.map(|component| component / length);

    let b = dot(origin, direction);
    let c = dot(origin, origin) - radius * radius;
    let det = b * b - c;
    if det < 0.0 {
        return None;
    }
    let distance = -b - det.sqrt();
    Some([0, 1, 2].map(|axis| origin[axis] + direction[axis] * distance))
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_grid_layout() {
        let grid = SphereGrid::new(3, 2);
        assert_eq!(grid.vertices.len(), 3 * 2 * 2);
        assert_eq!(&grid.vertices[..4], &[0.0, 0.0, 0.0, 1.0]);
        assert_eq!(&grid.vertices[grid.vertices.len() - 2..], &[1.0, 1.0]);
        assert_eq!(grid.indices.len(), SphereGrid::index_count(3, 2));
        assert_eq!(grid.indices, vec![0, 0, 2, 1, 3, 3, 2, 2, 4, 3, 5, 5]);
    }

    #[test]
    fn indices_stay_in_bounds() {
        let grid = SphereGrid::default();
        let vertex_count = (grid.vertices.len() / 2) as u32;
        assert!(grid.indices.iter().all(|&index| index < vertex_count));
    }

    #[test]
    fn ray_hits_near_side() {
        let hit = ray_intersection([0.0, 0.0, 10.0], [0.0, 0.0, -2.0], 2.0).unwrap();
        assert_eq!(hit, [0.0, 0.0, 2.0]);
    }

    #[test]
    fn ray_misses() {
        assert_eq!(ray_intersection([5.0, 0.0, 10.0], [0.0, 0.0, -1.0], 2.0), None);
        assert_eq!(ray_intersection([0.0, 0.0, 10.0], [0.0, 0.0, 0.0], 2.0), None);
    }
}
