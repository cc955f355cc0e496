//! Static level geometry as a flat list of axis-aligned boxes
//!
//! Walls and the floor are registered once at map load and never move, so
//! the index is a plain `Vec` scanned linearly per bullet per tick.

use shared::Vec3;

/// Direction components smaller than this are treated as parallel to a slab.
pub const PARALLEL_EPSILON: f32 = 1e-8;

/// Axis-aligned box given by its center and half-extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub center: Vec3,
    pub half_extent: Vec3,
}

impl Aabb {
    pub fn new(center: Vec3, half_extent: Vec3) -> Self {
        Self {
            center,
            half_extent,
        }
    }

    /// Builds a box from its full size, the way walls are authored.
    pub fn from_size(center: Vec3, size: Vec3) -> Self {
        Self::new(center, size * 0.5)
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.half_extent
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.half_extent
    }

    pub fn contains(&self, point: Vec3) -> bool {
        let (min, max) = (self.min(), self.max());
        (0..3).all(|axis| point.axis(axis) >= min.axis(axis) && point.axis(axis) <= max.axis(axis))
    }

    /// Slab test of the segment `p0 -> p1` against this box.
    ///
    /// Returns the entry parameter `t` in `[0, 1]` along the segment, or
    /// `None` when the segment misses. A segment starting inside the box
    /// reports `t == 0`.
    pub fn segment_intersection(&self, p0: Vec3, p1: Vec3) -> Option<f32> {
        let min_b = self.min();
        let max_b = self.max();
        let direction = p1 - p0;

        let mut tmin = 0.0f32;
        let mut tmax = 1.0f32;

        for axis in 0..3 {
            let d = direction.axis(axis);
            let o = p0.axis(axis);
            let mn = min_b.axis(axis);
            let mx = max_b.axis(axis);

            if d.abs() < PARALLEL_EPSILON {
                if o < mn || o > mx {
                    return None;
                }
                continue;
            }

            let inv_d = 1.0 / d;
            let mut t1 = (mn - o) * inv_d;
            let mut t2 = (mx - o) * inv_d;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }

            tmin = tmin.max(t1);
            tmax = tmax.min(t2);
            if tmin > tmax {
                return None;
            }
        }

        if (0.0..=1.0).contains(&tmin) {
            Some(tmin)
        } else {
            None
        }
    }
}

/// Nearest static obstruction along a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticHit {
    /// Distance from the segment origin to the entry point.
    pub distance: f32,
    pub point: Vec3,
    pub index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct StaticGeometryIndex {
    boxes: Vec<Aabb>,
}

impl StaticGeometryIndex {
    pub fn new() -> Self {
        Self { boxes: Vec::new() }
    }

    pub fn with_boxes(boxes: Vec<Aabb>) -> Self {
        Self { boxes }
    }

    /// The default arena: floor slab, perimeter and five small buildings.
    pub fn arena() -> Self {
        let mut index = Self::new();

        const FLOOR_SIZE: f32 = 160.0;
        index.insert(Aabb::from_size(
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::new(FLOOR_SIZE, 1.0, FLOOR_SIZE),
        ));

        let half = 45.0;
        let height = 6.0;
        let thickness = 1.0;
        let span = 2.0 * half + thickness;
        index.wall((0.0, height / 2.0, -half), (span, height, thickness));
        index.wall((0.0, height / 2.0, half), (span, height, thickness));
        index.wall((-half, height / 2.0, 0.0), (thickness, height, span));
        index.wall((half, height / 2.0, 0.0), (thickness, height, span));

        // Building 1
        index.wall((-10.0, 3.0, -10.0), (12.0, 6.0, 1.0));
        index.wall((-10.0, 3.0, 0.0), (12.0, 6.0, 1.0));
        index.wall((-16.0, 3.0, -5.0), (1.0, 6.0, 10.0));
        index.wall((-4.0, 3.0, -5.0), (1.0, 6.0, 10.0));

        // Building 2
        index.wall((18.0, 2.5, -14.0), (16.0, 5.0, 1.0));
        index.wall((18.0, 2.5, -6.0), (16.0, 5.0, 1.0));
        index.wall((10.0, 2.5, -10.0), (1.0, 5.0, 8.0));
        index.wall((26.0, 2.5, -10.0), (1.0, 5.0, 8.0));

        // Tower
        index.wall((-28.0, 4.0, 14.0), (10.0, 8.0, 1.0));
        index.wall((-28.0, 4.0, 22.0), (10.0, 8.0, 1.0));
        index.wall((-33.0, 4.0, 18.0), (1.0, 8.0, 8.0));
        index.wall((-23.0, 4.0, 18.0), (1.0, 8.0, 8.0));

        // Courtyard
        index.wall((16.0, 3.0, 16.0), (12.0, 6.0, 1.0));
        index.wall((16.0, 3.0, 24.0), (12.0, 6.0, 1.0));
        index.wall((10.0, 3.0, 20.0), (1.0, 6.0, 8.0));
        index.wall((22.0, 3.0, 20.0), (1.0, 6.0, 8.0));

        // Hut
        index.wall((-4.0, 2.5, 24.0), (10.0, 5.0, 1.0));
        index.wall((-4.0, 2.5, 30.0), (10.0, 5.0, 1.0));
        index.wall((-8.0, 2.5, 27.0), (1.0, 5.0, 6.0));
        index.wall((0.0, 2.5, 27.0), (1.0, 5.0, 6.0));

        index
    }

    fn wall(&mut self, center: (f32, f32, f32), size: (f32, f32, f32)) {
        self.insert(Aabb::from_size(
            Vec3::new(center.0, center.1, center.2),
            Vec3::new(size.0, size.1, size.2),
        ));
    }

    pub fn insert(&mut self, aabb: Aabb) {
        self.boxes.push(aabb);
    }

    pub fn boxes(&self) -> &[Aabb] {
        &self.boxes
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Finds the nearest box crossed by the segment `p0 -> p1`.
    pub fn first_hit(&self, p0: Vec3, p1: Vec3) -> Option<StaticHit> {
        let length = (p1 - p0).length();
        let mut best: Option<(usize, f32)> = None;

        for (index, aabb) in self.boxes.iter().enumerate() {
            if let Some(t) = aabb.segment_intersection(p0, p1) {
                if best.map_or(true, |(_, best_t)| t < best_t) {
                    best = Some((index, t));
                }
            }
        }

        best.map(|(index, t)| StaticHit {
            distance: t * length,
            point: p0 + (p1 - p0) * t,
            index,
        })
    }
}
