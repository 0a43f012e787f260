// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D profile definitions

use crate::error::{Error, Result};
use crate::triangulation::{signed_area, triangulate_polygon_with_holes};
use nalgebra::Point2;
use std::f64::consts::TAU;

/// 2D profile with optional holes
#[derive(Debug, Clone, PartialEq)]
pub struct Profile2D {
    /// Outer boundary
    pub outer: Vec<Point2<f64>>,
    /// Holes
    pub holes: Vec<Vec<Point2<f64>>>,
}

impl Profile2D {
    /// Create a new profile from an outer boundary
    pub fn new(outer: Vec<Point2<f64>>) -> Self {
        Self {
            outer,
            holes: Vec::new(),
        }
    }

    /// Add a hole to the profile
    pub fn add_hole(&mut self, hole: Vec<Point2<f64>>) {
        self.holes.push(hole);
    }

    /// Rectangle of `width` x `height` centred at the origin
    pub fn rectangle(width: f64, height: f64) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        Self::new(vec![
            Point2::new(-hw, -hh),
            Point2::new(hw, -hh),
            Point2::new(hw, hh),
            Point2::new(-hw, hh),
        ])
    }

    /// Circle centred at the origin, `segments` picked from the radius if `None`
    pub fn circle(radius: f64, segments: Option<usize>) -> Self {
        let segments = segments.unwrap_or_else(|| calculate_circle_segments(radius));
        let outer = (0..segments)
            .map(|i| {
                let angle = TAU * (i as f64) / (segments as f64);
                Point2::new(radius * angle.cos(), radius * angle.sin())
            })
            .collect();
        Self::new(outer)
    }

    /// Reorient rings so the outer boundary is counter-clockwise and holes
    /// are clockwise
    pub fn normalize_winding(&mut self) {
        if signed_area(&self.outer) < 0.0 {
            self.outer.reverse();
        }
        for hole in &mut self.holes {
            if signed_area(hole) > 0.0 {
                hole.reverse();
            }
        }
    }

    /// All rings, outer first
    pub fn rings(&self) -> impl Iterator<Item = &[Point2<f64>]> {
        std::iter::once(self.outer.as_slice()).chain(self.holes.iter().map(Vec::as_slice))
    }

    /// Triangulate the profile
    ///
    /// Holes with fewer than 3 points are dropped from the result.
    pub fn triangulate(&self) -> Result<Triangulation> {
        if self.outer.len() < 3 {
            return Err(Error::profile("Profile must have at least 3 vertices"));
        }

        let indices = triangulate_polygon_with_holes(&self.outer, &self.holes)?;
        let points = self
            .rings()
            .enumerate()
            .filter(|(i, ring)| *i == 0 || ring.len() >= 3)
            .flat_map(|(_, ring)| ring.iter().copied())
            .collect();

        Ok(Triangulation { points, indices })
    }
}

/// Triangulated profile
#[derive(Debug, Clone)]
pub struct Triangulation {
    /// All vertices (outer + holes)
    pub points: Vec<Point2<f64>>,
    /// Triangle indices into `points`
    pub indices: Vec<usize>,
}

/// Adaptive number of segments for a circle
#[inline]
pub fn calculate_circle_segments(radius: f64) -> usize {
    let segments = (radius.abs().sqrt() * 8.0).ceil() as usize;
    segments.clamp(8, 32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_profile() {
        let profile = Profile2D::rectangle(10.0, 5.0);
        assert_eq!(profile.outer.len(), 4);
        assert!(signed_area(&profile.outer) > 0.0);
    }

    #[test]
    fn test_circle_segments_are_clamped() {
        assert_eq!(Profile2D::circle(0.01, None).outer.len(), 8);
        assert_eq!(Profile2D::circle(1000.0, None).outer.len(), 32);
        assert_eq!(Profile2D::circle(1.0, Some(12)).outer.len(), 12);
    }

    #[test]
    fn test_triangulate_rectangle() {
        let tri = Profile2D::rectangle(10.0, 5.0).triangulate().unwrap();
        assert_eq!(tri.points.len(), 4);
        assert_eq!(tri.indices.len(), 6);
    }

    #[test]
    fn test_normalize_winding() {
        let mut profile = Profile2D::rectangle(4.0, 4.0);
        profile.outer.reverse();
        profile.add_hole(Profile2D::rectangle(1.0, 1.0).outer);
        profile.normalize_winding();

        assert!(signed_area(&profile.outer) > 0.0);
        assert!(signed_area(&profile.holes[0]) < 0.0);
    }

    #[test]
    fn test_degenerate_holes_are_dropped() {
        let mut profile = Profile2D::rectangle(4.0, 4.0);
        profile.add_hole(vec![Point2::new(0.0, 0.0), Point2::new(0.1, 0.0)]);
        let tri = profile.triangulate().unwrap();
        assert_eq!(tri.points.len(), 4);
    }
}
