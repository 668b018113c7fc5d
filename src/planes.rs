//! Contains the PlaneMapper struct, which describes a relationship
//! between the square pixel raster of the render, with an origin at
//! 0,0, and a rectangle on the complex plane with an arbitrary pair of
//! corners.
use num::Complex;

use crate::error::{Error, Result};

/// The left-lower corner of the default view of the Mandelbrot set.
pub const DEFAULT_LEFTLOWER: Complex<f64> = Complex { re: -2.0, im: -1.5 };

/// The right-upper corner of the default view of the Mandelbrot set.
pub const DEFAULT_RIGHTUPPER: Complex<f64> = Complex { re: 1.0, im: 1.5 };

/// Describes the width and height of an integral plane that is assumed to start at
/// 0,0 and all values are assumed to be non-negative integers.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntegralPlane(pub usize, pub usize);

/// Describes the x (column), y (row) of a pixel in the raster.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// Maps pixels of the raster onto points of the complex plane.
#[derive(Copy, Clone, Debug)]
pub struct PlaneMapper {
    /// The far corner of the integral cartesian plane.  The near
    /// corner is assumed to be at 0,0
    pub integral_plane: IntegralPlane,
    origin: Complex<f64>,
    // Complex distance covered by one pixel along each axis.
    steps: (f64, f64),
}

impl PlaneMapper {
    /// Constructor.  Takes the size of the raster and the two corners
    /// of the complex region it covers.
    pub fn new(
        width: usize,
        height: usize,
        leftlower: Complex<f64>,
        rightupper: Complex<f64>,
    ) -> Result<PlaneMapper> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidArgument(format!(
                "raster of {}x{} pixels is empty",
                width, height
            )));
        }

        if rightupper.re <= leftlower.re {
            return Err(Error::InvalidArgument(
                "The left lower corner is not to the left of the right upper corner.".to_string(),
            ));
        }

        if rightupper.im <= leftlower.im {
            return Err(Error::InvalidArgument(
                "The left lower corner is not lower than the right upper corner".to_string(),
            ));
        }

        Ok(PlaneMapper {
            integral_plane: IntegralPlane(width, height),
            origin: leftlower,
            steps: (
                (rightupper.re - leftlower.re) / (width as f64),
                (rightupper.im - leftlower.im) / (height as f64),
            ),
        })
    }

    /// The square raster with the default view, `size` pixels a side.
    pub fn square(size: usize) -> Result<PlaneMapper> {
        PlaneMapper::new(size, size, DEFAULT_LEFTLOWER, DEFAULT_RIGHTUPPER)
    }

    /// The total number of points in the integral grid.
    pub fn len(&self) -> usize {
        self.integral_plane.0 * self.integral_plane.1
    }

    /// Describes that the integral plane is of a size.
    pub fn is_empty(&self) -> bool {
        self.integral_plane.0 == 0 || self.integral_plane.1 == 0
    }

    /// Width of a raster row, in pixels.
    pub fn width(&self) -> usize {
        self.integral_plane.0
    }

    /// Given a pixel on the integral cartesian plane, map that as
    /// closely as possible to a point on the complex cartesian plane.
    pub fn pixel_to_point(&self, pixel: &Pixel) -> Complex<f64> {
        Complex::new(
            self.origin.re + (pixel.0 as f64) * self.steps.0,
            self.origin.im + (pixel.1 as f64) * self.steps.1,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planemapper_fails_on_bad_shape() {
        let pm = PlaneMapper::new(4, 4, Complex::new(-1.0, 1.0), Complex::new(1.0, -1.0));
        assert!(pm.is_err());
    }

    #[test]
    fn planemapper_fails_on_empty_raster() {
        assert!(PlaneMapper::square(0).is_err());
    }

    #[test]
    fn planemapper_passes_on_good_shape() {
        let pm = PlaneMapper::new(4, 4, Complex::new(-1.0, -1.0), Complex::new(1.0, 1.0));
        assert!(pm.is_ok());
    }

    #[test]
    fn pixel_to_point_on_positive_planes() {
        let pm = PlaneMapper::new(5, 5, Complex::new(0.0, 0.0), Complex::new(5.0, 5.0)).unwrap();
        assert_eq!(pm.pixel_to_point(&Pixel(0, 0)), Complex::new(0.0, 0.0));
        assert_eq!(pm.pixel_to_point(&Pixel(2, 2)), Complex::new(2.0, 2.0));
        assert_eq!(pm.pixel_to_point(&Pixel(4, 4)), Complex::new(4.0, 4.0));
    }

    #[test]
    fn pixel_to_points_on_mixed_planes() {
        let pm = PlaneMapper::new(4, 4, Complex::new(-2.0, -2.0), Complex::new(2.0, 2.0)).unwrap();
        assert_eq!(pm.pixel_to_point(&Pixel(2, 2)), Complex::new(0.0, 0.0));
        assert_eq!(pm.pixel_to_point(&Pixel(0, 0)), Complex::new(-2.0, -2.0));
        assert_eq!(pm.pixel_to_point(&Pixel(4, 4)), Complex::new(2.0, 2.0));
    }

    #[test]
    fn default_view_spans_three_units() {
        let pm = PlaneMapper::square(600).unwrap();
        assert_eq!(pm.len(), 360_000);
        assert_eq!(pm.pixel_to_point(&Pixel(0, 0)), Complex::new(-2.0, -1.5));
        let centre = pm.pixel_to_point(&Pixel(400, 300));
        assert!(centre.norm() < 1e-12, "{:?}", centre);
    }
}
