// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The per-pixel escape-time kernel.  It is stateless, so any number
//! of workers may call it at once.

use num::Complex;

/// One 8-bit RGB pixel.
pub type Rgb = [u8; 3];

/// Color blended in as escape slows, toward the boundary of the set.
pub const INSIDE_COLOR: Rgb = [255, 0, 255];

/// Color of points that never escape or escape at once.
pub const OUTSIDE_COLOR: Rgb = [0, 255, 0];

/// Default bound on the number of iterations per point.
pub const DEFAULT_ITERATIONS: usize = 100;

/// A pure function from a point on the complex plane to a color.
pub trait Kernel: Send + Sync {
    /// Color the point `c`.
    fn color(&self, c: Complex<f64>) -> Rgb;
}

/// The classic Mandelbrot escape-time coloring, blending between two
/// colors by how quickly the orbit of `c` leaves the radius-2 circle.
#[derive(Copy, Clone, Debug)]
pub struct EscapeTime {
    limit: usize,
    inside: Rgb,
    outside: Rgb,
}

impl EscapeTime {
    /// An escape-time kernel running at most `limit` iterations per point.
    pub fn new(limit: usize) -> Self {
        EscapeTime {
            limit,
            inside: INSIDE_COLOR,
            outside: OUTSIDE_COLOR,
        }
    }

    /// Replace the blend colors.
    pub fn with_colors(mut self, inside: Rgb, outside: Rgb) -> Self {
        self.inside = inside;
        self.outside = outside;
        self
    }

    /// If `c` leaves the circle of radius 2 within the limit, return the
    /// iteration at which it did.  Otherwise `c` is presumed to be a
    /// member of the set and we return `None`.
    pub fn escape_time(&self, c: Complex<f64>) -> Option<usize> {
        let mut z = Complex::new(0.0, 0.0);
        for i in 0..self.limit {
            z = z * z + c;
            if z.norm_sqr() > 4.0 {
                return Some(i);
            }
        }
        None
    }
}

impl Default for EscapeTime {
    fn default() -> Self {
        EscapeTime::new(DEFAULT_ITERATIONS)
    }
}

impl Kernel for EscapeTime {
    fn color(&self, c: Complex<f64>) -> Rgb {
        let t = match self.escape_time(c) {
            Some(i) => (i as f64 / self.limit as f64).powf(0.2),
            None => 0.0,
        };
        let mut rgb = [0u8; 3];
        for (k, channel) in rgb.iter_mut().enumerate() {
            let v = f64::from(self.inside[k]) * t + f64::from(self.outside[k]) * (1.0 - t);
            *channel = num::clamp(v, 0.0, 255.0) as u8;
        }
        rgb
    }
}
