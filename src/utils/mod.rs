use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

pub mod coords;
pub mod hash;

// ----------------------------------------------
// Macros
// ----------------------------------------------

// Defines a bitflags struct with a Display implementation.
#[macro_export]
macro_rules! bitflags_with_display {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident: $ty:ty {
            $(
                const $flag:ident = $value:expr;
            )+
        }
    ) => {
        bitflags! {
            $(#[$meta])*
            $vis struct $name: $ty {
                $(
                    const $flag = $value;
                )+
            }
        }
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                let mut first = true;
                $(
                    if self.contains($name::$flag) {
                        if !first {
                            write!(f, " | ")?;
                        }
                        write!(f, stringify!($flag))?;
                        first = false;
                    }
                )+
                if first {
                    write!(f, "(empty)")
                } else {
                    Ok(())
                }
            }
        }
    };
}

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// ----------------------------------------------
// Size
// ----------------------------------------------

// Integer width & height pair.
#[derive(Copy, Clone, Debug, Default, PartialOrd, Ord, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    #[inline]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { width: 0, height: 0 }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    #[inline]
    pub const fn cell_count(&self) -> usize {
        (self.width * self.height) as usize
    }
}

// Size + i32
impl Add<i32> for Size {
    type Output = Size;
    fn add(self, rhs: i32) -> Size {
        Size { width: self.width + rhs, height: self.height + rhs }
    }
}

// Size - i32
impl Sub<i32> for Size {
    type Output = Size;
    fn sub(self, rhs: i32) -> Size {
        Size { width: self.width - rhs, height: self.height - rhs }
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[{},{}]", self.width, self.height)
    }
}

// ----------------------------------------------
// Curve
// ----------------------------------------------

pub type CurvePoint = (f32, f32);

// Piecewise-linear curve evaluation over a sorted list of (x, y) points.
// Clamps to the first/last point outside the covered x range.
pub fn evaluate_curve(points: &[CurvePoint], x: f32) -> f32 {
    debug_assert!(!points.is_empty());
    debug_assert!(points.windows(2).all(|w| w[0].0 <= w[1].0), "Curve points must be sorted by x!");

    let (first_x, first_y) = points[0];
    if x <= first_x {
        return first_y;
    }

    let (last_x, last_y) = points[points.len() - 1];
    if x >= last_x {
        return last_y;
    }

    for segment in points.windows(2) {
        let (x0, y0) = segment[0];
        let (x1, y1) = segment[1];
        if x <= x1 {
            if x1 == x0 {
                return y1;
            }
            let t = (x - x0) / (x1 - x0);
            return y0 + (y1 - y0) * t;
        }
    }

    last_y
}
