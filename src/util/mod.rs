pub mod image;
pub mod math;

pub use self::image::{Image, ImageRGB8};
pub use self::math::{Point2, Vec2};
