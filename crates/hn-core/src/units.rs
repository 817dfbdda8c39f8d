//! Geometry units. Inputs are typed; the flux formulas work on raw SI values.

use uom::si::f64::{Area as UomArea, Length as UomLength};

pub type Area = UomArea;
pub type Length = UomLength;

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn mm(v: f64) -> Length {
    use uom::si::length::millimeter;
    Length::new::<millimeter>(v)
}

#[inline]
pub fn m2(v: f64) -> Area {
    use uom::si::area::square_meter;
    Area::new::<square_meter>(v)
}

/// Raw SI value of a length in metres.
#[inline]
pub fn meters(l: Length) -> f64 {
    use uom::si::length::meter;
    l.get::<meter>()
}

/// Raw SI value of an area in square metres.
#[inline]
pub fn square_meters(a: Area) -> f64 {
    use uom::si::area::square_meter;
    a.get::<square_meter>()
}
