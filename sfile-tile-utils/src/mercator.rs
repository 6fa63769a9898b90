//! Spherical Web Mercator conversions between tile pixels, projected meters and WGS84.
//!
//! Pixel coordinates grow right and *down* from the top-left corner of the map, while
//! projected meters grow right and *up* from the map center. All functions are pure.

use std::f64::consts::PI;

use crate::{BoundingBox, ORIGIN_SHIFT, TILE_SIZE};

/// Meters per pixel at zoom 0.
pub const INITIAL_RESOLUTION: f64 = 2.0 * ORIGIN_SHIFT / TILE_SIZE as f64;

/// Meters per pixel at the equator for the given zoom.
#[must_use]
pub fn resolution(zoom: u8) -> f64 {
    INITIAL_RESOLUTION / 2_f64.powi(i32::from(zoom))
}

/// Convert pixel coordinates at `zoom` to projected meters.
#[must_use]
pub fn pixels_to_meters(px: f64, py: f64, zoom: u8) -> (f64, f64) {
    let res = resolution(zoom);
    let mx = px * res - ORIGIN_SHIFT;
    let my = -(py * res - ORIGIN_SHIFT);
    (mx, my)
}

/// Inverse of [`pixels_to_meters`].
#[must_use]
pub fn meters_to_pixels(mx: f64, my: f64, zoom: u8) -> (f64, f64) {
    let res = resolution(zoom);
    let px = (mx + ORIGIN_SHIFT) / res;
    let py = (ORIGIN_SHIFT - my) / res;
    (px, py)
}

/// Convert projected meters to `(longitude, latitude)` in degrees.
#[must_use]
pub fn meters_to_lng_lat(mx: f64, my: f64) -> (f64, f64) {
    let lng = (mx / ORIGIN_SHIFT) * 180.0;
    let lat = (my / ORIGIN_SHIFT) * 180.0;
    let lat = 180.0 / PI * (2.0 * (lat * PI / 180.0).exp().atan() - PI / 2.0);
    (lng, lat)
}

/// Inverse of [`meters_to_lng_lat`].
#[must_use]
pub fn lng_lat_to_meters(lng: f64, lat: f64) -> (f64, f64) {
    let mx = lng * ORIGIN_SHIFT / 180.0;
    let my = ((90.0 + lat) * PI / 360.0).tan().ln() / (PI / 180.0);
    let my = my * ORIGIN_SHIFT / 180.0;
    (mx, my)
}

/// Geographic extent of the XYZ tile `(tx, ty)` at `zoom`.
///
/// The top-left pixel corner maps to the larger latitude, so it becomes `max_y`.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub fn tile_bound(tx: i64, ty: i64, zoom: u8) -> BoundingBox {
    let size = f64::from(TILE_SIZE);
    let (mx0, my0) = pixels_to_meters(tx as f64 * size, ty as f64 * size, zoom);
    let (lng0, lat0) = meters_to_lng_lat(mx0, my0);
    let (mx1, my1) = pixels_to_meters((tx as f64 + 1.0) * size, (ty as f64 + 1.0) * size, zoom);
    let (lng1, lat1) = meters_to_lng_lat(mx1, my1);
    BoundingBox::new(lng0, lat1, lng1, lat0)
}
