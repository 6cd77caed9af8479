use std::f64::consts::PI;

use siam_shared::{Bounds, LatLng};

/// Side of the zoom-0 world square in screen pixels.
const TILE_SIZE: f64 = 256.0;
const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

pub const MIN_ZOOM: f64 = 5.0;
pub const MAX_ZOOM: f64 = 18.0;
pub const DEFAULT_ZOOM: f64 = 5.0;
pub const DEFAULT_CENTER: LatLng = LatLng::new(-9.19, -75.0152);
/// Padding applied around a fitted box.
pub const FIT_PADDING_PX: f64 = 50.0;
/// Zoom cap when fitting to a single search result.
pub const SEARCH_MAX_ZOOM: f64 = 12.0;

/// Navigation is confined to this box (Peru plus a margin).
pub fn max_bounds() -> Bounds {
    Bounds::new(LatLng::new(-20.0, -85.0), LatLng::new(2.0, -66.0))
}

/// Web Mercator projection into zoom-0 world pixels, y growing southwards.
pub fn project(point: LatLng) -> (f64, f64) {
    let lat = point.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (point.lng + 180.0) / 360.0 * TILE_SIZE;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * TILE_SIZE;
    (x, y)
}

pub fn unproject(x: f64, y: f64) -> LatLng {
    let lng = x / TILE_SIZE * 360.0 - 180.0;
    let n = PI * (1.0 - 2.0 * y / TILE_SIZE);
    LatLng::new(n.sinh().atan().to_degrees(), lng)
}

fn scale_for_zoom(zoom: f64) -> f64 {
    zoom.clamp(MIN_ZOOM, MAX_ZOOM).exp2()
}

/// Pan/zoom transform from projected world pixels to canvas pixels.
/// `scale` is `2^zoom`.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale: f64,
}

const ZOOM_SENSITIVITY: f64 = 0.002;

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            scale: scale_for_zoom(DEFAULT_ZOOM),
        }
    }
}

impl Viewport {
    /// Default view centered on `DEFAULT_CENTER` for a canvas of the given size.
    pub fn initial(canvas_w: f64, canvas_h: f64) -> Self {
        let mut vp = Self::default();
        vp.center_on(DEFAULT_CENTER, DEFAULT_ZOOM, canvas_w, canvas_h);
        vp
    }

    pub fn zoom(&self) -> f64 {
        self.scale.log2()
    }

    pub fn world_to_screen(&self, wx: f64, wy: f64) -> (f64, f64) {
        (
            wx * self.scale + self.offset_x,
            wy * self.scale + self.offset_y,
        )
    }

    pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        (
            (sx - self.offset_x) / self.scale,
            (sy - self.offset_y) / self.scale,
        )
    }

    pub fn latlng_to_screen(&self, point: LatLng) -> (f64, f64) {
        let (wx, wy) = project(point);
        self.world_to_screen(wx, wy)
    }

    pub fn screen_to_latlng(&self, sx: f64, sy: f64) -> LatLng {
        let (wx, wy) = self.screen_to_world(sx, sy);
        unproject(wx, wy)
    }

    /// Zoom toward a focus point (screen coordinates).
    pub fn zoom_at(&mut self, delta: f64, screen_x: f64, screen_y: f64) {
        let factor = (-delta * ZOOM_SENSITIVITY).exp();
        let new_scale = (self.scale * factor).clamp(MIN_ZOOM.exp2(), MAX_ZOOM.exp2());
        let ratio = new_scale / self.scale;

        // Keep the point under the cursor fixed.
        self.offset_x = screen_x - (screen_x - self.offset_x) * ratio;
        self.offset_y = screen_y - (screen_y - self.offset_y) * ratio;
        self.scale = new_scale;
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    pub fn center_on(&mut self, point: LatLng, zoom: f64, canvas_w: f64, canvas_h: f64) {
        let (cx, cy) = project(point);
        self.scale = scale_for_zoom(zoom);
        self.offset_x = canvas_w / 2.0 - cx * self.scale;
        self.offset_y = canvas_h / 2.0 - cy * self.scale;
    }

    /// Center on `bounds` at the largest whole zoom that keeps the box inside
    /// the canvas minus `padding` on every side, capped at `max_zoom`.
    /// A zero-area box (a single point) lands on `max_zoom`.
    pub fn fit_bounds(
        &mut self,
        bounds: &Bounds,
        canvas_w: f64,
        canvas_h: f64,
        padding: f64,
        max_zoom: f64,
    ) {
        if !bounds.is_valid() || canvas_w <= 0.0 || canvas_h <= 0.0 {
            return;
        }
        let (min_x, max_y) = project(bounds.south_west);
        let (max_x, min_y) = project(bounds.north_east);
        let world_w = max_x - min_x;
        let world_h = max_y - min_y;
        let avail_w = (canvas_w - 2.0 * padding).max(1.0);
        let avail_h = (canvas_h - 2.0 * padding).max(1.0);

        let fit = |avail: f64, extent: f64| {
            if extent > 0.0 { avail / extent } else { f64::INFINITY }
        };
        let max_zoom = max_zoom.min(MAX_ZOOM);
        let zoom = fit(avail_w, world_w)
            .min(fit(avail_h, world_h))
            .log2()
            .floor()
            .min(max_zoom);

        let center = unproject((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
        self.center_on(center, zoom, canvas_w, canvas_h);
    }

    /// Keep the view inside `limit`. An axis where the box is smaller than
    /// the canvas is centered instead.
    pub fn clamp_to(&mut self, limit: &Bounds, canvas_w: f64, canvas_h: f64) {
        let (left, bottom) = self.latlng_to_screen(limit.south_west);
        let (right, top) = self.latlng_to_screen(limit.north_east);
        self.offset_x += clamp_axis(left, right, canvas_w);
        self.offset_y += clamp_axis(top, bottom, canvas_h);
    }
}

/// Frame of a fly-to at progress `t` in `[0, 1]`: eased, zoom interpolated
/// in log space, center in projected space.
pub fn interpolate(from: &Viewport, to: &Viewport, t: f64, canvas_w: f64, canvas_h: f64) -> Viewport {
    let t = ease_in_out(t.clamp(0.0, 1.0));
    let (fx, fy) = from.screen_to_world(canvas_w / 2.0, canvas_h / 2.0);
    let (tx, ty) = to.screen_to_world(canvas_w / 2.0, canvas_h / 2.0);
    let scale = (from.zoom() + (to.zoom() - from.zoom()) * t).exp2();
    let cx = fx + (tx - fx) * t;
    let cy = fy + (ty - fy) * t;
    Viewport {
        offset_x: canvas_w / 2.0 - cx * scale,
        offset_y: canvas_h / 2.0 - cy * scale,
        scale,
    }
}

fn ease_in_out(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Shift needed to bring the span `[lo, hi]` over `[0, size]`.
fn clamp_axis(lo: f64, hi: f64, size: f64) -> f64 {
    if hi - lo <= size {
        size / 2.0 - (lo + hi) / 2.0
    } else if lo > 0.0 {
        -lo
    } else if hi < size {
        size - hi
    } else {
        0.0
    }
}
