//! Zoom / pan arithmetic of the in-page interaction layer.
//!
//! The page script does this work in the browser; [`ViewState`] is the same
//! arithmetic in Rust, and the constants below are substituted into the
//! script template so both always agree.

/// Lower zoom bound.
pub const MIN_ZOOM: f64 = 0.1;
/// Upper zoom bound.
pub const MAX_ZOOM: f64 = 10.0;
/// Wheel step towards the user (zoom in).
pub const WHEEL_ZOOM_IN: f64 = 1.1;
/// Wheel step away from the user (zoom out).
pub const WHEEL_ZOOM_OUT: f64 = 0.9;
/// Toolbar "+" step.
pub const BUTTON_ZOOM_IN: f64 = 1.25;
/// Toolbar "-" step.
pub const BUTTON_ZOOM_OUT: f64 = 0.8;
/// Margin kept around the diagram by the initial fit, in CSS pixels.
pub const FIT_MARGIN: f64 = 16.0;
/// Idle time before the toolbar fades out.
pub const TOOLBAR_HIDE_MS: u32 = 1500;

/// Clamp a requested zoom into `[MIN_ZOOM, MAX_ZOOM]`.
pub fn clamp_zoom(zoom: f64) -> f64 {
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Largest scale at which a `width` x `height` diagram fits the viewport
/// minus [`FIT_MARGIN`] on every side. `None` for degenerate sizes.
pub fn initial_fit_scale(
    diagram_width: f64,
    diagram_height: f64,
    viewport_width: f64,
    viewport_height: f64,
) -> Option<f64> {
    if !(diagram_width > 0.0 && diagram_height > 0.0) {
        return None;
    }
    let view_w = viewport_width - FIT_MARGIN * 2.0;
    let view_h = viewport_height - FIT_MARGIN * 2.0;
    Some((view_w / diagram_width).min(view_h / diagram_height))
}

/// Zoom and pan, with points expressed relative to the container centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    zoom: f64,
    pan_x: f64,
    pan_y: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

impl ViewState {
    pub fn new(zoom: f64) -> Self {
        Self {
            zoom: clamp_zoom(zoom),
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }

    pub const fn zoom(&self) -> f64 {
        self.zoom
    }

    pub const fn pan(&self) -> (f64, f64) {
        (self.pan_x, self.pan_y)
    }

    /// Percentage shown in the toolbar.
    #[allow(clippy::cast_possible_truncation)]
    pub fn zoom_percent(&self) -> i64 {
        (self.zoom * 100.0).round() as i64
    }

    /// Set the zoom without an anchor point. Pan is kept, which is what the
    /// editor page does when the host pushes a new state.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = clamp_zoom(zoom);
    }

    /// Set the zoom keeping the diagram point under `(x, y)` in place.
    pub fn zoom_at(&mut self, zoom: f64, x: f64, y: f64) {
        let old = self.zoom;
        self.zoom = clamp_zoom(zoom);
        let factor = self.zoom / old - 1.0;
        self.pan_x -= (x - self.pan_x) * factor;
        self.pan_y -= (y - self.pan_y) * factor;
    }

    /// One wheel notch; positive `delta_y` zooms out.
    pub fn wheel(&mut self, delta_y: f64, x: f64, y: f64) {
        let step = if delta_y > 0.0 { WHEEL_ZOOM_OUT } else { WHEEL_ZOOM_IN };
        self.zoom_at(self.zoom * step, x, y);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * BUTTON_ZOOM_IN);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom * BUTTON_ZOOM_OUT);
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Back to the fitted baseline.
    pub fn reset(&mut self) {
        *self = Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        };
    }

    /// Where a diagram-space point (relative to the element centre) lands.
    pub fn to_screen(&self, dx: f64, dy: f64) -> (f64, f64) {
        (self.pan_x + self.zoom * dx, self.pan_y + self.zoom * dy)
    }

    /// The diagram-space point under a screen point.
    pub fn to_diagram(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.pan_x) / self.zoom, (y - self.pan_y) / self.zoom)
    }
}
