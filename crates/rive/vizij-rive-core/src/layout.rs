//! Layout: how artboard content is fitted into a rectangle on the target surface.

use serde::{Deserialize, Serialize};

use crate::surface::Surface;

/// How content scales into the layout bounds.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Fit {
    Cover,
    #[default]
    Contain,
    Fill,
    FitWidth,
    FitHeight,
    None,
    ScaleDown,
}

/// Where content sits inside the layout bounds once fitted.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Alignment {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    #[default]
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl Alignment {
    /// Normalized (x, y) anchor in [-1, 1].
    pub fn anchor(self) -> (f32, f32) {
        match self {
            Self::TopLeft => (-1.0, -1.0),
            Self::TopCenter => (0.0, -1.0),
            Self::TopRight => (1.0, -1.0),
            Self::CenterLeft => (-1.0, 0.0),
            Self::Center => (0.0, 0.0),
            Self::CenterRight => (1.0, 0.0),
            Self::BottomLeft => (-1.0, 1.0),
            Self::BottomCenter => (0.0, 1.0),
            Self::BottomRight => (1.0, 1.0),
        }
    }
}

/// Layout rectangle in surface pixels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Whole-surface bounds.
    pub fn of_surface(surface: &dyn Surface) -> Self {
        Self::new(0.0, 0.0, surface.width() as f32, surface.height() as f32)
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

/// Fit, alignment, and optional explicit bounds.
///
/// Without explicit bounds the player resolves them to the full surface each time a
/// file finishes loading.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub fit: Fit,
    #[serde(default)]
    pub alignment: Alignment,
    #[serde(flatten)]
    pub bounds: Option<Bounds>,
}

impl Layout {
    pub fn new(fit: Fit, alignment: Alignment) -> Self {
        Self {
            fit,
            alignment,
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Explicit bounds win; otherwise take the surface's current pixel size.
    pub fn resolve(&self, surface: &dyn Surface) -> Layout {
        Layout {
            bounds: Some(self.bounds.unwrap_or_else(|| Bounds::of_surface(surface))),
            ..*self
        }
    }

    /// Scale factors (x, y) that fit `content` (width, height) into these bounds.
    /// Returns `None` until bounds have been resolved.
    pub fn scale_for(&self, content: (f32, f32)) -> Option<(f32, f32)> {
        let bounds = self.bounds?;
        let (cw, ch) = content;
        if cw <= 0.0 || ch <= 0.0 {
            return Some((1.0, 1.0));
        }
        let sx = bounds.width() / cw;
        let sy = bounds.height() / ch;
        let scale = match self.fit {
            Fit::Fill => return Some((sx, sy)),
            Fit::Contain => sx.min(sy),
            Fit::Cover => sx.max(sy),
            Fit::FitWidth => sx,
            Fit::FitHeight => sy,
            Fit::None => 1.0,
            Fit::ScaleDown => sx.min(sy).min(1.0),
        };
        Some((scale, scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::Canvas;

    #[test]
    fn unbounded_layout_takes_surface_size() {
        let canvas = Canvas::new(400, 300);
        let layout = Layout::default().resolve(&canvas);
        assert_eq!(layout.bounds, Some(Bounds::new(0.0, 0.0, 400.0, 300.0)));
        assert_eq!(layout.fit, Fit::Contain);
        assert_eq!(layout.alignment, Alignment::Center);
    }

    #[test]
    fn explicit_bounds_survive_resolution() {
        let canvas = Canvas::new(400, 300);
        let explicit = Bounds::new(10.0, 20.0, 110.0, 220.0);
        let layout = Layout::new(Fit::Cover, Alignment::TopLeft)
            .with_bounds(explicit)
            .resolve(&canvas);
        assert_eq!(layout.bounds, Some(explicit));
        assert_eq!(layout.alignment.anchor(), (-1.0, -1.0));
    }

    #[test]
    fn fit_modes_scale_content() {
        let layout = Layout::default().with_bounds(Bounds::new(0.0, 0.0, 400.0, 300.0));
        assert_eq!(layout.scale_for((200.0, 200.0)), Some((1.5, 1.5)));

        let cover = Layout::new(Fit::Cover, Alignment::Center).with_bounds(layout.bounds.unwrap());
        assert_eq!(cover.scale_for((200.0, 200.0)), Some((2.0, 2.0)));

        let fill = Layout::new(Fit::Fill, Alignment::Center).with_bounds(layout.bounds.unwrap());
        assert_eq!(fill.scale_for((200.0, 100.0)), Some((2.0, 3.0)));

        let down = Layout::new(Fit::ScaleDown, Alignment::Center).with_bounds(layout.bounds.unwrap());
        assert_eq!(down.scale_for((100.0, 100.0)), Some((1.0, 1.0)));

        assert_eq!(Layout::default().scale_for((1.0, 1.0)), None);
    }

    #[test]
    fn bounds_serialize_with_min_max_names() {
        let layout = Layout::default().with_bounds(Bounds::new(0.0, 0.0, 400.0, 300.0));
        let json = serde_json::to_value(layout).unwrap();
        assert_eq!(json["maxX"], 400.0);
        assert_eq!(json["maxY"], 300.0);
        assert_eq!(json["fit"], "contain");
        let back: Layout = serde_json::from_value(json).unwrap();
        assert_eq!(back, layout);
    }
}
