use siam_shared::RegionKind;

/// Stroke/fill style for one region path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerStyle {
    pub stroke: (u8, u8, u8),
    pub fill: (u8, u8, u8),
    pub line_width: f64,
    pub fill_alpha: f64,
    pub stroke_alpha: f64,
    /// Dash segments in CSS pixels; empty draws a solid line.
    pub dash: &'static [f64],
}

const DEPARTMENT: LayerStyle = LayerStyle {
    stroke: (0x6C, 0x5D, 0xD3),
    fill: (0x6C, 0x5D, 0xD3),
    line_width: 1.0,
    fill_alpha: 0.05,
    stroke_alpha: 1.0,
    dash: &[5.0, 10.0],
};

const PROVINCE: LayerStyle = LayerStyle {
    stroke: (0x57, 0xCC, 0xF2),
    fill: (0x57, 0xCC, 0xF2),
    line_width: 2.0,
    fill_alpha: 0.2,
    stroke_alpha: 1.0,
    dash: &[],
};

const DISTRICT: LayerStyle = LayerStyle {
    stroke: (0xFF, 0x9F, 0x43),
    fill: (0xFF, 0x9F, 0x43),
    line_width: 2.0,
    fill_alpha: 0.35,
    stroke_alpha: 1.0,
    dash: &[],
};

/// Search selection outline.
pub const SELECTED: LayerStyle = LayerStyle {
    stroke: (0, 0, 0),
    fill: (0, 0, 0),
    line_width: 4.0,
    fill_alpha: 0.1,
    stroke_alpha: 1.0,
    dash: &[10.0, 5.0],
};

/// Soft halo drawn under the national border.
pub const BOUNDARY_GLOW: LayerStyle = LayerStyle {
    stroke: (0x3b, 0x82, 0xf6),
    fill: (0x3b, 0x82, 0xf6),
    line_width: 6.0,
    fill_alpha: 0.02,
    stroke_alpha: 0.3,
    dash: &[],
};

pub const BOUNDARY_LINE: LayerStyle = LayerStyle {
    stroke: (0x0f, 0x17, 0x2a),
    fill: (0x0f, 0x17, 0x2a),
    line_width: 2.5,
    fill_alpha: 0.0,
    stroke_alpha: 1.0,
    dash: &[],
};

pub const MAP_BACKGROUND: &str = "#e8eef5";
pub const MARKER_FILL: &str = "#2563eb";

pub fn layer_style(kind: RegionKind, hovered: bool) -> LayerStyle {
    let base = match kind {
        RegionKind::Department => DEPARTMENT,
        RegionKind::Province => PROVINCE,
        RegionKind::District => DISTRICT,
    };
    if !hovered {
        return base;
    }
    let (r, g, b) = darken(base.stroke, 0.88);
    LayerStyle {
        stroke: (r, g, b),
        line_width: base.line_width + 2.0,
        fill_alpha: (base.fill_alpha * 2.0 + 0.05).min(1.0),
        dash: &[],
        ..base
    }
}

/// Format RGBA as a CSS color string.
pub fn rgba_css((r, g, b): (u8, u8, u8), a: f64) -> String {
    format!("rgba({r},{g},{b},{a})")
}

pub fn darken((r, g, b): (u8, u8, u8), factor: f64) -> (u8, u8, u8) {
    let scale = |c: u8| (c as f64 * factor).clamp(0.0, 255.0) as u8;
    (scale(r), scale(g), scale(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn departments_are_dashed_and_others_solid() {
        assert!(!layer_style(RegionKind::Department, false).dash.is_empty());
        assert!(layer_style(RegionKind::Province, false).dash.is_empty());
        assert!(layer_style(RegionKind::District, false).dash.is_empty());
    }

    #[test]
    fn hover_thickens_and_darkens_stroke() {
        let base = layer_style(RegionKind::Province, false);
        let hot = layer_style(RegionKind::Province, true);
        assert!(hot.line_width > base.line_width);
        assert!(hot.fill_alpha > base.fill_alpha);
        assert!(hot.stroke.0 <= base.stroke.0 && hot.stroke.2 <= base.stroke.2);
        assert!(hot.dash.is_empty());
    }

    #[test]
    fn css_color_format() {
        assert_eq!(rgba_css((255, 159, 67), 0.5), "rgba(255,159,67,0.5)");
    }
}
