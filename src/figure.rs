//! Chart objects in Plotly.js's JSON figure schema.
//!
//! Only the attributes the dashboard sets are modelled; everything else is
//! left to Plotly's defaults. Builders are pure: data in, figure out.

use serde::{Deserialize, Serialize};

use crate::{
    quotes::QuoteTable,
    spot::SpotHistory,
    stats::{self, histogram},
};

/// Plotly's qualitative "Vivid" palette.
pub const VIVID: [&str; 11] = [
    "rgb(229, 134, 6)",
    "rgb(93, 105, 177)",
    "rgb(82, 188, 163)",
    "rgb(153, 201, 69)",
    "rgb(204, 97, 176)",
    "rgb(36, 121, 108)",
    "rgb(218, 165, 27)",
    "rgb(47, 138, 196)",
    "rgb(118, 78, 159)",
    "rgb(237, 100, 90)",
    "rgb(165, 170, 153)",
];

pub const TERM_STRUCTURE_TITLE: &str = "VIX Futures Term Structure | Data Collected from CBOE";
pub const HISTOGRAM_BINS: usize = 50;

const SUBPLOT_SPACING: f64 = 0.01;
const ROW_HEIGHTS: [f64; 2] = [0.25, 0.75];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Scatter {
        x: Vec<String>,
        y: Vec<f64>,
        mode: String,
        showlegend: bool,
    },
    /// Horizontal box drawn from precomputed statistics, one entry per box.
    Box {
        y: Vec<String>,
        q1: Vec<f64>,
        median: Vec<f64>,
        q3: Vec<f64>,
        lowerfence: Vec<f64>,
        upperfence: Vec<f64>,
        orientation: String,
        name: String,
        marker: Marker,
        showlegend: bool,
        xaxis: String,
        yaxis: String,
    },
    Bar {
        x: Vec<f64>,
        y: Vec<u64>,
        marker: Marker,
        showlegend: bool,
        xaxis: String,
        yaxis: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub color: Color,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colorscale: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Color {
    Named(String),
    Values(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub xanchor: String,
    pub yanchor: String,
}

impl Title {
    fn centered(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            x: 0.5,
            y: 0.96,
            xanchor: "center".into(),
            yanchor: "top".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub b: u32,
    pub t: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSlider {
    pub visible: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showgrid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showticklabels: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rangeslider: Option<RangeSlider>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub color: String,
    pub width: u32,
    pub dash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    #[serde(rename = "type")]
    pub kind: String,
    pub line: LineStyle,
    pub xref: String,
    pub yref: String,
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

impl Shape {
    /// Vertical line at `x` on axis `xref`, spanning paper heights `0..top`.
    fn vline(x: f64, xref: &str, top: f64, color: &str, dash: &str) -> Self {
        Self {
            kind: "line".into(),
            line: LineStyle {
                color: color.into(),
                width: 3,
                dash: dash.into(),
            },
            xref: xref.into(),
            yref: "paper".into(),
            x0: x,
            x1: x,
            y0: 0.0,
            y1: top,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub x: f64,
    pub y: f64,
    pub xref: String,
    pub yref: String,
    pub text: String,
    pub showarrow: bool,
    pub font: Font,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub title: Title,
    pub font: Font,
    pub height: u32,
    pub margin: Margin,
    pub showlegend: bool,
    pub xaxis: Axis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis2: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis2: Option<Axis>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub shapes: Vec<Shape>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub annotations: Vec<Annotation>,
}

impl Layout {
    fn base(title: Title, height: u32) -> Self {
        Self {
            title,
            font: Font { size: 10 },
            height,
            margin: Margin { l: 25, r: 10, b: 25, t: 50 },
            showlegend: false,
            xaxis: Axis {
                rangeslider: Some(RangeSlider { visible: false }),
                ..Axis::default()
            },
            xaxis2: None,
            yaxis: None,
            yaxis2: None,
            shapes: Vec::new(),
            annotations: Vec::new(),
        }
    }
}

/// Last price against expiration, one point per contract in table order.
pub fn term_structure_figure(table: &QuoteTable) -> Figure {
    let x = table
        .rows
        .iter()
        .map(|r| r.expiration.format("%Y-%m-%d").to_string())
        .collect();

    Figure {
        data: vec![Trace::Scatter {
            x,
            y: table.last_prices(),
            mode: "lines+markers".into(),
            showlegend: false,
        }],
        layout: Layout::base(Title::centered(TERM_STRUCTURE_TITLE), 600),
    }
}

/// Paper-coordinate y domains of the (top, bottom) subplot rows.
fn row_domains() -> ([f64; 2], [f64; 2]) {
    let usable = 1.0 - SUBPLOT_SPACING;
    let top_h = usable * ROW_HEIGHTS[0];
    let bottom_h = usable * ROW_HEIGHTS[1];
    ([1.0 - top_h, 1.0], [0.0, bottom_h])
}

/// Box plot over a 50-bin histogram of the spot series, with a dotted marker
/// at `last` and a dashed one at the series mean.
pub fn distribution_figure(history: &SpotHistory, last: f64) -> Figure {
    let closes = history.closes();
    let hist = histogram(&closes, HISTOGRAM_BINS);
    let (top, bottom) = row_domains();
    let line_top = top[0] - SUBPLOT_SPACING;

    let start = history
        .first()
        .map(|p| p.date.to_string())
        .unwrap_or_default();
    let end = history
        .last()
        .map(|p| p.date.to_string())
        .unwrap_or_default();

    let box_trace = stats::box_stats(&closes).map(|b| Trace::Box {
        y: vec![String::new()],
        q1: vec![b.q1],
        median: vec![b.median],
        q3: vec![b.q3],
        lowerfence: vec![b.lower_whisker],
        upperfence: vec![b.upper_whisker],
        orientation: "h".into(),
        name: String::new(),
        marker: Marker {
            color: Color::Named(VIVID[2].into()),
            colorscale: None,
        },
        showlegend: false,
        xaxis: "x".into(),
        yaxis: "y".into(),
    });
    let bar_trace = Trace::Bar {
        x: hist.edges[..hist.counts.len()].to_vec(),
        y: hist.counts.clone(),
        marker: Marker {
            color: Color::Values(hist.counts.iter().map(|c| *c as f64).collect()),
            colorscale: Some("Viridis".into()),
        },
        showlegend: false,
        xaxis: "x2".into(),
        yaxis: "y2".into(),
    };

    let mut shapes = vec![Shape::vline(last, "x2", line_top, VIVID[VIVID.len() - 4], "dot")];
    if let Some(m) = stats::mean(&closes) {
        shapes.push(Shape::vline(m, "x2", line_top, VIVID[VIVID.len() - 2], "dash"));
    }

    let mut layout = Layout::base(
        Title::centered(format!("Spot-VIX, From {start} To {end}")),
        400,
    );
    layout.xaxis = Axis {
        anchor: Some("y".into()),
        matches: Some("x2".into()),
        showgrid: Some(false),
        showticklabels: Some(false),
        rangeslider: Some(RangeSlider { visible: false }),
        ..Axis::default()
    };
    layout.xaxis2 = Some(Axis {
        anchor: Some("y2".into()),
        showgrid: Some(false),
        ..Axis::default()
    });
    layout.yaxis = Some(Axis {
        domain: Some(top),
        anchor: Some("x".into()),
        ..Axis::default()
    });
    layout.yaxis2 = Some(Axis {
        domain: Some(bottom),
        anchor: Some("x2".into()),
        ..Axis::default()
    });
    layout.shapes = shapes;
    layout.annotations = vec![Annotation {
        x: last * 1.25,
        y: hist.max_count() as f64 * 0.75,
        xref: "x2".into(),
        yref: "y2".into(),
        text: format!("Last Spot-VIX: {last}"),
        showarrow: false,
        font: Font { size: 12 },
    }];

    Figure {
        data: box_trace.into_iter().chain([bar_trace]).collect(),
        layout,
    }
}
