use serde::Serialize;

use crate::{
    figure::{distribution_figure, term_structure_figure, Figure},
    quotes::QuoteTable,
    spot::{SpotHistory, SpotMetric},
};

const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub label: String,
    pub value: String,
}

impl From<&SpotMetric> for Card {
    fn from(m: &SpotMetric) -> Self {
        Self {
            label: m.name.clone(),
            value: format!("{:.2}", m.value),
        }
    }
}

/// Plotly `config` object passed alongside each figure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    pub responsive: bool,
    pub display_mode_bar: bool,
    #[serde(rename = "displaylogo")]
    pub display_logo: bool,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            responsive: true,
            display_mode_bar: true,
            display_logo: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub id: String,
    pub figure: Figure,
    pub config: ChartConfig,
}

/// Everything one render shows: navbar brand, metric cards, then charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub brand: String,
    pub cards: Vec<Card>,
    pub charts: Vec<Chart>,
}

pub fn build_page(
    brand: &str,
    table: &QuoteTable,
    metrics: &[SpotMetric],
    history: Option<&SpotHistory>,
) -> Page {
    let mut charts = vec![Chart {
        id: "main_chart".into(),
        figure: term_structure_figure(table),
        config: ChartConfig::default(),
    }];

    if let Some(h) = history {
        if let Some(last) = h.last() {
            charts.push(Chart {
                id: "spot_distribution".into(),
                figure: distribution_figure(h, last.close),
                config: ChartConfig::default(),
            });
        }
    }

    Page {
        brand: brand.to_string(),
        cards: metrics.iter().map(Card::from).collect(),
        charts,
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// JSON safe to inline in a `<script>` element.
fn script_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

pub fn render_html(page: &Page) -> Result<String, serde_json::Error> {
    let brand = escape_html(&page.brand);

    let cards: String = page
        .cards
        .iter()
        .map(|c| {
            format!(
                r#"<div class="card"><div class="lbl">{}</div><div class="val">{}</div></div>"#,
                escape_html(&c.label),
                escape_html(&c.value)
            )
        })
        .collect();
    let cards_row = if cards.is_empty() {
        String::new()
    } else {
        format!(r#"<div class="cards">{cards}</div>"#)
    };

    let mut containers = String::new();
    let mut scripts = String::new();
    for chart in &page.charts {
        let id = escape_html(&chart.id);
        containers.push_str(&format!(
            r#"<div class="pretty_container"><div id="{id}"></div></div>"#
        ));
        scripts.push_str(&format!(
            "(function() {{ const f = {fig}; Plotly.newPlot(\"{id}\", f.data, f.layout, {cfg}); }})();\n",
            fig = script_json(&chart.figure)?,
            cfg = script_json(&chart.config)?,
        ));
    }

    Ok(format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{brand}</title>
    <script src="{PLOTLY_JS}"></script>
    <style>
      * {{ box-sizing: border-box; }}
      body {{ margin: 0; font-family: ui-sans-serif, system-ui, -apple-system, Segoe UI, Roboto, Helvetica, Arial; background: #f8f9fa; }}
      .navbar {{ position: sticky; top: 0; z-index: 10; background: #343a40; padding: 10px 18px; }}
      .navbar .brand {{ color: #fff; font-size: 20px; font-weight: 600; }}
      .main_chart {{ max-width: 1280px; margin: 0 auto; padding: 18px; }}
      .cards {{ display: flex; gap: 14px; flex-wrap: wrap; margin-bottom: 14px; }}
      .card {{ flex: 1 1 160px; background: #fff; border: 1px solid #dee2e6; border-radius: 8px; padding: 12px 14px; }}
      .card .lbl {{ color: #6c757d; font-size: 12px; }}
      .card .val {{ font-size: 24px; font-weight: 700; margin-top: 4px; }}
      .pretty_container {{ background: #fff; border-radius: 8px; margin-bottom: 14px; padding: 10px; box-shadow: 2px 2px 2px lightgrey; }}
    </style>
  </head>
  <body>
    <nav class="navbar"><span class="brand">{brand}</span></nav>
    <br />
    <div class="main_chart">
      {cards_row}
      {containers}
    </div>
    <script>
{scripts}    </script>
  </body>
</html>
"#
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spot::HistoryPoint;
    use chrono::NaiveDate;

    fn history() -> SpotHistory {
        SpotHistory {
            points: vec![
                HistoryPoint {
                    date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                    close: 13.2,
                },
                HistoryPoint {
                    date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                    close: 14.04,
                },
            ],
        }
    }

    #[test]
    fn page_without_history_has_only_the_term_structure() {
        let page = build_page("Wango Contango", &QuoteTable::default(), &[], None);
        assert_eq!(page.charts.len(), 1);
        assert_eq!(page.charts[0].id, "main_chart");
        assert!(page.cards.is_empty());
    }

    #[test]
    fn cards_keep_metric_order() {
        let metrics = vec![
            SpotMetric { name: "VIX".into(), value: 14.5 },
            SpotMetric { name: "VIX9D".into(), value: 12.346 },
        ];
        let h = history();
        let page = build_page("Wango Contango", &QuoteTable::default(), &metrics, Some(&h));
        assert_eq!(
            page.cards,
            vec![
                Card { label: "VIX".into(), value: "14.50".into() },
                Card { label: "VIX9D".into(), value: "12.35".into() },
            ]
        );
        assert_eq!(page.charts.len(), 2);
        assert_eq!(page.charts[1].id, "spot_distribution");
    }

    #[test]
    fn empty_history_adds_no_distribution() {
        let empty = SpotHistory::default();
        let page = build_page("x", &QuoteTable::default(), &[], Some(&empty));
        assert_eq!(page.charts.len(), 1);
    }

    #[test]
    fn chart_config_matches_plotly_keys() {
        let v = serde_json::to_value(ChartConfig::default()).unwrap();
        assert_eq!(v["responsive"], true);
        assert_eq!(v["displayModeBar"], true);
        assert_eq!(v["displaylogo"], false);
    }

    #[test]
    fn html_embeds_each_chart_and_escapes_text() {
        let metrics = vec![SpotMetric { name: "<VIX>".into(), value: 14.0 }];
        let page = build_page("Wango & Co", &QuoteTable::default(), &metrics, None);
        let html = render_html(&page).unwrap();
        assert!(html.contains("<title>Wango &amp; Co</title>"));
        assert!(html.contains("&lt;VIX&gt;"));
        assert!(html.contains(r#"<div id="main_chart"></div>"#));
        assert!(html.contains("Plotly.newPlot(\"main_chart\""));
        assert!(html.contains(PLOTLY_JS));
    }

    #[test]
    fn script_json_cannot_close_the_script_tag() {
        let s = script_json(&"</script><b>").unwrap();
        assert!(!s.contains("</script>"));
    }
}
