use std::{fs::File, io::BufReader};

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Serialize;

use crate::{
    config::Settings,
    fetch::{build_client, fetch_page},
    html::table_cells,
    page::{build_page, Page},
    quotes::{normalize, NormalizeOptions, QuoteTable},
    spot::{spot_metrics, SpotHistory, SpotMetric},
};

/// Result of one full scrape: the data and the page built from it.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub quotes: QuoteTable,
    pub metrics: Vec<SpotMetric>,
    pub history: Option<SpotHistory>,
    pub page: Page,
}

/// Fetch → normalize → present, recomputed from scratch on every call.
pub struct Pipeline {
    settings: Settings,
    client: Client,
}

impl Pipeline {
    pub fn new(settings: Settings) -> Result<Self> {
        let client = build_client(&settings)?;
        Ok(Self { settings, client })
    }

    pub fn fetch_quotes(&self) -> Result<QuoteTable> {
        let s = &self.settings;
        let html = fetch_page(&self.client, &s.futures_url)?;
        let cells = table_cells(&html, s.futures_table_index)
            .with_context(|| format!("futures table #{} on {}", s.futures_table_index, s.futures_url))?;
        let opts = NormalizeOptions {
            drop_untraded_front: s.drop_untraded_front,
        };
        Ok(normalize(&cells, opts).context("normalize futures quotes")?)
    }

    fn fetch_spot(&self) -> Result<Vec<SpotMetric>> {
        let s = &self.settings;
        let Some(url) = s.spot_url.as_deref() else {
            return Ok(Vec::new());
        };
        let html = fetch_page(&self.client, url)?;
        let cells = table_cells(&html, s.spot_table_index)
            .with_context(|| format!("spot table #{} on {}", s.spot_table_index, url))?;
        Ok(spot_metrics(&cells, &s.spot_symbols)?)
    }

    fn load_history(&self) -> Result<Option<SpotHistory>> {
        let Some(path) = self.settings.spot_history_path.as_deref() else {
            return Ok(None);
        };
        let file = File::open(path).with_context(|| format!("open spot history {path}"))?;
        let history = SpotHistory::parse_from_reader(BufReader::new(file))
            .with_context(|| format!("parse spot history {path}"))?;
        log::info!("history.loaded path={} points={}", path, history.points.len());
        Ok(Some(history))
    }

    pub fn run(&self) -> Result<Dashboard> {
        let quotes = self.fetch_quotes()?;
        let mut metrics = self.fetch_spot()?;
        let history = self.load_history()?;

        if let Some(h) = &history {
            if !metrics.iter().any(|m| m.name.eq_ignore_ascii_case("VIX")) {
                if let Some(m) = SpotMetric::latest("VIX", h) {
                    metrics.insert(0, m);
                }
            }
        }

        let page = build_page(&self.settings.dashboard_title, &quotes, &metrics, history.as_ref());
        log::info!(
            "pipeline.done contracts={} metrics={} charts={}",
            quotes.len(),
            metrics.len(),
            page.charts.len()
        );
        Ok(Dashboard {
            quotes,
            metrics,
            history,
            page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::FetchError, quotes::QuoteRow};
    use axum::{http::StatusCode, response::Html, routing::get, Router};
    use chrono::NaiveDate;
    use std::net::SocketAddr;

    const FUTURES_PAGE: &str = r#"<html><body>
      <table class="nav"><tr><td>Quotes</td><td>Options</td></tr></table>
      <table class="banner"><tr><td>Delayed 15 minutes</td></tr></table>
      <table class="vx">
        <tr><th>Symbol</th><th>Expiration</th><th>Last</th><th>Change</th><th>High</th>
            <th>Low</th><th>Settlement</th><th>Volume</th><th>Open Int</th></tr>
        <tr><td>VX02/F4</td><td>01/10/2024</td><td>13.10</td><td>0.00</td><td>13.20</td>
            <td>13.00</td><td>13.05</td><td>310</td><td>1,020</td></tr>
        <tr><td><a href="/vx/f4">VX/F4</a></td><td>01/17/2024</td><td>13.55</td><td>-0.10</td><td>13.80</td>
            <td>13.40</td><td>13.65</td><td>45,210</td><td>101,334</td></tr>
        <tr><td>VX/G4</td><td>02/14/2024</td><td>14.60</td><td>+0.05</td><td>14.75</td>
            <td>14.50</td><td>14.55</td><td>12,004</td><td>88,901</td></tr>
        <tr><td>VX/H4</td><td>03/20/2024</td><td>0</td><td>0</td><td>0</td>
            <td>0</td><td>15.30</td><td>0</td><td>1,200</td></tr>
      </table>
    </body></html>"#;

    const SPOT_PAGE: &str = r#"<table><tr><td>VIX</td><td>13.20</td></tr>
      <tr><td>VIX9D</td><td>11.90</td></tr></table>"#;

    async fn serve_mock() -> SocketAddr {
        let app = Router::new()
            .route("/futures", get(|| async { Html(FUTURES_PAGE) }))
            .route("/spot", get(|| async { Html(SPOT_PAGE) }))
            .route("/down", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn settings_for(addr: SocketAddr) -> Settings {
        Settings {
            futures_url: format!("http://{addr}/futures"),
            futures_table_index: 2,
            http_no_proxy: true,
            ..Settings::default()
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn scrapes_mock_page_into_exact_rows() {
        let addr = serve_mock().await;
        let settings = settings_for(addr);

        let dash = tokio::task::spawn_blocking(move || Pipeline::new(settings)?.run())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            dash.quotes.rows,
            vec![
                QuoteRow {
                    symbol: "VX/F4".into(),
                    expiration: date(2024, 1, 17),
                    last: 13.55,
                    change: -0.10,
                    high: 13.80,
                    low: 13.40,
                    settlement: 13.65,
                    volume: 45_210,
                    open_interest: 101_334,
                },
                QuoteRow {
                    symbol: "VX/G4".into(),
                    expiration: date(2024, 2, 14),
                    last: 14.60,
                    change: 0.05,
                    high: 14.75,
                    low: 14.50,
                    settlement: 14.55,
                    volume: 12_004,
                    open_interest: 88_901,
                },
            ]
        );
        assert!(dash.metrics.is_empty());
        assert!(dash.history.is_none());
        assert_eq!(dash.page.charts.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn spot_cards_and_history_join_the_page() {
        let addr = serve_mock().await;
        let path = std::env::temp_dir().join(format!("contango-history-{}.csv", std::process::id()));
        std::fs::write(&path, "Date,Close\n2024-01-02,13.20\n2024-01-03,14.04\n").unwrap();

        let settings = Settings {
            spot_url: Some(format!("http://{addr}/spot")),
            spot_history_path: Some(path.to_string_lossy().into_owned()),
            ..settings_for(addr)
        };
        let dash = tokio::task::spawn_blocking(move || Pipeline::new(settings)?.run())
            .await
            .unwrap()
            .unwrap();
        std::fs::remove_file(&path).ok();

        let names: Vec<_> = dash.metrics.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["VIX", "VIX9D"]);
        assert_eq!(dash.metrics[0].value, 13.20);
        assert_eq!(dash.page.cards.len(), 2);
        assert_eq!(dash.page.charts.len(), 2);
        assert_eq!(dash.history.unwrap().points.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn history_supplies_vix_when_no_spot_page() {
        let addr = serve_mock().await;
        let path = std::env::temp_dir().join(format!("contango-vix-{}.csv", std::process::id()));
        std::fs::write(&path, "2024-01-02,13.20\n2024-01-03,14.04\n").unwrap();

        let settings = Settings {
            spot_history_path: Some(path.to_string_lossy().into_owned()),
            ..settings_for(addr)
        };
        let dash = tokio::task::spawn_blocking(move || Pipeline::new(settings)?.run())
            .await
            .unwrap()
            .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(dash.metrics, vec![SpotMetric { name: "VIX".into(), value: 14.04 }]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn non_2xx_status_propagates() {
        let addr = serve_mock().await;
        let settings = Settings {
            futures_url: format!("http://{addr}/down"),
            ..settings_for(addr)
        };
        let err = tokio::task::spawn_blocking(move || Pipeline::new(settings)?.run())
            .await
            .unwrap()
            .unwrap_err();
        match err.downcast_ref::<FetchError>() {
            Some(FetchError::Status { status, .. }) => assert_eq!(*status, 503),
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn wrong_table_index_is_a_parse_error() {
        let addr = serve_mock().await;
        let settings = Settings {
            futures_table_index: 9,
            ..settings_for(addr)
        };
        let err = tokio::task::spawn_blocking(move || Pipeline::new(settings)?.run())
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<crate::error::ParseError>(),
            Some(&crate::error::ParseError::TableNotFound { index: 9, found: 3 })
        );
    }
}
