//! Scrape VIX futures quotes from an exchange's delayed-quote page and build a
//! term-structure dashboard from them.
//!
//! The flow is linear and blocking: [`fetch`] pulls the page, [`html`] flattens
//! the quote table's cells, [`quotes`] turns them into typed rows, and
//! [`figure`]/[`page`] build the charts and layout. [`pipeline`] runs the whole
//! thing once; [`dashboard`] serves it.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod fetch;
pub mod figure;
pub mod html;
pub mod page;
pub mod pipeline;
pub mod quotes;
pub mod spot;
pub mod stats;
