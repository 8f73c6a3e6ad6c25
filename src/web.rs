//! Browser bindings
//!
//! Wires the auto-refresh controller to the dashboard's `#autoRefreshToggle`
//! checkbox and `#liveIndicator` badge, and exposes `exportTableToCSV` and
//! `downloadCSV` to page scripts (the Export buttons call them).

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use gloo_timers::callback::{Interval, Timeout};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    console, Blob, BlobPropertyBag, Document, Element, HtmlAnchorElement, HtmlElement,
    HtmlInputElement, Url,
};

use crate::export::{self, CsvDownload, DownloadSink, TableRows, TableSource, CSV_MIME};
use crate::refresh::{AutoRefreshController, Indicator, RefreshTimer, HIDDEN_CLASS};

pub const TOGGLE_ID: &str = "autoRefreshToggle";
pub const INDICATOR_ID: &str = "liveIndicator";

/// Delay before a download's object URL is released
const REVOKE_DELAY_MS: u32 = 1000;

fn document() -> Option<Document> {
    web_sys::window()?.document()
}

fn js_error(err: JsValue) -> anyhow::Error {
    anyhow!("{}", err.as_string().unwrap_or_else(|| format!("{:?}", err)))
}

fn report(context: &str, err: &anyhow::Error) {
    console::error_1(&JsValue::from_str(&format!("{}: {:#}", context, err)));
}

/// Live badge shown by removing its hidden class
pub struct ClassListIndicator {
    element: Element,
}

impl ClassListIndicator {
    pub fn new(element: Element) -> Self {
        Self { element }
    }
}

impl Indicator for ClassListIndicator {
    fn show(&mut self) {
        if let Err(err) = self.element.class_list().remove_1(HIDDEN_CLASS) {
            console::error_1(&err);
        }
    }

    fn hide(&mut self) {
        if let Err(err) = self.element.class_list().add_1(HIDDEN_CLASS) {
            console::error_1(&err);
        }
    }
}

/// Interval that reloads the whole page on every tick
pub struct PageReloadTimer;

impl RefreshTimer for PageReloadTimer {
    type Handle = Interval;

    fn schedule(&mut self, period: Duration) -> Interval {
        let millis = u32::try_from(period.as_millis()).unwrap_or(u32::MAX);
        Interval::new(millis, || {
            if let Some(window) = web_sys::window() {
                if let Err(err) = window.location().reload() {
                    console::error_1(&err);
                }
            }
        })
    }

    fn cancel(&mut self, handle: Interval) {
        // Dropping a gloo interval clears it
        drop(handle);
    }
}

/// Bind the toggle once the DOM is ready
#[wasm_bindgen(start)]
pub fn start() {
    let Some(document) = document() else {
        return;
    };

    if document.ready_state() != "loading" {
        bind_auto_refresh(&document);
        return;
    }

    let ready = Closure::once(move || {
        if let Some(document) = self::document() {
            bind_auto_refresh(&document);
        }
    });
    if let Err(err) =
        document.add_event_listener_with_callback("DOMContentLoaded", ready.as_ref().unchecked_ref())
    {
        console::error_1(&err);
    }
    ready.forget();
}

fn bind_auto_refresh(document: &Document) {
    let toggle = document
        .get_element_by_id(TOGGLE_ID)
        .and_then(|el| el.dyn_into::<HtmlInputElement>().ok());
    let Some(toggle) = toggle else {
        return;
    };
    let indicator = document
        .get_element_by_id(INDICATOR_ID)
        .map(ClassListIndicator::new);

    let Some(controller) =
        AutoRefreshController::attach(Some(toggle.checked()), indicator, PageReloadTimer)
    else {
        return;
    };
    let controller = Rc::new(RefCell::new(controller));

    let input = toggle.clone();
    let on_change = Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
        controller.borrow_mut().on_toggle_change(input.checked());
    });
    if let Err(err) =
        toggle.add_event_listener_with_callback("change", on_change.as_ref().unchecked_ref())
    {
        console::error_1(&err);
    }
    // The listener lives as long as the page
    on_change.forget();
}

/// The live document's tables
pub struct DomTables {
    document: Document,
}

impl DomTables {
    pub fn new(document: Document) -> Self {
        Self { document }
    }
}

impl TableSource for DomTables {
    fn table_rows(&self) -> Result<TableRows> {
        let rows = self
            .document
            .query_selector_all("table tr")
            .map_err(js_error)?;

        let mut table = Vec::with_capacity(rows.length() as usize);
        for i in 0..rows.length() {
            let Some(row) = rows.item(i).and_then(|n| n.dyn_into::<Element>().ok()) else {
                continue;
            };
            let cells = row.query_selector_all("td, th").map_err(js_error)?;
            let mut texts = Vec::with_capacity(cells.length() as usize);
            for j in 0..cells.length() {
                if let Some(cell) = cells.item(j).and_then(|n| n.dyn_into::<HtmlElement>().ok()) {
                    texts.push(cell.inner_text());
                }
            }
            table.push(texts);
        }
        Ok(table)
    }
}

/// Saves downloads through a hidden anchor and an object URL
pub struct BrowserDownload {
    document: Document,
}

impl BrowserDownload {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    fn trigger(&self, download: &CsvDownload) -> std::result::Result<(), JsValue> {
        let parts = js_sys::Array::of1(&JsValue::from_str(&download.content));
        let options = BlobPropertyBag::new();
        options.set_type(CSV_MIME);
        let blob = Blob::new_with_str_sequence_and_options(&parts, &options)?;
        let url = Url::create_object_url_with_blob(&blob)?;

        let anchor = self
            .document
            .create_element("a")?
            .dyn_into::<HtmlAnchorElement>()
            .map_err(JsValue::from)?;
        anchor.set_download(&download.filename);
        anchor.set_href(&url);
        anchor.style().set_property("display", "none")?;

        let body = self
            .document
            .body()
            .ok_or_else(|| JsValue::from_str("document has no body"))?;
        body.append_child(&anchor)?;
        anchor.click();
        anchor.remove();

        Timeout::new(REVOKE_DELAY_MS, move || {
            let _ = Url::revoke_object_url(&url);
        })
        .forget();
        Ok(())
    }
}

impl DownloadSink for BrowserDownload {
    fn deliver(&mut self, download: CsvDownload) -> Result<()> {
        self.trigger(&download).map_err(js_error)
    }
}

/// Export every table on the page as `filename`
#[wasm_bindgen(js_name = exportTableToCSV)]
pub fn export_table_to_csv(filename: &str) {
    let Some(document) = document() else {
        return;
    };
    let source = DomTables::new(document.clone());
    let mut sink = BrowserDownload::new(document);
    if let Err(err) = export::export_table_to_csv(&source, filename, &mut sink) {
        report("CSV export failed", &err);
    }
}

/// Offer already-built CSV text as a download
#[wasm_bindgen(js_name = downloadCSV)]
pub fn download_csv(csv: &str, filename: &str) {
    let Some(document) = document() else {
        return;
    };
    let mut sink = BrowserDownload::new(document);
    if let Err(err) = export::download_csv(csv, filename, &mut sink) {
        report("CSV download failed", &err);
    }
}
