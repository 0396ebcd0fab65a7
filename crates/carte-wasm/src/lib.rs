//! WASM bridge for Carte: embeds the map editor in a host form.
//!
//! Compiled via `wasm-pack build --target web`. The hosting page owns the
//! map and the draw control; it forwards draw events here and this crate
//! keeps the hidden `[data-feature-collection-id="<id>"]` input in sync.

mod dom;

use carte_core::FeatureCollection;
use carte_editor::search::{Address, SearchOutcome, SearchStep, SearchTicket, parse_search_response};
use carte_editor::session::{ApplyReport, DrawEventKind};
use carte_editor::{EditorConfig, FieldSelector, MapEditor, SearchError};
use dom::{DomFormField, JsDrawSurface};
use wasm_bindgen::prelude::*;

/// The JS-facing editor for one map field.
#[wasm_bindgen]
pub struct CarteEditor {
    editor: MapEditor,
    /// Last fetch handed to the host; older generations are stale.
    pending: Option<SearchTicket>,
    /// Results currently listed under the search input.
    results: Vec<Address>,
}

#[wasm_bindgen]
impl CarteEditor {
    /// Mount on the collection supplied by the page. `record_id` is the value
    /// of the hidden input's `data-feature-collection-id` attribute.
    #[wasm_bindgen(constructor)]
    pub fn new(
        feature_collection: &str,
        record_id: &str,
        config: Option<String>,
    ) -> Result<CarteEditor, JsValue> {
        console_error_panic_hook_setup();

        let config = match config.as_deref() {
            Some(json) => EditorConfig::from_json(json).map_err(to_js_error)?,
            None => EditorConfig::default(),
        };
        let initial = FeatureCollection::parse(feature_collection).map_err(to_js_error)?;
        let mut editor = MapEditor::new(config, initial);

        let selector = FieldSelector::for_record(record_id);
        editor.attach_field(DomFormField::new(&selector), selector);

        Ok(Self {
            editor,
            pending: None,
            results: Vec::new(),
        })
    }

    // ─── Draw events ─────────────────────────────────────────────────────

    /// `draw.create` handler. Takes the event body `{"features":[...]}` and
    /// returns `{"applied":[ids],"rejected":[messages]}`.
    pub fn on_draw_create(&mut self, event: &str) -> Result<String, JsValue> {
        self.apply(DrawEventKind::Create, event)
    }

    pub fn on_draw_update(&mut self, event: &str) -> Result<String, JsValue> {
        self.apply(DrawEventKind::Update, event)
    }

    pub fn on_draw_delete(&mut self, event: &str) -> Result<String, JsValue> {
        self.apply(DrawEventKind::Delete, event)
    }

    /// Push persisted selections into the draw control (anything with an
    /// `add(feature) -> string[]` method). Returns how many were added.
    pub fn map_ready(&mut self, draw: JsValue) -> Result<usize, JsValue> {
        let mut surface = JsDrawSurface::new(draw);
        let seeded = self.editor.map_ready(&mut surface).map_err(to_js_error)?;
        log::debug!("seeded draw control with {} selections", seeded.len());
        Ok(seeded.len())
    }

    /// Current value of the form field.
    pub fn feature_collection(&self) -> String {
        self.editor.field_value()
    }

    /// Which draw tools to enable: `{"point":true,...}`.
    pub fn draw_controls(&self) -> String {
        serde_json::to_string(&self.editor.config().draw_controls).unwrap_or_else(|_| "{}".into())
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    /// `{"center":[lon,lat],"zoom":z,"style":"ortho","styleUrl":..,"switchLabel":..}`
    pub fn viewport(&self) -> String {
        let vp = &self.editor.viewport;
        serde_json::json!({
            "center": vp.state().center,
            "zoom": vp.state().zoom,
            "style": vp.style(),
            "styleUrl": vp.style_url(),
            "switchLabel": vp.switch_label(),
        })
        .to_string()
    }

    /// Returns the new style name.
    pub fn toggle_base_style(&mut self) -> String {
        self.editor.viewport.toggle_base_style().as_str().to_string()
    }

    /// One-shot bounds to frame: `{"bbox":[..],"padding":n}` or `null`.
    pub fn take_fit_bounds(&mut self) -> String {
        match self.editor.viewport.take_fit_bounds() {
            Some(fit) => serde_json::to_string(&fit).unwrap_or_else(|_| "null".into()),
            None => "null".to_string(),
        }
    }

    // ─── Address search ──────────────────────────────────────────────────

    /// Start a search as the user types. Returns one of
    /// `{"status":"idle"}`, `{"status":"ready","results":[..]}` or
    /// `{"status":"fetch","generation":n,"url":".."}`; for `fetch` the host
    /// calls `resolve_search` or `fail_search` with the same generation.
    pub fn search(&mut self, term: &str) -> String {
        match self.editor.search.query(term) {
            SearchStep::Idle => {
                self.pending = None;
                self.results.clear();
                r#"{"status":"idle"}"#.to_string()
            }
            SearchStep::Ready(results) => {
                self.pending = None;
                self.results = results;
                serde_json::json!({ "status": "ready", "results": self.result_rows() }).to_string()
            }
            SearchStep::Fetch(request) => {
                let query = String::from(js_sys::encode_uri_component(&request.query));
                let url = format!("{}?q={query}&limit={}", request.endpoint, request.limit);
                let generation = request.ticket.generation();
                self.pending = Some(request.ticket);
                serde_json::json!({ "status": "fetch", "generation": generation, "url": url })
                    .to_string()
            }
        }
    }

    /// Deliver the geocoder's response body. Returns `null` when the result is
    /// stale, otherwise the same shape as a `ready` search, or
    /// `{"status":"error","message":..}` if the body is unreadable.
    pub fn resolve_search(&mut self, generation: u32, body: &str) -> String {
        let parsed = serde_json::from_str::<serde_json::Value>(body)
            .map_err(|e| SearchError::Decode(e.to_string()))
            .and_then(|value| parse_search_response(&value));
        self.finish_search(generation, parsed)
    }

    /// Report a failed request (network error or non-2xx status).
    pub fn fail_search(&mut self, generation: u32, message: &str) -> String {
        self.finish_search(generation, Err(SearchError::Network(message.to_string())))
    }

    /// The user picked the result at `index` of the last listing.
    pub fn select_result(&mut self, index: usize) -> bool {
        match self.results.get(index) {
            Some(address) => {
                let address = address.clone();
                self.editor.select_address(&address);
                true
            }
            None => false,
        }
    }

    // ─── Internals ───────────────────────────────────────────────────────

    fn apply(&mut self, kind: DrawEventKind, event: &str) -> Result<String, JsValue> {
        let payload: serde_json::Value = serde_json::from_str(event).map_err(to_js_error)?;
        let report = self.editor.session.apply_json(kind, &payload);
        Ok(report_json(&report))
    }

    fn finish_search(
        &mut self,
        generation: u32,
        result: Result<Vec<Address>, SearchError>,
    ) -> String {
        let Some(ticket) = self
            .pending
            .take_if(|ticket| ticket.generation() == u64::from(generation))
        else {
            return "null".to_string();
        };
        match self.editor.search.resolve(&ticket, result) {
            None => "null".to_string(),
            Some(SearchOutcome::Results(results)) => {
                self.results = results;
                serde_json::json!({ "status": "ready", "results": self.result_rows() }).to_string()
            }
            Some(SearchOutcome::Failed(e)) => {
                self.results.clear();
                serde_json::json!({ "status": "error", "message": e.to_string() }).to_string()
            }
        }
    }

    fn result_rows(&self) -> Vec<serde_json::Value> {
        self.results
            .iter()
            .map(|a| serde_json::json!({ "label": a.label(), "coordinates": a.coordinates }))
            .collect()
    }
}

fn report_json(report: &ApplyReport) -> String {
    let applied: Vec<&str> = report.applied.iter().map(|id| id.as_str()).collect();
    let rejected: Vec<String> = report.rejected.iter().map(ToString::to_string).collect();
    serde_json::json!({ "applied": applied, "rejected": rejected }).to_string()
}

fn to_js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

// ─── Standalone validation (no map needed) ───────────────────────────────

/// Check a stored field value before mounting an editor on it. Returns JSON
/// `{"ok":true,"selections":n,"references":n,"skipped":n}` or
/// `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate(feature_collection: &str) -> String {
    validation_json(feature_collection).to_string()
}

fn validation_json(feature_collection: &str) -> serde_json::Value {
    match FeatureCollection::parse(feature_collection) {
        Ok(fc) => serde_json::json!({
            "ok": true,
            "selections": fc.selections().count(),
            "references": fc.references().count(),
            "skipped": fc.skipped,
        }),
        Err(e) => serde_json::json!({ "ok": false, "error": e.to_string() }),
    }
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Carte WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}
