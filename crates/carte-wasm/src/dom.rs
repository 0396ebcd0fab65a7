//! Browser-side collaborators: the hidden form input and the draw control.

use carte_core::{FeatureId, Geometry};
use carte_editor::bridge::{BridgeError, FieldSelector, FormField};
use carte_editor::session::{DrawSurface, SurfaceError};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Event, EventInit, HtmlInputElement};

/// The hidden input carrying the serialized collection. Looked up on every
/// write, since the host page may re-render the form.
pub struct DomFormField {
    css: String,
}

impl DomFormField {
    pub fn new(selector: &FieldSelector) -> Self {
        Self {
            css: selector.css(),
        }
    }

    fn input(&self) -> Result<HtmlInputElement, BridgeError> {
        let not_found = || BridgeError::FieldNotFound(self.css.clone());
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(not_found)?;
        let element = document
            .query_selector(&self.css)
            .ok()
            .flatten()
            .ok_or_else(not_found)?;
        element
            .dyn_into::<HtmlInputElement>()
            .map_err(|_| BridgeError::NotAnInput(self.css.clone()))
    }
}

impl FormField for DomFormField {
    fn set_value(&mut self, value: &str) -> Result<(), BridgeError> {
        self.input()?.set_value(value);
        Ok(())
    }

    fn notify_change(&mut self) -> Result<(), BridgeError> {
        let input = self.input()?;
        let init = EventInit::new();
        init.set_bubbles(true);
        let event = Event::new_with_event_init_dict("change", &init)
            .map_err(|_| BridgeError::FieldNotFound(self.css.clone()))?;
        let dispatched = input.dispatch_event(&event).map_err(|e| format!("{e:?}"));
        if let Some(warning) = dispatch_warning(&self.css, dispatched) {
            log::warn!("{warning}");
        }
        Ok(())
    }
}

/// The value is already written when the change event fails to dispatch, so
/// a failure is reported but not propagated.
fn dispatch_warning(css: &str, dispatched: Result<bool, String>) -> Option<String> {
    dispatched
        .err()
        .map(|e| format!("change event on {css} was not dispatched: {e}"))
}

/// A mapbox-gl-draw style control: `draw.add(feature)` returns the ids it
/// assigned.
pub struct JsDrawSurface {
    draw: JsValue,
}

impl JsDrawSurface {
    pub fn new(draw: JsValue) -> Self {
        Self { draw }
    }
}

impl DrawSurface for JsDrawSurface {
    fn add(&mut self, geometry: &Geometry) -> Result<FeatureId, SurfaceError> {
        if self.draw.is_undefined() || self.draw.is_null() {
            return Err(SurfaceError::Unavailable);
        }
        let add = js_sys::Reflect::get(&self.draw, &JsValue::from_str("add"))
            .ok()
            .and_then(|f| f.dyn_into::<js_sys::Function>().ok())
            .ok_or(SurfaceError::Unavailable)?;

        let feature = serde_json::json!({
            "type": "Feature",
            "properties": {},
            "geometry": geometry.to_json(),
        });
        let feature = js_sys::JSON::parse(&feature.to_string())
            .map_err(|e| SurfaceError::Rejected(format!("{e:?}")))?;
        let ids = add
            .call1(&self.draw, &feature)
            .map_err(|e| SurfaceError::Rejected(format!("{e:?}")))?;

        js_sys::Array::from(&ids)
            .get(0)
            .as_string()
            .map(|id| FeatureId::intern(&id))
            .ok_or_else(|| SurfaceError::Rejected("draw control returned no id".into()))
    }
}
