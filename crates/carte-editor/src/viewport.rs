//! Map viewport: center, zoom, and base map style.
//!
//! Independent of the geometry store. The host reads the state after each
//! call and moves the map accordingly.

use crate::config::EditorConfig;
use carte_core::{Bbox, LonLat};
use serde::Serialize;

/// Base map imagery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseStyle {
    /// Aerial imagery.
    #[default]
    Ortho,
    /// Line map.
    Vector,
}

impl BaseStyle {
    pub fn toggled(self) -> Self {
        match self {
            BaseStyle::Ortho => BaseStyle::Vector,
            BaseStyle::Vector => BaseStyle::Ortho,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BaseStyle::Ortho => "ortho",
            BaseStyle::Vector => "vector",
        }
    }

    /// Caption shown on the switch button.
    pub fn label(self) -> &'static str {
        match self {
            BaseStyle::Ortho => "Satellite",
            BaseStyle::Vector => "Vectoriel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewportState {
    pub center: LonLat,
    pub zoom: f64,
}

/// A one-shot request to frame a bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitBounds {
    pub bbox: Bbox,
    pub padding: u32,
}

pub struct ViewportController {
    state: ViewportState,
    style: BaseStyle,
    search_zoom: f64,
    ortho_url: String,
    vector_url: String,
    fit_padding: u32,
    pending_fit: Option<FitBounds>,
}

impl ViewportController {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            state: ViewportState {
                center: config.initial_center,
                zoom: config.initial_zoom,
            },
            style: BaseStyle::default(),
            search_zoom: config.search_zoom,
            ortho_url: config.ortho_style_url.clone(),
            vector_url: config.vector_style_url.clone(),
            fit_padding: config.fit_bounds_padding,
            pending_fit: None,
        }
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn style(&self) -> BaseStyle {
        self.style
    }

    /// Center on a picked search result at street level.
    pub fn set_center_from_search(&mut self, coordinates: LonLat) {
        self.state = ViewportState {
            center: coordinates,
            zoom: self.search_zoom,
        };
        // A later fit would undo the user's pick.
        self.pending_fit = None;
    }

    pub fn toggle_base_style(&mut self) -> BaseStyle {
        self.style = self.style.toggled();
        log::debug!("base style is now {}", self.style.as_str());
        self.style
    }

    pub fn style_url(&self) -> &str {
        match self.style {
            BaseStyle::Ortho => &self.ortho_url,
            BaseStyle::Vector => &self.vector_url,
        }
    }

    /// Caption of the style the switch would change to.
    pub fn switch_label(&self) -> &'static str {
        self.style.toggled().label()
    }

    /// Ask the host to frame `bbox` once the map is shown. Degenerate or
    /// inverted boxes are ignored.
    pub fn request_fit(&mut self, bbox: Bbox) {
        let [min_lon, min_lat, max_lon, max_lat] = bbox;
        if min_lon > max_lon || min_lat > max_lat {
            log::warn!("ignoring inverted bbox {bbox:?}");
            return;
        }
        self.pending_fit = Some(FitBounds {
            bbox,
            padding: self.fit_padding,
        });
    }

    /// Consume the pending fit request, if any.
    pub fn take_fit_bounds(&mut self) -> Option<FitBounds> {
        self.pending_fit.take()
    }
}
