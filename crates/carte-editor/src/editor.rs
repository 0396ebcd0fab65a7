//! Map editor: one form session's draw session, viewport, and address search.

use crate::bridge::{FieldSelector, FormField, FormFieldBridge};
use crate::config::EditorConfig;
use crate::search::{Address, AddressSearch};
use crate::session::{DrawSession, DrawSurface, SubscriptionId, SurfaceError};
use crate::viewport::ViewportController;
use carte_core::{FeatureCollection, FeatureId};

pub struct MapEditor {
    pub session: DrawSession,
    pub viewport: ViewportController,
    pub search: AddressSearch,
    config: EditorConfig,
    /// Collection the hosting page supplied on mount.
    initial: FeatureCollection,
}

impl MapEditor {
    /// Mount an editor on the hosting page's collection. The viewport is asked
    /// to frame the collection's bbox (or the computed one when absent).
    pub fn new(config: EditorConfig, initial: FeatureCollection) -> Self {
        let mut viewport = ViewportController::new(&config);
        if let Some(bbox) = initial.bbox.or_else(|| initial.compute_bbox()) {
            viewport.request_fit(bbox);
        }
        if initial.skipped > 0 {
            log::warn!("{} persisted features could not be read", initial.skipped);
        }
        Self {
            session: DrawSession::new(),
            viewport,
            search: AddressSearch::new(&config),
            config,
            initial,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Route every store mutation to the form field owned by `selector`.
    pub fn attach_field<F>(&mut self, field: F, selector: FieldSelector) -> SubscriptionId
    where
        F: FormField + 'static,
    {
        self.session
            .subscribe(Box::new(FormFieldBridge::new(field, selector)))
    }

    /// Seed the draw surface with the persisted user selections.
    pub fn map_ready(&mut self, surface: &mut dyn DrawSurface) -> Result<Vec<FeatureId>, SurfaceError> {
        self.session.on_map_ready(&self.initial, surface)
    }

    /// The user picked a search result.
    pub fn select_address(&mut self, address: &Address) {
        log::debug!("centering on {}", address.label());
        self.viewport.set_center_from_search(address.coordinates);
    }

    /// Current form field value.
    pub fn field_value(&self) -> String {
        self.session.to_feature_collection().to_json_string()
    }
}
