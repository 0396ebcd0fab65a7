//! Form field bridge: writes the store's FeatureCollection into the host
//! form's hidden input and fires a change notification on it.

use crate::session::{SessionObserver, StoreChange};
use carte_core::GeometryStore;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    #[error("no form field matches {0}")]
    FieldNotFound(String),
    #[error("form field {0} is not an input")]
    NotAnInput(String),
}

/// Selector of the hidden input owned by a record:
/// `[data-feature-collection-id="<id>"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelector {
    record_id: String,
}

impl FieldSelector {
    pub fn for_record(record_id: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
        }
    }

    /// CSS attribute selector. Quotes and backslashes in the id are escaped.
    pub fn css(&self) -> String {
        let escaped = self.record_id.replace('\\', "\\\\").replace('"', "\\\"");
        format!(r#"[data-feature-collection-id="{escaped}"]"#)
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.css())
    }
}

/// The external form input the bridge writes to.
pub trait FormField {
    fn set_value(&mut self, value: &str) -> Result<(), BridgeError>;
    /// Tell the surrounding form the value changed (a synthetic `change`
    /// event in a browser).
    fn notify_change(&mut self) -> Result<(), BridgeError>;
}

pub struct FormFieldBridge<F: FormField> {
    field: F,
    selector: FieldSelector,
    last_value: Option<String>,
}

impl<F: FormField> FormFieldBridge<F> {
    pub fn new(field: F, selector: FieldSelector) -> Self {
        Self {
            field,
            selector,
            last_value: None,
        }
    }

    pub fn selector(&self) -> &FieldSelector {
        &self.selector
    }

    pub fn field(&self) -> &F {
        &self.field
    }

    /// Value written by the most recent sync.
    pub fn last_value(&self) -> Option<&str> {
        self.last_value.as_deref()
    }

    /// Serialize `store` and write it to the field, then notify. Skips the
    /// write when the value is what was last written. Returns whether the
    /// field was written.
    pub fn sync(&mut self, store: &GeometryStore) -> Result<bool, BridgeError> {
        let value = store.to_feature_collection().to_json_string();
        if self.last_value.as_deref() == Some(value.as_str()) {
            return Ok(false);
        }
        self.write(value)?;
        Ok(true)
    }

    /// Write even if the value did not change.
    pub fn force_sync(&mut self, store: &GeometryStore) -> Result<(), BridgeError> {
        let value = store.to_feature_collection().to_json_string();
        self.write(value)
    }

    fn write(&mut self, value: String) -> Result<(), BridgeError> {
        self.field.set_value(&value)?;
        self.field.notify_change()?;
        log::debug!("synced {} bytes to {}", value.len(), self.selector);
        self.last_value = Some(value);
        Ok(())
    }
}

impl<F: FormField> SessionObserver for FormFieldBridge<F> {
    fn store_changed(&mut self, change: &StoreChange, store: &GeometryStore) {
        if let Err(e) = self.sync(store) {
            log::warn!("form sync after {:?} failed: {e}", change.kind);
        }
    }
}

/// Lets a host keep reading a field after handing the bridge to a session.
impl<T: FormField> FormField for Rc<RefCell<T>> {
    fn set_value(&mut self, value: &str) -> Result<(), BridgeError> {
        self.borrow_mut().set_value(value)
    }

    fn notify_change(&mut self) -> Result<(), BridgeError> {
        self.borrow_mut().notify_change()
    }
}

/// A form field held in memory; counts change notifications.
#[derive(Debug, Default, Clone)]
pub struct MemoryField {
    pub value: String,
    pub changes: usize,
}

impl FormField for MemoryField {
    fn set_value(&mut self, value: &str) -> Result<(), BridgeError> {
        self.value = value.to_string();
        Ok(())
    }

    fn notify_change(&mut self) -> Result<(), BridgeError> {
        self.changes += 1;
        Ok(())
    }
}
