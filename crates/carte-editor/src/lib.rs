pub mod bridge;
pub mod config;
pub mod editor;
pub mod search;
pub mod session;
pub mod viewport;

pub use bridge::{BridgeError, FieldSelector, FormField, FormFieldBridge, MemoryField};
pub use config::{ConfigError, DrawControls, EditorConfig};
pub use editor::MapEditor;
pub use search::{Address, AddressSearch, SearchError, SearchOutcome, SearchStep};
pub use session::{DrawEvent, DrawEventKind, DrawSession, DrawSurface, SessionObserver};
pub use viewport::{BaseStyle, ViewportController, ViewportState};
