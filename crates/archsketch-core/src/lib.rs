//! ArchSketch Core Library
//!
//! State container, mutation gateway and free-hand drawing core for the
//! ArchSketch architecture diagram editor. Platform-agnostic; rendering and
//! the rest of the UI live with the host.

pub mod camera;
pub mod capture;
pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod geometry;
pub mod history;
pub mod input;
pub mod model;
pub mod serialize;
pub mod spatial;
pub mod storage;
pub mod store;
pub mod surface;
pub mod tools;

pub use camera::{Camera, ScreenTransform, screen_to_canvas};
pub use capture::{CapturePhase, FrameHandle, FrameScheduler, ManualScheduler, StrokeCapture};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DrawingConfig, GatewayConfig, HistoryConfig, LimiterMode, StoreConfig};
pub use error::{SerializationError, TransformError};
pub use gateway::{LimiterSnapshot, MutationGateway, MutationMode, MutationOutcome};
pub use history::{HistorySnapshot, TemporalHistory};
pub use input::{KeyEvent, Modifiers, PointerEvent, PointerKind, PointerSample};
pub use model::{Component, Connection, EntityId, InfoCard, Stroke, StrokePoint, StrokeTool, ViewPreferences};
pub use serialize::{decode_strokes, encode_strokes};
pub use spatial::{SegmentIndex, StrokeIndexCache};
pub use storage::{KeyValueStore, StorageError, StorageResult};
pub use store::{CanvasState, CanvasStore, DebugInfo, MutationEvent, ScalarOptions, SubscriptionId};
pub use surface::{DrawingHost, DrawingSurface};
pub use tools::{ToolKind, ToolSettings};
