//! Chunk streaming around a moving viewer: background work dispatch, per-chunk
//! heightfield and mesh state, and the events the presentation layer consumes.

pub mod chunk;
pub mod dispatcher;
pub mod events;
pub mod settings;
pub mod store;

pub use chunk::{ChunkCoord, ColliderCheck, Evaluation, HeightState, MeshState, TerrainChunk};
pub use dispatcher::{DispatchError, Dispatcher, JobId, WorkError};
pub use events::ChunkEvent;
pub use settings::{SettingsError, StreamingConfig, TerrainSettings};
pub use store::ChunkStore;
