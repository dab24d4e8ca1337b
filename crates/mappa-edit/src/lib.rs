//! Dungeon editing: grouping, validation, repair and the orchestrator
//! that ties the model crates to a project's storage.

pub mod group;
pub mod open_request;
pub mod orchestrator;
pub mod storage;
pub mod validator;

pub use group::{DungeonGroup, DungeonListEntry, GroupError};
pub use open_request::{EntityFocus, OpenRequest, OpenRequestError, OpenTarget, TreeNode};
pub use orchestrator::{DungeonEditor, EditorError, FixedFloorProperties};
pub use storage::{BinaryName, EntityData, Patch, Patches, Storage, StorageError};
pub use validator::DungeonError;
