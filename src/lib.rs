pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};
pub use config::TomlConfig;

pub use adapters::{ChannelNotifier, HttpModuleRepository, TracingNotifier};
pub use app::board::ModuleBoard;
pub use core::{
    assignment::{AssignmentPlan, AssignmentResult, AssignmentService},
    gesture::{DragGestureAdapter, DragSignal, DragSource, DropTarget, PointerEvent},
    reorder::compute_reorder,
    store::{AssociationStore, SharedStore},
    sync::{
        DragIntent, MutationState, OptimisticSyncController, SyncEvent, SyncOutcome, SyncSettings,
    },
};
pub use utils::error::{Result, SyncError};
