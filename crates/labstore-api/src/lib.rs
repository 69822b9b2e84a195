mod dto;
mod errors;
mod ids;
mod types;

pub use dto::{
    CanDeleteResponse, CanMoveResponse, CascadeDeleteSummary, DevicePayload, ErrorBody,
    NodePayload, NodeRecord, ParentRef, RackPayload, RoomPayload, ShelfPayload,
};
pub use errors::ApiError;
pub use ids::{Flag, LooseText, NodeId};
pub use types::{DeviceKind, NodeType};
