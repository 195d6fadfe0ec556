//! Domain model (IDs, records, status machine, views, wire events, errors).

pub mod delivery;
pub mod errors;
pub mod events;
pub mod ids;
pub mod location;
pub mod package;
pub mod pagination;
pub mod state;
pub mod tracking;

pub use delivery::{DeliveryFilter, DeliveryRecord, DeliveryUpdate};
pub use errors::{Entity, ErrorKind, TrackerError};
pub use events::{BroadcastPayload, HubMessage, InboundEvent};
pub use ids::{DeliveryId, IdKind, PackageId};
pub use location::Location;
pub use package::{NewPackage, PackageFilter, PackageRecord, PackageUpdate};
pub use pagination::{Page, PageOptions};
pub use state::{DeliveryStatus, Milestone, StatusChange, TransitionPolicy};
pub use tracking::TrackingView;
