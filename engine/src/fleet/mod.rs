//! Fleet collaborators and the route table

pub mod http;
pub mod routes;
pub mod snapshot;

pub use http::HttpFleetClient;
pub use routes::RouteTable;
pub use snapshot::{BusRecord, FleetSnapshot};
