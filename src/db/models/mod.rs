pub mod event;
pub mod focus_group;
pub mod graph;
pub mod insight;
pub mod persona;
pub mod project;
pub mod response;

pub use event::*;
pub use focus_group::*;
pub use insight::*;
pub use persona::*;
pub use project::*;
pub use response::*;

// `graph` is not glob-reexported: it deliberately shares names (`GraphNode`,
// `GraphLink`) that read better qualified as `models::graph::GraphNode` at
// call sites in the graph builder and query layer.
