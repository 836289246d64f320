// ABOUTME: Validated domain identifiers and the deterministic resource naming scheme.
// ABOUTME: Every name derived for a customer deployment flows through these types.

mod account_id;
mod customer_name;
mod environment;
mod layer_name;
pub mod naming;
mod region_id;

pub use account_id::{AccountId, AccountIdError};
pub use customer_name::{CustomerName, CustomerNameError};
pub use environment::{Environment, SizeClass, UnknownTagError};
pub use layer_name::{LayerName, LayerNameError, LayerSelector};
pub use naming::{ResourceKind, resource_name};
pub use region_id::{RegionId, RegionIdError};
