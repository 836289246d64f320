// ABOUTME: Deterministic resource naming derived from customer and environment.
// ABOUTME: Names are traceable back to the profile without a central registry.

use super::{CustomerName, Environment};
use std::fmt;

/// Kinds of resources the layers create for a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Top-level scope holding the provisioned infrastructure.
    ResourceGroup,
    ServicePrincipal,
    Image,
    EdgeNode,
    /// GitOps configuration scope the workload reconciler watches.
    GitOpsScope,
}

impl ResourceKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            ResourceKind::ResourceGroup => "rg",
            ResourceKind::ServicePrincipal => "sp",
            ResourceKind::Image => "img",
            ResourceKind::EdgeNode => "edge",
            ResourceKind::GitOpsScope => "gitops",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Derive the name of a resource for a customer deployment.
///
/// The result is a pure function of its inputs: the same profile always
/// yields the same names, and two customers (or two environments of one
/// customer) never collide.
pub fn resource_name(customer: &CustomerName, env: Environment, kind: ResourceKind) -> String {
    format!("{}-{}-{}", kind.prefix(), customer, env.short())
}
