//! One builder per Kubernetes kind
//!
//! Each builder returns `None` (or an empty list) when its values disable it.

mod config;
mod extra;
mod monitoring;
mod network;
mod rbac;
mod scaling;
mod storage;
mod workload;

pub use config::{config_map, secret};
pub use extra::extra_deploy;
pub use monitoring::{MONITORING_API_VERSION, prometheus_rule, service_monitor};
pub use network::{ingress, network_policy, service};
pub use rbac::{rbac, service_account};
pub use scaling::{hpa, pdb};
pub use storage::pvc;
pub use workload::deployment;
