use std::collections::BTreeSet;

use config_tree_core::TreePath;
use serde::Deserialize;
use tracing::debug;

use crate::commit::{Change, LiveView};
use crate::error::ReconcileError;
use crate::php::{Directive, Service};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Everything {
    All,
}

/// A service name, or `all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ServiceRequest {
    All(Everything),
    One(Service),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplyParams {
    pub services: Vec<ServiceRequest>,
}

impl ApplyParams {
    fn requested(&self) -> BTreeSet<Service> {
        if self.services.iter().any(|s| matches!(s, ServiceRequest::All(_))) {
            return Service::ALL.into_iter().collect();
        }
        self.services
            .iter()
            .filter_map(|s| match s {
                ServiceRequest::One(service) => Some(*service),
                ServiceRequest::All(_) => None,
            })
            .collect()
    }
}

/// Queue reconfiguration hooks in their fixed order. DNS daemons are only
/// reconfigured when enabled and FRR only when the package is installed.
pub fn plan(mut view: LiveView<'_>, params: &ApplyParams) -> Result<Change, ReconcileError> {
    let requested = params.requested();
    let dnsmasq = view.fetch(&TreePath::key("dnsmasq"))?;
    let unbound = view.fetch(&TreePath::key("unbound"))?;
    let frr_include = view.access().target().frr_include.clone();
    let frr_installed = requested.contains(&Service::Frr) && view.file_exists(&frr_include)?;

    let mut change = view.change();
    for service in Service::ALL {
        if !requested.contains(&service) {
            continue;
        }
        let runnable = match service {
            Service::Dnsmasq => dnsmasq.contains_key("enable"),
            Service::Unbound => unbound.contains_key("enable"),
            Service::Frr => frr_installed,
            _ => true,
        };
        if !runnable {
            debug!(?service, "skipping service that is not enabled");
            continue;
        }
        change.post.push(Directive::Reconfigure { service }.into());
    }
    Ok(change)
}
