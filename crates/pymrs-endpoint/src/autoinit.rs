//! Declarative embeds: containers carrying `data-pym-src`.

use std::rc::Rc;

use tracing::{debug, warn};

use crate::config::ParentConfig;
use crate::host::ParentHost;
use crate::parent::Parent;

/// Attribute naming the child URL of a declarative embed.
pub const AUTO_INIT_SRC_ATTRIBUTE: &str = "data-pym-src";

/// Attribute set on containers already handled by [`auto_init`].
pub const AUTO_INITIALIZED_ATTRIBUTE: &str = "data-pym-auto-initialized";

/// Create a [`Parent`] for every declarative container not handled yet.
///
/// Containers without an id, and containers whose Parent fails to construct,
/// are logged and skipped.
pub fn auto_init<H: ParentHost + 'static>(host: &Rc<H>) -> Vec<Parent<H>> {
    let mut parents = Vec::new();

    for container in host.auto_init_containers() {
        let Some(src) = container.attributes.get(AUTO_INIT_SRC_ATTRIBUTE) else {
            continue;
        };
        if container.attributes.contains_key(AUTO_INITIALIZED_ATTRIBUTE) {
            continue;
        }
        let Some(id) = container.id.as_deref().filter(|id| !id.is_empty()) else {
            warn!(src = %src, "skipping declarative embed without a container id");
            continue;
        };

        let config = ParentConfig::from_data_attributes(&container.attributes);
        match Parent::new(host.clone(), id, src, config) {
            Ok(parent) => {
                host.mark_auto_initialized(id);
                debug!(container = id, src = %src, "auto-initialized embed");
                parents.push(parent);
            }
            Err(err) => warn!(container = id, error = %err, "failed to auto-initialize embed"),
        }
    }

    parents
}
