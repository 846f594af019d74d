//! Two-way association tables between view and host nodes.
//!
//! Both directions hold weak handles keyed by node ids, so a binding never
//! keeps either side alive. Entries whose nodes were dropped are pruned
//! lazily: when a lookup trips over one, and periodically while binding.
//!
//! Text is never bound. Text correspondence is recomputed from siblings and
//! parents because hosts replace and merge text nodes freely.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use tracing::debug;
use weaver_view::{ViewNodeId, ViewParent, ViewSelection, WeakViewParent};

use crate::host::{HostDom, HostNodeId};

/// Binds between full prunes of dead entries.
const PRUNE_INTERVAL: usize = 256;

struct Entry<W> {
    host: W,
    view: WeakViewParent,
}

/// Binding tables owned by exactly one converter.
pub struct BindingTables<H: HostDom> {
    dom_to_view: RefCell<HashMap<HostNodeId, Entry<H::WeakNode>>>,
    view_to_dom: RefCell<HashMap<ViewNodeId, Entry<H::WeakNode>>>,
    fake_selections: RefCell<HashMap<HostNodeId, (H::WeakNode, ViewSelection)>>,
    binds_since_prune: Cell<usize>,
}

impl<H: HostDom> Default for BindingTables<H> {
    fn default() -> Self {
        Self {
            dom_to_view: RefCell::new(HashMap::new()),
            view_to_dom: RefCell::new(HashMap::new()),
            fake_selections: RefCell::new(HashMap::new()),
            binds_since_prune: Cell::new(0),
        }
    }
}

impl<H: HostDom> BindingTables<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `host` and `view` in both directions.
    ///
    /// Any previous partner of either side is released first, so each node
    /// is bound to at most one node on the other side.
    pub fn bind(&self, dom: &H, host: &H::Node, view: &ViewParent) {
        let host_id = dom.node_id(host);
        let view_id = view.id();

        if let Some(old) = self.dom_to_view.borrow_mut().remove(&host_id) {
            if let Some(old_view) = old.view.upgrade() {
                self.view_to_dom.borrow_mut().remove(&old_view.id());
            }
        }
        if let Some(old) = self.view_to_dom.borrow_mut().remove(&view_id) {
            if let Some(old_host) = dom.upgrade(&old.host) {
                self.dom_to_view.borrow_mut().remove(&dom.node_id(&old_host));
            }
        }

        let entry = || Entry {
            host: dom.downgrade(host),
            view: view.downgrade(),
        };
        self.dom_to_view.borrow_mut().insert(host_id, entry());
        self.view_to_dom.borrow_mut().insert(view_id, entry());
        debug!(host = %host_id, view = %view_id, "bound host node");

        let binds = self.binds_since_prune.get() + 1;
        if binds >= PRUNE_INTERVAL {
            self.prune(dom);
        } else {
            self.binds_since_prune.set(binds);
        }
    }

    /// View element or fragment bound to `host`.
    pub fn view_for(&self, dom: &H, host: &H::Node) -> Option<ViewParent> {
        let host_id = dom.node_id(host);
        let view = self
            .dom_to_view
            .borrow()
            .get(&host_id)
            .map(|entry| entry.view.upgrade());
        match view {
            Some(Some(view)) => Some(view),
            Some(None) => {
                self.dom_to_view.borrow_mut().remove(&host_id);
                None
            }
            None => None,
        }
    }

    /// Host node bound to `view`.
    pub fn host_for(&self, dom: &H, view: &ViewParent) -> Option<H::Node> {
        let view_id = view.id();
        let host = self
            .view_to_dom
            .borrow()
            .get(&view_id)
            .map(|entry| dom.upgrade(&entry.host));
        match host {
            Some(Some(host)) => Some(host),
            Some(None) => {
                self.view_to_dom.borrow_mut().remove(&view_id);
                None
            }
            None => None,
        }
    }

    /// Remove the bindings of `host` and of every host descendant.
    pub fn unbind(&self, dom: &H, host: &H::Node) {
        let host_id = dom.node_id(host);
        if let Some(entry) = self.dom_to_view.borrow_mut().remove(&host_id) {
            if let Some(view) = entry.view.upgrade() {
                self.view_to_dom.borrow_mut().remove(&view.id());
            }
            debug!(host = %host_id, "unbound host node");
        }
        for child in dom.children(host) {
            self.unbind(dom, &child);
        }
    }

    /// Remember a copy of `selection` for `host`.
    pub fn bind_fake_selection(&self, dom: &H, host: &H::Node, selection: &ViewSelection) {
        self.fake_selections
            .borrow_mut()
            .insert(dom.node_id(host), (dom.downgrade(host), selection.clone()));
    }

    /// Copy of the selection remembered for `host`.
    pub fn fake_selection_for(&self, dom: &H, host: &H::Node) -> Option<ViewSelection> {
        self.fake_selections
            .borrow()
            .get(&dom.node_id(host))
            .map(|(_, selection)| selection.clone())
    }

    /// Drop entries whose nodes no longer exist.
    pub fn prune(&self, dom: &H) {
        self.dom_to_view
            .borrow_mut()
            .retain(|_, entry| entry.view.upgrade().is_some() && dom.upgrade(&entry.host).is_some());
        self.view_to_dom
            .borrow_mut()
            .retain(|_, entry| entry.view.upgrade().is_some() && dom.upgrade(&entry.host).is_some());
        self.fake_selections
            .borrow_mut()
            .retain(|_, (host, _)| dom.upgrade(host).is_some());
        self.binds_since_prune.set(0);
    }

    /// Number of live-or-unpruned host to view entries.
    pub fn len(&self) -> usize {
        self.dom_to_view.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
