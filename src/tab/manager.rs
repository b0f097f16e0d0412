//! Tab manager for coordinating multiple workbench tabs

use std::sync::Arc;

use super::{Tab, TabId};
use crate::error::EngineError;
use crate::traits::Transport;

/// Manages multiple tabs within a single workbench
pub struct TabManager {
    /// All tabs in this workbench, in order
    tabs: Vec<Tab>,
    /// Currently active tab ID
    active_tab_id: Option<TabId>,
    /// Counter for generating unique tab IDs
    next_tab_id: TabId,
}

impl TabManager {
    /// Create a new empty tab manager
    pub fn new() -> Self {
        Self {
            tabs: Vec::new(),
            active_tab_id: None,
            next_tab_id: 1,
        }
    }

    /// Create a new tab bound to `transport` and return its ID
    ///
    /// The new tab becomes the active tab.
    pub fn new_tab(&mut self, transport: Arc<dyn Transport>) -> TabId {
        let id = self.next_tab_id;
        self.next_tab_id += 1;

        // Tab number is based on current count, not unique ID
        let tab_number = self.tabs.len() + 1;
        self.tabs.push(Tab::new(id, tab_number, transport));
        self.active_tab_id = Some(id);

        log::info!("Created new tab {} (total: {})", id, self.tabs.len());

        id
    }

    /// Close a tab by ID
    ///
    /// Dropping the tab cancels any live macro worker and waits for its
    /// confirmed termination. Returns true if this was the last tab
    /// (workbench should close).
    pub fn close_tab(&mut self, id: TabId) -> bool {
        let index = self.tabs.iter().position(|t| t.id == id);

        if let Some(idx) = index {
            log::info!("Closing tab {} (index {})", id, idx);

            self.tabs.remove(idx);

            // If we closed the active tab, switch to another
            if self.active_tab_id == Some(id) {
                self.active_tab_id = if self.tabs.is_empty() {
                    None
                } else {
                    // Prefer the tab at the same index (or previous if at end)
                    let new_idx = idx.min(self.tabs.len().saturating_sub(1));
                    Some(self.tabs[new_idx].id)
                };
            }
        }

        self.tabs.is_empty()
    }

    /// Switch the active tab; returns false if the ID is unknown
    pub fn set_active_tab(&mut self, id: TabId) -> bool {
        if self.tabs.iter().any(|t| t.id == id) {
            self.active_tab_id = Some(id);
            log::debug!("Switched to tab {}", id);
            true
        } else {
            false
        }
    }

    /// Get the currently active tab
    pub fn active_tab(&self) -> Option<&Tab> {
        self.active_tab_id.and_then(|id| self.tab(id))
    }

    /// Get the currently active tab mutably
    pub fn active_tab_mut(&mut self) -> Option<&mut Tab> {
        let id = self.active_tab_id?;
        self.tab_mut(id)
    }

    /// Get a tab by ID
    pub fn tab(&self, id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == id)
    }

    /// Get a tab by ID mutably
    pub fn tab_mut(&mut self, id: TabId) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|t| t.id == id)
    }

    /// Route a hotkey press to the active tab's macro binding
    ///
    /// Returns `None` when no tab is active or the key does not match the
    /// active tab's binding; otherwise the result of starting the macro.
    pub fn dispatch_macro_key(&mut self, key: &str) -> Option<Result<(), EngineError>> {
        let tab = self.active_tab_mut()?;
        if tab.matches_binding(key) {
            Some(tab.start_macro())
        } else {
            None
        }
    }

    /// All tab IDs in display order
    pub fn tab_ids(&self) -> Vec<TabId> {
        self.tabs.iter().map(|t| t.id).collect()
    }

    /// Number of tabs
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    /// True when no tabs are open
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}

impl Default for TabManager {
    fn default() -> Self {
        Self::new()
    }
}
