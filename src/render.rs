//! Element bookkeeping for the rendering surface.
//!
//! The canvas allocates every [`ElementId`] itself and tells the
//! [`RenderSurface`](crate::traits::RenderSurface) about it, so the
//! containment hierarchy is known locally.  Pointer events carry the raw
//! element they hit; [`ElementTree::owner_of`] walks that element up to the
//! screen it belongs to.
//!
//! ```text
//! canvas                (root, receives input)
//! └ view                (translated by the pan offset)
//!     ├ screen          (one per ScreenNode, owned by its id)
//!     │   └ label
//!     └ …
//! ```

use crate::screen::ScreenId;
use crate::traits::RenderSurface;
use crate::vector::Vector2;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;

/// Handle of one element on the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u32);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an element represents, so a surface can style it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    Canvas,
    View,
    Screen,
    Label,
}

/// Parent links plus the screen that owns each screen body element.
#[derive(Debug, Default)]
pub struct ElementTree {
    next: u32,
    parents: HashMap<ElementId, ElementId>,
    owners: HashMap<ElementId, ScreenId>,
}

impl ElementTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out a fresh id, optionally placed under `parent`.
    pub fn allocate(&mut self, parent: Option<ElementId>) -> ElementId {
        let id = ElementId(self.next);
        self.next += 1;
        if let Some(parent) = parent {
            self.parents.insert(id, parent);
        }
        id
    }

    /// Mark `element` as the body of `screen`.
    pub fn set_owner(&mut self, element: ElementId, screen: ScreenId) {
        self.owners.insert(element, screen);
    }

    /// Forget `element` and everything below it.
    pub fn remove_subtree(&mut self, element: ElementId) {
        let mut doomed = vec![element];
        let mut i = 0;
        while i < doomed.len() {
            let current = doomed[i];
            doomed.extend(
                self.parents
                    .iter()
                    .filter(|&(_, &p)| p == current)
                    .map(|(&child, _)| child),
            );
            i += 1;
        }
        for id in doomed {
            self.parents.remove(&id);
            self.owners.remove(&id);
        }
    }

    /// The screen owning `element` or one of its ancestors, stopping at
    /// `root`.  `None` means the element belongs to the canvas itself (or
    /// is unknown).
    pub fn owner_of(&self, element: ElementId, root: ElementId) -> Option<ScreenId> {
        let mut current = element;
        // Bounded by the number of links, so a corrupt tree cannot spin.
        for _ in 0..=self.parents.len() {
            if current == root {
                return None;
            }
            if let Some(&screen) = self.owners.get(&current) {
                return Some(screen);
            }
            current = *self.parents.get(&current)?;
        }
        None
    }
}

/// A headless [`RenderSurface`] that only logs what it is asked to draw.
///
/// The daemon uses it when no UI is attached; notifications go to the
/// error log.
#[derive(Debug, Default)]
pub struct LogSurface;

impl RenderSurface for LogSurface {
    type Error = Infallible;

    fn create_element(
        &self,
        id: ElementId,
        kind: ElementKind,
        text: Option<&str>,
    ) -> Result<(), Infallible> {
        debug!("create {} {:?} {:?}", id, kind, text.unwrap_or_default());
        Ok(())
    }

    fn set_position(&self, id: ElementId, position: Vector2) -> Result<(), Infallible> {
        debug!("position {} {}", id, position);
        Ok(())
    }

    fn set_size(&self, id: ElementId, size: Vector2) -> Result<(), Infallible> {
        debug!("size {} {}", id, size);
        Ok(())
    }

    fn set_class(&self, id: ElementId, class: &str, enabled: bool) -> Result<(), Infallible> {
        debug!("class {} {}{}", id, if enabled { "+" } else { "-" }, class);
        Ok(())
    }

    fn append(&self, parent: ElementId, child: ElementId) -> Result<(), Infallible> {
        debug!("append {} to {}", child, parent);
        Ok(())
    }

    fn remove(&self, id: ElementId) -> Result<(), Infallible> {
        debug!("remove {}", id);
        Ok(())
    }

    fn notify(&self, message: &str) -> Result<(), Infallible> {
        error!("{}", message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// canvas(0) > view(1) > screen(2) > label(3)
    fn tree() -> (ElementTree, [ElementId; 4]) {
        let mut t = ElementTree::new();
        let canvas = t.allocate(None);
        let view = t.allocate(Some(canvas));
        let body = t.allocate(Some(view));
        let label = t.allocate(Some(body));
        t.set_owner(body, ScreenId(7));
        (t, [canvas, view, body, label])
    }

    #[test]
    fn label_resolves_to_owning_screen() {
        let (t, [canvas, _, body, label]) = tree();
        assert_eq!(t.owner_of(label, canvas), Some(ScreenId(7)));
        assert_eq!(t.owner_of(body, canvas), Some(ScreenId(7)));
    }

    #[test]
    fn view_and_canvas_resolve_to_nothing() {
        let (t, [canvas, view, _, _]) = tree();
        assert_eq!(t.owner_of(view, canvas), None);
        assert_eq!(t.owner_of(canvas, canvas), None);
        assert_eq!(t.owner_of(ElementId(99), canvas), None);
    }

    #[test]
    fn removing_a_subtree_forgets_children() {
        let (mut t, [canvas, view, body, label]) = tree();
        t.remove_subtree(body);
        assert_eq!(t.owner_of(label, canvas), None);
        assert_eq!(t.owner_of(body, canvas), None);
        // Untouched part of the tree survives.
        assert_eq!(t.parents.get(&view), Some(&canvas));
    }

    #[test]
    fn ids_are_never_reused() {
        let (mut t, [_, _, body, label]) = tree();
        t.remove_subtree(body);
        let fresh = t.allocate(None);
        assert!(fresh.0 > label.0);
    }
}
