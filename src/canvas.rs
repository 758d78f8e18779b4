//! The spatial canvas: the composition root of a layout-editing session.
//!
//! [`SpatialCanvas`] owns the [`ScreenGraph`], the pan offset, the focus
//! table and the element tree, and reacts to [`Command`]s by updating that
//! state and then issuing calls to the [`RenderSurface`] trait.  Edits that
//! change the graph are published as [`OutboundMessage::Screens`] on an
//! optional channel.

use crate::command::{Command, OutboundMessage, Viewport};
use crate::config::CanvasConfig;
use crate::focus::{DragHost, DragTarget, FocusTable, PointerEvent, PointerFocusRouter};
use crate::graph::ScreenGraph;
use crate::render::{ElementId, ElementKind, ElementTree};
use crate::screen::ScreenId;
use crate::snapshot::{self, ClusterSnapshot};
use crate::traits::RenderSurface;
use crate::vector::Vector2;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::mpsc;
use std::time::Instant;

/// Possible errors from the canvas.
#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    /// The rendering surface returned an error.
    #[error("render surface error: {0}")]
    Surface(String),
    /// Nobody is listening for published layouts any more.
    #[error("cluster channel closed, layout not published")]
    Publish,
}

fn surface_err<E: std::error::Error>(e: E) -> CanvasError {
    CanvasError::Surface(e.to_string())
}

/// Style class of a screen or the canvas while it is dragged.
pub const DRAGGING_CLASS: &str = "dragging";
/// Style class of the screen this editor runs on.
pub const LOCAL_CLASS: &str = "local";

/// Everything the focus router drives.
struct Scene<S: RenderSurface> {
    surface: S,
    graph: ScreenGraph,
    pan: Vector2,
    viewport: Viewport,
    config: CanvasConfig,
    elements: ElementTree,
    canvas_element: ElementId,
    view_element: ElementId,
    /// Body element per screen; its label is a child.
    screen_elements: HashMap<ScreenId, ElementId>,
    /// Inserted screens so far, for name cycling.
    inserted: usize,
    publisher: Option<mpsc::Sender<OutboundMessage>>,
}

/// Interactive editor for the screen layout of a cluster.
///
/// # Typical usage
///
/// ```ignore
/// let mut canvas = SpatialCanvas::new(LogSurface, config.canvas)?;
/// canvas.set_publisher(outbound_tx);
/// canvas.handle(Command::Resize(viewport))?;
/// ```
pub struct SpatialCanvas<S: RenderSurface> {
    router: PointerFocusRouter,
    scene: Scene<S>,
}

impl<S: RenderSurface> SpatialCanvas<S> {
    /// Create an empty canvas and its root elements on `surface`.
    pub fn new(surface: S, config: CanvasConfig) -> Result<Self, CanvasError> {
        let mut elements = ElementTree::new();
        let canvas_element = elements.allocate(None);
        let view_element = elements.allocate(Some(canvas_element));

        surface
            .create_element(canvas_element, ElementKind::Canvas, None)
            .map_err(surface_err)?;
        surface
            .create_element(view_element, ElementKind::View, None)
            .map_err(surface_err)?;
        surface
            .append(canvas_element, view_element)
            .map_err(surface_err)?;
        surface
            .set_position(view_element, Vector2::ZERO)
            .map_err(surface_err)?;

        Ok(Self {
            router: PointerFocusRouter::new(config.insert_modifier),
            scene: Scene {
                surface,
                graph: ScreenGraph::new(config.pad),
                pan: Vector2::ZERO,
                viewport: Viewport::default(),
                config,
                elements,
                canvas_element,
                view_element,
                screen_elements: HashMap::new(),
                inserted: 0,
                publisher: None,
            },
        })
    }

    /// Attach the channel that carries layouts to the cluster daemon.
    ///
    /// A `Screens` message is sent after every completed screen drag and
    /// after every insert.  Snapshot replacements are not echoed back.
    pub fn set_publisher(&mut self, tx: mpsc::Sender<OutboundMessage>) {
        self.scene.publisher = Some(tx);
    }

    pub fn graph(&self) -> &ScreenGraph {
        &self.scene.graph
    }

    pub fn pan(&self) -> Vector2 {
        self.scene.pan
    }

    pub fn viewport(&self) -> Viewport {
        self.scene.viewport
    }

    pub fn focus(&self) -> &FocusTable {
        self.router.focus()
    }

    pub fn surface(&self) -> &S {
        &self.scene.surface
    }

    /// The root element; pointer input is expected to arrive on it.
    pub fn canvas_element(&self) -> ElementId {
        self.scene.canvas_element
    }

    /// The body element drawn for `id`.
    pub fn screen_element(&self, id: ScreenId) -> Option<ElementId> {
        self.scene.screen_elements.get(&id).copied()
    }

    /// Screens not under an active drag, in graph order.  These are the
    /// candidates for every closest-neighbour search.
    pub fn available_screens(&self) -> Vec<ScreenId> {
        self.scene.available(self.router.focus())
    }

    /// Process a single [`Command`].
    ///
    /// State is updated before the surface is told about it, so an error
    /// from the surface never leaves the graph half-edited.
    pub fn handle(&mut self, cmd: Command) -> Result<(), CanvasError> {
        let now = Instant::now();
        match cmd {
            Command::Mouse(input) => {
                let event = PointerEvent::from_mouse(&input);
                self.router.route(&mut self.scene, &event, now)
            }

            Command::Touch(input) => {
                let mut result = Ok(());
                for event in PointerEvent::from_touch(&input) {
                    if let Err(e) = self.router.route(&mut self.scene, &event, now) {
                        if result.is_ok() {
                            result = Err(e);
                        }
                    }
                }
                result
            }

            Command::Resize(viewport) => {
                debug!("viewport {} size {}", viewport.origin, viewport.size);
                self.scene.viewport = viewport;
                Ok(())
            }

            Command::Recenter => {
                info!("recenter");
                self.scene.set_pan(Vector2::ZERO)
            }

            Command::Cluster(snapshot) => {
                self.router.forget_screens();
                self.scene.replace(&snapshot)
            }

            Command::ChannelFailed(reason) => {
                error!("cluster channel failed: {}", reason);
                self.scene
                    .surface
                    .notify(&format!("Could not connect to the cluster: {}", reason))
                    .map_err(surface_err)
            }
        }
    }

    /// Release drags that saw no input for the configured timeout.
    pub fn expire_stale_focus(&mut self, now: Instant) -> Result<usize, CanvasError> {
        match self.scene.config.stale_focus_timeout() {
            Some(timeout) => self.router.expire_stale(&mut self.scene, now, timeout),
            None => Ok(0),
        }
    }
}

impl<S: RenderSurface> Scene<S> {
    fn available(&self, focus: &FocusTable) -> Vec<ScreenId> {
        self.graph
            .ids()
            .filter(|&id| !focus.is_focused(DragTarget::Screen(id)))
            .collect()
    }

    fn next_name(&mut self) -> String {
        let names = &self.config.names;
        let name = if names.is_empty() {
            format!("Screen {}", self.inserted + 1)
        } else {
            names[self.inserted % names.len()].clone()
        };
        self.inserted += 1;
        name
    }

    fn publish(&mut self) -> Result<(), CanvasError> {
        let Some(tx) = &self.publisher else {
            return Ok(());
        };
        let msg = OutboundMessage::Screens {
            screens: snapshot::records(&self.graph),
        };
        if tx.send(msg).is_err() {
            warn!("cluster channel closed, no longer publishing");
            self.publisher = None;
            return Err(CanvasError::Publish);
        }
        Ok(())
    }

    fn set_pan(&mut self, pan: Vector2) -> Result<(), CanvasError> {
        self.pan = pan;
        self.surface
            .set_position(self.view_element, pan)
            .map_err(surface_err)
    }

    /// Create the elements of a screen already in the graph.
    fn render_screen(&mut self, id: ScreenId) -> Result<(), CanvasError> {
        let Some(node) = self.graph.get(id) else {
            return Ok(());
        };
        let (name, origin, size, local) = (node.name.clone(), node.origin(), node.size, node.local);

        let body = self.elements.allocate(Some(self.view_element));
        let label = self.elements.allocate(Some(body));
        self.elements.set_owner(body, id);
        self.screen_elements.insert(id, body);

        let s = &self.surface;
        s.create_element(body, ElementKind::Screen, None)
            .map_err(surface_err)?;
        s.create_element(label, ElementKind::Label, Some(&name))
            .map_err(surface_err)?;
        s.append(body, label).map_err(surface_err)?;
        s.set_size(body, size).map_err(surface_err)?;
        s.set_position(body, origin).map_err(surface_err)?;
        if local {
            s.set_class(body, LOCAL_CLASS, true).map_err(surface_err)?;
        }
        s.append(self.view_element, body).map_err(surface_err)
    }

    fn render_position(&self, id: ScreenId) -> Result<(), CanvasError> {
        let (Some(node), Some(&body)) = (self.graph.get(id), self.screen_elements.get(&id)) else {
            return Ok(());
        };
        self.surface
            .set_position(body, node.origin())
            .map_err(surface_err)
    }

    /// Discard every screen and rebuild from `snapshot`, anchored at the
    /// visual centre of the canvas.
    fn replace(&mut self, snapshot: &ClusterSnapshot) -> Result<(), CanvasError> {
        let anchor = self.viewport.center() - self.pan;
        let old: Vec<ElementId> = self.screen_elements.drain().map(|(_, body)| body).collect();
        for &body in &old {
            self.elements.remove_subtree(body);
        }
        self.graph = snapshot::resolve(
            snapshot,
            snapshot.local_screen,
            anchor,
            self.config.screen_size,
            self.config.pad,
        );
        info!(
            "cluster snapshot: {} screen(s), local screen {}",
            self.graph.len(),
            snapshot.local_screen
        );

        for body in old {
            self.surface.remove(body).map_err(surface_err)?;
        }
        let ids: Vec<ScreenId> = self.graph.ids().collect();
        for id in ids {
            self.render_screen(id)?;
        }
        Ok(())
    }
}

impl<S: RenderSurface> DragHost for Scene<S> {
    type Error = CanvasError;

    fn localize(&self, position: Vector2) -> Vector2 {
        position - self.viewport.origin - self.pan
    }

    fn resolve_target(&self, element: Option<ElementId>) -> DragTarget {
        element
            .and_then(|e| self.elements.owner_of(e, self.canvas_element))
            .filter(|&id| self.graph.contains(id))
            .map_or(DragTarget::Canvas, DragTarget::Screen)
    }

    fn insert_screen(&mut self, at: Vector2, focus: &FocusTable) -> Result<(), CanvasError> {
        let name = self.next_name();
        let id = self.graph.add(name, at, self.config.screen_size);
        let candidates = self.available(focus);
        match self.graph.connect_closest(id, candidates) {
            Some(neighbor) => info!("inserted screen {} next to screen {}", id, neighbor),
            None => info!("inserted screen {} at {}", id, at),
        }
        let published = self.publish();
        self.render_screen(id)?;
        published
    }

    fn set_dragging(&mut self, target: DragTarget, dragging: bool) -> Result<(), CanvasError> {
        let element = match target {
            DragTarget::Canvas => Some(self.canvas_element),
            DragTarget::Screen(id) => self.screen_elements.get(&id).copied(),
        };
        match element {
            Some(element) => self
                .surface
                .set_class(element, DRAGGING_CLASS, dragging)
                .map_err(surface_err),
            None => Ok(()),
        }
    }

    /// A grabbed screen is raised above its siblings.
    fn on_drag_begin(&mut self, target: DragTarget, _delta: Vector2) -> Result<(), CanvasError> {
        let DragTarget::Screen(id) = target else {
            return Ok(());
        };
        match self.screen_elements.get(&id) {
            Some(&body) => self
                .surface
                .append(self.view_element, body)
                .map_err(surface_err),
            None => Ok(()),
        }
    }

    fn on_drag_move(&mut self, target: DragTarget, delta: Vector2) -> Result<(), CanvasError> {
        match target {
            DragTarget::Canvas => self.set_pan(self.pan + delta),
            DragTarget::Screen(id) => {
                self.graph.translate(id, delta);
                self.render_position(id)
            }
        }
    }

    fn on_drag_end(
        &mut self,
        target: DragTarget,
        _delta: Vector2,
        focus: &FocusTable,
    ) -> Result<(), CanvasError> {
        let DragTarget::Screen(id) = target else {
            return Ok(());
        };
        if !self.graph.contains(id) {
            return Ok(());
        }
        let candidates = self.available(focus);
        if self.graph.connect_closest(id, candidates).is_none() {
            debug!("screen {} dropped with nothing to connect to", id);
        }
        let published = self.publish();
        self.render_position(id)?;
        published
    }
}
