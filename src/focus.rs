//! Multi-pointer drag routing.
//!
//! Mouse and touch input are first flattened into [`PointerEvent`]s, one
//! per pointer identifier.  The [`PointerFocusRouter`] then binds each
//! identifier to at most one [`DragTarget`] for the lifetime of a gesture
//! and turns the event stream into begin / move / end calls on a
//! [`DragHost`].
//!
//! Two rules hold for the [`FocusTable`] at all times:
//!
//! * one entry per pointer identifier;
//! * one entry per target, so two fingers can never drag the same screen.
//!
//! Deltas are computed from raw screen-space positions, so panning the
//! canvas during a drag does not feed back into the next delta.

use crate::command::{Modifier, Modifiers, MouseInput, Phase, TouchInput};
use crate::render::ElementId;
use crate::screen::ScreenId;
use crate::vector::Vector2;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

/// `None` for the mouse, `Some(identifier)` for each touch contact.
pub type PointerId = Option<u32>;

/// One pointer's state change, whatever device produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub id: PointerId,
    pub phase: Phase,
    pub target: Option<ElementId>,
    /// Screen space.
    pub position: Vector2,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn from_mouse(input: &MouseInput) -> Self {
        Self {
            id: None,
            phase: input.phase,
            target: input.target,
            position: Vector2::new(input.x, input.y),
            modifiers: input.modifiers,
        }
    }

    /// One event per changed contact, in delivery order.
    pub fn from_touch(input: &TouchInput) -> impl Iterator<Item = PointerEvent> + '_ {
        input.touches.iter().map(move |touch| Self {
            id: Some(touch.identifier),
            phase: input.phase,
            target: input.target,
            position: Vector2::new(touch.x, touch.y),
            modifiers: input.modifiers,
        })
    }
}

/// What a pointer is dragging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragTarget {
    /// The canvas background; dragging it pans the view.
    Canvas,
    Screen(ScreenId),
}

impl fmt::Display for DragTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DragTarget::Canvas => write!(f, "canvas"),
            DragTarget::Screen(id) => write!(f, "screen {}", id),
        }
    }
}

/// The binding of one pointer to the target it drags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusEntry {
    pub target: DragTarget,
    /// Screen space.
    pub last_position: Vector2,
    pub last_activity: Instant,
}

/// Active drags, keyed by pointer.
#[derive(Debug, Default)]
pub struct FocusTable {
    entries: BTreeMap<PointerId, FocusEntry>,
}

impl FocusTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: PointerId) -> Option<&FocusEntry> {
        self.entries.get(&id)
    }

    /// Whether any pointer is dragging `target`.
    pub fn is_focused(&self, target: DragTarget) -> bool {
        self.entries.values().any(|e| e.target == target)
    }

    /// Screens currently being dragged.
    pub fn focused_screens(&self) -> impl Iterator<Item = ScreenId> + '_ {
        self.entries.values().filter_map(|e| match e.target {
            DragTarget::Screen(id) => Some(id),
            DragTarget::Canvas => None,
        })
    }
}

/// The side of the canvas a [`PointerFocusRouter`] drives.
///
/// The three `on_drag_*` hooks are optional capabilities: a target that
/// has nothing to do in a phase keeps the default no-op.  Hooks get the
/// focus table so they can tell which screens are still being dragged.
pub trait DragHost {
    type Error;

    /// Screen space to canvas space.
    fn localize(&self, position: Vector2) -> Vector2;

    /// Walk a raw element up to the canvas or the screen that owns it.
    fn resolve_target(&self, element: Option<ElementId>) -> DragTarget;

    /// The insert gesture: create a screen at canvas-space `at`.
    fn insert_screen(&mut self, at: Vector2, focus: &FocusTable) -> Result<(), Self::Error>;

    fn set_dragging(&mut self, target: DragTarget, dragging: bool) -> Result<(), Self::Error>;

    fn on_drag_begin(&mut self, _target: DragTarget, _delta: Vector2) -> Result<(), Self::Error> {
        Ok(())
    }

    fn on_drag_move(&mut self, _target: DragTarget, _delta: Vector2) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called while the ending entry is still in `focus`.
    fn on_drag_end(
        &mut self,
        _target: DragTarget,
        _delta: Vector2,
        _focus: &FocusTable,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Turns pointer events into per-target drag gestures.
#[derive(Debug)]
pub struct PointerFocusRouter {
    table: FocusTable,
    insert_modifier: Modifier,
}

impl PointerFocusRouter {
    pub fn new(insert_modifier: Modifier) -> Self {
        Self {
            table: FocusTable::default(),
            insert_modifier,
        }
    }

    pub fn focus(&self) -> &FocusTable {
        &self.table
    }

    /// Dispatch one event.  `now` stamps the entry for the stale sweep.
    pub fn route<H: DragHost>(
        &mut self,
        host: &mut H,
        event: &PointerEvent,
        now: Instant,
    ) -> Result<(), H::Error> {
        match event.phase {
            Phase::Down => self.begin(host, event, now),
            Phase::Move => self.drag(host, event, now),
            Phase::Up => self.end(host, event.id, event.position),
        }
    }

    fn begin<H: DragHost>(
        &mut self,
        host: &mut H,
        event: &PointerEvent,
        now: Instant,
    ) -> Result<(), H::Error> {
        if event.modifiers.contains(self.insert_modifier) {
            let at = host.localize(event.position);
            debug!("pointer {:?}: insert at {}", event.id, at);
            return host.insert_screen(at, &self.table);
        }
        if self.table.entries.contains_key(&event.id) {
            debug!("pointer {:?}: already dragging, down ignored", event.id);
            return Ok(());
        }
        let target = host.resolve_target(event.target);
        if self.table.is_focused(target) {
            debug!("pointer {:?}: {} is taken, down ignored", event.id, target);
            return Ok(());
        }

        debug!("pointer {:?}: begin {}", event.id, target);
        self.table.entries.insert(
            event.id,
            FocusEntry {
                target,
                last_position: event.position,
                last_activity: now,
            },
        );
        host.set_dragging(target, true)?;
        host.on_drag_begin(target, Vector2::ZERO)
    }

    fn drag<H: DragHost>(
        &mut self,
        host: &mut H,
        event: &PointerEvent,
        now: Instant,
    ) -> Result<(), H::Error> {
        let Some(entry) = self.table.entries.get_mut(&event.id) else {
            return Ok(());
        };
        let delta = event.position - entry.last_position;
        entry.last_position = event.position;
        entry.last_activity = now;
        let target = entry.target;
        host.on_drag_move(target, delta)
    }

    fn end<H: DragHost>(
        &mut self,
        host: &mut H,
        id: PointerId,
        position: Vector2,
    ) -> Result<(), H::Error> {
        let Some(entry) = self.table.entries.get(&id) else {
            return Ok(());
        };
        let delta = position - entry.last_position;
        let target = entry.target;
        debug!("pointer {:?}: end {}", id, target);

        let result = host
            .set_dragging(target, false)
            .and_then(|_| host.on_drag_end(target, delta, &self.table));
        // The entry goes away even if the host failed.
        self.table.entries.remove(&id);
        result
    }

    /// Force-release every entry idle for at least `timeout`, as if its
    /// pointer-up had arrived where the pointer was last seen.  Returns the
    /// number of entries released.
    pub fn expire_stale<H: DragHost>(
        &mut self,
        host: &mut H,
        now: Instant,
        timeout: Duration,
    ) -> Result<usize, H::Error> {
        let stale: Vec<(PointerId, Vector2)> = self
            .table
            .entries
            .iter()
            .filter(|(_, e)| now.saturating_duration_since(e.last_activity) >= timeout)
            .map(|(&id, e)| (id, e.last_position))
            .collect();

        let mut result = Ok(stale.len());
        for (id, position) in stale {
            warn!("pointer {:?}: no pointer-up after {:?}, releasing", id, timeout);
            if let Err(e) = self.end(host, id, position) {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    /// Drop screen entries without calling the host.  Used when the
    /// screens themselves are gone; canvas entries are kept.
    pub fn forget_screens(&mut self) -> usize {
        let before = self.table.len();
        self.table
            .entries
            .retain(|_, e| matches!(e.target, DragTarget::Canvas));
        let dropped = before - self.table.len();
        if dropped > 0 {
            warn!("dropped {} screen drag(s) in progress", dropped);
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::TouchPoint;
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Insert(Vector2),
        Dragging(DragTarget, bool),
        Begin(DragTarget, Vector2),
        Move(DragTarget, Vector2),
        /// Target, delta, entries still in the table.
        End(DragTarget, Vector2, usize),
    }

    #[derive(Default)]
    struct MockHost {
        owners: HashMap<ElementId, ScreenId>,
        calls: Vec<Call>,
    }

    impl MockHost {
        fn with_screens(ids: &[u32]) -> Self {
            let mut host = Self::default();
            for &id in ids {
                host.owners.insert(ElementId(100 + id), ScreenId(id));
            }
            host
        }

        fn ends(&self) -> Vec<&Call> {
            self.calls
                .iter()
                .filter(|c| matches!(c, Call::End(..)))
                .collect()
        }
    }

    impl DragHost for MockHost {
        type Error = ();

        fn localize(&self, position: Vector2) -> Vector2 {
            position - Vector2::new(10.0, 10.0)
        }

        fn resolve_target(&self, element: Option<ElementId>) -> DragTarget {
            element
                .and_then(|e| self.owners.get(&e).copied())
                .map_or(DragTarget::Canvas, DragTarget::Screen)
        }

        fn insert_screen(&mut self, at: Vector2, _focus: &FocusTable) -> Result<(), ()> {
            self.calls.push(Call::Insert(at));
            Ok(())
        }

        fn set_dragging(&mut self, target: DragTarget, dragging: bool) -> Result<(), ()> {
            self.calls.push(Call::Dragging(target, dragging));
            Ok(())
        }

        fn on_drag_begin(&mut self, target: DragTarget, delta: Vector2) -> Result<(), ()> {
            self.calls.push(Call::Begin(target, delta));
            Ok(())
        }

        fn on_drag_move(&mut self, target: DragTarget, delta: Vector2) -> Result<(), ()> {
            self.calls.push(Call::Move(target, delta));
            Ok(())
        }

        fn on_drag_end(
            &mut self,
            target: DragTarget,
            delta: Vector2,
            focus: &FocusTable,
        ) -> Result<(), ()> {
            self.calls.push(Call::End(target, delta, focus.len()));
            Ok(())
        }
    }

    fn event(id: PointerId, phase: Phase, target: Option<u32>, x: f64, y: f64) -> PointerEvent {
        PointerEvent {
            id,
            phase,
            target: target.map(ElementId),
            position: Vector2::new(x, y),
            modifiers: Modifiers::default(),
        }
    }

    #[test]
    fn down_then_up_ends_once_with_zero_delta() {
        let mut router = PointerFocusRouter::new(Modifier::Ctrl);
        let mut host = MockHost::with_screens(&[1]);
        let now = Instant::now();
        let screen = DragTarget::Screen(ScreenId(1));

        router
            .route(&mut host, &event(None, Phase::Down, Some(101), 50.0, 50.0), now)
            .unwrap();
        router
            .route(&mut host, &event(None, Phase::Up, Some(101), 50.0, 50.0), now)
            .unwrap();

        assert!(router.focus().is_empty());
        assert_eq!(
            host.calls,
            vec![
                Call::Dragging(screen, true),
                Call::Begin(screen, Vector2::ZERO),
                Call::Dragging(screen, false),
                Call::End(screen, Vector2::ZERO, 1),
            ]
        );
    }

    #[test]
    fn moves_report_incremental_deltas() {
        let mut router = PointerFocusRouter::new(Modifier::Ctrl);
        let mut host = MockHost::default();
        let now = Instant::now();

        for e in [
            event(None, Phase::Down, None, 10.0, 10.0),
            event(None, Phase::Move, None, 15.0, 12.0),
            event(None, Phase::Move, None, 20.0, 20.0),
            event(None, Phase::Up, None, 21.0, 20.0),
        ] {
            router.route(&mut host, &e, now).unwrap();
        }

        let canvas = DragTarget::Canvas;
        assert!(host.calls.contains(&Call::Move(canvas, Vector2::new(5.0, 2.0))));
        assert!(host.calls.contains(&Call::Move(canvas, Vector2::new(5.0, 8.0))));
        assert_eq!(host.ends(), vec![&Call::End(canvas, Vector2::new(1.0, 0.0), 1)]);
    }

    #[test]
    fn second_pointer_on_same_target_is_ignored() {
        let mut router = PointerFocusRouter::new(Modifier::Ctrl);
        let mut host = MockHost::with_screens(&[1]);
        let now = Instant::now();

        router
            .route(&mut host, &event(None, Phase::Down, Some(101), 0.0, 0.0), now)
            .unwrap();
        router
            .route(&mut host, &event(Some(0), Phase::Down, Some(101), 5.0, 5.0), now)
            .unwrap();
        router
            .route(&mut host, &event(Some(0), Phase::Move, Some(101), 9.0, 9.0), now)
            .unwrap();

        assert_eq!(router.focus().len(), 1);
        assert!(router.focus().get(Some(0)).is_none());
        let begins = host.calls.iter().filter(|c| matches!(c, Call::Begin(..))).count();
        assert_eq!(begins, 1);
        assert!(!host.calls.iter().any(|c| matches!(c, Call::Move(..))));
    }

    #[test]
    fn repeated_down_for_same_pointer_is_ignored() {
        let mut router = PointerFocusRouter::new(Modifier::Ctrl);
        let mut host = MockHost::with_screens(&[1, 2]);
        let now = Instant::now();

        router
            .route(&mut host, &event(None, Phase::Down, Some(101), 0.0, 0.0), now)
            .unwrap();
        router
            .route(&mut host, &event(None, Phase::Down, Some(102), 0.0, 0.0), now)
            .unwrap();

        assert_eq!(router.focus().len(), 1);
        assert_eq!(
            router.focus().get(None).map(|e| e.target),
            Some(DragTarget::Screen(ScreenId(1)))
        );
    }

    #[test]
    fn touches_drag_independent_targets() {
        let mut router = PointerFocusRouter::new(Modifier::Ctrl);
        let mut host = MockHost::with_screens(&[1, 2]);
        let now = Instant::now();

        router
            .route(&mut host, &event(Some(0), Phase::Down, Some(101), 0.0, 0.0), now)
            .unwrap();
        router
            .route(&mut host, &event(Some(1), Phase::Down, Some(102), 0.0, 0.0), now)
            .unwrap();
        assert_eq!(router.focus().len(), 2);
        let mut dragged: Vec<_> = router.focus().focused_screens().collect();
        dragged.sort();
        assert_eq!(dragged, vec![ScreenId(1), ScreenId(2)]);

        router
            .route(&mut host, &event(Some(0), Phase::Up, None, 0.0, 0.0), now)
            .unwrap();
        assert_eq!(router.focus().len(), 1);
        assert!(router.focus().is_focused(DragTarget::Screen(ScreenId(2))));
    }

    #[test]
    fn unknown_pointer_move_and_up_are_ignored() {
        let mut router = PointerFocusRouter::new(Modifier::Ctrl);
        let mut host = MockHost::default();
        let now = Instant::now();

        router
            .route(&mut host, &event(Some(4), Phase::Move, None, 1.0, 1.0), now)
            .unwrap();
        router
            .route(&mut host, &event(Some(4), Phase::Up, None, 1.0, 1.0), now)
            .unwrap();
        assert!(host.calls.is_empty());
    }

    #[test]
    fn insert_modifier_inserts_without_focus() {
        let mut router = PointerFocusRouter::new(Modifier::Shift);
        let mut host = MockHost::with_screens(&[1]);
        let mut e = event(None, Phase::Down, Some(101), 110.0, 60.0);
        e.modifiers.shift = true;

        router.route(&mut host, &e, Instant::now()).unwrap();

        assert!(router.focus().is_empty());
        assert_eq!(host.calls, vec![Call::Insert(Vector2::new(100.0, 50.0))]);
    }

    #[test]
    fn other_modifiers_still_drag() {
        let mut router = PointerFocusRouter::new(Modifier::Shift);
        let mut host = MockHost::default();
        let mut e = event(None, Phase::Down, None, 0.0, 0.0);
        e.modifiers.ctrl = true;

        router.route(&mut host, &e, Instant::now()).unwrap();
        assert_eq!(router.focus().len(), 1);
    }

    #[test]
    fn stale_entries_are_released_with_zero_delta() {
        let mut router = PointerFocusRouter::new(Modifier::Ctrl);
        let mut host = MockHost::with_screens(&[1]);
        let start = Instant::now();
        let later = start + Duration::from_secs(5);

        router
            .route(&mut host, &event(Some(0), Phase::Down, Some(101), 0.0, 0.0), start)
            .unwrap();
        router
            .route(&mut host, &event(Some(0), Phase::Move, None, 30.0, 0.0), start)
            .unwrap();
        router
            .route(&mut host, &event(Some(1), Phase::Down, None, 0.0, 0.0), later)
            .unwrap();

        let released = router
            .expire_stale(&mut host, later, Duration::from_secs(2))
            .unwrap();

        assert_eq!(released, 1);
        assert_eq!(router.focus().len(), 1);
        assert_eq!(
            router.focus().get(Some(1)).map(|e| e.target),
            Some(DragTarget::Canvas)
        );
        assert_eq!(
            host.ends(),
            vec![&Call::End(DragTarget::Screen(ScreenId(1)), Vector2::ZERO, 2)]
        );
    }

    #[test]
    fn forget_screens_keeps_canvas_pan() {
        let mut router = PointerFocusRouter::new(Modifier::Ctrl);
        let mut host = MockHost::with_screens(&[1]);
        let now = Instant::now();

        router
            .route(&mut host, &event(Some(0), Phase::Down, Some(101), 0.0, 0.0), now)
            .unwrap();
        router
            .route(&mut host, &event(Some(1), Phase::Down, None, 0.0, 0.0), now)
            .unwrap();

        assert_eq!(router.forget_screens(), 1);
        assert!(router.focus().is_focused(DragTarget::Canvas));
        assert_eq!(router.focus().focused_screens().count(), 0);
    }

    #[test]
    fn touch_input_fans_out_per_contact() {
        let input = TouchInput {
            phase: Phase::Move,
            target: Some(ElementId(3)),
            touches: vec![
                TouchPoint { identifier: 7, x: 1.0, y: 2.0 },
                TouchPoint { identifier: 9, x: 3.0, y: 4.0 },
            ],
            modifiers: Modifiers::default(),
        };
        let events: Vec<_> = PointerEvent::from_touch(&input).collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, Some(7));
        assert_eq!(events[1].position, Vector2::new(3.0, 4.0));
        assert!(events.iter().all(|e| e.target == Some(ElementId(3))));

        let mouse = MouseInput {
            phase: Phase::Up,
            target: None,
            x: 5.0,
            y: 6.0,
            modifiers: Modifiers::default(),
        };
        assert_eq!(PointerEvent::from_mouse(&mouse).id, None);
    }
}
