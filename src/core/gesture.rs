//! Boundary between the rendering layer and the association core.
//!
//! The UI feeds raw pointer events in; four abstract signals come out.
//! Nothing here knows about courses beyond the ids carried in the payloads.

use crate::domain::model::{CourseId, ModuleId};
use serde::{Deserialize, Serialize};

/// What is being dragged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DragSource {
    /// A module card from the unassigned / all-modules pool.
    Pool { module_id: ModuleId },
    /// A module row inside a course's ordered list.
    CourseItem {
        course_id: CourseId,
        module_id: ModuleId,
        index: usize,
    },
}

impl DragSource {
    pub fn module_id(&self) -> &ModuleId {
        match self {
            DragSource::Pool { module_id } | DragSource::CourseItem { module_id, .. } => module_id,
        }
    }
}

/// Where it can land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropTarget {
    /// The course card or header as a whole.
    Course { course_id: CourseId },
    /// A position inside a course's list.
    Slot { course_id: CourseId, index: usize },
}

impl DropTarget {
    pub fn course_id(&self) -> &CourseId {
        match self {
            DropTarget::Course { course_id } | DropTarget::Slot { course_id, .. } => course_id,
        }
    }
}

/// Raw events as the UI framework reports them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerEvent {
    Pressed { source: DragSource },
    Moved { over: Option<DropTarget> },
    Released { over: Option<DropTarget> },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragSignal {
    DragStart(DragSource),
    DragOver(DropTarget),
    Drop(DropTarget),
    /// Emitted once per gesture, dropped or not.
    DragEnd,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum GestureState {
    #[default]
    Idle,
    Dragging {
        over: Option<DropTarget>,
    },
}

#[derive(Debug, Default)]
pub struct DragGestureAdapter {
    state: GestureState,
}

impl DragGestureAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, GestureState::Dragging { .. })
    }

    /// Target currently highlighted by the last `DragOver`.
    pub fn hovered(&self) -> Option<&DropTarget> {
        match &self.state {
            GestureState::Dragging { over } => over.as_ref(),
            GestureState::Idle => None,
        }
    }

    pub fn feed(&mut self, event: PointerEvent) -> Vec<DragSignal> {
        let (next, signals) = match (std::mem::take(&mut self.state), event) {
            (GestureState::Idle, PointerEvent::Pressed { source }) => (
                GestureState::Dragging { over: None },
                vec![DragSignal::DragStart(source)],
            ),
            (GestureState::Idle, other) => {
                tracing::trace!("Ignoring {:?} without an active drag", other);
                (GestureState::Idle, Vec::new())
            }
            (dragging @ GestureState::Dragging { .. }, PointerEvent::Pressed { .. }) => {
                tracing::trace!("Ignoring press while a drag is in progress");
                (dragging, Vec::new())
            }
            (GestureState::Dragging { over }, PointerEvent::Moved { over: next }) => {
                let signals = if over == next {
                    Vec::new()
                } else {
                    next.clone().map(DragSignal::DragOver).into_iter().collect()
                };
                (GestureState::Dragging { over: next }, signals)
            }
            (GestureState::Dragging { .. }, PointerEvent::Released { over }) => {
                let mut signals: Vec<DragSignal> = over.map(DragSignal::Drop).into_iter().collect();
                signals.push(DragSignal::DragEnd);
                (GestureState::Idle, signals)
            }
            (GestureState::Dragging { .. }, PointerEvent::Cancelled) => {
                (GestureState::Idle, vec![DragSignal::DragEnd])
            }
        };
        self.state = next;
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(module: &str) -> DragSource {
        DragSource::Pool {
            module_id: module.into(),
        }
    }

    fn course(course: &str) -> DropTarget {
        DropTarget::Course {
            course_id: course.into(),
        }
    }

    #[test]
    fn test_full_drop_sequence() {
        let mut adapter = DragGestureAdapter::new();

        assert_eq!(
            adapter.feed(PointerEvent::Pressed { source: pool("m1") }),
            vec![DragSignal::DragStart(pool("m1"))]
        );
        assert_eq!(
            adapter.feed(PointerEvent::Moved {
                over: Some(course("c1"))
            }),
            vec![DragSignal::DragOver(course("c1"))]
        );
        assert_eq!(adapter.hovered(), Some(&course("c1")));
        assert_eq!(
            adapter.feed(PointerEvent::Released {
                over: Some(course("c1"))
            }),
            vec![DragSignal::Drop(course("c1")), DragSignal::DragEnd]
        );
        assert!(!adapter.is_dragging());
        assert_eq!(adapter.hovered(), None);
    }

    #[test]
    fn test_repeated_hover_is_deduplicated_and_last_wins() {
        let mut adapter = DragGestureAdapter::new();
        adapter.feed(PointerEvent::Pressed { source: pool("m1") });

        adapter.feed(PointerEvent::Moved {
            over: Some(course("c1")),
        });
        assert!(adapter
            .feed(PointerEvent::Moved {
                over: Some(course("c1"))
            })
            .is_empty());
        assert_eq!(
            adapter.feed(PointerEvent::Moved {
                over: Some(course("c2"))
            }),
            vec![DragSignal::DragOver(course("c2"))]
        );
        assert!(adapter.feed(PointerEvent::Moved { over: None }).is_empty());
        assert_eq!(adapter.hovered(), None);
    }

    #[test]
    fn test_release_off_target_and_cancel_only_end() {
        let mut adapter = DragGestureAdapter::new();
        adapter.feed(PointerEvent::Pressed { source: pool("m1") });
        assert_eq!(
            adapter.feed(PointerEvent::Released { over: None }),
            vec![DragSignal::DragEnd]
        );

        adapter.feed(PointerEvent::Pressed { source: pool("m2") });
        adapter.feed(PointerEvent::Moved {
            over: Some(course("c1")),
        });
        assert_eq!(adapter.feed(PointerEvent::Cancelled), vec![DragSignal::DragEnd]);
        assert_eq!(adapter.hovered(), None);
    }

    #[test]
    fn test_events_without_drag_are_ignored() {
        let mut adapter = DragGestureAdapter::new();
        assert!(adapter.feed(PointerEvent::Cancelled).is_empty());
        assert!(adapter
            .feed(PointerEvent::Released {
                over: Some(course("c1"))
            })
            .is_empty());

        adapter.feed(PointerEvent::Pressed { source: pool("m1") });
        assert!(adapter
            .feed(PointerEvent::Pressed { source: pool("m2") })
            .is_empty());
    }
}
