use crate::core::gesture::{DragGestureAdapter, DragSignal, DragSource, DropTarget, PointerEvent};
use crate::core::sync::DragIntent;
use crate::domain::model::{CourseId, ModuleId};

/// Drag state of the course/module management view.
///
/// Feeds pointer events through the gesture adapter and turns a completed
/// drop into a `DragIntent`. Running the intent is left to the caller so a
/// slow remote call never blocks the next gesture.
#[derive(Debug, Default)]
pub struct ModuleBoard {
    gestures: DragGestureAdapter,
    dragging: Option<DragSource>,
}

impl ModuleBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dragging(&self) -> Option<&DragSource> {
        self.dragging.as_ref()
    }

    /// Follows the pointer; `None` once it leaves every target.
    pub fn highlighted(&self) -> Option<&DropTarget> {
        self.gestures.hovered()
    }

    pub fn handle(&mut self, event: PointerEvent) -> Option<DragIntent> {
        let mut intent = None;
        for signal in self.gestures.feed(event) {
            match signal {
                DragSignal::DragStart(source) => {
                    tracing::trace!("Drag started on module {}", source.module_id());
                    self.dragging = Some(source);
                }
                DragSignal::DragOver(target) => {
                    tracing::trace!("Dragging over course {}", target.course_id());
                }
                DragSignal::Drop(target) => {
                    intent = self.dragging.as_ref().map(|source| resolve(source, &target));
                }
                DragSignal::DragEnd => self.dragging = None,
            }
        }
        intent
    }

    /// The explicit "add to course" action outside of drag and drop.
    pub fn add_to_course(module_id: ModuleId, course_id: CourseId) -> DragIntent {
        DragIntent::Assign {
            module_id,
            course_id,
        }
    }
}

fn resolve(source: &DragSource, target: &DropTarget) -> DragIntent {
    match (source, target) {
        (
            DragSource::CourseItem {
                course_id,
                module_id,
                index,
            },
            DropTarget::Slot {
                course_id: target_course,
                index: target_index,
            },
        ) if course_id == target_course => DragIntent::Reorder {
            course_id: course_id.clone(),
            module_id: Some(module_id.clone()),
            source_index: *index,
            target_index: *target_index,
        },
        // anything else is a membership; the position is always the end
        _ => DragIntent::Assign {
            module_id: source.module_id().clone(),
            course_id: target.course_id().clone(),
        },
    }
}
