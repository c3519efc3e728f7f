use revision_range::SnapTransition;
use shared::TimeMs;
use zoon::*;

/// Move a displayed handle position along `transition`, one frame every
/// `frame_ms`. Dropping the returned handle stops the glide where it is.
pub fn glide(position: Mutable<TimeMs>, transition: SnapTransition, frame_ms: u32) -> TaskHandle {
    Task::start_droppable(async move {
        for frame in transition.frames() {
            Timer::sleep(frame_ms).await;
            position.set_neq(frame);
        }
    })
}
