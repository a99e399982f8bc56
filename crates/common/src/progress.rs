//! Generic progress callback trait.
//!
//! Callbacks double as cancellation points: returning `false` asks the caller
//! to stop at the next safe boundary.

/// Generic progress callback trait.
///
/// Type parameter `T` is the progress data type, so planning, diffing and
/// execution can each report their own progress shape.
pub trait ProgressCallback<T>: Send + Sync {
    /// Called with progress updates.
    ///
    /// # Returns
    /// - `true` to continue the operation
    /// - `false` to cancel the operation at the next safe boundary
    fn on_progress(&self, progress: &T) -> bool;
}

impl<T, F> ProgressCallback<T> for F
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn on_progress(&self, progress: &T) -> bool {
        self(progress)
    }
}
