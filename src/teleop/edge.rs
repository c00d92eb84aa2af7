//! # Rising-Edge Detection
//!
//! One-shot button actions fire once per press, not once per frame the
//! button is held.

/// Rising-edge detector for one button.
///
/// The detector latches when it reports a trigger and unlatches as soon as
/// it observes the button released.
///
/// # Examples
///
/// ```
/// use joy_teleop::teleop::edge::Edge;
///
/// let mut edge = Edge::new();
/// assert!(edge.observe(true));   // press
/// assert!(!edge.observe(true));  // held
/// assert!(!edge.observe(false)); // release
/// assert!(edge.observe(true));   // press again
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Edge {
    latched: bool,
}

impl Edge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` on a fresh press.
    pub fn observe(&mut self, pressed: bool) -> bool {
        self.observe_if(pressed, || true)
    }

    /// Like [`observe`](Self::observe), but the press only counts when
    /// `accept` returns `true`.
    ///
    /// A refused press does not latch, so a held button keeps re-trying on
    /// every frame until it is accepted or released. `accept` is only called
    /// for an unlatched press.
    pub fn observe_if<F>(&mut self, pressed: bool, accept: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        if !pressed {
            self.latched = false;
            return false;
        }

        if self.latched || !accept() {
            return false;
        }

        self.latched = true;
        true
    }

    /// `true` while a triggered press is still held.
    #[must_use]
    pub fn is_latched(&self) -> bool {
        self.latched
    }
}
