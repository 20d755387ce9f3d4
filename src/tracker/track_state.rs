/// Controller state: whether a short-term visual tracker currently holds the puck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackState {
    /// No active short-term tracker; the candidate detector runs every frame
    #[default]
    Searching,
    /// A short-term tracker was seeded on a prior detection and is following it
    Locked,
}
