/// Coordinator phase for the detect/track lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Scanning for a new target with the motion detector
    #[default]
    Detecting,
    /// Following an acquired target with the object tracker
    Tracking,
}
