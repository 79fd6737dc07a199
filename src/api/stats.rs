//! Call graph statistics.

/// A snapshot of the process-wide counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphStats {
    /// Non-root frames currently alive.
    pub live_frames: usize,

    /// Highest `live_frames` observed (high water mark).
    pub peak_live_frames: usize,

    /// Frames minted since process start.
    pub frames_created: u64,

    /// Frames destroyed since process start.
    pub frames_destroyed: u64,

    /// Calls to `begin` since process start.
    pub activations: u64,

    /// References currently held on the root, its static one included.
    pub root_refs: usize,
}

impl GraphStats {
    /// Frames created but not yet destroyed, computed from the counters.
    pub fn outstanding(&self) -> u64 {
        self.frames_created.saturating_sub(self.frames_destroyed)
    }
}

impl std::fmt::Display for GraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Call Graph Statistics:")?;
        writeln!(f, "  Live frames:  {}", self.live_frames)?;
        writeln!(f, "  Peak live:    {}", self.peak_live_frames)?;
        writeln!(f, "  Created:      {}", self.frames_created)?;
        writeln!(f, "  Destroyed:    {}", self.frames_destroyed)?;
        writeln!(f, "  Activations:  {}", self.activations)?;
        writeln!(f, "  Root refs:    {}", self.root_refs)?;
        Ok(())
    }
}
