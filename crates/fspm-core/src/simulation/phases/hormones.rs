use super::super::Step;

impl Step<'_> {
    /// Recompute auxin, cytokinin and transport-derived activation potentials.
    ///
    /// Sag angles read here are the ones left by the previous step's carbon phase.
    pub(in crate::simulation) fn hormone_phase(&mut self) {
        self.physiology.transport_hormones(self.tree);
    }
}
