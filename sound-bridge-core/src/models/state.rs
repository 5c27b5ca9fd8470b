/// Filter lifecycle state.
///
/// State transitions (reusable across runs):
/// ```text
/// uninitialized → preprocessing → running → postprocessing → uninitialized
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterState {
    #[default]
    Uninitialized,
    Preprocessing,
    Running,
    Postprocessing,
}

impl FilterState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Uninitialized)
    }
}
