/// Load state of the game's display assets. The view stays blank until the
/// load settles either way.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AssetStatus {
    #[default]
    Loading,
    Loaded,
    Failed(String),
}

impl AssetStatus {
    pub fn is_settled(&self) -> bool {
        !matches!(self, AssetStatus::Loading)
    }
}
