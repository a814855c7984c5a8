/// Package version with the git revision it was built from.
pub const FULL: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "+git.",
    env!("ADRKIT_GIT_COUNT"),
    ".",
    env!("ADRKIT_GIT_SHA"),
    env!("ADRKIT_GIT_DIRTY")
);
