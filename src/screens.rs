/// Card screens and the one-shot session flags.
use bevy::prelude::*;
use strum::{AsRefStr, Display, EnumIter, EnumString};

#[derive(
    Debug, Clone, Copy, Default, Eq, PartialEq, Hash, States, EnumIter, EnumString, AsRefStr, Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum Screens {
    #[default]
    Intro,
    Message,
    Question,
    Celebrate,
}

impl Screens {
    /// Resolve a screen by its lowercase name.
    pub fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

/// Flags that flip to true once per session and are never reset.
#[derive(Resource, Default, Debug)]
pub struct SessionFlags {
    pub music_started: bool,
    pub confetti_started: bool,
}
