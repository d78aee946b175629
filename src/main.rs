// Main
mod decorations;
mod evasive;
mod music;
mod navigation;
mod random;
mod screens;

use bevy::prelude::*;
use decorations::DecorationsPlugin;
use evasive::EvasivePlugin;
use music::MusicPlugin;
use navigation::NavigationPlugin;
use random::CardRng;
use screens::{Screens, SessionFlags};

const BLUSH: Color = Color::srgb(1.0, 0.89, 0.92);

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "For you".into(),
                fit_canvas_to_parent: true,
                ..default()
            }),
            ..default()
        }))
        .insert_resource(ClearColor(BLUSH))
        .init_state::<Screens>()
        .init_resource::<SessionFlags>()
        .init_resource::<CardRng>()
        .add_systems(Startup, spawn_camera)
        .add_plugins((
            DecorationsPlugin,
            NavigationPlugin,
            EvasivePlugin,
            MusicPlugin,
        ))
        .run();
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}
