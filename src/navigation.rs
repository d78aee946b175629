// Card pages and the buttons that move between them.

use bevy::prelude::*;
use bevy::ui::UiTransform;
use strum::IntoEnumIterator;

use crate::evasive::{EvasiveButton, QuestionArea};
use crate::music::MusicRequest;
use crate::screens::{Screens, SessionFlags};

pub struct NavigationPlugin;

impl Plugin for NavigationPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<RequestScreen>()
            .add_systems(Startup, spawn_pages)
            .add_systems(
                Update,
                (
                    button_visuals,
                    (advance_buttons, apply_screen_requests).chain(),
                    show_active_screen.run_if(state_changed::<Screens>),
                ),
            );
    }
}

pub const NORMAL_BUTTON: Color = Color::srgb(0.85, 0.33, 0.47);
const HOVERED_BUTTON: Color = Color::srgb(0.92, 0.42, 0.56);
const PRESSED_BUTTON: Color = Color::srgb(0.70, 0.24, 0.37);
const INK: Color = Color::srgb(0.45, 0.10, 0.22);

/// Ask to show the screen with this name.
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct RequestScreen(pub String);

/// Any clickable button on the card; gets hover and press colours.
#[derive(Component)]
pub struct CardButton;

/// Button that requests a screen by name when pressed.
#[derive(Component)]
pub struct AdvanceButton(pub Screens);

/// Root node of one page.
#[derive(Component)]
pub struct ScreenPage(pub Screens);

fn spawn_pages(mut commands: Commands) {
    for screen in Screens::iter() {
        let mut page = commands.spawn((
            ScreenPage(screen),
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                position_type: PositionType::Absolute,
                flex_direction: FlexDirection::Column,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                row_gap: Val::Px(24.0),
                display: Display::None,
                ..default()
            },
        ));

        match screen {
            Screens::Intro => {
                page.with_children(|parent| {
                    spawn_heading(parent, "Hey you", 56.0);
                    spawn_line(parent, "I made you a little something.");
                    spawn_button(parent, "Start", AdvanceButton(Screens::Message));
                });
            }
            Screens::Message => {
                page.with_children(|parent| {
                    spawn_heading(parent, "Every day with you", 40.0);
                    for line in [
                        "is warmer, funnier and a little brighter.",
                        "So I have one important question...",
                    ] {
                        spawn_line(parent, line);
                    }
                    spawn_button(parent, "Continue", AdvanceButton(Screens::Question));
                });
            }
            Screens::Question => {
                page.insert(QuestionArea).with_children(|parent| {
                    spawn_heading(parent, "Will you be my Valentine?", 44.0);
                    parent
                        .spawn(Node {
                            column_gap: Val::Px(32.0),
                            ..default()
                        })
                        .with_children(|row| {
                            spawn_button(row, "Yes", AdvanceButton(Screens::Celebrate));
                            spawn_button(row, "No", (EvasiveButton, UiTransform::default()));
                        });
                });
            }
            Screens::Celebrate => {
                page.with_children(|parent| {
                    spawn_heading(parent, "Yay!", 64.0);
                    spawn_line(parent, "Best answer ever. See you on the 14th.");
                    spawn_button(parent, "Again", AdvanceButton(Screens::Intro));
                });
            }
        }
    }
}

fn spawn_heading(parent: &mut ChildSpawnerCommands, text: &str, size: f32) {
    parent.spawn((
        Text::new(text),
        TextFont {
            font_size: size,
            ..default()
        },
        TextColor(INK),
    ));
}

fn spawn_line(parent: &mut ChildSpawnerCommands, text: &str) {
    parent.spawn((
        Text::new(text),
        TextFont {
            font_size: 22.0,
            ..default()
        },
        TextColor(INK),
    ));
}

fn spawn_button(parent: &mut ChildSpawnerCommands, label: &str, marker: impl Bundle) {
    parent
        .spawn((
            marker,
            CardButton,
            Button,
            Node {
                width: Val::Px(160.0),
                height: Val::Px(50.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                border: UiRect::all(Val::Px(2.0)),
                ..default()
            },
            BorderColor::all(Color::srgba(1.0, 1.0, 1.0, 0.3)),
            BackgroundColor(NORMAL_BUTTON),
        ))
        .with_children(|btn| {
            btn.spawn((
                Text::new(label),
                TextFont {
                    font_size: 24.0,
                    ..default()
                },
                TextColor(Color::WHITE),
            ));
        });
}

fn button_visuals(
    mut query: Query<
        (&Interaction, &mut BackgroundColor, &mut BorderColor),
        (Changed<Interaction>, With<CardButton>),
    >,
) {
    for (interaction, mut bg, mut border) in &mut query {
        match *interaction {
            Interaction::Pressed => {
                *bg = PRESSED_BUTTON.into();
                *border = BorderColor::all(Color::WHITE);
            }
            Interaction::Hovered => {
                *bg = HOVERED_BUTTON.into();
                *border = BorderColor::all(Color::WHITE);
            }
            Interaction::None => {
                *bg = NORMAL_BUTTON.into();
                *border = BorderColor::all(Color::srgba(1.0, 1.0, 1.0, 0.3));
            }
        }
    }
}

fn advance_buttons(
    query: Query<(&Interaction, &AdvanceButton), Changed<Interaction>>,
    flags: Res<SessionFlags>,
    mut screens: MessageWriter<RequestScreen>,
    mut music: MessageWriter<MusicRequest>,
) {
    for (interaction, AdvanceButton(target)) in &query {
        if *interaction != Interaction::Pressed {
            continue;
        }
        // Music begins with the first step into the card.
        if !flags.music_started && *target == Screens::Message {
            music.write(MusicRequest::Start);
        }
        let name: &str = target.as_ref();
        screens.write(RequestScreen(name.to_owned()));
    }
}

fn apply_screen_requests(
    mut requests: MessageReader<RequestScreen>,
    mut next_screen: ResMut<NextState<Screens>>,
) {
    for RequestScreen(name) in requests.read() {
        match Screens::from_name(name) {
            Some(screen) => {
                next_screen.set(screen);
            }
            None => warn!("Unknown screen {name:?}, keeping the current one"),
        }
    }
}

fn show_active_screen(current: Res<State<Screens>>, mut pages: Query<(&ScreenPage, &mut Node)>) {
    let current = *current.get();
    info!("Showing {current} screen");
    for (page, mut node) in &mut pages {
        node.display = if page.0 == current {
            Display::Flex
        } else {
            Display::None
        };
    }
}
