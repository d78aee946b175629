// Floating hearts behind the card and the one-time confetti burst.

use std::f32::consts::{PI, TAU};
use std::ops::Range;

use bevy::prelude::*;
use bevy::ui::{UiTransform, Val2};
use rand::Rng;

use crate::random::CardRng;
use crate::screens::{Screens, SessionFlags};

pub struct DecorationsPlugin;

impl Plugin for DecorationsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DecorationConfig>()
            .add_systems(Startup, spawn_decoration_layers)
            .add_systems(OnEnter(Screens::Celebrate), launch_confetti)
            .add_systems(Update, (float_hearts, fall_confetti));
    }
}

/// Pixels a heart rises at the top of its bob.
const HEART_DRIFT: f32 = 24.0;
/// Relative size change of a heart over one pulse.
const HEART_PULSE: f32 = 0.1;
/// Confetti starts this far above the top edge, in percent of the layer height.
const CONFETTI_START_TOP: f32 = -5.0;
const CONFETTI_FALL_SPAN: f32 = 110.0;

#[derive(Resource, Debug, Clone)]
pub struct DecorationConfig {
    pub heart_count: usize,
    pub heart_size: f32,
    pub heart_color: Color,
    pub heart_opacity: Range<f32>,
    pub heart_scale: Range<f32>,
    /// Seconds per bob.
    pub heart_duration: Range<f32>,
    pub heart_delay: Range<f32>,
    pub confetti_count: usize,
    pub confetti_size: Vec2,
    pub confetti_palette: Vec<Color>,
    pub confetti_opacity: f32,
    /// Seconds per fall.
    pub confetti_duration: Range<f32>,
    pub confetti_delay: Range<f32>,
}

impl Default for DecorationConfig {
    fn default() -> Self {
        Self {
            heart_count: 18,
            heart_size: 18.0,
            heart_color: Color::srgb_u8(0xff, 0x6f, 0x91),
            heart_opacity: 0.4..0.8,
            heart_scale: 0.8..1.6,
            heart_duration: 8.0..14.0,
            heart_delay: 0.0..6.0,
            confetti_count: 120,
            confetti_size: Vec2::new(8.0, 14.0),
            confetti_palette: vec![
                Color::srgb_u8(0xff, 0x6f, 0x91),
                Color::srgb_u8(0xff, 0x9a, 0x9e),
                Color::srgb_u8(0xff, 0xd1, 0x66),
                Color::srgb_u8(0x9d, 0xd9, 0xd2),
                Color::srgb_u8(0xf8, 0xc8, 0xdc),
            ],
            confetti_opacity: 0.9,
            confetti_duration: 3.0..5.0,
            confetti_delay: 0.0..2.0,
        }
    }
}

/// Randomized presentation of one floating heart. Positions are percentages.
#[derive(Debug, Clone, PartialEq)]
pub struct HeartSpec {
    pub left: f32,
    pub top: f32,
    pub opacity: f32,
    pub scale: f32,
    pub duration: f32,
    pub delay: f32,
}

/// Randomized presentation of one confetti piece.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfettiSpec {
    pub left: f32,
    pub color: Color,
    pub duration: f32,
    pub delay: f32,
}

#[derive(Component)]
pub struct HeartsLayer;

#[derive(Component)]
pub struct ConfettiLayer;

#[derive(Component)]
pub struct FloatingHeart {
    scale: f32,
    duration: f32,
    delay: f32,
    elapsed: f32,
}

#[derive(Component)]
pub struct ConfettiPiece {
    duration: f32,
    delay: f32,
    elapsed: f32,
    spin: f32,
}

/// Uniform sample from `range` that tolerates empty ranges.
fn sample(rng: &mut impl Rng, range: &Range<f32>) -> f32 {
    range.start + rng.random::<f32>() * (range.end - range.start)
}

pub fn generate_hearts(rng: &mut impl Rng, config: &DecorationConfig) -> Vec<HeartSpec> {
    (0..config.heart_count)
        .map(|_| HeartSpec {
            left: rng.random::<f32>() * 100.0,
            top: rng.random::<f32>() * 100.0,
            opacity: sample(rng, &config.heart_opacity),
            scale: sample(rng, &config.heart_scale),
            duration: sample(rng, &config.heart_duration),
            delay: sample(rng, &config.heart_delay),
        })
        .collect()
}

/// Colours cycle through the palette by index, everything else is random.
pub fn generate_confetti(rng: &mut impl Rng, config: &DecorationConfig) -> Vec<ConfettiSpec> {
    let palette = &config.confetti_palette;
    (0..config.confetti_count)
        .map(|i| ConfettiSpec {
            left: rng.random::<f32>() * 100.0,
            color: palette
                .get(i % palette.len().max(1))
                .copied()
                .unwrap_or(Color::WHITE),
            delay: sample(rng, &config.confetti_delay),
            duration: sample(rng, &config.confetti_duration),
        })
        .collect()
}

/// Position within the current loop in [0, 1), or `None` while still delayed.
pub fn animation_phase(elapsed: f32, delay: f32, duration: f32) -> Option<f32> {
    if elapsed < delay {
        return None;
    }
    if duration <= 0.0 {
        return Some(0.0);
    }
    Some(((elapsed - delay) / duration).fract())
}

fn layer_node() -> Node {
    Node {
        width: Val::Percent(100.0),
        height: Val::Percent(100.0),
        position_type: PositionType::Absolute,
        overflow: Overflow::clip(),
        ..default()
    }
}

fn spawn_decoration_layers(
    mut commands: Commands,
    config: Res<DecorationConfig>,
    mut rng: ResMut<CardRng>,
) {
    let hearts = generate_hearts(&mut rng.0, &config);
    let size = config.heart_size;
    let color = config.heart_color;

    commands
        .spawn((HeartsLayer, layer_node(), GlobalZIndex(-1), Pickable::IGNORE))
        .with_children(|parent| {
            for heart in hearts {
                parent.spawn((
                    FloatingHeart {
                        scale: heart.scale,
                        duration: heart.duration,
                        delay: heart.delay,
                        elapsed: 0.0,
                    },
                    Node {
                        position_type: PositionType::Absolute,
                        left: Val::Percent(heart.left),
                        top: Val::Percent(heart.top),
                        width: Val::Px(size),
                        height: Val::Px(size),
                        ..default()
                    },
                    UiTransform {
                        scale: Vec2::splat(heart.scale),
                        rotation: Rot2::degrees(45.0),
                        ..default()
                    },
                    BackgroundColor(color.with_alpha(heart.opacity)),
                    Pickable::IGNORE,
                ));
            }
        });

    commands.spawn((ConfettiLayer, layer_node(), GlobalZIndex(50), Pickable::IGNORE));
}

fn launch_confetti(
    mut commands: Commands,
    mut flags: ResMut<SessionFlags>,
    config: Res<DecorationConfig>,
    mut rng: ResMut<CardRng>,
    layer: Query<Entity, With<ConfettiLayer>>,
) {
    if flags.confetti_started {
        return;
    }
    flags.confetti_started = true;

    let Ok(layer) = layer.single() else {
        return;
    };

    let pieces = generate_confetti(&mut rng.0, &config);
    info!("Launching {} confetti pieces", pieces.len());

    let size = config.confetti_size;
    let opacity = config.confetti_opacity;
    commands.entity(layer).with_children(|parent| {
        for (i, piece) in pieces.into_iter().enumerate() {
            parent.spawn((
                ConfettiPiece {
                    duration: piece.duration,
                    delay: piece.delay,
                    elapsed: 0.0,
                    spin: if i % 2 == 0 { 1.0 } else { -1.0 },
                },
                Node {
                    position_type: PositionType::Absolute,
                    left: Val::Percent(piece.left),
                    top: Val::Percent(CONFETTI_START_TOP),
                    width: Val::Px(size.x),
                    height: Val::Px(size.y),
                    ..default()
                },
                UiTransform::default(),
                BackgroundColor(piece.color.with_alpha(opacity)),
                Pickable::IGNORE,
            ));
        }
    });
}

fn float_hearts(time: Res<Time>, mut hearts: Query<(&mut FloatingHeart, &mut UiTransform)>) {
    let dt = time.delta_secs();
    for (mut heart, mut transform) in &mut hearts {
        heart.elapsed += dt;
        let Some(phase) = animation_phase(heart.elapsed, heart.delay, heart.duration) else {
            continue;
        };

        // Rise and settle once per loop, pulsing twice as fast.
        transform.translation = Val2::px(0.0, -HEART_DRIFT * (phase * PI).sin());
        transform.scale = Vec2::splat(heart.scale * (1.0 + HEART_PULSE * (phase * TAU).sin()));
    }
}

fn fall_confetti(
    time: Res<Time>,
    mut pieces: Query<(&mut ConfettiPiece, &mut Node, &mut UiTransform)>,
) {
    let dt = time.delta_secs();
    for (mut piece, mut node, mut transform) in &mut pieces {
        piece.elapsed += dt;
        let Some(phase) = animation_phase(piece.elapsed, piece.delay, piece.duration) else {
            continue;
        };

        node.top = Val::Percent(CONFETTI_START_TOP + CONFETTI_FALL_SPAN * phase);
        transform.rotation = Rot2::radians(piece.spin * phase * TAU);
    }
}
