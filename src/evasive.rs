// The shy "No" button: hops away whenever the pointer gets close.

use bevy::input::touch::{TouchInput, TouchPhase};
use bevy::prelude::*;
use bevy::ui::{ComputedNode, UiGlobalTransform, UiTransform, Val2};
use bevy::window::CursorMoved;
use rand::Rng;

use crate::random::CardRng;
use crate::screens::Screens;

pub struct EvasivePlugin;

impl Plugin for EvasivePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<EvasiveConfig>().add_systems(
            Update,
            (evade_pointer, evade_touch).run_if(in_state(Screens::Question)),
        );
    }
}

#[derive(Resource, Debug, Clone)]
pub struct EvasiveConfig {
    /// Pointer distance from the button centre that triggers a hop.
    pub proximity: f32,
    /// Space kept between the button and the far edges of the area.
    pub margin: f32,
    /// Vertical range is divided by this to keep the button within reach.
    pub vertical_damping: f32,
}

impl Default for EvasiveConfig {
    fn default() -> Self {
        Self {
            proximity: 140.0,
            margin: 16.0,
            vertical_damping: 1.2,
        }
    }
}

/// The container the button may roam in.
#[derive(Component)]
pub struct QuestionArea;

#[derive(Component)]
pub struct EvasiveButton;

pub fn within_reach(pointer: Vec2, center: Vec2, proximity: f32) -> bool {
    pointer.distance(center) < proximity
}

/// Pick a new translation for a button laid out at `layout` so that it ends up
/// inside `area` shrunk by the margin. Horizontal offsets are uniform over the
/// free width, vertical offsets favour small downward moves.
pub fn evasive_offset(rng: &mut impl Rng, area: Rect, layout: Rect, config: &EvasiveConfig) -> Vec2 {
    let lo = area.min + config.margin - layout.min;
    let hi = area.max - config.margin - layout.max;

    // A button wider or taller than the padded area is centred on that axis.
    let dx = if hi.x >= lo.x {
        (lo.x + rng.random::<f32>() * (hi.x - lo.x)).min(hi.x)
    } else {
        (lo.x + hi.x) / 2.0
    };
    let dy = if hi.y >= lo.y {
        let floor = lo.y.max(0.0).min(hi.y);
        (floor + rng.random::<f32>() * (hi.y - floor) / config.vertical_damping).min(hi.y)
    } else {
        (lo.y + hi.y) / 2.0
    };
    Vec2::new(dx, dy)
}

/// Logical-pixel rectangle covered by a laid-out node.
fn node_rect(node: &ComputedNode, transform: &UiGlobalTransform) -> Rect {
    let scale = node.inverse_scale_factor();
    Rect::from_center_size(transform.translation * scale, node.size() * scale)
}

/// Pixel offset currently applied to a node.
fn current_offset(transform: &UiTransform) -> Vec2 {
    let px = |val: Val| match val {
        Val::Px(v) => v,
        _ => 0.0,
    };
    Vec2::new(px(transform.translation.x), px(transform.translation.y))
}

/// Move the button, whose on-screen rect is `button`, somewhere else in `area`.
fn hop(rng: &mut impl Rng, area: Rect, button: Rect, config: &EvasiveConfig, offset: &mut UiTransform) {
    let shift = current_offset(offset);
    let layout = Rect {
        min: button.min - shift,
        max: button.max - shift,
    };
    let next = evasive_offset(rng, area, layout, config);
    offset.translation = Val2::px(next.x, next.y);
}

fn evade_pointer(
    mut cursor: MessageReader<CursorMoved>,
    config: Res<EvasiveConfig>,
    mut rng: ResMut<CardRng>,
    area: Query<(&ComputedNode, &UiGlobalTransform), With<QuestionArea>>,
    mut button: Query<(&ComputedNode, &UiGlobalTransform, &mut UiTransform), With<EvasiveButton>>,
) {
    let Some(pointer) = cursor.read().last().map(|moved| moved.position) else {
        return;
    };
    let Ok((area_node, area_transform)) = area.single() else {
        return;
    };
    let Ok((node, transform, mut offset)) = button.single_mut() else {
        return;
    };

    let area_rect = node_rect(area_node, area_transform);
    if !area_rect.contains(pointer) {
        return;
    }
    let button_rect = node_rect(node, transform);
    if within_reach(pointer, button_rect.center(), config.proximity) {
        hop(&mut rng.0, area_rect, button_rect, &config, &mut offset);
    }
}

/// Touch screens have no hover, so any touch landing on the button moves it.
fn evade_touch(
    mut touches: MessageReader<TouchInput>,
    config: Res<EvasiveConfig>,
    mut rng: ResMut<CardRng>,
    area: Query<(&ComputedNode, &UiGlobalTransform), With<QuestionArea>>,
    mut button: Query<(&ComputedNode, &UiGlobalTransform, &mut UiTransform), With<EvasiveButton>>,
) {
    let started: Vec<Vec2> = touches
        .read()
        .filter(|touch| touch.phase == TouchPhase::Started)
        .map(|touch| touch.position)
        .collect();
    if started.is_empty() {
        return;
    }
    let Ok((area_node, area_transform)) = area.single() else {
        return;
    };
    let Ok((node, transform, mut offset)) = button.single_mut() else {
        return;
    };

    let button_rect = node_rect(node, transform);
    if started.iter().any(|&position| button_rect.contains(position)) {
        let area_rect = node_rect(area_node, area_transform);
        hop(&mut rng.0, area_rect, button_rect, &config, &mut offset);
    }
}
