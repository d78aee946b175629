// Background music: start on first interaction, frame-driven volume fades, mute toggle.

use std::time::Duration;

use bevy::audio::{AudioSinkPlayback, Volume};
use bevy::prelude::*;

use crate::navigation::{CardButton, NORMAL_BUTTON};
use crate::screens::SessionFlags;

pub struct MusicPlugin;

impl Plugin for MusicPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MusicSettings>()
            .init_resource::<MusicController>()
            .add_message::<MusicRequest>()
            .add_systems(Startup, (spawn_music, spawn_music_toggle))
            .add_systems(
                Update,
                (
                    music_toggle_button,
                    handle_music_requests,
                    advance_fade,
                    sync_sink,
                    update_toggle_label.run_if(resource_changed::<MusicController>),
                )
                    .chain(),
            );
    }
}

#[derive(Resource, Debug, Clone)]
pub struct MusicSettings {
    /// Asset path of the looping track. `None` disables music entirely.
    pub track: Option<String>,
    pub target_volume: f32,
    /// Unmuting below this volume fades back up to `target_volume`.
    pub audible_floor: f32,
    pub fade_in: Duration,
    pub unmute_fade: Duration,
}

impl Default for MusicSettings {
    fn default() -> Self {
        Self {
            track: Some("audio/theme.ogg".to_owned()),
            target_volume: 0.45,
            audible_floor: 0.4,
            fade_in: Duration::from_millis(1200),
            unmute_fade: Duration::from_millis(600),
        }
    }
}

#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicRequest {
    /// Sent by the intro's Start button.
    Start,
    /// Sent by the music toggle button.
    Toggle,
}

#[derive(Component)]
pub struct BackgroundMusic;

#[derive(Component)]
struct MusicToggle;

#[derive(Component)]
struct MusicToggleLabel;

/// Linear ramp from `from` to `to`, advanced by frame deltas.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeFade {
    from: f32,
    to: f32,
    duration: Duration,
    elapsed: Duration,
}

impl VolumeFade {
    pub fn new(from: f32, to: f32, duration: Duration) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: Duration::ZERO,
        }
    }

    #[cfg(test)]
    pub fn target(&self) -> f32 {
        self.to
    }

    #[cfg(test)]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    pub fn volume(&self) -> f32 {
        self.from + (self.to - self.from) * self.progress()
    }

    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }

    /// Advance by one frame and return the new volume.
    pub fn step(&mut self, delta: Duration) -> f32 {
        self.elapsed += delta;
        self.volume()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicPhase {
    NotStarted,
    /// Playback requested but the sink has not started playing.
    Starting,
    PlayingUnmuted,
    PlayingMuted,
}

/// Authoritative music state. The sink mirrors it every frame.
#[derive(Resource, Debug)]
pub struct MusicController {
    volume: f32,
    muted: bool,
    playing: bool,
    /// The audio sink exists, so the track has loaded.
    sink_ready: bool,
    play_requested: bool,
    fade: Option<VolumeFade>,
}

impl Default for MusicController {
    fn default() -> Self {
        Self {
            volume: 0.0,
            muted: true,
            playing: false,
            sink_ready: false,
            play_requested: false,
            fade: None,
        }
    }
}

impl MusicController {
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn active_fade(&self) -> Option<&VolumeFade> {
        self.fade.as_ref()
    }

    pub fn phase(&self) -> MusicPhase {
        match (self.play_requested, self.playing, self.muted) {
            (false, _, _) => MusicPhase::NotStarted,
            (true, false, _) => MusicPhase::Starting,
            (true, true, true) => MusicPhase::PlayingMuted,
            (true, true, false) => MusicPhase::PlayingUnmuted,
        }
    }

    /// Playback was asked for and the sink exists, but it is still paused.
    pub fn playback_refused(&self) -> bool {
        self.play_requested && self.sink_ready && !self.playing
    }

    /// Silence, unmute, ask for playback and fade up.
    pub fn start(&mut self, settings: &MusicSettings) {
        self.volume = 0.0;
        self.muted = false;
        self.play_requested = true;
        self.fade_to(settings.target_volume, settings.fade_in);
    }

    pub fn toggle(&mut self, settings: &MusicSettings) {
        self.muted = !self.muted;
        if self.playing && !self.muted && self.volume < settings.audible_floor {
            self.fade_to(settings.target_volume, settings.unmute_fade);
        }
    }

    /// Replaces any fade in flight, starting from the current volume.
    pub fn fade_to(&mut self, target: f32, duration: Duration) {
        self.fade = Some(VolumeFade::new(self.volume, target, duration));
    }

    pub fn advance(&mut self, delta: Duration) {
        let Some(fade) = self.fade.as_mut() else {
            return;
        };
        self.volume = fade.step(delta);
        if fade.is_finished() {
            self.fade = None;
        }
    }
}

/// Apply one request. Start only ever happens once unless the sink refused to
/// play, in which case the toggle retries it. While the track is still loading
/// the toggle just mutes.
pub fn apply_request(
    request: MusicRequest,
    flags: &mut SessionFlags,
    controller: &mut MusicController,
    settings: &MusicSettings,
) {
    let start = match request {
        MusicRequest::Start => !flags.music_started,
        MusicRequest::Toggle => {
            !flags.music_started || controller.playback_refused()
        }
    };

    if start {
        controller.start(settings);
        flags.music_started = true;
    } else if request == MusicRequest::Toggle {
        controller.toggle(settings);
    }
}

pub fn toggle_label(muted: bool) -> &'static str {
    if muted { "Music: off" } else { "Music: on" }
}

fn spawn_music(mut commands: Commands, asset_server: Res<AssetServer>, settings: Res<MusicSettings>) {
    let Some(track) = settings.track.clone() else {
        info!("No music track configured");
        return;
    };

    commands.spawn((
        BackgroundMusic,
        AudioPlayer::<AudioSource>::new(asset_server.load(track)),
        PlaybackSettings::LOOP
            .paused()
            .muted()
            .with_volume(Volume::SILENT),
    ));
}

fn spawn_music_toggle(mut commands: Commands, controller: Res<MusicController>) {
    commands
        .spawn((
            MusicToggle,
            CardButton,
            Button,
            Node {
                position_type: PositionType::Absolute,
                top: Val::Px(16.0),
                right: Val::Px(16.0),
                padding: UiRect::axes(Val::Px(14.0), Val::Px(8.0)),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                border: UiRect::all(Val::Px(2.0)),
                ..default()
            },
            BorderColor::all(Color::srgba(1.0, 1.0, 1.0, 0.3)),
            BackgroundColor(NORMAL_BUTTON),
            GlobalZIndex(100),
        ))
        .with_children(|btn| {
            btn.spawn((
                MusicToggleLabel,
                Text::new(toggle_label(controller.is_muted())),
                TextFont {
                    font_size: 18.0,
                    ..default()
                },
                TextColor(Color::WHITE),
            ));
        });
}

fn music_toggle_button(
    query: Query<&Interaction, (Changed<Interaction>, With<MusicToggle>)>,
    mut requests: MessageWriter<MusicRequest>,
) {
    for interaction in &query {
        if *interaction == Interaction::Pressed {
            requests.write(MusicRequest::Toggle);
        }
    }
}

fn handle_music_requests(
    mut requests: MessageReader<MusicRequest>,
    mut flags: ResMut<SessionFlags>,
    mut controller: ResMut<MusicController>,
    settings: Res<MusicSettings>,
    music: Query<(), With<BackgroundMusic>>,
    sinks: Query<(), (With<BackgroundMusic>, With<AudioSink>)>,
) {
    for &request in requests.read() {
        if music.is_empty() {
            debug!("Ignoring {request:?}: no background music");
            continue;
        }
        apply_request(request, &mut flags, &mut controller, &settings);
        debug!("Music {request:?} -> {:?}", controller.phase());
        if controller.phase() == MusicPhase::Starting && sinks.is_empty() {
            debug!("Music sink not ready; playback starts once it is");
        }
    }
}

fn advance_fade(time: Res<Time>, mut controller: ResMut<MusicController>) {
    if controller.active_fade().is_none() {
        return;
    }
    controller.advance(time.delta());
}

fn sync_sink(
    mut controller: ResMut<MusicController>,
    mut sinks: Query<&mut AudioSink, With<BackgroundMusic>>,
) {
    let Ok(mut sink) = sinks.single_mut() else {
        return;
    };

    if controller.play_requested && sink.is_paused() {
        sink.play();
    }
    if !controller.sink_ready {
        controller.sink_ready = true;
    }
    let playing = !sink.is_paused();
    if controller.playing != playing {
        controller.playing = playing;
    }

    sink.set_volume(Volume::Linear(controller.volume));
    if sink.is_muted() != controller.muted {
        if controller.muted {
            sink.mute();
        } else {
            sink.unmute();
        }
    }
}

fn update_toggle_label(
    controller: Res<MusicController>,
    mut labels: Query<&mut Text, With<MusicToggleLabel>>,
) {
    for mut text in &mut labels {
        **text = toggle_label(controller.is_muted()).to_owned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn playing_controller(volume: f32, muted: bool) -> MusicController {
        MusicController {
            volume,
            muted,
            playing: true,
            sink_ready: true,
            play_requested: true,
            fade: None,
        }
    }

    #[test]
    fn fade_is_linear_in_progress() {
        let mut fade = VolumeFade::new(0.0, 0.45, ms(1200));
        for step in 1..=4 {
            let volume = fade.step(ms(300));
            let progress = step as f32 / 4.0;
            assert!((volume - 0.45 * progress).abs() < EPSILON, "step {step}: {volume}");
        }
        assert!(fade.is_finished());
        assert_eq!(fade.volume(), 0.45);
    }

    #[test]
    fn fade_clamps_past_its_duration() {
        let mut fade = VolumeFade::new(0.0, 0.45, ms(1200));
        assert_eq!(fade.step(ms(5000)), 0.45);
        assert_eq!(fade.progress(), 1.0);
    }

    #[test]
    fn zero_duration_fade_completes_immediately() {
        let mut fade = VolumeFade::new(0.2, 0.45, Duration::ZERO);
        assert!((fade.step(Duration::ZERO) - 0.45).abs() < EPSILON);
        assert!(fade.is_finished());
    }

    #[test]
    fn controller_drops_fade_when_done() {
        let settings = MusicSettings::default();
        let mut controller = MusicController::default();
        controller.start(&settings);
        controller.advance(ms(600));
        assert!((controller.volume() - 0.225).abs() < EPSILON);
        assert!(controller.active_fade().is_some());

        controller.advance(ms(600));
        assert!((controller.volume() - 0.45).abs() < EPSILON);
        assert!(controller.active_fade().is_none());
    }

    #[test]
    fn new_fade_replaces_the_one_in_flight() {
        let settings = MusicSettings::default();
        let mut controller = MusicController::default();
        controller.start(&settings);
        controller.advance(ms(600));
        let midway = controller.volume();

        controller.fade_to(0.1, ms(600));
        assert_eq!(controller.volume(), midway);
        let fade = controller.active_fade().unwrap();
        assert_eq!(fade.target(), 0.1);
        assert_eq!(fade.duration(), ms(600));

        controller.advance(ms(300));
        let expected = midway + (0.1 - midway) * 0.5;
        assert!((controller.volume() - expected).abs() < EPSILON);
        assert!(controller.volume() < midway);

        controller.advance(ms(300));
        assert!((controller.volume() - 0.1).abs() < EPSILON);
    }

    #[test]
    fn start_silences_unmutes_and_fades_in() {
        let settings = MusicSettings::default();
        let mut controller = playing_controller(0.3, true);
        controller.start(&settings);

        assert_eq!(controller.volume(), 0.0);
        assert!(!controller.is_muted());
        let fade = controller.active_fade().unwrap();
        assert_eq!(fade.target(), 0.45);
        assert_eq!(fade.duration(), ms(1200));
    }

    #[test]
    fn unmuting_quiet_playback_fades_back_up() {
        let settings = MusicSettings::default();
        let mut controller = playing_controller(0.2, true);
        controller.toggle(&settings);

        assert!(!controller.is_muted());
        let fade = controller.active_fade().unwrap();
        assert_eq!(fade.target(), 0.45);
        assert_eq!(fade.duration(), ms(600));
    }

    #[test]
    fn toggling_audible_playback_only_flips_mute() {
        let settings = MusicSettings::default();
        let mut controller = playing_controller(0.45, false);
        controller.toggle(&settings);
        assert!(controller.is_muted());
        assert!(controller.active_fade().is_none());

        controller.toggle(&settings);
        assert!(!controller.is_muted());
        assert!(controller.active_fade().is_none());
    }

    #[test]
    fn start_request_only_fires_once() {
        let settings = MusicSettings::default();
        let mut flags = SessionFlags::default();
        let mut controller = MusicController::default();

        apply_request(MusicRequest::Start, &mut flags, &mut controller, &settings);
        assert!(flags.music_started);
        controller.playing = true;
        controller.advance(ms(600));
        let volume = controller.volume();

        apply_request(MusicRequest::Start, &mut flags, &mut controller, &settings);
        assert_eq!(controller.volume(), volume);
        assert_eq!(controller.phase(), MusicPhase::PlayingUnmuted);
    }

    #[test]
    fn toggle_before_start_starts() {
        let settings = MusicSettings::default();
        let mut flags = SessionFlags::default();
        let mut controller = MusicController::default();
        assert_eq!(controller.phase(), MusicPhase::NotStarted);

        apply_request(MusicRequest::Toggle, &mut flags, &mut controller, &settings);
        assert!(flags.music_started);
        assert!(!controller.is_muted());
        assert_eq!(controller.phase(), MusicPhase::Starting);
        assert_eq!(controller.active_fade().unwrap().duration(), ms(1200));
    }

    #[test]
    fn toggle_retries_refused_playback() {
        let settings = MusicSettings::default();
        let mut flags = SessionFlags::default();
        let mut controller = MusicController::default();
        apply_request(MusicRequest::Start, &mut flags, &mut controller, &settings);
        controller.advance(ms(1200));
        controller.sink_ready = true;
        assert!(controller.playback_refused());

        apply_request(MusicRequest::Toggle, &mut flags, &mut controller, &settings);
        assert_eq!(controller.volume(), 0.0);
        assert!(!controller.is_muted());
        assert!(controller.active_fade().is_some());
    }

    #[test]
    fn toggle_while_track_loads_mutes_instead_of_restarting() {
        let settings = MusicSettings::default();
        let mut flags = SessionFlags::default();
        let mut controller = MusicController::default();
        apply_request(MusicRequest::Start, &mut flags, &mut controller, &settings);
        controller.advance(ms(300));
        let volume = controller.volume();
        assert!(!controller.playback_refused());

        apply_request(MusicRequest::Toggle, &mut flags, &mut controller, &settings);
        assert!(controller.is_muted());
        assert_eq!(controller.volume(), volume);
        assert_eq!(controller.phase(), MusicPhase::Starting);
        // The fade-in keeps running underneath the mute.
        assert_eq!(controller.active_fade().unwrap().duration(), ms(1200));
    }

    fn request_app(with_music: bool) -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<SessionFlags>()
            .init_resource::<MusicController>()
            .insert_resource(MusicSettings {
                track: with_music.then(|| "audio/theme.ogg".to_owned()),
                ..default()
            })
            .add_message::<MusicRequest>()
            .add_systems(Update, handle_music_requests);
        if with_music {
            app.world_mut().spawn(BackgroundMusic);
        }
        app
    }

    fn send(app: &mut App, request: MusicRequest) {
        app.world_mut().write_message(request);
        app.update();
    }

    #[test]
    fn requests_without_music_are_ignored() {
        let mut app = request_app(false);
        send(&mut app, MusicRequest::Start);
        send(&mut app, MusicRequest::Toggle);

        assert!(!app.world().resource::<SessionFlags>().music_started);
        let controller = app.world().resource::<MusicController>();
        assert_eq!(controller.phase(), MusicPhase::NotStarted);
        assert!(controller.is_muted());
        assert_eq!(controller.volume(), 0.0);
        assert!(controller.active_fade().is_none());
    }

    #[test]
    fn start_request_reaches_existing_music() {
        let mut app = request_app(true);
        send(&mut app, MusicRequest::Start);

        assert!(app.world().resource::<SessionFlags>().music_started);
        let controller = app.world().resource::<MusicController>();
        assert_eq!(controller.phase(), MusicPhase::Starting);
        assert!(!controller.is_muted());
    }

    #[test]
    fn toggle_after_playback_mutes() {
        let settings = MusicSettings::default();
        let mut flags = SessionFlags {
            music_started: true,
            ..default()
        };
        let mut controller = playing_controller(0.45, false);
        apply_request(MusicRequest::Toggle, &mut flags, &mut controller, &settings);
        assert_eq!(controller.phase(), MusicPhase::PlayingMuted);
    }

    #[test]
    fn label_reflects_mute_state() {
        assert_eq!(toggle_label(true), "Music: off");
        assert_eq!(toggle_label(false), "Music: on");
    }
}
