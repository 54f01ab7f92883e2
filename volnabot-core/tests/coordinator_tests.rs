//! Coordinator behavior against scripted fake transports.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker};
use uuid::Uuid;

use volnabot_common::error::Error;
use volnabot_common::models::playback::ControlMessageRef;
use volnabot_common::models::station::Station;
use volnabot_common::traits::surface_traits::ControlSurface;
use volnabot_common::traits::voice_traits::{StreamEnded, VoiceTransport};
use volnabot_core::catalog::StationCatalog;
use volnabot_core::icy::IcyTitleFetcher;
use volnabot_core::services::playback::{PlaybackCoordinator, SwitchDirection};

use tokio_test::assert_ok;

#[derive(Default)]
struct FakeVoice {
    ops: Mutex<Vec<String>>,
    current: Mutex<Option<Uuid>>,
    connect_failures: Mutex<u32>,
    fail_start: Mutex<bool>,
}

impl FakeVoice {
    fn ops(&self) -> Vec<String> {
        self.ops.lock().clone()
    }
}

#[async_trait]
impl VoiceTransport for FakeVoice {
    async fn connect(
        &self,
        guild_id: Id<GuildMarker>,
        _channel_id: Id<ChannelMarker>,
    ) -> Result<(), Error> {
        {
            let mut failures = self.connect_failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(Error::Platform("connect refused".to_string()));
            }
        }
        self.ops.lock().push(format!("connect {guild_id}"));
        Ok(())
    }

    async fn disconnect(&self, guild_id: Id<GuildMarker>) -> Result<(), Error> {
        self.ops.lock().push(format!("disconnect {guild_id}"));
        *self.current.lock() = None;
        Ok(())
    }

    async fn start_stream(&self, guild_id: Id<GuildMarker>, url: &str) -> Result<Uuid, Error> {
        if *self.fail_start.lock() {
            return Err(Error::Platform("decoder refused".to_string()));
        }
        let stream_id = Uuid::new_v4();
        self.ops.lock().push(format!("start {guild_id} {url}"));
        *self.current.lock() = Some(stream_id);
        Ok(stream_id)
    }

    async fn stop_stream(&self, guild_id: Id<GuildMarker>) -> Result<(), Error> {
        self.ops.lock().push(format!("stop {guild_id}"));
        *self.current.lock() = None;
        Ok(())
    }

    async fn set_stream_paused(
        &self,
        guild_id: Id<GuildMarker>,
        paused: bool,
    ) -> Result<(), Error> {
        self.ops.lock().push(format!("pause {guild_id} {paused}"));
        Ok(())
    }

    fn current_stream(&self, _guild_id: Id<GuildMarker>) -> Option<Uuid> {
        *self.current.lock()
    }
}

#[derive(Default)]
struct FakeSurface {
    ops: Mutex<Vec<String>>,
    next_message_id: Mutex<u64>,
    presence: Mutex<Option<String>>,
    fail_edit: Mutex<bool>,
}

impl FakeSurface {
    fn ops(&self) -> Vec<String> {
        self.ops.lock().clone()
    }
}

#[async_trait]
impl ControlSurface for FakeSurface {
    async fn publish_controls(
        &self,
        channel_id: Id<ChannelMarker>,
        content: &str,
    ) -> Result<ControlMessageRef, Error> {
        let message_id = {
            let mut next = self.next_message_id.lock();
            *next += 1;
            Id::<MessageMarker>::new(100 + *next)
        };
        self.ops.lock().push(format!("publish {content}"));
        Ok(ControlMessageRef {
            channel_id,
            message_id,
            last_rendered: String::new(),
        })
    }

    async fn edit_controls(&self, _target: &ControlMessageRef, content: &str) -> Result<(), Error> {
        if *self.fail_edit.lock() {
            return Err(Error::NotificationDelivery("message gone".to_string()));
        }
        self.ops.lock().push(format!("edit {content}"));
        Ok(())
    }

    async fn delete_controls(&self, target: &ControlMessageRef) -> Result<(), Error> {
        self.ops.lock().push(format!("delete {}", target.message_id));
        Ok(())
    }

    async fn post_notice(&self, _channel_id: Id<ChannelMarker>, text: &str) -> Result<(), Error> {
        self.ops.lock().push(format!("notice {text}"));
        Ok(())
    }

    fn update_presence(&self, text: Option<&str>) -> Result<(), Error> {
        *self.presence.lock() = text.map(str::to_string);
        Ok(())
    }
}

fn guild() -> Id<GuildMarker> {
    Id::new(1)
}

fn text_channel() -> Id<ChannelMarker> {
    Id::new(10)
}

fn voice_channel() -> Option<Id<ChannelMarker>> {
    Some(Id::new(20))
}

fn test_catalog() -> Arc<StationCatalog> {
    Arc::new(StationCatalog::new(vec![
        Station {
            name: "record".to_string(),
            url: "http://stream/a".to_string(),
        },
        Station {
            name: "mix".to_string(),
            url: "http://stream/b".to_string(),
        },
    ]))
}

fn coordinator() -> (Arc<PlaybackCoordinator>, Arc<FakeVoice>, Arc<FakeSurface>) {
    let voice = Arc::new(FakeVoice::default());
    let surface = Arc::new(FakeSurface::default());
    let coordinator = Arc::new(PlaybackCoordinator::new(
        test_catalog(),
        voice.clone(),
        surface.clone(),
        Arc::new(IcyTitleFetcher::new()),
    ));
    (coordinator, voice, surface)
}

#[tokio::test]
async fn start_installs_state_and_controls() {
    let (coordinator, _voice, surface) = coordinator();

    assert_ok!(
        coordinator
            .start(guild(), text_channel(), voice_channel(), 0)
            .await
    );

    let state = coordinator.snapshot(guild()).expect("state installed");
    assert_eq!(state.station_index, 0);
    assert!(!state.paused);
    assert!(state.current_track.is_none());
    assert!(state.controls.is_some());
    assert!(surface.ops().iter().any(|op| op.starts_with("publish")));
    assert!(surface.presence.lock().is_some());
}

#[tokio::test]
async fn start_without_voice_channel_changes_nothing() {
    let (coordinator, voice, _surface) = coordinator();

    let err = coordinator
        .start(guild(), text_channel(), None, 0)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NoVoiceChannel));
    assert!(coordinator.snapshot(guild()).is_none());
    assert!(voice.ops().is_empty());
}

#[tokio::test]
async fn stop_removes_state_and_controls_and_is_idempotent() {
    let (coordinator, voice, surface) = coordinator();

    coordinator
        .start(guild(), text_channel(), voice_channel(), 0)
        .await
        .unwrap();
    assert!(coordinator.stop(guild()).await.unwrap());

    assert!(coordinator.snapshot(guild()).is_none());
    assert!(voice.ops().iter().any(|op| op.starts_with("disconnect")));
    assert!(surface.ops().iter().any(|op| op.starts_with("delete")));
    assert!(surface.presence.lock().is_none());

    // Second stop is a safe no-op.
    assert!(!coordinator.stop(guild()).await.unwrap());
}

#[tokio::test]
async fn switch_wraps_around_the_catalog() {
    let (coordinator, _voice, _surface) = coordinator();

    coordinator
        .start(guild(), text_channel(), voice_channel(), 0)
        .await
        .unwrap();

    let name = coordinator
        .switch_station(guild(), SwitchDirection::Next)
        .await
        .unwrap();
    assert_eq!(name, "mix");
    let state = coordinator.snapshot(guild()).unwrap();
    assert_eq!(state.station_index, 1);
    assert!(state.current_track.is_none());
    assert!(state.history.is_empty());

    let name = coordinator
        .switch_station(guild(), SwitchDirection::Next)
        .await
        .unwrap();
    assert_eq!(name, "record");
    assert_eq!(coordinator.snapshot(guild()).unwrap().station_index, 0);
}

#[tokio::test]
async fn switch_requires_existing_state() {
    let (coordinator, _voice, _surface) = coordinator();

    let err = coordinator
        .switch_station(guild(), SwitchDirection::Next)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NothingPlaying));
}

#[tokio::test]
async fn every_stream_start_is_preceded_by_a_stop() {
    let (coordinator, voice, _surface) = coordinator();

    coordinator
        .start(guild(), text_channel(), voice_channel(), 0)
        .await
        .unwrap();
    coordinator
        .switch_station(guild(), SwitchDirection::Next)
        .await
        .unwrap();
    coordinator
        .switch_station(guild(), SwitchDirection::Previous)
        .await
        .unwrap();

    let playback_ops: Vec<String> = voice
        .ops()
        .into_iter()
        .filter(|op| op.starts_with("start") || op.starts_with("stop"))
        .map(|op| op.split_whitespace().next().unwrap().to_string())
        .collect();
    assert_eq!(
        playback_ops,
        vec!["stop", "start", "stop", "start", "stop", "start"]
    );
}

#[tokio::test]
async fn pause_when_already_paused_is_rejected() {
    let (coordinator, voice, _surface) = coordinator();

    coordinator
        .start(guild(), text_channel(), voice_channel(), 0)
        .await
        .unwrap();
    coordinator.set_paused(guild(), true).await.unwrap();
    assert!(coordinator.snapshot(guild()).unwrap().paused);

    let err = coordinator.set_paused(guild(), true).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyPaused));
    assert!(coordinator.snapshot(guild()).unwrap().paused);

    let pause_ops = voice
        .ops()
        .into_iter()
        .filter(|op| op.starts_with("pause"))
        .count();
    assert_eq!(pause_ops, 1);
}

#[tokio::test]
async fn resume_when_playing_is_rejected() {
    let (coordinator, _voice, _surface) = coordinator();

    coordinator
        .start(guild(), text_channel(), voice_channel(), 0)
        .await
        .unwrap();

    let err = coordinator.set_paused(guild(), false).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyPlaying));
}

#[tokio::test(start_paused = true)]
async fn voice_connect_is_retried_before_succeeding() {
    let (coordinator, voice, _surface) = coordinator();
    *voice.connect_failures.lock() = 2;

    coordinator
        .start(guild(), text_channel(), voice_channel(), 0)
        .await
        .unwrap();
    assert!(coordinator.snapshot(guild()).is_some());
}

#[tokio::test(start_paused = true)]
async fn voice_connect_gives_up_after_three_attempts() {
    let (coordinator, voice, _surface) = coordinator();
    *voice.connect_failures.lock() = 3;

    let err = coordinator
        .start(guild(), text_channel(), voice_channel(), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::VoiceConnectFailed(_)));
    assert!(coordinator.snapshot(guild()).is_none());
}

#[tokio::test]
async fn stream_start_failure_leaves_no_state_behind() {
    let (coordinator, voice, _surface) = coordinator();
    *voice.fail_start.lock() = true;

    let err = coordinator
        .start(guild(), text_channel(), voice_channel(), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::StreamStartFailed(_)));
    assert!(coordinator.snapshot(guild()).is_none());
}

#[tokio::test]
async fn concurrent_switch_and_pause_apply_in_arrival_order() {
    let (coordinator, voice, _surface) = coordinator();

    coordinator
        .start(guild(), text_channel(), voice_channel(), 0)
        .await
        .unwrap();

    let (switched, paused) = tokio::join!(
        coordinator.switch_station(guild(), SwitchDirection::Next),
        coordinator.set_paused(guild(), true),
    );
    switched.unwrap();
    paused.unwrap();

    let state = coordinator.snapshot(guild()).unwrap();
    assert_eq!(state.station_index, 1);
    assert!(state.paused);

    // The pause request arrived second and must land after the restart.
    let ops = voice.ops();
    let last_start = ops.iter().rposition(|op| op.starts_with("start")).unwrap();
    let pause = ops.iter().position(|op| op.starts_with("pause")).unwrap();
    assert!(pause > last_start);
}

#[tokio::test]
async fn unexpected_stream_end_clears_the_guild() {
    let (coordinator, voice, surface) = coordinator();

    coordinator
        .start(guild(), text_channel(), voice_channel(), 0)
        .await
        .unwrap();
    let stream_id = voice.current_stream(guild()).unwrap();

    coordinator
        .handle_stream_end(StreamEnded {
            guild_id: guild(),
            stream_id,
            errored: true,
        })
        .await;

    assert!(coordinator.snapshot(guild()).is_none());
    assert!(surface.ops().iter().any(|op| op.starts_with("notice")));
}

#[tokio::test]
async fn stale_stream_end_events_are_ignored() {
    let (coordinator, _voice, _surface) = coordinator();

    coordinator
        .start(guild(), text_channel(), voice_channel(), 0)
        .await
        .unwrap();

    coordinator
        .handle_stream_end(StreamEnded {
            guild_id: guild(),
            stream_id: Uuid::new_v4(),
            errored: false,
        })
        .await;

    assert!(coordinator.snapshot(guild()).is_some());
}

#[tokio::test]
async fn external_voice_disconnect_cleans_up() {
    let (coordinator, _voice, surface) = coordinator();

    coordinator
        .start(guild(), text_channel(), voice_channel(), 0)
        .await
        .unwrap();
    coordinator.handle_bot_voice_disconnect(guild()).await;

    assert!(coordinator.snapshot(guild()).is_none());
    assert!(surface.ops().iter().any(|op| op.starts_with("delete")));

    // Safe to report again once the state is gone.
    coordinator.handle_bot_voice_disconnect(guild()).await;
}

#[tokio::test]
async fn unreachable_control_message_is_invalidated() {
    let (coordinator, _voice, surface) = coordinator();

    coordinator
        .start(guild(), text_channel(), voice_channel(), 0)
        .await
        .unwrap();
    *surface.fail_edit.lock() = true;

    // The pause succeeds even though the control edit cannot land.
    coordinator.set_paused(guild(), true).await.unwrap();

    let state = coordinator.snapshot(guild()).unwrap();
    assert!(state.paused);
    assert!(state.controls.is_none());
}

#[tokio::test]
async fn restart_replaces_the_previous_control_message() {
    let (coordinator, _voice, surface) = coordinator();

    coordinator
        .start(guild(), text_channel(), voice_channel(), 0)
        .await
        .unwrap();
    let first = coordinator
        .snapshot(guild())
        .unwrap()
        .controls
        .unwrap()
        .message_id;

    coordinator
        .start(guild(), text_channel(), voice_channel(), 1)
        .await
        .unwrap();
    let second = coordinator
        .snapshot(guild())
        .unwrap()
        .controls
        .unwrap()
        .message_id;

    assert_ne!(first, second);
    assert!(
        surface
            .ops()
            .iter()
            .any(|op| op == &format!("delete {first}"))
    );
}

#[tokio::test]
async fn clear_all_stops_every_guild() {
    let (coordinator, _voice, _surface) = coordinator();
    let other_guild: Id<GuildMarker> = Id::new(2);

    coordinator
        .start(guild(), text_channel(), voice_channel(), 0)
        .await
        .unwrap();
    coordinator
        .start(other_guild, text_channel(), voice_channel(), 1)
        .await
        .unwrap();

    coordinator.clear_all().await;

    assert!(coordinator.snapshot(guild()).is_none());
    assert!(coordinator.snapshot(other_guild).is_none());
}
