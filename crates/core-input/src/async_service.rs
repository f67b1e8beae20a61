use crate::map_mods;
use crate::translate::{map_key_code, map_mouse_kind};
use core_events::{
    ASYNC_INPUT_STARTS, ASYNC_INPUT_STOP_CHANNEL, ASYNC_INPUT_STOP_ERROR, ASYNC_INPUT_STOP_SIGNAL,
    ASYNC_INPUT_STOP_STREAM, CHANNEL_BLOCKING_SENDS, CHANNEL_SEND_FAILURES, Event, FOCUS_EVENTS,
    InputEvent, KEYPRESS_REPEAT, KEYPRESS_TOTAL, KeyCode, KeyEvent, MOUSE_TOTAL, MouseEvent,
};
use crossterm::event::{
    Event as CEvent, EventStream, KeyCode as CKeyCode, KeyEvent as CKeyEvent,
    KeyEventKind as CKind, MouseEvent as CMouseEvent,
};
use std::io;
use std::sync::Arc;
use tokio::sync::{Notify, mpsc::Sender};
use tokio::task;
use tokio_stream::StreamExt;
use tracing::{info, trace, warn};

#[derive(Clone, Debug)]
pub struct AsyncInputShutdown {
    notify: Arc<Notify>,
}

impl AsyncInputShutdown {
    pub fn signal(&self) {
        self.notify.notify_one();
    }
}

#[derive(Clone, Debug)]
struct ShutdownListener {
    notify: Arc<Notify>,
}

impl ShutdownListener {
    fn new_pair() -> (AsyncInputShutdown, Self) {
        let notify = Arc::new(Notify::new());
        (
            AsyncInputShutdown {
                notify: notify.clone(),
            },
            ShutdownListener { notify },
        )
    }

    async fn wait(&self) {
        self.notify.notified().await;
    }
}

/// Spawn a Tokio task that pumps `EventStream` into the runtime channel.
pub(crate) fn spawn_async_event_task(
    sender: Sender<Event>,
) -> (task::JoinHandle<()>, AsyncInputShutdown) {
    let (shutdown, listener) = ShutdownListener::new_pair();
    let handle = task::spawn(async move {
        AsyncEventStreamTask::new(sender, EventStream::new(), listener)
            .run()
            .await;
    });

    (handle, shutdown)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ExitReason {
    Running,
    ShutdownSignal,
    ChannelClosed,
    StreamEnded,
    StreamError,
}

impl ExitReason {
    fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Running => "running",
            ExitReason::ShutdownSignal => "shutdown_signal",
            ExitReason::ChannelClosed => "channel_closed",
            ExitReason::StreamEnded => "stream_ended",
            ExitReason::StreamError => "stream_error",
        }
    }
}

struct AsyncEventStreamTask<S>
where
    S: tokio_stream::Stream<Item = io::Result<CEvent>> + Send + Unpin + 'static,
{
    sender: Sender<Event>,
    stream: S,
    shutdown: ShutdownListener,
    exit_reason: ExitReason,
    stream_error: Option<io::ErrorKind>,
}

impl<S> AsyncEventStreamTask<S>
where
    S: tokio_stream::Stream<Item = io::Result<CEvent>> + Send + Unpin + 'static,
{
    fn new(sender: Sender<Event>, stream: S, shutdown: ShutdownListener) -> Self {
        Self {
            sender,
            stream,
            shutdown,
            exit_reason: ExitReason::Running,
            stream_error: None,
        }
    }

    pub async fn run(mut self) {
        info!(target: "input.thread", "async_input_task_started");
        ASYNC_INPUT_STARTS.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.exit_reason = ExitReason::StreamEnded;
        loop {
            let maybe_result = tokio::select! {
                biased;
                _ = self.shutdown.wait() => {
                    self.exit_reason = ExitReason::ShutdownSignal;
                    break;
                }
                result = self.stream.next() => result,
            };

            let Some(result) = maybe_result else {
                break;
            };

            match result {
                Ok(CEvent::Key(key)) => {
                    if !self.handle_key_event(key).await {
                        break;
                    }
                }
                Ok(CEvent::Mouse(mouse)) => {
                    if !self.handle_mouse_event(mouse).await {
                        break;
                    }
                }
                Ok(CEvent::Resize(w, h)) => {
                    trace!(target: "input.event", w, h, "resize");
                    if !self
                        .send_event(Event::Input(InputEvent::Resize(w, h)))
                        .await
                    {
                        break;
                    }
                }
                Ok(CEvent::FocusGained) => {
                    trace!(target: "input.event", kind = "focus", gained = true);
                    if !self.send_event(Event::Input(InputEvent::FocusGained)).await {
                        break;
                    }
                    FOCUS_EVENTS.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                }
                Ok(CEvent::FocusLost) => {
                    trace!(target: "input.event", kind = "focus", gained = false);
                    if !self.send_event(Event::Input(InputEvent::FocusLost)).await {
                        break;
                    }
                    FOCUS_EVENTS.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                }
                Ok(CEvent::Paste(_)) => {
                    // Bracketed paste is never enabled by the terminal host.
                }
                Err(err) => {
                    self.exit_reason = ExitReason::StreamError;
                    self.stream_error = Some(err.kind());
                    break;
                }
            }
        }

        let reason = match self.exit_reason {
            ExitReason::Running => ExitReason::StreamEnded,
            other => other,
        };

        match reason {
            ExitReason::ShutdownSignal => {
                ASYNC_INPUT_STOP_SIGNAL.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
            ExitReason::ChannelClosed => {
                ASYNC_INPUT_STOP_CHANNEL.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
            ExitReason::StreamEnded => {
                ASYNC_INPUT_STOP_STREAM.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
            ExitReason::StreamError => {
                ASYNC_INPUT_STOP_ERROR.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
            ExitReason::Running => {}
        }

        if matches!(reason, ExitReason::StreamError) {
            if let Some(kind) = self.stream_error {
                warn!(target: "input.thread", error_kind = ?kind, "async_input_task_stream_error");
            } else {
                warn!(target: "input.thread", "async_input_task_stream_error");
            }
        }

        info!(target: "input.thread", reason = reason.as_str(), "async_input_task_stopped");
    }

    async fn handle_key_event(&mut self, key: CKeyEvent) -> bool {
        if !matches!(key.kind, CKind::Press | CKind::Repeat) {
            return true;
        }

        if matches!(key.code, CKeyCode::Char('c'))
            && key
                .modifiers
                .contains(crossterm::event::KeyModifiers::CONTROL)
        {
            return self.send_event(Event::Input(InputEvent::CtrlC)).await;
        }

        let Some(code) = map_key_code(key.code) else {
            return true;
        };
        let mods = map_mods(key.modifiers);
        let repeat = matches!(key.kind, CKind::Repeat);

        trace!(
            target: "input.event",
            kind = "keypress",
            repeat,
            mods = ?mods,
            code = code_label(code)
        );

        let sent = self
            .send_event(Event::Input(InputEvent::Key(KeyEvent { code, mods })))
            .await;
        if sent {
            KEYPRESS_TOTAL.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            if repeat {
                KEYPRESS_REPEAT.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
        }
        sent
    }

    async fn handle_mouse_event(&mut self, mouse: CMouseEvent) -> bool {
        let Some(kind) = map_mouse_kind(mouse.kind) else {
            return true;
        };

        trace!(
            target: "input.event",
            kind = "mouse",
            column = mouse.column,
            row = mouse.row
        );

        let sent = self
            .send_event(Event::Input(InputEvent::Mouse(MouseEvent {
                kind,
                column: mouse.column,
                row: mouse.row,
                mods: map_mods(mouse.modifiers),
            })))
            .await;
        if sent {
            MOUSE_TOTAL.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        sent
    }

    async fn send_event(&mut self, event: Event) -> bool {
        match self.sender.send(event).await {
            Ok(_) => {
                CHANNEL_BLOCKING_SENDS.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                true
            }
            Err(_) => {
                CHANNEL_SEND_FAILURES.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                if !matches!(self.exit_reason, ExitReason::ShutdownSignal) {
                    self.exit_reason = ExitReason::ChannelClosed;
                }
                false
            }
        }
    }
}

/// Coarse label for keypress trace logs so typed characters never land in the
/// log stream.
fn code_label(code: KeyCode) -> &'static str {
    match code {
        KeyCode::Char(_) => "char",
        _ => "named",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::{
        ASYNC_INPUT_STARTS, ASYNC_INPUT_STOP_CHANNEL, ASYNC_INPUT_STOP_ERROR,
        ASYNC_INPUT_STOP_SIGNAL, Event, InputEvent, KeyModifiers, MouseButton, MouseEventKind,
    };
    use crossterm::event::{MouseButton as CMouseButton, MouseEventKind as CMouseEventKind};
    use std::io;
    use std::sync::atomic::Ordering;
    use std::sync::{Arc, Mutex};
    use tokio::sync::{Mutex as TokioMutex, mpsc};
    use tokio::time::{Duration, timeout};
    use tokio_stream::wrappers::UnboundedReceiverStream;
    use tracing::{Metadata, Subscriber, subscriber::Interest};

    use tracing::field::{Field, Visit};
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use tracing_subscriber::registry::Registry;

    static LOG_CAPTURE_GUARD: TokioMutex<()> = TokioMutex::const_new(());

    #[derive(Clone, Default)]
    struct LogCapture {
        events: Arc<Mutex<Vec<CapturedLog>>>,
    }

    #[derive(Clone, Debug)]
    struct CapturedLog {
        target: String,
        fields: Vec<(String, String)>,
    }

    #[derive(Default)]
    struct LogVisitor {
        fields: Vec<(String, String)>,
    }

    impl Visit for LogVisitor {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            self.fields
                .push((field.name().to_string(), format!("{:?}", value)));
        }
    }

    impl<S> Layer<S> for LogCapture
    where
        S: Subscriber,
    {
        fn register_callsite(
            &self,
            _metadata: &'static tracing::Metadata<'static>,
        ) -> tracing::subscriber::Interest {
            Interest::always()
        }

        fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
            metadata.target().starts_with("input.")
        }

        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut visitor = LogVisitor::default();
            event.record(&mut visitor);
            let meta = event.metadata();
            self.events.lock().unwrap().push(CapturedLog {
                target: meta.target().to_string(),
                fields: visitor.fields,
            });
        }
    }

    fn key_press(code: CKeyCode, modifiers: crossterm::event::KeyModifiers) -> CEvent {
        CEvent::Key(CKeyEvent::new(code, modifiers))
    }

    fn mouse(kind: CMouseEventKind, column: u16, row: u16) -> CEvent {
        CEvent::Mouse(CMouseEvent {
            kind,
            column,
            row,
            modifiers: crossterm::event::KeyModifiers::NONE,
        })
    }

    #[tokio::test]
    async fn forwards_basic_key_events() {
        let base_total = KEYPRESS_TOTAL.fetch_add(0, Ordering::Relaxed);

        let outputs = run_scenario(vec![key_press(
            CKeyCode::Char('a'),
            crossterm::event::KeyModifiers::NONE,
        )])
        .await;

        match outputs.as_slice() {
            [Event::Input(InputEvent::Key(key))] => {
                assert_eq!(key.code, KeyCode::Char('a'));
                assert!(key.mods.is_empty());
            }
            other => panic!("unexpected output sequence: {other:?}"),
        }

        let after_total = KEYPRESS_TOTAL.fetch_add(0, Ordering::Relaxed);
        assert!(
            after_total > base_total,
            "keypress counter did not advance"
        );
    }

    #[tokio::test]
    async fn repeat_key_events_count_separately() {
        let base_repeat = KEYPRESS_REPEAT.fetch_add(0, Ordering::Relaxed);

        let mut c_event = CKeyEvent::new(CKeyCode::Down, crossterm::event::KeyModifiers::NONE);
        c_event.kind = CKind::Repeat;

        let outputs = run_scenario(vec![CEvent::Key(c_event)]).await;

        match outputs.as_slice() {
            [Event::Input(InputEvent::Key(key))] => {
                assert_eq!(key.code, KeyCode::Down);
            }
            other => panic!("unexpected output sequence: {other:?}"),
        }

        let after_repeat = KEYPRESS_REPEAT.fetch_add(0, Ordering::Relaxed);
        assert!(
            after_repeat > base_repeat,
            "repeat counter did not advance"
        );
    }

    #[tokio::test]
    async fn key_release_events_are_ignored() {
        let mut c_event = CKeyEvent::new(CKeyCode::Char('x'), crossterm::event::KeyModifiers::NONE);
        c_event.kind = CKind::Release;

        let outputs = run_scenario(vec![CEvent::Key(c_event)]).await;
        assert!(outputs.is_empty(), "release should not produce events");
    }

    #[tokio::test]
    async fn keypress_logging_redacts_typed_characters() {
        let _log_guard = LOG_CAPTURE_GUARD.lock().await;

        let capture = LogCapture::default();
        let events_handle = capture.events.clone();
        let subscriber = Registry::default().with(capture.with_filter(LevelFilter::TRACE));
        let dispatch = tracing::Dispatch::new(subscriber);
        let _guard = tracing::dispatcher::set_default(&dispatch);

        let outputs = run_scenario(vec![key_press(
            CKeyCode::Char('z'),
            crossterm::event::KeyModifiers::NONE,
        )])
        .await;

        assert!(matches!(
            outputs.as_slice(),
            [Event::Input(InputEvent::Key(_))]
        ));

        let logs = events_handle.lock().unwrap();
        let keypress_log = logs
            .iter()
            .find(|entry| entry.target == "input.event")
            .unwrap_or_else(|| panic!("missing input.event log, captured: {logs:?}"));
        assert!(
            keypress_log
                .fields
                .iter()
                .any(|(k, v)| k == "kind" && v == "\"keypress\"")
        );
        assert!(
            keypress_log
                .fields
                .iter()
                .any(|(k, v)| k == "code" && v == "\"char\"")
        );
        for (_, value) in &keypress_log.fields {
            assert!(
                !value.contains('z'),
                "keypress log leaked typed character: {value}"
            );
        }
    }

    #[tokio::test]
    async fn forwards_ctrl_c() {
        let outputs = run_scenario(vec![key_press(
            CKeyCode::Char('c'),
            crossterm::event::KeyModifiers::CONTROL,
        )])
        .await;

        assert!(matches!(
            outputs.as_slice(),
            [Event::Input(InputEvent::CtrlC)]
        ));
    }

    #[tokio::test]
    async fn forwards_resize_event() {
        let outputs = run_scenario(vec![CEvent::Resize(120, 48)]).await;

        assert!(matches!(
            outputs.as_slice(),
            [Event::Input(InputEvent::Resize(120, 48))]
        ));
    }

    #[tokio::test]
    async fn forwards_mouse_press_with_modifiers() {
        let base_mouse = MOUSE_TOTAL.fetch_add(0, Ordering::Relaxed);

        let outputs = run_scenario(vec![CEvent::Mouse(CMouseEvent {
            kind: CMouseEventKind::Down(CMouseButton::Left),
            column: 10,
            row: 5,
            modifiers: crossterm::event::KeyModifiers::SHIFT,
        })])
        .await;

        match outputs.as_slice() {
            [Event::Input(InputEvent::Mouse(ev))] => {
                assert_eq!(ev.kind, MouseEventKind::Down(MouseButton::Left));
                assert_eq!((ev.column, ev.row), (10, 5));
                assert_eq!(ev.mods, KeyModifiers::SHIFT);
            }
            other => panic!("unexpected output sequence: {other:?}"),
        }

        let after_mouse = MOUSE_TOTAL.fetch_add(0, Ordering::Relaxed);
        assert!(after_mouse > base_mouse, "mouse counter did not advance");
    }

    #[tokio::test]
    async fn horizontal_scroll_is_dropped() {
        let outputs = run_scenario(vec![
            mouse(CMouseEventKind::ScrollUp, 0, 0),
            mouse(CMouseEventKind::ScrollLeft, 0, 0),
            mouse(CMouseEventKind::ScrollDown, 0, 0),
        ])
        .await;

        let kinds: Vec<_> = outputs
            .iter()
            .map(|event| match event {
                Event::Input(InputEvent::Mouse(ev)) => ev.kind,
                other => panic!("unexpected event: {other:?}"),
            })
            .collect();
        assert_eq!(kinds, [MouseEventKind::ScrollUp, MouseEventKind::ScrollDown]);
    }

    #[tokio::test]
    async fn forwards_focus_transitions() {
        let base_focus = FOCUS_EVENTS.fetch_add(0, Ordering::Relaxed);

        let outputs = run_scenario(vec![CEvent::FocusLost, CEvent::FocusGained]).await;

        assert!(matches!(
            outputs.as_slice(),
            [
                Event::Input(InputEvent::FocusLost),
                Event::Input(InputEvent::FocusGained)
            ]
        ));

        let after_focus = FOCUS_EVENTS.fetch_add(0, Ordering::Relaxed);
        assert!(
            after_focus - base_focus >= 2,
            "focus counter did not advance"
        );
    }

    #[tokio::test]
    async fn paste_payloads_are_dropped() {
        let outputs = run_scenario(vec![CEvent::Paste("stray payload".to_string())]).await;
        assert!(outputs.is_empty(), "paste should not produce events");
    }

    #[tokio::test]
    async fn logs_startup_and_shutdown_reason_on_signal() {
        let _log_guard = LOG_CAPTURE_GUARD.lock().await;
        let capture = LogCapture::default();
        let events_handle = capture.events.clone();
        let subscriber = Registry::default().with(capture.with_filter(LevelFilter::TRACE));
        let dispatch = tracing::Dispatch::new(subscriber);
        let _guard = tracing::dispatcher::set_default(&dispatch);

        let base_start = ASYNC_INPUT_STARTS.fetch_add(0, Ordering::Relaxed);
        let base_signal = ASYNC_INPUT_STOP_SIGNAL.fetch_add(0, Ordering::Relaxed);

        let (tx, rx) = mpsc::channel(1);
        let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel::<io::Result<CEvent>>();
        let stream = UnboundedReceiverStream::new(event_rx);
        let (shutdown, listener) = ShutdownListener::new_pair();

        let notifier = shutdown.clone();
        let signal_task = tokio::spawn(async move {
            tokio::task::yield_now().await;
            notifier.signal();
        });

        let _keep_alive = event_tx;
        AsyncEventStreamTask::new(tx, stream, listener).run().await;
        signal_task.await.unwrap();
        drop(rx);

        let logged = events_handle.lock().unwrap();
        assert!(
            logged.iter().any(|entry| {
                entry.target == "input.thread"
                    && entry
                        .fields
                        .iter()
                        .any(|(k, v)| k == "message" && v == "async_input_task_started")
            }),
            "missing async_input_task_started log, captured events: {:?}",
            *logged
        );

        let stop_event = logged.iter().find(|entry| {
            entry.target == "input.thread"
                && entry
                    .fields
                    .iter()
                    .any(|(k, v)| k == "message" && v == "async_input_task_stopped")
        });
        let stop_event = stop_event.unwrap_or_else(|| {
            panic!(
                "missing async_input_task_stopped log, captured events: {:?}",
                *logged
            )
        });
        let reason_field = stop_event
            .fields
            .iter()
            .find(|(k, _)| k == "reason")
            .map(|(_, v)| v.trim_matches('"'))
            .unwrap_or_default();
        assert_eq!(reason_field, "shutdown_signal");

        let after_start = ASYNC_INPUT_STARTS.fetch_add(0, Ordering::Relaxed);
        let after_signal = ASYNC_INPUT_STOP_SIGNAL.fetch_add(0, Ordering::Relaxed);
        assert!(
            after_start > base_start,
            "async input starts counter did not advance"
        );
        assert!(
            after_signal > base_signal,
            "shutdown signal counter did not advance"
        );
    }

    #[tokio::test]
    async fn channel_closed_increments_telemetry() {
        let base_channel = ASYNC_INPUT_STOP_CHANNEL.fetch_add(0, Ordering::Relaxed);

        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let stream = tokio_stream::iter(vec![Ok(CEvent::Resize(10, 10))]);
        let (_shutdown, listener) = ShutdownListener::new_pair();

        AsyncEventStreamTask::new(tx, stream, listener).run().await;

        let after_channel = ASYNC_INPUT_STOP_CHANNEL.fetch_add(0, Ordering::Relaxed);
        assert!(
            after_channel > base_channel,
            "channel closed counter did not advance"
        );
    }

    #[tokio::test]
    async fn stream_error_increments_telemetry() {
        let base_error = ASYNC_INPUT_STOP_ERROR.fetch_add(0, Ordering::Relaxed);

        let (tx, mut rx) = mpsc::channel(1);
        let stream = tokio_stream::iter(vec![Err(io::Error::other("tty gone"))]);
        let (_shutdown, listener) = ShutdownListener::new_pair();

        AsyncEventStreamTask::new(tx, stream, listener).run().await;

        assert!(rx.recv().await.is_none());
        let after_error = ASYNC_INPUT_STOP_ERROR.fetch_add(0, Ordering::Relaxed);
        assert!(
            after_error > base_error,
            "stream error counter did not advance"
        );
    }

    #[tokio::test]
    async fn shutdown_signal_exits_immediately() {
        let (tx, mut rx) = mpsc::channel(1);
        let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel::<io::Result<CEvent>>();
        let stream = UnboundedReceiverStream::new(event_rx);
        let (shutdown, listener) = ShutdownListener::new_pair();

        let task = tokio::spawn(async move {
            let _keep_alive = event_tx;
            AsyncEventStreamTask::new(tx, stream, listener).run().await;
        });

        shutdown.signal();

        timeout(Duration::from_millis(50), task)
            .await
            .expect("shutdown should resolve promptly")
            .expect("task join failed");

        assert!(rx.recv().await.is_none());
    }

    async fn run_scenario(events: Vec<CEvent>) -> Vec<Event> {
        let (tx, mut rx) = mpsc::channel(64);
        let stream = tokio_stream::iter(events.into_iter().map(Ok));
        let (_shutdown, listener) = ShutdownListener::new_pair();
        AsyncEventStreamTask::new(tx, stream, listener).run().await;

        let mut outputs = Vec::new();
        while let Some(evt) = rx.recv().await {
            outputs.push(evt);
        }
        outputs
    }
}
