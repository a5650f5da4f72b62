use iced::widget::image::Handle;
use iced::widget::{button, column, container, image, row, scrollable, text, Column, Row};
use iced::{event, window, Alignment, Element, Event, Length, Subscription, Task, Theme};
use rfd::FileDialog;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod acquire;
mod camera;
mod config;
mod detect;
mod error;
mod state;
mod ui;

#[cfg(test)]
mod testing;

use acquire::loader;
use acquire::preview::IcedPreviews;
use camera::device::{acquire_guarded, CameraError, Facing, Frame, GrantedStream, MediaCapture};
use camera::{encode, SessionId};
use config::AppConfig;
use detect::client::HttpDetector;
use detect::Ticket;
use state::data::{messages, CameraStatus, CandidateFile, ErrorInfo, ErrorKind, NutritionResult};
use state::view::{CaptureId, ViewState};

/// How often the live camera preview is refreshed
const PREVIEW_INTERVAL: Duration = Duration::from_millis(100);

/// Main application state
struct Nutriva {
    /// The core workflow state; the view only reads its snapshot
    state: ViewState,
    /// Display handles for the current image preview
    previews: Arc<IcedPreviews>,
    /// Camera backend
    camera: Arc<dyn MediaCapture>,
    /// Detection service client (None if the HTTP client could not be built)
    detector: Option<Arc<HttpDetector>>,
    /// Latest live camera frame while streaming
    live_frame: Option<Handle>,
    /// Dropped file being read; further drops are ignored until it lands
    pending_drop: Option<PathBuf>,
    /// Connection status line
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User clicked "Upload foto tabel"
    PickFile,
    /// Picked file finished loading
    FileLoaded(Result<CandidateFile, ErrorInfo>),
    /// A file was dropped on the window
    FileDropped(PathBuf),
    /// Dropped files finished loading
    DropLoaded(Vec<Result<CandidateFile, ErrorInfo>>),
    /// User clicked "Foto dengan kamera"
    OpenCamera,
    /// The device answered an open request
    CameraOpened(SessionId, Result<GrantedStream, CameraError>),
    /// Refresh the live preview
    Tick,
    /// User clicked "Ambil Foto"
    Capture,
    /// Background JPEG encode finished
    CaptureEncoded(CaptureId, Option<Vec<u8>>),
    /// User clicked "Batal" in the camera panel
    CloseCamera,
    /// User clicked "Deteksi"
    Submit,
    /// Detection request finished
    SubmitFinished(Ticket, Result<NutritionResult, ErrorInfo>),
    /// User clicked the back arrow
    Reset,
    /// Start-up health check finished
    Pinged(Result<String, String>),
}

impl Nutriva {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        let config = AppConfig::load();
        let previews = Arc::new(IcedPreviews::new());
        let mut state = ViewState::new(previews.clone(), config.mirror_capture);

        let detector = match HttpDetector::new(config.api_base.clone()) {
            Ok(detector) => Some(Arc::new(detector)),
            Err(e) => {
                tracing::error!(error = %e, "failed to build HTTP client");
                state.surface(e.to_error_info());
                None
            }
        };

        tracing::info!(api = %config.api_base, mirror = config.mirror_capture, "Nutriva initialized");

        let task = match &detector {
            Some(detector) => Task::perform(ping(Arc::clone(detector)), Message::Pinged),
            None => Task::none(),
        };

        (
            Nutriva {
                state,
                previews,
                camera: camera::default_backend(),
                detector,
                live_frame: None,
                pending_drop: None,
                status: format!("Menghubungkan ke {}...", config.api_base),
            },
            task,
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::PickFile => {
                // Show the native file picker dialog; the filter is only a hint
                let picked = FileDialog::new()
                    .set_title("Pilih foto tabel gizi")
                    .add_filter("Gambar", &["jpg", "jpeg", "png", "webp", "bmp"])
                    .pick_file();

                match picked {
                    Some(path) => Task::perform(load_candidate(path), Message::FileLoaded),
                    None => {
                        // Cancelled pick
                        self.state.select_file(None);
                        Task::none()
                    }
                }
            }
            Message::FileLoaded(Ok(file)) => {
                self.state.select_file(Some(file));
                Task::none()
            }
            Message::FileLoaded(Err(error)) => {
                self.state.surface(error);
                Task::none()
            }
            Message::FileDropped(path) => {
                // One event arrives per file; the first one of a drop wins
                if let Some(pending) = &self.pending_drop {
                    tracing::debug!(ignored = %path.display(), pending = %pending.display(), "drop already loading");
                    return Task::none();
                }
                self.pending_drop = Some(path.clone());
                Task::perform(load_drop(vec![path]), Message::DropLoaded)
            }
            Message::DropLoaded(results) => {
                self.pending_drop = None;
                let mut results = results.into_iter();
                match results.next() {
                    None => {
                        self.state.handle_drop(Vec::new());
                    }
                    Some(Err(error)) => self.state.surface(error),
                    Some(Ok(first)) => {
                        let files = std::iter::once(first)
                            .chain(results.filter_map(Result::ok))
                            .collect();
                        self.state.handle_drop(files);
                    }
                }
                Task::none()
            }
            Message::OpenCamera => {
                let Some(id) = self.state.open_camera() else {
                    return Task::none();
                };
                let media = Arc::clone(&self.camera);
                Task::perform(
                    async move {
                        acquire_guarded(media.as_ref(), Facing::Rear)
                            .await
                            .map(GrantedStream::new)
                    },
                    move |outcome| Message::CameraOpened(id, outcome),
                )
            }
            Message::CameraOpened(id, outcome) => {
                let outcome = outcome.and_then(|granted| {
                    granted
                        .take()
                        .ok_or_else(|| CameraError::Unavailable("stream already taken".to_string()))
                });
                self.state.camera_opened(id, outcome);
                Task::none()
            }
            Message::Tick => {
                self.live_frame = self
                    .state
                    .camera_preview()
                    .map(|frame| Handle::from_rgba(frame.width(), frame.height(), frame.into_raw()));
                Task::none()
            }
            Message::Capture => {
                self.live_frame = None;
                match self.state.capture() {
                    Some(pending) => {
                        let id = pending.id;
                        Task::perform(encode_frame(pending.frame, pending.mirror), move |bytes| {
                            Message::CaptureEncoded(id, bytes)
                        })
                    }
                    None => Task::none(),
                }
            }
            Message::CaptureEncoded(id, bytes) => {
                self.state.capture_encoded(id, bytes);
                Task::none()
            }
            Message::CloseCamera => {
                self.state.close_camera();
                self.live_frame = None;
                Task::none()
            }
            Message::Submit => {
                let Some(detector) = self.detector.clone() else {
                    self.state
                        .surface(ErrorInfo::new(ErrorKind::Network, messages::GENERIC));
                    return Task::none();
                };
                match self.state.begin_submit() {
                    Ok(pending) => {
                        let ticket = pending.ticket;
                        Task::perform(
                            async move { detect::run(detector.as_ref(), pending.upload).await },
                            move |outcome| Message::SubmitFinished(ticket, outcome),
                        )
                    }
                    Err(rejected) => {
                        tracing::debug!(reason = %rejected, "submit not started");
                        Task::none()
                    }
                }
            }
            Message::SubmitFinished(ticket, outcome) => {
                self.state.finish_submit(ticket, outcome);
                Task::none()
            }
            Message::Reset => {
                self.state.reset();
                self.live_frame = None;
                Task::none()
            }
            Message::Pinged(result) => {
                self.status = match result {
                    Ok(message) => {
                        tracing::info!(%message, "detection service reachable");
                        format!("✅ {}", message)
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "detection service unreachable");
                        format!("⚠️ Server tidak terhubung: {}", e)
                    }
                };
                Task::none()
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<'_, Message> {
        let snapshot = self.state.snapshot();

        let header = column![
            text("Nutriva").size(48),
            text("Foto Labelnya, Pahami Isinya!").size(18),
        ]
        .spacing(4)
        .align_x(Alignment::Center);

        // Dropzone: preview of the current image, or the upload affordance
        let dropzone: Element<Message> = match snapshot.preview.and_then(|id| self.previews.get(id)) {
            Some(handle) => image(handle).height(Length::Fixed(280.0)).into(),
            None => column![
                button("Upload foto tabel").on_press(Message::PickFile).padding(10),
                text("atau tarik ke sini").size(14),
            ]
            .spacing(8)
            .align_x(Alignment::Center)
            .into(),
        };

        let submit_label = if snapshot.is_loading() { "Memproses..." } else { "Deteksi" };

        let mut checker: Column<Message> = column![
            text("Cek Label Gizi").size(28),
            text("Upload foto tabel gizi atau ambil langsung dari kamera.").size(14),
            container(dropzone).padding(20).center_x(Length::Fill),
            text("atau").size(14),
            button("Foto dengan kamera")
                .on_press_maybe((snapshot.camera == CameraStatus::Closed).then_some(Message::OpenCamera))
                .padding(10),
            button(submit_label)
                .on_press_maybe((!snapshot.is_loading()).then_some(Message::Submit))
                .padding(10),
        ]
        .spacing(12)
        .align_x(Alignment::Center);

        if let Some(error) = &snapshot.error {
            checker = checker.push(text(error.message.clone()).size(16).style(text::danger));
        }

        if snapshot.has_outcome() {
            checker = checker.push(button("←").on_press(Message::Reset).padding(8));
        }

        if snapshot.camera != CameraStatus::Closed {
            checker = checker.push(self.camera_panel(snapshot.camera));
        }

        let cards: Row<Message> = ui::metrics::metrics(snapshot.result())
            .iter()
            .fold(row![].spacing(12), |row, metric| row.push(ui::metrics::metric_card(metric)));

        let content: Column<Message> = column![
            header,
            container(checker).padding(20).style(container::rounded_box),
            text("Hasil").size(28),
            cards,
            text(&self.status).size(12),
        ]
        .spacing(24)
        .padding(40)
        .align_x(Alignment::Center);

        scrollable(
            container(content)
                .width(Length::Fill)
                .center_x(Length::Fill),
        )
        .into()
    }

    /// Live camera view with capture/cancel actions
    fn camera_panel(&self, status: CameraStatus) -> Element<'_, Message> {
        let live: Element<Message> = match (&self.live_frame, status) {
            (Some(handle), CameraStatus::Streaming) => image(handle.clone()).height(Length::Fixed(320.0)).into(),
            _ => text("Membuka kamera...").size(14).into(),
        };

        column![
            live,
            row![
                button("Ambil Foto")
                    .on_press_maybe((status == CameraStatus::Streaming).then_some(Message::Capture))
                    .padding(10),
                button("Batal").on_press(Message::CloseCamera).padding(10),
            ]
            .spacing(12),
        ]
        .spacing(12)
        .align_x(Alignment::Center)
        .into()
    }

    /// Listen for dropped files, and tick the live preview while streaming
    fn subscription(&self) -> Subscription<Message> {
        let drops = event::listen_with(|event, _status, _window| match event {
            Event::Window(window::Event::FileDropped(path)) => Some(Message::FileDropped(path)),
            _ => None,
        });

        if self.state.camera_status() == CameraStatus::Streaming {
            Subscription::batch([
                drops,
                iced::time::every(PREVIEW_INTERVAL).map(|_| Message::Tick),
            ])
        } else {
            drops
        }
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Light
    }
}

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nutriva=info".into()),
        )
        .init();

    iced::application("Nutriva", Nutriva::update, Nutriva::view)
        .theme(Nutriva::theme)
        .subscription(Nutriva::subscription)
        .centered()
        .run_with(Nutriva::new)
}

/// Read a picked file in the background
async fn load_candidate(path: PathBuf) -> Result<CandidateFile, ErrorInfo> {
    loader::load_file(path).await.map_err(|e| e.to_error_info())
}

/// Read dropped files in the background, keeping their order
async fn load_drop(paths: Vec<PathBuf>) -> Vec<Result<CandidateFile, ErrorInfo>> {
    loader::load_files(paths)
        .await
        .into_iter()
        .map(|r| r.map_err(|e| e.to_error_info()))
        .collect()
}

/// Encode a captured frame off the UI thread
/// Runs in a blocking task because JPEG encoding is CPU-bound
async fn encode_frame(frame: Frame, mirror: bool) -> Option<Vec<u8>> {
    tokio::task::spawn_blocking(move || encode::encode_capture(&frame, mirror))
        .await
        .ok()
        .flatten()
}

/// Check that the detection service answers
async fn ping(detector: Arc<HttpDetector>) -> Result<String, String> {
    match detector.ping().await {
        Ok(resp) if resp.ok => Ok(resp.message.unwrap_or_else(|| "backend tersambung".to_string())),
        Ok(resp) => Err(resp.message.unwrap_or_else(|| messages::GENERIC.to_string())),
        Err(e) => Err(e.to_string()),
    }
}
