mod api;
mod components;

use components::footer::render_footer;
use components::header::{render_header, render_navbar};
use components::preview_area::render_preview_area;
use components::results::render_result_actions;
use components::upload_section::render_upload_section;
use components::utils::{files_from_list, render_notices};
use gloo_events::EventListener;
use gloo_file::{File as GlooFile, ObjectUrl};
use gloo_timers::callback::Timeout;
use shared::UploadedFile;
use shared::upload::{FileInfo, download_file_name, select_upload};
use shared::workflow::{CancelHandle, JobCounter, Submission, cancel_pair, run_submission};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{ClipboardEvent, DragEvent};
use yew::prelude::*;

const NOTICE_DURATION_MS: u32 = 5000;

/// Everything the page shows for the current photo. One value instead of a
/// set of loading flags, so "uploading" and "succeeded" can never both hold.
#[derive(Clone, PartialEq)]
enum Session {
    Empty,
    Uploading {
        file_name: String,
    },
    Generating {
        file_name: String,
        original_url: String,
        submission: Submission,
    },
}

struct Notice {
    id: u64,
    message: String,
}

// Yew msg components
enum Msg {
    // File operations
    FilesPicked(Vec<GlooFile>),
    Uploaded {
        job: u64,
        result: Result<UploadedFile, String>,
    },

    // Generation
    SubmissionUpdated {
        job: u64,
        submission: Submission,
    },
    OutputLoaded(String),
    Reset,
    Download,
    DownloadFinished(Result<ObjectUrl, String>),

    // UI states
    DismissNotice(u64),
    SetDragging(bool),

    // Input events
    HandleDrop(DragEvent),
    HandlePaste(ClipboardEvent),
}

// Main component
struct Model {
    session: Session,
    cancel: Option<CancelHandle>,
    jobs: JobCounter,
    loaded_output: Option<String>,
    is_dragging: bool,
    is_downloading: bool,
    download_url: Option<ObjectUrl>,
    wait_banner: NodeRef,
    scroll_to_wait_banner: bool,
    notices: Vec<Notice>,
    next_notice_id: u64,
    paste_listener: Option<EventListener>,
}

impl Component for Model {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        let mut model = Self {
            session: Session::Empty,
            cancel: None,
            jobs: JobCounter::default(),
            loaded_output: None,
            is_dragging: false,
            is_downloading: false,
            download_url: None,
            wait_banner: NodeRef::default(),
            scroll_to_wait_banner: false,
            notices: Vec::new(),
            next_notice_id: 0,
            paste_listener: None,
        };

        let link = ctx.link().clone();
        if let Some(window) = web_sys::window() {
            let listener = EventListener::new(&window, "paste", move |event| {
                if let Some(clipboard_event) = event.dyn_ref::<ClipboardEvent>() {
                    link.send_message(Msg::HandlePaste(clipboard_event.clone()));
                }
            });
            model.paste_listener = Some(listener);
        }

        model
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            // File operations
            Msg::FilesPicked(files) => self.handle_files_picked(ctx, files),
            Msg::Uploaded { job, result } => self.handle_uploaded(ctx, job, result),

            // Generation
            Msg::SubmissionUpdated { job, submission } => {
                self.handle_submission_updated(ctx, job, submission)
            }
            Msg::OutputLoaded(url) => {
                self.loaded_output = Some(url);
                true
            }
            Msg::Reset => self.handle_reset(),
            Msg::Download => self.handle_download(ctx),
            Msg::DownloadFinished(result) => {
                self.is_downloading = false;
                match result {
                    // Kept alive until the next download or reset.
                    Ok(object_url) => self.download_url = Some(object_url),
                    Err(message) => self.notify(ctx, message),
                }
                true
            }

            // UI states
            Msg::DismissNotice(id) => {
                self.notices.retain(|notice| notice.id != id);
                true
            }
            Msg::SetDragging(is_dragging) => {
                self.is_dragging = is_dragging;
                true
            }

            // Input events
            Msg::HandleDrop(event) => self.handle_drop(ctx, event),
            Msg::HandlePaste(event) => self.handle_paste(ctx, event),
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="container">
                { render_navbar() }
                { render_header() }

                <main class="main-content">
                    {
                        match &self.session {
                            Session::Empty | Session::Uploading { .. } => render_upload_section(self, ctx),
                            Session::Generating { .. } => render_preview_area(self, ctx),
                        }
                    }
                    { render_result_actions(self, ctx) }
                    { self.render_wait_banner() }
                </main>

                { render_notices(self, ctx) }
                { render_footer() }
            </div>
        }
    }

    fn rendered(&mut self, _ctx: &Context<Self>, _first_render: bool) {
        if !self.scroll_to_wait_banner {
            return;
        }
        if let Some(banner) = self.wait_banner.cast::<web_sys::Element>() {
            banner.scroll_into_view();
            self.scroll_to_wait_banner = false;
        }
    }
}

// Handler methods
impl Model {
    fn handle_files_picked(&mut self, ctx: &Context<Self>, files: Vec<GlooFile>) -> bool {
        if !matches!(self.session, Session::Empty) {
            log::warn!("Ignoring {} file(s) while a photo is in progress", files.len());
            return false;
        }

        let (selected, rejected) = select_upload(files, |file| FileInfo {
            name: file.name(),
            mime: file.raw_mime_type(),
            size: file.size(),
        });

        for (file, rejection) in rejected {
            log::warn!("Rejected {}: {}", file.name(), rejection);
            self.notify(ctx, rejection.to_string());
        }

        if let Some(file) = selected {
            self.start_upload(ctx, file);
        }
        true
    }

    fn start_upload(&mut self, ctx: &Context<Self>, file: GlooFile) {
        let job = self.jobs.begin();
        self.session = Session::Uploading {
            file_name: file.name(),
        };

        let link = ctx.link().clone();
        spawn_local(async move {
            let result = match api::read_data_url(&file).await {
                Ok(data_url) => api::upload_image(data_url).await,
                Err(e) => Err(e),
            };
            link.send_message(Msg::Uploaded { job, result });
        });
    }

    fn handle_uploaded(
        &mut self,
        ctx: &Context<Self>,
        job: u64,
        result: Result<UploadedFile, String>,
    ) -> bool {
        let file_name = match &self.session {
            Session::Uploading { file_name } if self.jobs.is_current(job) => file_name.clone(),
            _ => {
                log::debug!("Dropping stale upload result for job {}", job);
                return false;
            }
        };

        let uploaded = match result {
            Ok(uploaded) => uploaded,
            Err(message) => {
                self.session = Session::Empty;
                self.notify(ctx, message);
                return true;
            }
        };

        log::info!("Uploaded {} to {}", file_name, uploaded.secure_url);
        self.session = Session::Generating {
            file_name,
            original_url: uploaded.secure_url.clone(),
            submission: Submission::Idle,
        };
        self.loaded_output = None;
        self.scroll_to_wait_banner = true;

        let (handle, token) = cancel_pair();
        self.cancel = Some(handle);

        let link = ctx.link().clone();
        spawn_local(async move {
            let outcome = run_submission(
                &api::RelayClient,
                &api::TimerPacer,
                uploaded.secure_url,
                &token,
                |submission| {
                    link.send_message(Msg::SubmissionUpdated {
                        job,
                        submission: submission.clone(),
                    })
                },
            )
            .await;
            if outcome.is_none() {
                log::info!("Generation job {} was abandoned", job);
            }
        });

        true
    }

    fn handle_submission_updated(
        &mut self,
        ctx: &Context<Self>,
        job: u64,
        submission: Submission,
    ) -> bool {
        if !self.jobs.is_current(job) {
            return false;
        }
        let Session::Generating {
            submission: current,
            ..
        } = &mut self.session
        else {
            return false;
        };

        let failure = submission.error().map(ToString::to_string);
        if submission.is_terminal() {
            self.cancel = None;
        }
        *current = submission;

        if let Some(message) = failure {
            self.notify(ctx, message);
        }
        true
    }

    fn handle_reset(&mut self) -> bool {
        if let Some(handle) = self.cancel.take() {
            handle.cancel();
        }
        self.jobs.invalidate();
        self.session = Session::Empty;
        self.loaded_output = None;
        self.is_downloading = false;
        self.download_url = None;
        self.scroll_to_wait_banner = false;

        if let Some(window) = web_sys::window() {
            window.scroll_to_with_x_and_y(0.0, 0.0);
        }
        true
    }

    fn handle_download(&mut self, ctx: &Context<Self>) -> bool {
        let Session::Generating {
            file_name,
            submission: Submission::Succeeded {
                output: Some(output),
                ..
            },
            ..
        } = &self.session
        else {
            return false;
        };
        if self.is_downloading {
            return false;
        }

        self.is_downloading = true;
        let url = output.clone();
        let download_name = download_file_name(file_name);
        let link = ctx.link().clone();
        spawn_local(async move {
            let result = api::download_output(&url, &download_name).await;
            link.send_message(Msg::DownloadFinished(result));
        });
        true
    }

    fn handle_drop(&mut self, ctx: &Context<Self>, event: DragEvent) -> bool {
        event.prevent_default();
        self.is_dragging = false;

        if let Some(data_transfer) = event.data_transfer() {
            if let Some(file_list) = data_transfer.files() {
                ctx.link()
                    .send_message(Msg::FilesPicked(files_from_list(&file_list)));
            }
        }

        true
    }

    fn handle_paste(&mut self, ctx: &Context<Self>, event: ClipboardEvent) -> bool {
        if let Some(data_transfer) = event.clipboard_data() {
            if let Some(file_list) = data_transfer.files() {
                if file_list.length() > 0 {
                    event.prevent_default();
                    ctx.link()
                        .send_message(Msg::FilesPicked(files_from_list(&file_list)));
                    return true;
                }
            }
        }
        false
    }

    fn notify(&mut self, ctx: &Context<Self>, message: String) {
        let id = self.next_notice_id;
        self.next_notice_id += 1;
        self.notices.push(Notice { id, message });

        let link = ctx.link().clone();
        Timeout::new(NOTICE_DURATION_MS, move || {
            link.send_message(Msg::DismissNotice(id));
        })
        .forget();
    }
}

// Rendering methods
impl Model {
    fn render_wait_banner(&self) -> Html {
        match &self.session {
            Session::Generating { submission, .. } if submission.is_active() => html! {
                <div class="wait-banner" ref={self.wait_banner.clone()}>
                    {"Please wait a while the image is being generated"}
                </div>
            },
            _ => html! {},
        }
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    yew::Renderer::<Model>::new().render();
}
