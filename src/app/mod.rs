use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use eframe::egui::{self, Context, Vec2};

use crate::api::{fetch_overview, ApiClient, ClusterNode, Company, Overview};
use crate::detail::DetailLoader;
use crate::filters::FilterStore;
use crate::graph::{GraphEdge, GraphNode};

mod controls;
mod details;
mod panels;
mod render_utils;
mod view;

pub struct ConstellationApp {
    client: ApiClient,
    state: AppState,
    reload_rx: Option<Receiver<Result<Overview, String>>>,
}

enum AppState {
    Loading {
        store: FilterStore,
        rx: Receiver<Result<Overview, String>>,
    },
    Ready(Box<ViewModel>),
    Error {
        store: FilterStore,
        message: String,
    },
}

/// One cluster's finished detail fetch; `None` marks a failure that must not
/// be cached.
type DetailResult = (i64, Option<Vec<String>>);

/// Identity of a cluster catalog query; a response is applied only while its
/// key still matches the current filter selection.
#[derive(Clone, Debug, PartialEq, Eq)]
struct CatalogKey {
    categories: Vec<String>,
    search: String,
}

struct ViewModel {
    client: ApiClient,
    overview: Overview,
    store: FilterStore,

    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    graph_dirty: bool,
    /// Categories drilled down in the graph, with how many child slots each
    /// currently shows.
    expanded_categories: HashMap<String, usize>,
    selected_cluster: Option<i64>,
    pan: Vec2,
    zoom: f32,

    detail: DetailLoader,
    detail_tx: Sender<DetailResult>,
    detail_rx: Receiver<DetailResult>,

    cluster_catalog: Vec<ClusterNode>,
    catalog_search: String,
    catalog_loaded_key: Option<CatalogKey>,
    catalog_rx: Option<(CatalogKey, Receiver<Result<Vec<ClusterNode>, String>>)>,

    companies: Option<Vec<Company>>,
    companies_rx: Option<Receiver<Result<Vec<Company>, String>>>,
    company_search: String,
}

impl ConstellationApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, api_base: String, initial_query: String) -> Self {
        let client = ApiClient::new(&api_base);
        let store = FilterStore::from_query(&initial_query);
        let state = Self::start_load(&client, store);

        Self {
            client,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(client: &ApiClient) -> Receiver<Result<Overview, String>> {
        let (tx, rx) = mpsc::channel();
        let client = client.clone();

        thread::spawn(move || {
            let result = fetch_overview(&client).map_err(|error| format!("{error:#}"));
            // The receiver may be gone if the app moved on; stale results
            // are dropped by the channel, never applied.
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(client: &ApiClient, store: FilterStore) -> AppState {
        AppState::Loading {
            store,
            rx: Self::spawn_load(client),
        }
    }
}

impl eframe::App for ConstellationApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { store, rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(match result {
                        Ok(overview) => AppState::Ready(Box::new(ViewModel::new(
                            self.client.clone(),
                            overview,
                            store.clone(),
                        ))),
                        Err(message) => AppState::Error {
                            store: store.clone(),
                            message,
                        },
                    });
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading interview constellation...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint();
            }
            AppState::Error { store, message } => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load interview data");
                    ui.add_space(6.0);
                    ui.label(message.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(&self.client, store.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(&self.client));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => {
                            // Filters survive a reload; only the data set is
                            // replaced.
                            transition = Some(match result {
                                Ok(overview) => AppState::Ready(Box::new(ViewModel::new(
                                    self.client.clone(),
                                    overview,
                                    model.store.clone(),
                                ))),
                                Err(message) => AppState::Error {
                                    store: model.store.clone(),
                                    message,
                                },
                            });
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition = Some(AppState::Error {
                                store: model.store.clone(),
                                message: "Background load worker disconnected".to_owned(),
                            });
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}
