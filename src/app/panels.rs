use std::collections::HashMap;
use std::sync::mpsc::{self, TryRecvError};

use eframe::egui::{self, Align, Context, Layout, Vec2};

use crate::api::{ApiClient, Overview};
use crate::detail::DetailLoader;
use crate::filters::FilterStore;
use crate::util::format_count;

use super::{CatalogKey, ViewModel};

impl ViewModel {
    pub(in crate::app) fn new(client: ApiClient, overview: Overview, store: FilterStore) -> Self {
        let (detail_tx, detail_rx) = mpsc::channel();

        // The constellation payload doubles as the initial cluster catalog;
        // the dedicated catalog endpoint is only hit once filters narrow it.
        let cluster_catalog = overview.constellation.nodes.clone();

        Self {
            client,
            overview,
            store,
            nodes: Vec::new(),
            edges: Vec::new(),
            graph_dirty: true,
            expanded_categories: HashMap::new(),
            selected_cluster: None,
            pan: Vec2::ZERO,
            zoom: 0.7,
            detail: DetailLoader::new(),
            detail_tx,
            detail_rx,
            cluster_catalog,
            catalog_search: String::new(),
            // The seed above corresponds to an unfiltered query; a view
            // restored with filters triggers a proper refetch right away.
            catalog_loaded_key: Some(CatalogKey {
                categories: Vec::new(),
                search: String::new(),
            }),
            catalog_rx: None,
            companies: None,
            companies_rx: None,
            company_search: String::new(),
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        reload_requested: &mut bool,
        is_reloading: bool,
    ) {
        self.poll_background_results();
        self.ensure_catalog_fresh();
        if self.graph_dirty {
            self.rebuild_graph();
        }

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("interview constellation");
                    ui.separator();
                    ui.label(format!("api: {}", self.client.base()));
                    ui.label(format!(
                        "questions: {}",
                        format_count(self.overview.totals.questions)
                    ));
                    ui.label(format!(
                        "clusters: {}",
                        format_count(self.overview.totals.clusters)
                    ));
                    ui.label(format!("categories: {}", self.overview.totals.categories));
                    let reload_button =
                        ui.add_enabled(!is_reloading, egui::Button::new("Reload data"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if self.store.page() > 1 {
                            ui.label(format!("page {}", self.store.page()));
                        }
                        let query = self.store.query_string();
                        if !query.is_empty() {
                            ui.monospace(query);
                        }
                    });
                });
            });

        egui::SidePanel::left("filters")
            .resizable(true)
            .default_width(330.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            if is_reloading {
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    ui.heading("Reloading interview data...");
                    ui.add_space(8.0);
                    ui.spinner();
                });
            } else {
                self.draw_graph(ui);
            }
        });

        if self.detail.has_in_flight() || self.catalog_rx.is_some() || self.companies_rx.is_some()
        {
            ctx.request_repaint();
        }
    }

    fn poll_background_results(&mut self) {
        while let Ok((cluster_id, questions)) = self.detail_rx.try_recv() {
            self.detail.complete(cluster_id, questions);
        }

        if let Some((key, rx)) = self.catalog_rx.take() {
            match rx.try_recv() {
                Ok(Ok(catalog)) => {
                    let fresh = key == self.desired_catalog_key();
                    self.catalog_loaded_key = Some(key);
                    if fresh {
                        self.cluster_catalog = catalog;
                    }
                    // A stale response is dropped; ensure_catalog_fresh
                    // issues the follow-up query for the current key.
                }
                Ok(Err(message)) => {
                    log::warn!("cluster catalog fetch failed: {message}");
                    // Keep the previous catalog; retried on the next key
                    // change rather than hammering a failing endpoint.
                    self.catalog_loaded_key = Some(key);
                }
                Err(TryRecvError::Empty) => self.catalog_rx = Some((key, rx)),
                Err(TryRecvError::Disconnected) => {
                    log::warn!("cluster catalog worker disconnected");
                }
            }
        }

        if let Some(rx) = self.companies_rx.take() {
            match rx.try_recv() {
                Ok(Ok(companies)) => self.companies = Some(companies),
                Ok(Err(message)) => {
                    log::warn!("company list fetch failed: {message}");
                    // An empty list renders as "no data"; prevents a
                    // refetch storm against a failing endpoint.
                    self.companies = Some(Vec::new());
                }
                Err(TryRecvError::Empty) => self.companies_rx = Some(rx),
                Err(TryRecvError::Disconnected) => {
                    log::warn!("company list worker disconnected");
                }
            }
        }
    }
}
