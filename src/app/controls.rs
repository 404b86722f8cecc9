use std::collections::HashMap;
use std::sync::mpsc;
use std::thread;

use eframe::egui::{self, Ui};
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::filters::clear_clusters_of_category;
use crate::graph;
use crate::util::{format_count, truncate_label};

use super::view::fuzzy_match_score;
use super::{CatalogKey, ViewModel};

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Filters");
        ui.add_space(4.0);

        let mut search = self.store.filters().search.clone();
        let search_edit = ui.add(
            egui::TextEdit::singleline(&mut search)
                .hint_text("Search categories and clusters")
                .desired_width(f32::INFINITY),
        );
        if search_edit.changed() {
            let mut filters = self.store.filters().clone();
            filters.search = search;
            self.store.update_filters(filters);
        }

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            ui.label("Page");
            let page = self.store.page();
            if ui.add_enabled(page > 1, egui::Button::new("<")).clicked() {
                self.store.update_page(page - 1);
            }
            ui.monospace(page.to_string());
            if ui.button(">").clicked() {
                self.store.update_page(page + 1);
            }
        });

        ui.horizontal(|ui| {
            let has_state = !self.store.filters().is_empty() || self.store.page() > 1;
            if ui
                .add_enabled(has_state, egui::Button::new("Copy view link"))
                .on_hover_text("Copies the query string for this view")
                .clicked()
            {
                ui.ctx().copy_text(self.store.query_string());
            }
            if ui.button("Reset").clicked() {
                self.store.reset();
                self.expanded_categories.clear();
                self.selected_cluster = None;
                self.graph_dirty = true;
            }
        });

        ui.separator();

        egui::ScrollArea::vertical().show(ui, |ui| {
            self.draw_category_section(ui);
            self.draw_cluster_section(ui);
            self.draw_company_section(ui);
        });
    }

    fn draw_category_section(&mut self, ui: &mut Ui) {
        egui::CollapsingHeader::new("Categories")
            .default_open(true)
            .show(ui, |ui| {
                let mut pending: Option<(String, bool)> = None;

                for category in &self.overview.categories {
                    let mut checked = self.store.filters().categories.contains(&category.id);
                    let label = format!(
                        "{} {} ({})",
                        graph::category_icon(&category.id),
                        category.name,
                        category.clusters_count
                    );
                    if ui.checkbox(&mut checked, label).changed() {
                        pending = Some((category.id.clone(), checked));
                    }
                }

                if let Some((category_id, checked)) = pending {
                    self.set_category_checked(&category_id, checked);
                }
            });
    }

    fn draw_cluster_section(&mut self, ui: &mut Ui) {
        egui::CollapsingHeader::new("Clusters")
            .default_open(false)
            .show(ui, |ui| {
                ui.add(
                    egui::TextEdit::singleline(&mut self.catalog_search)
                        .hint_text("Filter clusters")
                        .desired_width(f32::INFINITY),
                );
                if self.catalog_rx.is_some() {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Updating cluster list...");
                    });
                }

                let matcher = SkimMatcherV2::default();
                let category_filter = self.store.filters().categories.clone();
                let query = self.catalog_search.trim().to_string();

                let visible: Vec<(i64, String, u64)> = self
                    .cluster_catalog
                    .iter()
                    .filter(|node| {
                        category_filter.is_empty()
                            || category_filter.iter().any(|id| id == &node.category_id)
                    })
                    .filter(|node| {
                        query.is_empty()
                            || fuzzy_match_score(&matcher, &node.name, &query).is_some()
                    })
                    .map(|node| (node.id, node.name.clone(), node.questions_count))
                    .collect();

                if visible.is_empty() {
                    ui.label("No clusters match.");
                }

                let mut pending: Option<(i64, bool)> = None;
                for (cluster_id, name, questions_count) in &visible {
                    let mut checked = self.store.filters().clusters.contains(cluster_id);
                    let label = format!(
                        "{} ({})",
                        truncate_label(name, 34),
                        format_count(*questions_count)
                    );
                    if ui.checkbox(&mut checked, label).changed() {
                        pending = Some((*cluster_id, checked));
                    }
                }

                if let Some((cluster_id, checked)) = pending {
                    self.set_cluster_checked(cluster_id, checked);
                }
            });
    }

    fn draw_company_section(&mut self, ui: &mut Ui) {
        egui::CollapsingHeader::new("Companies")
            .default_open(false)
            .show(ui, |ui| {
                // The company list is only fetched once someone actually
                // opens this section.
                self.ensure_companies_loading();

                ui.add(
                    egui::TextEdit::singleline(&mut self.company_search)
                        .hint_text("Filter companies")
                        .desired_width(f32::INFINITY),
                );

                let Some(companies) = self.companies.clone() else {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Loading companies...");
                    });
                    return;
                };

                if companies.is_empty() {
                    ui.label("No company data available.");
                    return;
                }

                let matcher = SkimMatcherV2::default();
                let query = self.company_search.trim().to_string();
                let mut pending: Option<(String, bool)> = None;

                for company in &companies {
                    if !query.is_empty()
                        && fuzzy_match_score(&matcher, &company.name, &query).is_none()
                    {
                        continue;
                    }
                    let mut checked = self.store.filters().companies.contains(&company.name);
                    let label = format!("{} ({})", company.name, format_count(company.count));
                    if ui.checkbox(&mut checked, label).changed() {
                        pending = Some((company.name.clone(), checked));
                    }
                }

                if let Some((name, checked)) = pending {
                    self.set_company_checked(&name, checked);
                }
            });
    }

    pub(in crate::app) fn set_category_checked(&mut self, category_id: &str, checked: bool) {
        let mut filters = self.store.filters().clone();
        let currently = filters.categories.iter().any(|id| id == category_id);
        if checked == currently {
            return;
        }

        if checked {
            filters.categories.push(category_id.to_string());
        } else {
            filters.categories.retain(|id| id != category_id);
            let owners = self.cluster_owners();
            clear_clusters_of_category(&mut filters, category_id, |cluster_id| {
                owners.get(&cluster_id).cloned()
            });
        }

        self.store.update_filters(filters);
    }

    pub(in crate::app) fn set_cluster_checked(&mut self, cluster_id: i64, checked: bool) {
        let mut filters = self.store.filters().clone();
        let currently = filters.clusters.contains(&cluster_id);
        if checked == currently {
            return;
        }

        if checked {
            filters.clusters.push(cluster_id);
        } else {
            filters.clusters.retain(|&id| id != cluster_id);
        }

        self.store.update_filters(filters);
    }

    pub(in crate::app) fn set_company_checked(&mut self, name: &str, checked: bool) {
        let mut filters = self.store.filters().clone();
        let currently = filters.companies.iter().any(|company| company == name);
        if checked == currently {
            return;
        }

        if checked {
            filters.companies.push(name.to_string());
        } else {
            filters.companies.retain(|company| company != name);
        }

        self.store.update_filters(filters);
    }

    /// Cluster id to owning category id, drawn from the constellation nodes
    /// plus whatever the catalog has seen.
    fn cluster_owners(&self) -> HashMap<i64, String> {
        let mut owners = HashMap::new();
        for node in self
            .overview
            .constellation
            .nodes
            .iter()
            .chain(self.cluster_catalog.iter())
        {
            if !node.category_id.is_empty() {
                owners
                    .entry(node.id)
                    .or_insert_with(|| node.category_id.clone());
            }
        }
        owners
    }

    pub(in crate::app) fn desired_catalog_key(&self) -> CatalogKey {
        let mut categories = self.store.filters().categories.clone();
        categories.sort();

        let search = self.catalog_search.trim();
        let search = if search.chars().count() >= 2 {
            search.to_string()
        } else {
            String::new()
        };

        CatalogKey { categories, search }
    }

    /// Starts a catalog fetch when the wanted query no longer matches the
    /// loaded one. At most one request runs at a time; a response arriving
    /// for an outdated key is discarded and this kicks off the next fetch.
    pub(in crate::app) fn ensure_catalog_fresh(&mut self) {
        if self.catalog_rx.is_some() {
            return;
        }

        let desired = self.desired_catalog_key();
        if self.catalog_loaded_key.as_ref() == Some(&desired) {
            return;
        }

        let (tx, rx) = mpsc::channel();
        let client = self.client.clone();
        let request_key = desired.clone();
        thread::spawn(move || {
            let result = client
                .fetch_cluster_catalog(&request_key.categories, &request_key.search)
                .map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        self.catalog_rx = Some((desired, rx));
    }

    fn ensure_companies_loading(&mut self) {
        if self.companies.is_some() || self.companies_rx.is_some() {
            return;
        }

        let (tx, rx) = mpsc::channel();
        let client = self.client.clone();
        thread::spawn(move || {
            let result = client
                .fetch_top_companies()
                .map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        self.companies_rx = Some(rx);
    }
}
