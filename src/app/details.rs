use std::thread;

use eframe::egui::{self, Ui};

use crate::api::ClusterNode;
use crate::detail::ExpandAction;
use crate::graph::category_icon;
use crate::util::format_count;

use super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Details");
        ui.add_space(4.0);

        let Some(cluster_id) = self.selected_cluster else {
            ui.label("Click a cluster node to inspect it.");
            return;
        };

        let Some(info) = self.cluster_info(cluster_id).cloned() else {
            ui.label(format!("Cluster {cluster_id} is not in the loaded data set."));
            return;
        };

        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.strong(&info.name);
            if !info.category_name.is_empty() {
                ui.label(format!(
                    "{} {}",
                    category_icon(&info.category_id),
                    info.category_name
                ));
            }
            ui.label(format!("{} questions", format_count(info.questions_count)));
            if let Some(penetration) = info.interview_penetration {
                ui.label(format!("Asked in {penetration:.1}% of interviews"));
            }

            if !info.keywords.is_empty() {
                ui.add_space(6.0);
                ui.strong("Keywords");
                ui.label(info.keywords.join(", "));
            }

            if let Some(example) = &info.example_question {
                ui.add_space(6.0);
                ui.strong("Example question");
                ui.label(egui::RichText::new(example).italics());
            }

            if let Some(top_companies) = &info.top_companies
                && !top_companies.is_empty()
            {
                ui.add_space(6.0);
                ui.strong("Top companies");
                ui.label(top_companies.join(", "));
            }

            ui.add_space(10.0);
            self.draw_sample_questions(ui, cluster_id);
        });
    }

    fn draw_sample_questions(&mut self, ui: &mut Ui, cluster_id: i64) {
        let label = if self.detail.is_expanded(cluster_id) {
            "Hide sample questions"
        } else {
            "Show sample questions"
        };
        if ui.button(label).clicked()
            && let Some(ExpandAction::NeedsFetch) = self.detail.toggle(cluster_id)
        {
            self.spawn_detail_fetch(cluster_id);
        }

        if !self.detail.is_expanded(cluster_id) {
            return;
        }

        if let Some(questions) = self.detail.questions(cluster_id) {
            if questions.is_empty() {
                ui.label("No sample questions recorded for this cluster.");
            } else {
                for (index, question) in questions.iter().enumerate() {
                    ui.label(format!("{}. {}", index + 1, question));
                }
            }
        } else if self.detail.is_loading(cluster_id) {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading sample questions...");
            });
        } else {
            ui.label("Sample questions failed to load; collapse and expand to retry.");
        }
    }

    fn cluster_info(&self, cluster_id: i64) -> Option<&ClusterNode> {
        self.overview
            .constellation
            .nodes
            .iter()
            .find(|node| node.id == cluster_id)
            .or_else(|| self.cluster_catalog.iter().find(|node| node.id == cluster_id))
    }

    pub(in crate::app) fn spawn_detail_fetch(&self, cluster_id: i64) {
        let client = self.client.clone();
        let tx = self.detail_tx.clone();

        thread::spawn(move || {
            let result = match client.fetch_cluster_questions(cluster_id) {
                Ok(questions) => Some(questions),
                Err(error) => {
                    log::warn!("sample question fetch failed for cluster {cluster_id}: {error:#}");
                    None
                }
            };
            let _ = tx.send((cluster_id, result));
        });
    }
}
